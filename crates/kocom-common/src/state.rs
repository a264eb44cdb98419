//! Decoded device state.

use crate::{Attributes, DeviceKey, Platform, Value};
use serde::{Deserialize, Serialize};

/// One decoded, identity-keyed device state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    /// Identity of the quantity this state describes.
    pub key: DeviceKey,
    /// Capability shape the device is exposed as.
    pub platform: Platform,
    /// Static or learned metadata (unit, device class, modes, step size).
    #[serde(default)]
    pub attributes: Attributes,
    /// Current value.
    pub value: Value,
    /// Frame this state was decoded from, kept for restore replay.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_frame: Option<Vec<u8>>,
}

impl DeviceState {
    /// Create a state with no attributes and no raw frame.
    pub fn new(key: DeviceKey, platform: Platform, value: impl Into<Value>) -> Self {
        DeviceState {
            key,
            platform,
            attributes: Attributes::new(),
            value: value.into(),
            raw_frame: None,
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Replace all attributes.
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Attach the raw frame.
    pub fn with_raw_frame(mut self, raw: &[u8]) -> Self {
        self.raw_frame = Some(raw.to_vec());
        self
    }

    /// Look up an attribute.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Look up a field of a map-shaped value (climate, fan).
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.value.get(name)
    }

    /// Whether the value reads as "on".
    ///
    /// Map-shaped values are on when their `state` field is true.
    pub fn is_on(&self) -> bool {
        match &self.value {
            Value::Map(_) => self.field("state").map(Value::is_truthy).unwrap_or(false),
            other => other.is_truthy(),
        }
    }

    /// Compare everything except the raw frame.
    pub fn same_content(&self, other: &DeviceState) -> bool {
        self.key == other.key
            && self.platform == other.platform
            && self.value == other.value
            && self.attributes == other.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceType, SubType};

    #[test]
    fn test_same_content_ignores_raw_frame() {
        let key = DeviceKey::new(DeviceType::Light, 1, 0, SubType::None);
        let a = DeviceState::new(key, Platform::Light, true).with_raw_frame(&[1, 2, 3]);
        let b = DeviceState::new(key, Platform::Light, true);
        assert!(a.same_content(&b));
        assert_ne!(a, b);

        let c = b.clone().with_attribute("temp_step", 0.5);
        assert!(!b.same_content(&c));
    }

    #[test]
    fn test_is_on_for_map_values() {
        let key = DeviceKey::new(DeviceType::Ventilation, 0, 0, SubType::None);
        let on = DeviceState::new(key, Platform::Fan, Value::map([("state", true)]));
        let off = DeviceState::new(key, Platform::Fan, Value::map([("state", false)]));
        assert!(on.is_on());
        assert!(!off.is_on());
    }
}
