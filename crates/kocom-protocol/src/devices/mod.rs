//! Per-family decode and encode rules.
//!
//! Each module exposes `decode` (frame to updates) and `encode` (action to
//! outbound frame plus confirmation condition). The translator picks the
//! module with an exhaustive match over [`kocom_common::DeviceType`].

pub(crate) mod aircon;
pub(crate) mod elevator;
pub(crate) mod gasvalve;
pub(crate) mod sensors;
pub(crate) mod switch;
pub(crate) mod thermostat;
pub(crate) mod ventilation;

use crate::expectation::Condition;
use crate::learned::LearnedFacts;
use crate::translator::{StateLookup, Update};
use crate::{Action, ProtocolError, ProtocolResult};
use kocom_common::{DeviceKey, DeviceState, Platform, SubType, Value};
use kocom_packet::Address;
use std::time::Duration;

pub(crate) const UNIT_CELSIUS: &str = "°C";
pub(crate) const UNIT_PPM: &str = "ppm";
pub(crate) const UNIT_UG_M3: &str = "µg/m³";
pub(crate) const UNIT_PERCENT: &str = "%";

/// Everything an encoder may consult.
pub(crate) struct EncodeContext<'a> {
    pub key: DeviceKey,
    pub lookup: &'a dyn StateLookup,
    pub learned: &'a LearnedFacts,
    pub confirm_timeout: Duration,
}

impl EncodeContext<'_> {
    /// Last known primary state of the addressed device.
    pub fn last_state(&self) -> Option<&DeviceState> {
        self.lookup.lookup(&self.key.with_sub_type(SubType::None))
    }

    /// Default wait, raised to at least `floor`.
    pub fn timeout_at_least(&self, floor: Duration) -> Duration {
        self.confirm_timeout.max(floor)
    }

    pub fn unsupported(&self, action: &Action) -> ProtocolError {
        ProtocolError::UnsupportedAction {
            device_type: self.key.device_type,
            action: action.name(),
        }
    }

    /// Destination address of the device, from its wire code.
    pub fn device_address(&self) -> ProtocolResult<Address> {
        self.key
            .device_type
            .wire_code()
            .map(|code| Address::new(code, self.key.room_index))
            .ok_or(ProtocolError::UnsupportedDevice(self.key.device_type))
    }
}

/// An encoded command before it is framed.
#[derive(Debug)]
pub(crate) struct Outbound {
    pub dest: Address,
    pub src: Address,
    pub command: u8,
    pub payload: [u8; 8],
    pub condition: Condition,
    pub timeout: Duration,
}

impl Outbound {
    /// A wallpad-to-device command with the default timeout.
    pub fn to_device(
        ctx: &EncodeContext<'_>,
        command: u8,
        payload: [u8; 8],
        condition: Condition,
    ) -> ProtocolResult<Self> {
        Ok(Outbound {
            dest: ctx.device_address()?,
            src: Address::WALLPAD,
            command,
            payload,
            condition,
            timeout: ctx.confirm_timeout,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

// ============================================================================
// State Builders
// ============================================================================

pub(crate) fn insert(state: DeviceState) -> Update {
    Update {
        state,
        allow_insert: true,
    }
}

pub(crate) fn sensor(
    key: DeviceKey,
    value: impl Into<Value>,
    device_class: &str,
    unit: &str,
) -> DeviceState {
    DeviceState::new(key, Platform::Sensor, value)
        .with_attribute("device_class", device_class)
        .with_attribute("unit_of_measurement", unit)
}

/// Binary "problem" sensor carrying the two-digit error code.
pub(crate) fn error_code(key: DeviceKey, code: u8) -> DeviceState {
    DeviceState::new(key.with_sub_type(SubType::ErrCode), Platform::BinarySensor, code != 0)
        .with_attribute("device_class", "problem")
        .with_attribute("error_code", format!("{:02}", code))
}

/// Read a string field of a map-shaped state.
pub(crate) fn str_field<'s>(state: Option<&'s DeviceState>, name: &str) -> Option<&'s str> {
    state.and_then(|s| s.field(name)).and_then(Value::as_str)
}

/// Read a numeric field of a map-shaped state.
pub(crate) fn num_field(state: Option<&DeviceState>, name: &str) -> Option<f64> {
    state.and_then(|s| s.field(name)).and_then(Value::as_f64)
}
