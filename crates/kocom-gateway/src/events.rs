//! Notifications broadcast to gateway subscribers.

use kocom_common::{DeviceKey, DeviceState};

/// A registry change.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayEvent {
    /// An identity was registered for the first time.
    NewDevice(DeviceState),
    /// A registered identity changed platform, value or attributes.
    DeviceUpdated(DeviceState),
}

impl GatewayEvent {
    /// State carried by the event.
    pub fn state(&self) -> &DeviceState {
        match self {
            GatewayEvent::NewDevice(state) | GatewayEvent::DeviceUpdated(state) => state,
        }
    }

    pub fn key(&self) -> &DeviceKey {
        &self.state().key
    }

    /// Whether this announces a new device.
    pub fn is_new(&self) -> bool {
        matches!(self, GatewayEvent::NewDevice(_))
    }
}
