//! Device identity types.

use crate::CommonError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Wire Codes
// ============================================================================

/// Wire code of a light (8 relays per room).
pub const CODE_LIGHT: u8 = 0x0E;
/// Wire code of a wall outlet (8 sockets per room).
pub const CODE_OUTLET: u8 = 0x3B;
/// Wire code of a floor-heating thermostat.
pub const CODE_THERMOSTAT: u8 = 0x36;
/// Wire code of an air conditioner.
pub const CODE_AIRCONDITIONER: u8 = 0x39;
/// Wire code of the ventilation unit.
pub const CODE_VENTILATION: u8 = 0x48;
/// Wire code of the gas valve.
pub const CODE_GASVALVE: u8 = 0x2C;
/// Wire code of the elevator call interface.
pub const CODE_ELEVATOR: u8 = 0x44;
/// Wire code of a motion sensor.
pub const CODE_MOTION: u8 = 0x60;
/// Wire code of the air-quality sensor.
pub const CODE_AIRQUALITY: u8 = 0x98;

// ============================================================================
// Device Type
// ============================================================================

/// Appliance family of a device on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Peer could not be resolved or the wire code is not known.
    Unknown = 0,
    /// On/off light relay.
    Light = 1,
    /// Whole-house light cutoff switch.
    LightCutoff = 2,
    /// Dimmable light.
    DimmingLight = 3,
    /// Wall outlet.
    Outlet = 4,
    /// Floor-heating thermostat.
    Thermostat = 5,
    /// Air conditioner.
    AirConditioner = 6,
    /// Ventilation unit.
    Ventilation = 7,
    /// Gas valve.
    GasValve = 8,
    /// Elevator call interface.
    Elevator = 9,
    /// Motion sensor.
    Motion = 10,
    /// Air-quality sensor.
    AirQuality = 11,
}

impl DeviceType {
    /// All device types in code order.
    pub const ALL: [DeviceType; 12] = [
        DeviceType::Unknown,
        DeviceType::Light,
        DeviceType::LightCutoff,
        DeviceType::DimmingLight,
        DeviceType::Outlet,
        DeviceType::Thermostat,
        DeviceType::AirConditioner,
        DeviceType::Ventilation,
        DeviceType::GasValve,
        DeviceType::Elevator,
        DeviceType::Motion,
        DeviceType::AirQuality,
    ];

    /// Numeric code used in unique ids.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Resolve a device type from the address byte seen on the wire.
    ///
    /// Unknown codes resolve to [`DeviceType::Unknown`].
    pub const fn from_wire_code(code: u8) -> Self {
        match code {
            CODE_LIGHT => DeviceType::Light,
            CODE_OUTLET => DeviceType::Outlet,
            CODE_THERMOSTAT => DeviceType::Thermostat,
            CODE_AIRCONDITIONER => DeviceType::AirConditioner,
            CODE_VENTILATION => DeviceType::Ventilation,
            CODE_GASVALVE => DeviceType::GasValve,
            CODE_ELEVATOR => DeviceType::Elevator,
            CODE_MOTION => DeviceType::Motion,
            CODE_AIRQUALITY => DeviceType::AirQuality,
            _ => DeviceType::Unknown,
        }
    }

    /// Address byte used on the wire, if this type has one of its own.
    ///
    /// The light cutoff shares the light code and dimming lights have no
    /// known address, so both return `None`.
    pub const fn wire_code(self) -> Option<u8> {
        match self {
            DeviceType::Light => Some(CODE_LIGHT),
            DeviceType::Outlet => Some(CODE_OUTLET),
            DeviceType::Thermostat => Some(CODE_THERMOSTAT),
            DeviceType::AirConditioner => Some(CODE_AIRCONDITIONER),
            DeviceType::Ventilation => Some(CODE_VENTILATION),
            DeviceType::GasValve => Some(CODE_GASVALVE),
            DeviceType::Elevator => Some(CODE_ELEVATOR),
            DeviceType::Motion => Some(CODE_MOTION),
            DeviceType::AirQuality => Some(CODE_AIRQUALITY),
            DeviceType::Unknown | DeviceType::LightCutoff | DeviceType::DimmingLight => None,
        }
    }

    /// Lowercase name, used for translation keys and the CLI.
    pub const fn as_str(self) -> &'static str {
        match self {
            DeviceType::Unknown => "unknown",
            DeviceType::Light => "light",
            DeviceType::LightCutoff => "lightcutoff",
            DeviceType::DimmingLight => "dimminglight",
            DeviceType::Outlet => "outlet",
            DeviceType::Thermostat => "thermostat",
            DeviceType::AirConditioner => "airconditioner",
            DeviceType::Ventilation => "ventilation",
            DeviceType::GasValve => "gasvalve",
            DeviceType::Elevator => "elevator",
            DeviceType::Motion => "motion",
            DeviceType::AirQuality => "airquality",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        DeviceType::ALL
            .iter()
            .copied()
            .find(|dt| dt.as_str() == normalized)
            .ok_or_else(|| CommonError::UnknownDeviceType(s.to_string()))
    }
}

// ============================================================================
// Sub Type
// ============================================================================

/// Observable facet of a physical device.
///
/// `None` is the primary state; the others are auxiliary sensors reported in
/// the same frame (e.g. a thermostat's hot-water temperature).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubType {
    /// Primary state.
    None = 0,
    /// Elevator travel direction.
    Direction = 1,
    /// Elevator floor.
    Floor = 2,
    /// Error code flag.
    ErrCode = 3,
    /// Heating water temperature.
    HeatTemp = 4,
    /// Hot water temperature.
    HotTemp = 5,
    /// CO2 concentration.
    Co2 = 6,
    /// PM10 concentration.
    Pm10 = 7,
    /// PM2.5 concentration.
    Pm25 = 8,
    /// Volatile organic compounds.
    Voc = 9,
    /// Air temperature.
    Temp = 10,
    /// Relative humidity.
    Humidity = 11,
}

impl SubType {
    /// All sub types in code order.
    pub const ALL: [SubType; 12] = [
        SubType::None,
        SubType::Direction,
        SubType::Floor,
        SubType::ErrCode,
        SubType::HeatTemp,
        SubType::HotTemp,
        SubType::Co2,
        SubType::Pm10,
        SubType::Pm25,
        SubType::Voc,
        SubType::Temp,
        SubType::Humidity,
    ];

    /// Numeric code used in unique ids.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            SubType::None => "none",
            SubType::Direction => "direction",
            SubType::Floor => "floor",
            SubType::ErrCode => "errcode",
            SubType::HeatTemp => "heattemp",
            SubType::HotTemp => "hottemp",
            SubType::Co2 => "co2",
            SubType::Pm10 => "pm10",
            SubType::Pm25 => "pm25",
            SubType::Voc => "voc",
            SubType::Temp => "temp",
            SubType::Humidity => "humidity",
        }
    }
}

impl fmt::Display for SubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubType {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.replace(['_', '-'], "").to_ascii_lowercase();
        SubType::ALL
            .iter()
            .copied()
            .find(|st| st.as_str() == normalized)
            .ok_or_else(|| CommonError::UnknownSubType(s.to_string()))
    }
}

// ============================================================================
// Platform
// ============================================================================

/// Capability shape a device is exposed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    /// On/off sensor.
    BinarySensor,
    /// Numeric or text sensor.
    Sensor,
    /// On/off actuator.
    Switch,
    /// Light.
    Light,
    /// Thermostat or air conditioner.
    Climate,
    /// Ventilation fan.
    Fan,
}

impl Platform {
    /// All platforms.
    pub const ALL: [Platform; 6] = [
        Platform::BinarySensor,
        Platform::Sensor,
        Platform::Switch,
        Platform::Light,
        Platform::Climate,
        Platform::Fan,
    ];

    /// Lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Platform::BinarySensor => "binary_sensor",
            Platform::Sensor => "sensor",
            Platform::Switch => "switch",
            Platform::Light => "light",
            Platform::Climate => "climate",
            Platform::Fan => "fan",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| CommonError::UnknownPlatform(s.to_string()))
    }
}

// ============================================================================
// Device Key
// ============================================================================

/// Identity of one controllable or observable quantity on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeviceKey {
    /// Appliance family.
    pub device_type: DeviceType,
    /// Room number as addressed on the bus.
    pub room_index: u8,
    /// Sub-device index within the room (light/outlet channel).
    pub device_index: u8,
    /// Observable facet.
    pub sub_type: SubType,
}

impl DeviceKey {
    /// Create a new key.
    pub const fn new(
        device_type: DeviceType,
        room_index: u8,
        device_index: u8,
        sub_type: SubType,
    ) -> Self {
        DeviceKey {
            device_type,
            room_index,
            device_index,
            sub_type,
        }
    }

    /// Key of the primary state of a device (sub type `None`).
    pub const fn primary(device_type: DeviceType, room_index: u8, device_index: u8) -> Self {
        Self::new(device_type, room_index, device_index, SubType::None)
    }

    /// Same device, different sub-device index.
    pub const fn with_device_index(self, device_index: u8) -> Self {
        DeviceKey {
            device_index,
            ..self
        }
    }

    /// Same device, different facet.
    pub const fn with_sub_type(self, sub_type: SubType) -> Self {
        DeviceKey { sub_type, ..self }
    }

    /// Numeric tuple form.
    pub const fn as_tuple(&self) -> (u8, u8, u8, u8) {
        (
            self.device_type.code(),
            self.room_index,
            self.device_index,
            self.sub_type.code(),
        )
    }

    /// Stable string id, e.g. `"5-2_0-0"`.
    pub fn unique_id(&self) -> String {
        format!(
            "{}-{}_{}-{}",
            self.device_type.code(),
            self.room_index,
            self.device_index,
            self.sub_type.code()
        )
    }

    /// Translation key, e.g. `"thermostat"` or `"thermostat-hottemp"`.
    pub fn format_key(&self) -> String {
        match self.sub_type {
            SubType::None => self.device_type.as_str().to_string(),
            sub => format!("{}-{}", self.device_type.as_str(), sub.as_str()),
        }
    }

    /// Translation placeholder, `"{room}-{index}"`.
    pub fn placeholder(&self) -> String {
        format!("{}-{}", self.room_index, self.device_index)
    }

    /// Grouping label of the physical device this key belongs to.
    pub fn identifier(&self) -> String {
        match self.device_type {
            DeviceType::Ventilation
            | DeviceType::GasValve
            | DeviceType::Elevator
            | DeviceType::Motion => "KOCOM".to_string(),
            DeviceType::Light | DeviceType::LightCutoff | DeviceType::DimmingLight => {
                "KOCOM LIGHT".to_string()
            }
            other => format!("KOCOM {}", other.as_str().to_ascii_uppercase()),
        }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[room={} index={} sub={}]",
            self.device_type, self.room_index, self.device_index, self.sub_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_code_roundtrip() {
        for dt in DeviceType::ALL {
            if let Some(code) = dt.wire_code() {
                assert_eq!(DeviceType::from_wire_code(code), dt);
            }
        }
        assert_eq!(DeviceType::from_wire_code(0x77), DeviceType::Unknown);
        assert_eq!(DeviceType::LightCutoff.wire_code(), None);
    }

    #[test]
    fn test_unique_id_and_keys() {
        let key = DeviceKey::new(DeviceType::Thermostat, 2, 0, SubType::HotTemp);
        assert_eq!(key.unique_id(), "5-2_0-5");
        assert_eq!(key.format_key(), "thermostat-hottemp");
        assert_eq!(key.placeholder(), "2-0");
        assert_eq!(key.identifier(), "KOCOM THERMOSTAT");
        assert_eq!(key.as_tuple(), (5, 2, 0, 5));
    }

    #[test]
    fn test_identifier_groups() {
        assert_eq!(DeviceKey::primary(DeviceType::GasValve, 0, 0).identifier(), "KOCOM");
        assert_eq!(
            DeviceKey::primary(DeviceType::LightCutoff, 0, 0).identifier(),
            "KOCOM LIGHT"
        );
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("air_conditioner".parse::<DeviceType>(), Ok(DeviceType::AirConditioner));
        assert_eq!("Gas-Valve".parse::<DeviceType>(), Ok(DeviceType::GasValve));
        assert_eq!("hot_temp".parse::<SubType>(), Ok(SubType::HotTemp));
        assert_eq!("binary_sensor".parse::<Platform>(), Ok(Platform::BinarySensor));
        assert!("toaster".parse::<DeviceType>().is_err());
    }

    #[test]
    fn test_with_helpers() {
        let key = DeviceKey::primary(DeviceType::Light, 1, 0);
        let other = key.with_device_index(5);
        assert_eq!(other.device_index, 5);
        assert_eq!(other.room_index, 1);
        assert_eq!(key.with_sub_type(SubType::ErrCode).sub_type, SubType::ErrCode);
    }
}
