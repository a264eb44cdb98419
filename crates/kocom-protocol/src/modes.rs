//! Named operating modes and their wire codes.

use crate::{ProtocolError, ProtocolResult};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// HVAC Mode
// ============================================================================

/// Climate operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HvacMode {
    /// Off.
    Off,
    /// Heating (thermostat only).
    Heat,
    /// Cooling.
    Cool,
    /// Fan only.
    FanOnly,
    /// Dehumidify.
    Dry,
    /// Automatic.
    Auto,
}

impl HvacMode {
    /// Air-conditioner modes in wire-code order.
    pub const AIRCON: [HvacMode; 4] = [HvacMode::Cool, HvacMode::FanOnly, HvacMode::Dry, HvacMode::Auto];

    /// Name as reported in state values.
    pub const fn as_str(self) -> &'static str {
        match self {
            HvacMode::Off => "off",
            HvacMode::Heat => "heat",
            HvacMode::Cool => "cool",
            HvacMode::FanOnly => "fan_only",
            HvacMode::Dry => "dry",
            HvacMode::Auto => "auto",
        }
    }

    /// Air-conditioner mode byte.
    pub const fn aircon_code(self) -> Option<u8> {
        match self {
            HvacMode::Cool => Some(0x00),
            HvacMode::FanOnly => Some(0x01),
            HvacMode::Dry => Some(0x02),
            HvacMode::Auto => Some(0x03),
            HvacMode::Off | HvacMode::Heat => None,
        }
    }

    /// Resolve an air-conditioner mode byte.
    pub fn from_aircon_code(code: u8) -> Option<Self> {
        HvacMode::AIRCON
            .iter()
            .copied()
            .find(|m| m.aircon_code() == Some(code))
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HvacMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        match s {
            "off" => Ok(HvacMode::Off),
            "heat" => Ok(HvacMode::Heat),
            "cool" => Ok(HvacMode::Cool),
            "fan_only" => Ok(HvacMode::FanOnly),
            "dry" => Ok(HvacMode::Dry),
            "auto" => Ok(HvacMode::Auto),
            other => Err(ProtocolError::UnknownMode {
                kind: "hvac mode",
                name: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// Fan Mode
// ============================================================================

/// Air-conditioner fan speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FanMode {
    /// Low.
    Low,
    /// Medium.
    Medium,
    /// High.
    High,
    /// Automatic.
    Auto,
}

impl FanMode {
    /// All fan modes in wire-code order.
    pub const ALL: [FanMode; 4] = [FanMode::Low, FanMode::Medium, FanMode::High, FanMode::Auto];

    /// Name as reported in state values.
    pub const fn as_str(self) -> &'static str {
        match self {
            FanMode::Low => "low",
            FanMode::Medium => "medium",
            FanMode::High => "high",
            FanMode::Auto => "auto",
        }
    }

    /// Fan byte.
    pub const fn code(self) -> u8 {
        match self {
            FanMode::Low => 0x01,
            FanMode::Medium => 0x02,
            FanMode::High => 0x03,
            FanMode::Auto => 0x04,
        }
    }

    /// Resolve a fan byte.
    pub fn from_code(code: u8) -> Option<Self> {
        FanMode::ALL.iter().copied().find(|m| m.code() == code)
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FanMode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        FanMode::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownMode {
                kind: "fan mode",
                name: s.to_string(),
            })
    }
}

// ============================================================================
// Presets
// ============================================================================

/// Thermostat preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClimatePreset {
    /// Normal operation.
    None,
    /// Away mode.
    Away,
}

impl ClimatePreset {
    /// Name as reported in state values.
    pub const fn as_str(self) -> &'static str {
        match self {
            ClimatePreset::None => "none",
            ClimatePreset::Away => "away",
        }
    }
}

impl FromStr for ClimatePreset {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        match s {
            "none" => Ok(ClimatePreset::None),
            "away" => Ok(ClimatePreset::Away),
            other => Err(ProtocolError::UnknownMode {
                kind: "climate preset",
                name: other.to_string(),
            }),
        }
    }
}

/// Ventilation preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VentPreset {
    /// Not reported.
    Unknown,
    /// Plain ventilation (the default preset).
    Ventilation,
    /// Automatic.
    Auto,
    /// Heat-exchanger bypass.
    Bypass,
    /// Night mode.
    Sleep,
    /// Recirculating purification.
    AirPurification,
}

impl VentPreset {
    /// All presets in wire-code order.
    pub const ALL: [VentPreset; 6] = [
        VentPreset::Unknown,
        VentPreset::Ventilation,
        VentPreset::Auto,
        VentPreset::Bypass,
        VentPreset::Sleep,
        VentPreset::AirPurification,
    ];

    /// Name as reported in state values.
    pub const fn as_str(self) -> &'static str {
        match self {
            VentPreset::Unknown => "unknown",
            VentPreset::Ventilation => "ventilation",
            VentPreset::Auto => "auto",
            VentPreset::Bypass => "bypass",
            VentPreset::Sleep => "sleep",
            VentPreset::AirPurification => "air purification",
        }
    }

    /// Preset byte.
    pub const fn code(self) -> u8 {
        match self {
            VentPreset::Unknown => 0x00,
            VentPreset::Ventilation => 0x01,
            VentPreset::Auto => 0x02,
            VentPreset::Bypass => 0x03,
            VentPreset::Sleep => 0x05,
            VentPreset::AirPurification => 0x08,
        }
    }

    /// Resolve a preset byte; unmapped bytes are `Unknown`.
    pub fn from_code(code: u8) -> Self {
        VentPreset::ALL
            .iter()
            .copied()
            .find(|p| p.code() == code)
            .unwrap_or(VentPreset::Unknown)
    }

    /// Resolve a preset name; unknown names are `Unknown`.
    pub fn from_str_lossy(name: &str) -> Self {
        name.parse().unwrap_or(VentPreset::Unknown)
    }
}

impl FromStr for VentPreset {
    type Err = ProtocolError;

    fn from_str(s: &str) -> ProtocolResult<Self> {
        VentPreset::ALL
            .iter()
            .copied()
            .filter(|p| *p != VentPreset::Unknown)
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownMode {
                kind: "ventilation preset",
                name: s.to_string(),
            })
    }
}

// ============================================================================
// Elevator Direction
// ============================================================================

/// Direction reported by the elevator interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElevatorDirection {
    /// Car is stationary.
    Idle,
    /// Car moving down.
    Downward,
    /// Car moving up.
    Upward,
    /// Car arrived at our floor.
    Arrival,
    /// Call acknowledged.
    Called,
    /// Unmapped byte.
    Unknown,
}

impl ElevatorDirection {
    /// Resolve the direction byte.
    pub const fn from_code(code: u8) -> Self {
        match code {
            0x00 => ElevatorDirection::Idle,
            0x01 => ElevatorDirection::Downward,
            0x02 => ElevatorDirection::Upward,
            0x03 => ElevatorDirection::Arrival,
            _ => ElevatorDirection::Unknown,
        }
    }

    /// Name as reported in state values.
    pub const fn as_str(self) -> &'static str {
        match self {
            ElevatorDirection::Idle => "idle",
            ElevatorDirection::Downward => "downward",
            ElevatorDirection::Upward => "upward",
            ElevatorDirection::Arrival => "arrival",
            ElevatorDirection::Called => "called",
            ElevatorDirection::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aircon_codes() {
        assert_eq!(HvacMode::from_aircon_code(0x02), Some(HvacMode::Dry));
        assert_eq!(HvacMode::from_aircon_code(0x09), None);
        assert_eq!(HvacMode::Heat.aircon_code(), None);
        assert_eq!("fan_only".parse::<HvacMode>(), Ok(HvacMode::FanOnly));
    }

    #[test]
    fn test_vent_presets() {
        assert_eq!(VentPreset::from_code(0x08), VentPreset::AirPurification);
        assert_eq!(VentPreset::from_code(0x04), VentPreset::Unknown);
        assert_eq!("air purification".parse::<VentPreset>(), Ok(VentPreset::AirPurification));
        assert!("unknown".parse::<VentPreset>().is_err());
    }

    #[test]
    fn test_fan_modes() {
        assert_eq!(FanMode::from_code(3), Some(FanMode::High));
        assert_eq!("auto".parse::<FanMode>().map(FanMode::code), Ok(0x04));
        assert!("turbo".parse::<FanMode>().is_err());
    }
}
