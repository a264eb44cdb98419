//! Actions a caller can request on a device.

use crate::modes::{FanMode, HvacMode};
use crate::{ProtocolError, ProtocolResult};
use kocom_common::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Named arguments accompanying an action.
pub type ActionArgs = BTreeMap<String, Value>;

/// A parsed, typed action.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Switch on.
    TurnOn,
    /// Switch off.
    TurnOff,
    /// Change the climate operating mode.
    SetHvac(HvacMode),
    /// Change the air-conditioner fan speed.
    SetFan(FanMode),
    /// Change a preset. Climate and ventilation interpret the name.
    SetPreset(String),
    /// Change the target temperature in degrees Celsius.
    SetTemperature(f64),
    /// Change the ventilation speed byte (0 turns the unit off).
    SetPercentage(u8),
    /// Ask the device to report its state without changing it.
    Query,
}

impl Action {
    /// Parse an action name and its arguments.
    ///
    /// | action            | argument      |
    /// |-------------------|---------------|
    /// | `turn_on`         |               |
    /// | `turn_off`        |               |
    /// | `set_hvac`        | `hvac_mode`   |
    /// | `set_fan`         | `fan_mode`    |
    /// | `set_preset`      | `preset_mode` |
    /// | `set_temperature` | `target_temp` |
    /// | `set_percentage`  | `speed`       |
    /// | `query`           |               |
    pub fn parse(name: &str, args: &ActionArgs) -> ProtocolResult<Action> {
        match name {
            "turn_on" => Ok(Action::TurnOn),
            "turn_off" => Ok(Action::TurnOff),
            "set_hvac" => Ok(Action::SetHvac(str_arg(args, "hvac_mode")?.parse()?)),
            "set_fan" => Ok(Action::SetFan(str_arg(args, "fan_mode")?.parse()?)),
            "set_preset" => Ok(Action::SetPreset(str_arg(args, "preset_mode")?.to_string())),
            "set_temperature" => {
                let value = arg(args, "target_temp")?;
                let temp = value.as_f64().ok_or_else(|| ProtocolError::InvalidArgument {
                    name: "target_temp",
                    reason: format!("expected a number, got {}", value),
                })?;
                if !(0.0..128.0).contains(&temp) {
                    return Err(ProtocolError::InvalidArgument {
                        name: "target_temp",
                        reason: format!("{} is out of range", temp),
                    });
                }
                Ok(Action::SetTemperature(temp))
            }
            "set_percentage" => {
                let value = arg(args, "speed")?;
                let speed = value.as_u8().ok_or_else(|| ProtocolError::InvalidArgument {
                    name: "speed",
                    reason: format!("expected 0..=255, got {}", value),
                })?;
                Ok(Action::SetPercentage(speed))
            }
            "query" => Ok(Action::Query),
            other => Err(ProtocolError::UnknownAction(other.to_string())),
        }
    }

    /// Canonical action name.
    pub const fn name(&self) -> &'static str {
        match self {
            Action::TurnOn => "turn_on",
            Action::TurnOff => "turn_off",
            Action::SetHvac(_) => "set_hvac",
            Action::SetFan(_) => "set_fan",
            Action::SetPreset(_) => "set_preset",
            Action::SetTemperature(_) => "set_temperature",
            Action::SetPercentage(_) => "set_percentage",
            Action::Query => "query",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::SetHvac(mode) => write!(f, "set_hvac({})", mode),
            Action::SetFan(mode) => write!(f, "set_fan({})", mode),
            Action::SetPreset(preset) => write!(f, "set_preset({})", preset),
            Action::SetTemperature(temp) => write!(f, "set_temperature({})", temp),
            Action::SetPercentage(speed) => write!(f, "set_percentage({})", speed),
            other => f.write_str(other.name()),
        }
    }
}

fn arg<'a>(args: &'a ActionArgs, name: &'static str) -> ProtocolResult<&'a Value> {
    args.get(name).ok_or(ProtocolError::MissingArgument(name))
}

fn str_arg<'a>(args: &'a ActionArgs, name: &'static str) -> ProtocolResult<&'a str> {
    let value = arg(args, name)?;
    value.as_str().ok_or_else(|| ProtocolError::InvalidArgument {
        name,
        reason: format!("expected a string, got {}", value),
    })
}
