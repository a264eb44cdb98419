//! Facts learned from observed traffic.
//!
//! Some device capabilities are never announced on the bus and can only be
//! inferred from what a device reports: whether a thermostat accepts half
//! degrees, which presets a ventilation unit has, whether the elevator
//! interface reports floors. These facts are kept here, keyed by the unique
//! id of the device's primary identity, so they can be persisted and
//! restored across sessions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Temperature step before a half degree has been seen.
pub const DEFAULT_TEMP_STEP: f64 = 1.0;

/// Temperature step once a half degree has been seen.
pub const HALF_TEMP_STEP: f64 = 0.5;

/// Learned facts about one thermostat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermostatFacts {
    /// Smallest setpoint increment; only ever moves from 1.0 to 0.5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_step: Option<f64>,
    /// Last setpoint observed while heating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_temp: Option<f64>,
    /// Last non-zero room temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_temp: Option<f64>,
}

impl ThermostatFacts {
    /// Effective temperature step.
    pub fn temp_step(&self) -> f64 {
        self.temp_step.unwrap_or(DEFAULT_TEMP_STEP)
    }
}

/// Learned facts about one ventilation unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VentilationFacts {
    /// Preset names seen, starting with the default preset.
    #[serde(default)]
    pub presets: Vec<String>,
}

impl VentilationFacts {
    /// Whether any non-default preset has been seen.
    pub fn has_presets(&self) -> bool {
        !self.presets.is_empty()
    }
}

/// Side table of everything the translator has learned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearnedFacts {
    /// Thermostat facts by unique id.
    #[serde(default)]
    pub thermostats: BTreeMap<String, ThermostatFacts>,
    /// Ventilation facts by unique id.
    #[serde(default)]
    pub ventilation: BTreeMap<String, VentilationFacts>,
    /// Elevator unique ids that have reported a floor.
    #[serde(default)]
    pub elevator_floors: BTreeMap<String, bool>,
    /// Last active air-conditioner mode by unique id.
    #[serde(default)]
    pub aircon_modes: BTreeMap<String, String>,
}

impl LearnedFacts {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Thermostat facts, if any.
    pub fn thermostat(&self, unique_id: &str) -> Option<&ThermostatFacts> {
        self.thermostats.get(unique_id)
    }

    /// Ventilation facts, if any.
    pub fn ventilation(&self, unique_id: &str) -> Option<&VentilationFacts> {
        self.ventilation.get(unique_id)
    }

    /// Whether the elevator has reported a floor.
    pub fn elevator_has_floor(&self, unique_id: &str) -> bool {
        self.elevator_floors.get(unique_id).copied().unwrap_or(false)
    }

    /// Last active air-conditioner mode name.
    pub fn aircon_mode(&self, unique_id: &str) -> Option<&str> {
        self.aircon_modes.get(unique_id).map(String::as_str)
    }

    /// Whether nothing has been learned.
    pub fn is_empty(&self) -> bool {
        self.thermostats.is_empty()
            && self.ventilation.is_empty()
            && self.elevator_floors.is_empty()
            && self.aircon_modes.is_empty()
    }

    /// Merge another table into this one; entries in `other` win.
    pub fn merge(&mut self, other: LearnedFacts) {
        self.thermostats.extend(other.thermostats);
        self.ventilation.extend(other.ventilation);
        self.elevator_floors.extend(other.elevator_floors);
        self.aircon_modes.extend(other.aircon_modes);
    }
}
