//! Floor-heating thermostat.
//!
//! Payload of a state report:
//!
//! | byte | meaning                                          |
//! |------|--------------------------------------------------|
//! | 0    | high nibble 1 = heating                          |
//! | 1    | low nibble 1 = away                              |
//! | 2    | setpoint, bit 7 adds half a degree               |
//! | 3    | hot-water temperature                            |
//! | 4    | room temperature                                 |
//! | 5    | heating-water temperature                        |
//! | 6    | error code                                       |

use super::{error_code, insert, num_field, sensor, str_field, EncodeContext, Outbound, UNIT_CELSIUS};
use crate::expectation::{Condition, SLOW_CONFIRM_TIMEOUT};
use crate::learned::{LearnedFacts, HALF_TEMP_STEP};
use crate::modes::{ClimatePreset, HvacMode};
use crate::translator::Update;
use crate::{Action, ProtocolError, ProtocolResult};
use kocom_common::{DeviceKey, DeviceState, DeviceType, Platform, SubType, Value};
use kocom_packet::{Packet, CMD_QUERY, CMD_STATE};
use tracing::debug;

const POWER_ON: u8 = 0x11;
const HALF_DEGREE: u8 = 0x80;

/// Decode a setpoint byte into degrees.
pub(crate) fn decode_setpoint(byte: u8) -> f64 {
    let whole = f64::from(byte & !HALF_DEGREE);
    if byte & HALF_DEGREE != 0 {
        whole + 0.5
    } else {
        whole
    }
}

/// Encode degrees into a setpoint byte.
///
/// The half-degree bit is only set for units known to take 0.5 steps;
/// anything else is truncated to whole degrees.
pub(crate) fn encode_setpoint(temp: f64, half_steps: bool) -> u8 {
    let whole = temp.trunc().clamp(0.0, 127.0) as u8;
    if half_steps && temp.fract() >= HALF_TEMP_STEP {
        whole | HALF_DEGREE
    } else {
        whole
    }
}

/// Whether the addressed thermostat has reported a half-degree setpoint.
fn half_steps(ctx: &EncodeContext<'_>) -> bool {
    ctx.learned
        .thermostat(&ctx.key.with_sub_type(SubType::None).unique_id())
        .is_some_and(|facts| facts.temp_step() == HALF_TEMP_STEP)
}

pub(crate) fn decode(packet: &Packet, room: u8, learned: &mut LearnedFacts) -> Vec<Update> {
    if packet.command() != CMD_STATE {
        return Vec::new();
    }

    let p = packet.payload();
    let key = DeviceKey::primary(DeviceType::Thermostat, room, 0);
    let heating = p[0] >> 4 == 0x01;
    let hvac = if heating { HvacMode::Heat } else { HvacMode::Off };
    let preset = if p[1] & 0x0F == 0x01 {
        ClimatePreset::Away
    } else {
        ClimatePreset::None
    };
    let target = decode_setpoint(p[2]);
    let hot_temp = p[3];
    let current = f64::from(p[4]);
    let heat_temp = p[5];

    let facts = learned.thermostats.entry(key.unique_id()).or_default();
    if target.fract() == HALF_TEMP_STEP && facts.temp_step != Some(HALF_TEMP_STEP) {
        debug!(%key, "half-degree setpoint seen, using 0.5 step");
        facts.temp_step = Some(HALF_TEMP_STEP);
    }
    if target != 0.0 && current != 0.0 {
        if heating && facts.target_temp != Some(target) {
            debug!(%key, target, "user setpoint updated");
            facts.target_temp = Some(target);
        }
        facts.current_temp = Some(current);
    }

    let climate = DeviceState::new(
        key,
        Platform::Climate,
        Value::map([
            ("hvac_mode", Value::from(hvac.as_str())),
            ("preset_mode", Value::from(preset.as_str())),
            ("target_temp", Value::from(facts.target_temp.unwrap_or(target))),
            ("current_temp", Value::from(facts.current_temp.unwrap_or(current))),
        ]),
    )
    .with_attribute("hvac_modes", vec![HvacMode::Heat.as_str(), HvacMode::Off.as_str()])
    .with_attribute(
        "preset_modes",
        vec![ClimatePreset::Away.as_str(), ClimatePreset::None.as_str()],
    )
    .with_attribute("feature_preset", true)
    .with_attribute("temp_step", facts.temp_step());

    let mut updates = vec![insert(climate)];
    if hot_temp > 0 {
        updates.push(insert(sensor(
            key.with_sub_type(SubType::HotTemp),
            hot_temp,
            "temperature",
            UNIT_CELSIUS,
        )));
    }
    if heat_temp > 0 {
        updates.push(insert(sensor(
            key.with_sub_type(SubType::HeatTemp),
            heat_temp,
            "temperature",
            UNIT_CELSIUS,
        )));
    }
    updates.push(insert(error_code(key, p[6])));
    updates
}

pub(crate) fn encode(ctx: &EncodeContext<'_>, action: &Action) -> ProtocolResult<Outbound> {
    let mut payload = [0u8; 8];
    match action {
        Action::SetHvac(mode) => set_hvac(ctx, *mode),
        Action::TurnOn => set_hvac(ctx, HvacMode::Heat),
        Action::TurnOff => set_hvac(ctx, HvacMode::Off),
        Action::SetPreset(name) => {
            let preset: ClimatePreset = name.parse()?;
            payload[0] = POWER_ON;
            payload[1] = u8::from(preset == ClimatePreset::Away);
            Outbound::to_device(
                ctx,
                CMD_STATE,
                payload,
                Condition::field("preset_mode", preset.as_str()),
            )
        }
        Action::SetTemperature(temp) => {
            payload[0] = POWER_ON;
            payload[2] = encode_setpoint(*temp, half_steps(ctx));
            let expected = decode_setpoint(payload[2]);
            Ok(Outbound::to_device(
                ctx,
                CMD_STATE,
                payload,
                Condition::field("target_temp", expected),
            )?
            .with_timeout(ctx.timeout_at_least(SLOW_CONFIRM_TIMEOUT)))
        }
        Action::Query => {
            // Only power and setpoint are re-asserted; the preset is left out.
            let last = ctx.last_state();
            if str_field(last, "hvac_mode") == Some(HvacMode::Heat.as_str()) {
                payload[0] = POWER_ON;
            }
            if let Some(target) = num_field(last, "target_temp") {
                payload[2] = encode_setpoint(target, half_steps(ctx));
            }
            Outbound::to_device(ctx, CMD_QUERY, payload, Condition::AnyUpdate)
        }
        other => Err(ctx.unsupported(other)),
    }
}

fn set_hvac(ctx: &EncodeContext<'_>, mode: HvacMode) -> ProtocolResult<Outbound> {
    let mut payload = [0u8; 8];
    payload[0] = match mode {
        HvacMode::Heat => POWER_ON,
        HvacMode::Off => 0x00,
        other => {
            return Err(ProtocolError::UnknownMode {
                kind: "thermostat hvac mode",
                name: other.as_str().to_string(),
            })
        }
    };
    Outbound::to_device(
        ctx,
        CMD_STATE,
        payload,
        Condition::field("hvac_mode", mode.as_str()),
    )
}
