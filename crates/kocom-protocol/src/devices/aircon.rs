//! Air conditioner.
//!
//! Set commands carry the full operating state, so every encoded frame
//! starts from the last known power, mode, fan and setpoint and changes
//! only what the action asks for.

use super::{insert, num_field, str_field, EncodeContext, Outbound};
use crate::expectation::{Condition, SLOW_CONFIRM_TIMEOUT};
use crate::learned::{LearnedFacts, DEFAULT_TEMP_STEP};
use crate::modes::{FanMode, HvacMode};
use crate::translator::Update;
use crate::{Action, ProtocolError, ProtocolResult};
use kocom_common::{DeviceKey, DeviceState, DeviceType, Platform, Value};
use kocom_packet::{Packet, CMD_QUERY, CMD_STATE};

const POWER_ON: u8 = 0x10;

pub(crate) fn decode(packet: &Packet, room: u8, learned: &mut LearnedFacts) -> Vec<Update> {
    if packet.command() != CMD_STATE {
        return Vec::new();
    }

    let p = packet.payload();
    let key = DeviceKey::primary(DeviceType::AirConditioner, room, 0);
    let mode = if p[0] == POWER_ON {
        HvacMode::from_aircon_code(p[1]).unwrap_or(HvacMode::Off)
    } else {
        HvacMode::Off
    };
    let fan = FanMode::from_code(p[2]).unwrap_or(FanMode::Low);

    if mode != HvacMode::Off {
        learned
            .aircon_modes
            .insert(key.unique_id(), mode.as_str().to_string());
    }

    let mut hvac_modes: Vec<&str> = HvacMode::AIRCON.iter().map(|m| m.as_str()).collect();
    hvac_modes.push(HvacMode::Off.as_str());
    let fan_modes: Vec<&str> = FanMode::ALL.iter().map(|m| m.as_str()).collect();

    let state = DeviceState::new(
        key,
        Platform::Climate,
        Value::map([
            ("hvac_mode", Value::from(mode.as_str())),
            ("fan_mode", Value::from(fan.as_str())),
            ("current_temp", Value::from(f64::from(p[4]))),
            ("target_temp", Value::from(f64::from(p[5]))),
        ]),
    )
    .with_attribute("hvac_modes", hvac_modes)
    .with_attribute("fan_modes", fan_modes)
    .with_attribute("feature_fan", true)
    .with_attribute("temp_step", DEFAULT_TEMP_STEP);

    vec![insert(state)]
}

/// Payload re-asserting the last known state.
fn last_known_payload(ctx: &EncodeContext<'_>) -> [u8; 8] {
    let last = ctx.last_state();
    let mut payload = [0u8; 8];
    if let Some(code) = str_field(last, "hvac_mode")
        .and_then(|m| m.parse::<HvacMode>().ok())
        .and_then(HvacMode::aircon_code)
    {
        payload[0] = POWER_ON;
        payload[1] = code;
    }
    if let Some(fan) = str_field(last, "fan_mode").and_then(|m| m.parse::<FanMode>().ok()) {
        payload[2] = fan.code();
    }
    if let Some(target) = num_field(last, "target_temp") {
        payload[5] = target.clamp(0.0, 255.0) as u8;
    }
    payload
}

/// Mode to resume on `turn_on`: current, else last active, else cool.
fn resume_mode(ctx: &EncodeContext<'_>) -> HvacMode {
    let active = |name: &str| {
        name.parse::<HvacMode>()
            .ok()
            .filter(|m| m.aircon_code().is_some())
    };
    str_field(ctx.last_state(), "hvac_mode")
        .and_then(active)
        .or_else(|| ctx.learned.aircon_mode(&ctx.key.unique_id()).and_then(active))
        .unwrap_or(HvacMode::Cool)
}

pub(crate) fn encode(ctx: &EncodeContext<'_>, action: &Action) -> ProtocolResult<Outbound> {
    let mut payload = last_known_payload(ctx);
    match action {
        Action::SetHvac(mode) => set_hvac(ctx, payload, *mode),
        Action::TurnOn => set_hvac(ctx, payload, resume_mode(ctx)),
        Action::TurnOff => set_hvac(ctx, payload, HvacMode::Off),
        Action::SetFan(fan) => {
            payload[0] = POWER_ON;
            payload[2] = fan.code();
            Outbound::to_device(ctx, CMD_STATE, payload, Condition::field("fan_mode", fan.as_str()))
        }
        Action::SetTemperature(temp) => {
            payload[0] = POWER_ON;
            payload[5] = temp.trunc().clamp(0.0, 255.0) as u8;
            let expected = f64::from(payload[5]);
            Ok(Outbound::to_device(
                ctx,
                CMD_STATE,
                payload,
                Condition::field("target_temp", expected),
            )?
            .with_timeout(ctx.timeout_at_least(SLOW_CONFIRM_TIMEOUT)))
        }
        Action::Query => Outbound::to_device(ctx, CMD_QUERY, payload, Condition::AnyUpdate),
        other => Err(ctx.unsupported(other)),
    }
}

fn set_hvac(ctx: &EncodeContext<'_>, mut payload: [u8; 8], mode: HvacMode) -> ProtocolResult<Outbound> {
    match mode {
        HvacMode::Off => payload[0] = 0x00,
        other => {
            let code = other.aircon_code().ok_or_else(|| ProtocolError::UnknownMode {
                kind: "air conditioner hvac mode",
                name: other.as_str().to_string(),
            })?;
            payload[0] = POWER_ON;
            payload[1] = code;
        }
    }
    Outbound::to_device(ctx, CMD_STATE, payload, Condition::field("hvac_mode", mode.as_str()))
}
