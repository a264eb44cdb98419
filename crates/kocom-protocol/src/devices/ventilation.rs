//! Ventilation unit.

use super::{error_code, insert, num_field, sensor, str_field, EncodeContext, Outbound, UNIT_PPM};
use crate::expectation::Condition;
use crate::learned::LearnedFacts;
use crate::modes::VentPreset;
use crate::translator::Update;
use crate::{Action, ProtocolResult};
use kocom_common::{DeviceKey, DeviceState, DeviceType, Platform, SubType, Value};
use kocom_packet::{Packet, CMD_QUERY, CMD_STATE};
use tracing::debug;

const POWER_ON: u8 = 0x11;

/// Speed bytes the unit accepts, slowest first.
pub const SPEED_LIST: [u8; 3] = [0x40, 0x80, 0xC0];

pub(crate) fn decode(packet: &Packet, room: u8, learned: &mut LearnedFacts) -> Vec<Update> {
    if packet.command() != CMD_STATE {
        return Vec::new();
    }

    let p = packet.payload();
    let key = DeviceKey::primary(DeviceType::Ventilation, room, 0);
    let on = p[0] >> 4 == 0x01;
    let preset = VentPreset::from_code(p[1]);
    let speed = p[2];
    let co2 = u32::from(p[4]) * 100 + u32::from(p[5]);

    let facts = learned.ventilation.entry(key.unique_id()).or_default();
    if !matches!(preset, VentPreset::Unknown | VentPreset::Ventilation) {
        if !facts.has_presets() {
            debug!(%key, "non-default ventilation preset seen, enabling presets");
            facts.presets.push(VentPreset::Ventilation.as_str().to_string());
        }
        if !facts.presets.iter().any(|known| known == preset.as_str()) {
            debug!(%key, preset = preset.as_str(), "ventilation preset added");
            facts.presets.push(preset.as_str().to_string());
        }
    }

    let fan = DeviceState::new(
        key,
        Platform::Fan,
        Value::map([
            ("state", Value::from(on)),
            ("preset_mode", Value::from(preset.as_str())),
            ("speed", Value::from(speed)),
        ]),
    )
    .with_attribute("feature_preset", facts.has_presets())
    .with_attribute("preset_modes", facts.presets.clone())
    .with_attribute("speed_list", SPEED_LIST.to_vec());

    let mut updates = vec![insert(fan)];
    if co2 > 0 {
        updates.push(insert(sensor(
            key.with_sub_type(SubType::Co2),
            co2,
            "carbon_dioxide",
            UNIT_PPM,
        )));
    }
    updates.push(insert(error_code(key, p[6])));
    updates
}

pub(crate) fn encode(ctx: &EncodeContext<'_>, action: &Action) -> ProtocolResult<Outbound> {
    let mut payload = [0u8; 8];
    match action {
        Action::TurnOn | Action::TurnOff => {
            let on = matches!(action, Action::TurnOn);
            payload[0] = if on { POWER_ON } else { 0x00 };
            Outbound::to_device(ctx, CMD_STATE, payload, Condition::Power(on))
        }
        Action::SetPreset(name) => {
            let preset: VentPreset = name.parse()?;
            payload[0] = POWER_ON;
            payload[1] = preset.code();
            Outbound::to_device(
                ctx,
                CMD_STATE,
                payload,
                Condition::field("preset_mode", preset.as_str()),
            )
        }
        Action::SetPercentage(speed) => {
            payload[0] = if *speed == 0 { 0x00 } else { POWER_ON };
            payload[2] = *speed;
            Outbound::to_device(ctx, CMD_STATE, payload, Condition::field("speed", *speed))
        }
        Action::Query => {
            let last = ctx.last_state();
            if last.map(DeviceState::is_on).unwrap_or(false) {
                payload[0] = POWER_ON;
            }
            if let Some(name) = str_field(last, "preset_mode") {
                payload[1] = VentPreset::from_str_lossy(name).code();
            }
            if let Some(speed) = num_field(last, "speed") {
                payload[2] = speed.clamp(0.0, 255.0) as u8;
            }
            Outbound::to_device(ctx, CMD_QUERY, payload, Condition::AnyUpdate)
        }
        other => Err(ctx.unsupported(other)),
    }
}
