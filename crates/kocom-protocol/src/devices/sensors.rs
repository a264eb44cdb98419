//! Read-only sensors: motion and air quality.

use super::{insert, sensor, EncodeContext, Outbound, UNIT_CELSIUS, UNIT_PERCENT, UNIT_PPM, UNIT_UG_M3};
use crate::expectation::Condition;
use crate::translator::Update;
use crate::{Action, ProtocolResult};
use kocom_common::{DeviceKey, DeviceState, DeviceType, Platform, SubType};
use kocom_packet::{Packet, CMD_MOTION_DETECTED, CMD_QUERY, CMD_STATE};

pub(crate) fn decode_motion(packet: &Packet, room: u8) -> Vec<Update> {
    let detected = match packet.command() {
        CMD_MOTION_DETECTED => true,
        CMD_STATE => false,
        _ => return Vec::new(),
    };
    let key = DeviceKey::primary(DeviceType::Motion, room, 0);
    vec![insert(
        DeviceState::new(key, Platform::BinarySensor, detected).with_attribute("device_class", "motion"),
    )]
}

pub(crate) fn decode_air_quality(packet: &Packet, room: u8) -> Vec<Update> {
    if !matches!(packet.command(), CMD_STATE | CMD_QUERY) {
        return Vec::new();
    }

    let p = packet.payload();
    let readings: [(SubType, u16, &str, &str); 6] = [
        (SubType::Pm10, u16::from(p[0]), "pm10", UNIT_UG_M3),
        (SubType::Pm25, u16::from(p[1]), "pm25", UNIT_UG_M3),
        (SubType::Co2, u16::from_be_bytes([p[2], p[3]]), "carbon_dioxide", UNIT_PPM),
        (
            SubType::Voc,
            u16::from_be_bytes([p[4], p[5]]),
            "volatile_organic_compounds",
            UNIT_UG_M3,
        ),
        (SubType::Temp, u16::from(p[6]), "temperature", UNIT_CELSIUS),
        (SubType::Humidity, u16::from(p[7]), "humidity", UNIT_PERCENT),
    ];

    let key = DeviceKey::primary(DeviceType::AirQuality, room, 0);
    readings
        .into_iter()
        .filter(|(_, value, _, _)| *value > 0)
        .map(|(sub, value, class, unit)| insert(sensor(key.with_sub_type(sub), value, class, unit)))
        .collect()
}

/// Sensors accept nothing but a status query.
pub(crate) fn encode(ctx: &EncodeContext<'_>, action: &Action) -> ProtocolResult<Outbound> {
    match action {
        Action::Query => Outbound::to_device(ctx, CMD_QUERY, [0; 8], Condition::AnyUpdate),
        other => Err(ctx.unsupported(other)),
    }
}
