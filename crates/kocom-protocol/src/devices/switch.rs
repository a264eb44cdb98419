//! Lights, outlets and the light cutoff.
//!
//! Lights and outlets report all eight channels of a room in one frame, one
//! payload byte per channel (`0xFF` on, `0x00` off). A set command must
//! carry all eight channels too, so it is rebuilt from last known states.

use super::{insert, EncodeContext, Outbound};
use crate::expectation::Condition;
use crate::translator::Update;
use crate::{Action, ProtocolError, ProtocolResult};
use kocom_common::{DeviceKey, DeviceState, DeviceType, Platform, SubType};
use kocom_packet::{Packet, CMD_CUTOFF_OFF, CMD_CUTOFF_ON, CMD_QUERY, CMD_STATE};

const CHANNELS: u8 = 8;
const ON: u8 = 0xFF;
const OFF: u8 = 0x00;

/// Decode a relay report for a light or outlet room.
pub(crate) fn decode(packet: &Packet, device_type: DeviceType, room: u8) -> Vec<Update> {
    if packet.command() != CMD_STATE {
        return Vec::new();
    }

    let payload = packet.payload();
    (0..CHANNELS)
        .map(|index| {
            let key = DeviceKey::new(device_type, room, index, SubType::None);
            let on = payload[index as usize] == ON;
            let state = match device_type {
                DeviceType::Outlet => {
                    DeviceState::new(key, Platform::Switch, on).with_attribute("device_class", "outlet")
                }
                _ => DeviceState::new(key, Platform::Light, on),
            };
            // Channels that have never been on are not registered.
            Update {
                state,
                allow_insert: on,
            }
        })
        .collect()
}

/// Decode a whole-house light cutoff frame.
pub(crate) fn decode_cutoff(packet: &Packet) -> Vec<Update> {
    let on = match packet.command() {
        CMD_CUTOFF_ON => true,
        CMD_CUTOFF_OFF => false,
        _ => return Vec::new(),
    };
    let key = DeviceKey::primary(DeviceType::LightCutoff, 0, 0);
    vec![insert(DeviceState::new(key, Platform::Light, on))]
}

pub(crate) fn encode(ctx: &EncodeContext<'_>, action: &Action) -> ProtocolResult<Outbound> {
    let index = ctx.key.device_index;
    if index >= CHANNELS {
        return Err(ProtocolError::InvalidArgument {
            name: "device_index",
            reason: format!("{} is not a channel (0..{})", index, CHANNELS),
        });
    }

    match action {
        Action::TurnOn | Action::TurnOff => {
            let on = matches!(action, Action::TurnOn);
            let mut payload = [OFF; 8];
            for channel in 0..CHANNELS {
                let value = if channel == index {
                    on
                } else {
                    let sibling = ctx.key.with_device_index(channel).with_sub_type(SubType::None);
                    ctx.lookup
                        .lookup(&sibling)
                        .map(DeviceState::is_on)
                        .unwrap_or(false)
                };
                payload[channel as usize] = if value { ON } else { OFF };
            }
            Outbound::to_device(ctx, CMD_STATE, payload, Condition::Power(on))
        }
        // An all-zero state frame would switch every channel off.
        Action::Query => Outbound::to_device(ctx, CMD_QUERY, [0; 8], Condition::AnyUpdate),
        other => Err(ctx.unsupported(other)),
    }
}
