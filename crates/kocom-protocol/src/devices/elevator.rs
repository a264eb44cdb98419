//! Elevator call interface.
//!
//! The elevator reports with the wallpad as destination like every other
//! device, but a call is sent *from* the elevator address *to* the wallpad.

use super::{insert, EncodeContext, Outbound};
use crate::expectation::Condition;
use crate::learned::LearnedFacts;
use crate::modes::ElevatorDirection;
use crate::translator::Update;
use crate::{Action, ProtocolResult};
use kocom_common::{DeviceKey, DeviceState, DeviceType, Platform, SubType, CODE_ELEVATOR};
use kocom_packet::{Address, Packet, CMD_OPEN, CMD_QUERY};

/// Packet type of a call acknowledgement.
const PACKET_TYPE_CALLED: u8 = 0x0D;

const FLOOR_UNKNOWN: &str = "unknown";

/// Floor text from payload bytes 1 and 2.
pub(crate) fn decode_floor(p1: u8, p2: u8) -> String {
    if p1 == 0 {
        FLOOR_UNKNOWN.to_string()
    } else if p2 != 0 {
        [char::from(p1), char::from(p2)].iter().collect()
    } else if p1 >> 4 == 0x08 {
        format!("B{}", p1 & 0x0F)
    } else {
        p1.to_string()
    }
}

pub(crate) fn decode(packet: &Packet, room: u8, learned: &mut LearnedFacts) -> Vec<Update> {
    let p = packet.payload();
    let called = packet.packet_type() == PACKET_TYPE_CALLED;
    let key = DeviceKey::primary(DeviceType::Elevator, room, 0);

    let on = match p[0] {
        0x03 => false,
        0x01 | 0x02 => true,
        _ => called,
    };
    let direction = if p[0] == 0x00 && called {
        ElevatorDirection::Called
    } else {
        ElevatorDirection::from_code(p[0])
    };
    let floor = decode_floor(p[1], p[2]);

    let mut updates = vec![
        insert(DeviceState::new(key, Platform::Switch, on)),
        insert(DeviceState::new(
            key.with_sub_type(SubType::Direction),
            Platform::Sensor,
            direction.as_str(),
        )),
    ];

    let unique_id = key.unique_id();
    if floor != FLOOR_UNKNOWN {
        learned.elevator_floors.insert(unique_id.clone(), true);
    }
    if learned.elevator_has_floor(&unique_id) {
        updates.push(insert(DeviceState::new(
            key.with_sub_type(SubType::Floor),
            Platform::Sensor,
            floor,
        )));
    }
    updates
}

pub(crate) fn encode(ctx: &EncodeContext<'_>, action: &Action) -> ProtocolResult<Outbound> {
    let (command, condition) = match action {
        Action::TurnOn => (CMD_OPEN, Condition::Power(true)),
        Action::Query => (CMD_QUERY, Condition::AnyUpdate),
        other => return Err(ctx.unsupported(other)),
    };
    Ok(Outbound {
        dest: Address::WALLPAD,
        src: Address::new(CODE_ELEVATOR, ctx.key.room_index),
        command,
        payload: [0; 8],
        condition,
        timeout: ctx.confirm_timeout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_text() {
        assert_eq!(decode_floor(0x00, 0x00), "unknown");
        assert_eq!(decode_floor(0x07, 0x00), "7");
        assert_eq!(decode_floor(0x82, 0x00), "B2");
        assert_eq!(decode_floor(b'1', b'2'), "12");
        assert_eq!(decode_floor(b'B', b'1'), "B1");
    }
}
