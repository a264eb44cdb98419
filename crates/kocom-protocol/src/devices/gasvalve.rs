//! Gas valve. It can be closed remotely but never opened.

use super::{insert, EncodeContext, Outbound};
use crate::expectation::{Condition, SLOW_CONFIRM_TIMEOUT};
use crate::translator::Update;
use crate::{Action, ProtocolResult};
use kocom_common::{DeviceKey, DeviceState, DeviceType, Platform};
use kocom_packet::{Packet, CMD_CLOSE, CMD_OPEN, CMD_QUERY};

pub(crate) fn decode(packet: &Packet, room: u8) -> Vec<Update> {
    let open = match packet.command() {
        CMD_OPEN => true,
        CMD_CLOSE => false,
        _ => return Vec::new(),
    };
    let key = DeviceKey::primary(DeviceType::GasValve, room, 0);
    vec![insert(DeviceState::new(key, Platform::Switch, open))]
}

pub(crate) fn encode(ctx: &EncodeContext<'_>, action: &Action) -> ProtocolResult<Outbound> {
    let timeout = ctx.timeout_at_least(SLOW_CONFIRM_TIMEOUT);
    let outbound = match action {
        Action::TurnOff => Outbound::to_device(ctx, CMD_CLOSE, [0; 8], Condition::Power(false))?,
        Action::Query => Outbound::to_device(ctx, CMD_QUERY, [0; 8], Condition::AnyUpdate)?,
        other => return Err(ctx.unsupported(other)),
    };
    Ok(outbound.with_timeout(timeout))
}
