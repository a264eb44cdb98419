//! Frame-to-state and action-to-frame translation.

use crate::devices::{self, EncodeContext, Outbound};
use crate::expectation::{Expectation, DEFAULT_CONFIRM_TIMEOUT};
use crate::learned::LearnedFacts;
use crate::{Action, ProtocolError, ProtocolResult};
use kocom_common::{DeviceKey, DeviceState, DeviceType};
use kocom_packet::{Address, Packet};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, trace};

/// Read access to last known device states, used when encoding.
///
/// Lookups should include states that were seen but not registered.
pub trait StateLookup {
    /// Last known state for an identity.
    fn lookup(&self, key: &DeviceKey) -> Option<&DeviceState>;
}

impl StateLookup for HashMap<DeviceKey, DeviceState> {
    fn lookup(&self, key: &DeviceKey) -> Option<&DeviceState> {
        self.get(key)
    }
}

impl StateLookup for BTreeMap<DeviceKey, DeviceState> {
    fn lookup(&self, key: &DeviceKey) -> Option<&DeviceState> {
        self.get(key)
    }
}

/// A lookup that knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStates;

impl StateLookup for NoStates {
    fn lookup(&self, _key: &DeviceKey) -> Option<&DeviceState> {
        None
    }
}

/// One decoded state and whether it may create a new registry entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// The decoded state, with the raw frame attached.
    pub state: DeviceState,
    /// Whether an unknown identity may be registered from this state.
    pub allow_insert: bool,
}

/// A framed command and how to recognise its confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    /// Frame to put on the bus.
    pub packet: Packet,
    /// Confirmation to wait for after sending.
    pub expectation: Expectation,
}

/// Stateful protocol translator.
///
/// Decoding updates the [`LearnedFacts`] side table; encoding only reads it.
#[derive(Debug, Clone)]
pub struct Translator {
    learned: LearnedFacts,
    confirm_timeout: Duration,
}

impl Default for Translator {
    fn default() -> Self {
        Self::new()
    }
}

impl Translator {
    /// Create a translator with nothing learned and the default timeout.
    pub fn new() -> Self {
        Translator {
            learned: LearnedFacts::default(),
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
        }
    }

    /// Set the base confirmation timeout.
    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    /// Base confirmation timeout.
    pub fn confirm_timeout(&self) -> Duration {
        self.confirm_timeout
    }

    /// Borrow the learned facts.
    pub fn learned(&self) -> &LearnedFacts {
        &self.learned
    }

    /// Copy of the learned facts for persistence.
    pub fn snapshot(&self) -> LearnedFacts {
        self.learned.clone()
    }

    /// Merge previously persisted facts into the table.
    pub fn restore(&mut self, facts: LearnedFacts) {
        self.learned.merge(facts);
    }

    /// Decode a checksum-verified frame into zero or more updates.
    pub fn decode(&mut self, packet: &Packet) -> Vec<Update> {
        let peer = packet.peer();
        if peer == Address::NULL {
            debug!(
                dest = ?packet.dest(),
                src = ?packet.src(),
                "neither end of frame is the wallpad"
            );
        }
        let device_type = DeviceType::from_wire_code(peer.device);
        let room = peer.room;

        let learned = &mut self.learned;
        let updates = match device_type {
            DeviceType::Light if room == 0xFF => devices::switch::decode_cutoff(packet),
            DeviceType::Light | DeviceType::Outlet => devices::switch::decode(packet, device_type, room),
            DeviceType::Thermostat => devices::thermostat::decode(packet, room, learned),
            DeviceType::AirConditioner => devices::aircon::decode(packet, room, learned),
            DeviceType::Ventilation => devices::ventilation::decode(packet, room, learned),
            DeviceType::GasValve => devices::gasvalve::decode(packet, room),
            DeviceType::Elevator => devices::elevator::decode(packet, room, learned),
            DeviceType::Motion => devices::sensors::decode_motion(packet, room),
            DeviceType::AirQuality => devices::sensors::decode_air_quality(packet, room),
            DeviceType::Unknown | DeviceType::LightCutoff | DeviceType::DimmingLight => {
                debug!(code = peer.device, frame = %packet, "unhandled device code");
                Vec::new()
            }
        };

        if updates.is_empty() {
            trace!(?device_type, command = packet.command(), "frame produced no states");
        }

        let raw = packet.as_bytes();
        updates
            .into_iter()
            .map(|mut update| {
                update.state.raw_frame = Some(raw.to_vec());
                update
            })
            .collect()
    }

    /// Encode an action for a device.
    ///
    /// `lookup` supplies last known states for commands that must re-assert
    /// state the action does not change.
    pub fn encode(
        &self,
        key: DeviceKey,
        action: &Action,
        lookup: &impl StateLookup,
    ) -> ProtocolResult<Command> {
        let ctx = EncodeContext {
            key,
            lookup,
            learned: &self.learned,
            confirm_timeout: self.confirm_timeout,
        };

        let outbound = match key.device_type {
            DeviceType::Light | DeviceType::Outlet => devices::switch::encode(&ctx, action)?,
            DeviceType::Thermostat => devices::thermostat::encode(&ctx, action)?,
            DeviceType::AirConditioner => devices::aircon::encode(&ctx, action)?,
            DeviceType::Ventilation => devices::ventilation::encode(&ctx, action)?,
            DeviceType::GasValve => devices::gasvalve::encode(&ctx, action)?,
            DeviceType::Elevator => devices::elevator::encode(&ctx, action)?,
            DeviceType::Motion | DeviceType::AirQuality => devices::sensors::encode(&ctx, action)?,
            DeviceType::LightCutoff | DeviceType::DimmingLight | DeviceType::Unknown => {
                return Err(ProtocolError::UnsupportedDevice(key.device_type))
            }
        };

        let Outbound {
            dest,
            src,
            command,
            payload,
            condition,
            timeout,
        } = outbound;
        let packet = Packet::build(dest, src, command, payload);
        trace!(%key, %action, frame = %packet, "encoded command");

        Ok(Command {
            packet,
            expectation: Expectation::new(key, condition, timeout),
        })
    }

    /// Parse and encode in one step.
    pub fn encode_named(
        &self,
        key: DeviceKey,
        action: &str,
        args: &crate::ActionArgs,
        lookup: &impl StateLookup,
    ) -> ProtocolResult<Command> {
        let action = Action::parse(action, args)?;
        self.encode(key, &action, lookup)
    }
}
