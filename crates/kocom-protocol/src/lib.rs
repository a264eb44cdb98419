//! Device protocol translator for the Kocom wallpad bus.
//!
//! The [`Translator`] turns verified frames into identity-keyed
//! [`DeviceState`](kocom_common::DeviceState)s and turns caller [`Action`]s
//! into outbound frames paired with an [`Expectation`]: the state report that
//! will confirm the command took effect.
//!
//! Decoding is stateful. Capabilities that are never announced on the bus
//! (half-degree setpoints, ventilation presets, elevator floor reporting)
//! are inferred from traffic and kept in [`LearnedFacts`], which can be
//! snapshotted and restored.
//!
//! # Example
//!
//! ```rust
//! use kocom_common::{DeviceKey, DeviceType, Value};
//! use kocom_packet::{Address, Packet};
//! use kocom_protocol::{Action, NoStates, Translator};
//!
//! let mut translator = Translator::new();
//!
//! // Room 1 reports channel 0 on.
//! let report = Packet::build(Address::WALLPAD, Address::new(0x0E, 1), 0x00, [0xFF, 0, 0, 0, 0, 0, 0, 0]);
//! let updates = translator.decode(&report);
//! assert_eq!(updates.len(), 8);
//! assert_eq!(updates[0].state.value, Value::Bool(true));
//! assert!(updates[0].allow_insert);
//! assert!(!updates[1].allow_insert);
//!
//! // Switch it off again.
//! let key = DeviceKey::primary(DeviceType::Light, 1, 0);
//! let command = translator.encode(key, &Action::TurnOff, &NoStates).unwrap();
//! assert_eq!(command.packet.payload(), [0; 8]);
//! ```

mod action;
mod devices;
mod error;
mod expectation;
mod learned;
mod modes;
mod translator;

pub use action::*;
pub use devices::ventilation::SPEED_LIST;
pub use error::*;
pub use expectation::*;
pub use learned::*;
pub use modes::*;
pub use translator::*;
