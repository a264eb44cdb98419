//! Common types for the Kocom wallpad bus.
//!
//! This crate holds the vocabulary shared by the packet codec, the protocol
//! translator and the gateway:
//!
//! - [`DeviceType`] / [`SubType`] - the closed set of appliance families and
//!   the observable facets under one physical device
//! - [`DeviceKey`] - the 4-tuple identity used as a map key everywhere
//! - [`Platform`] - the capability shape a device is exposed as
//! - [`Value`] - the dynamic value type for state values and attributes
//! - [`DeviceState`] - one decoded, identity-keyed device state
//!
//! # Example
//!
//! ```rust
//! use kocom_common::{DeviceKey, DeviceType, SubType};
//!
//! let key = DeviceKey::new(DeviceType::Light, 1, 0, SubType::None);
//! assert_eq!(key.unique_id(), "1-1_0-0");
//! assert_eq!(key.format_key(), "light");
//! ```

mod error;
mod key;
mod state;
mod value;

pub use error::*;
pub use key::*;
pub use state::*;
pub use value::*;
