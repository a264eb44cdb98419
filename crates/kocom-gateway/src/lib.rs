//! Gateway between the Kocom wallpad bus and a home-automation host.
//!
//! [`Gateway`] owns the transport, decodes everything on the bus into a
//! [`Registry`] of device states, and serialises caller commands onto the
//! shared half-duplex line. Each command waits for a quiet line, is written,
//! and succeeds only when a later state report confirms it.
//!
//! # Example
//!
//! ```rust,no_run
//! use kocom_common::{DeviceKey, DeviceType};
//! use kocom_gateway::{Gateway, GatewayConfig};
//! use kocom_protocol::ActionArgs;
//! use kocom_transport::Endpoint;
//!
//! # async fn run() -> kocom_gateway::GatewayResult<()> {
//! let config = GatewayConfig::default().with_endpoint(Endpoint::tcp("192.168.0.40"));
//! let gateway = Gateway::from_config(config).await?;
//!
//! let living_room = DeviceKey::primary(DeviceType::Light, 1, 0);
//! let confirmed = gateway.submit_action(living_room, "turn_on", ActionArgs::new()).await;
//! println!("confirmed: {confirmed}");
//!
//! gateway.stop().await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod events;
mod gateway;
mod pending;
mod registry;

pub use config::*;
pub use error::*;
pub use events::*;
pub use gateway::*;
pub use pending::*;
pub use registry::*;
