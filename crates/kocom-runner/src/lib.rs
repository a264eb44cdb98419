//! Library side of the `kocom` command-line runner.
//!
//! - [`Snapshot`] - frames and learned facts persisted between runs
//! - [`parse_arg`] - typed `key=value` action arguments

mod args;
mod error;
mod snapshot;

pub use args::*;
pub use error::*;
pub use snapshot::*;
