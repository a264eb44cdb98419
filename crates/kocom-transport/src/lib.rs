//! Byte-stream transport for the Kocom wallpad bus.
//!
//! The bus is reached either through an RS-485 to TCP bridge or a local
//! serial adapter. [`Transport`] hides which: it owns one stream at a time,
//! tracks line activity for idle-gap pacing, and reconnects with an
//! exponential [`Backoff`] when the stream fails.
//!
//! - [`Connector`] - opens fresh streams ([`TcpConnector`],
//!   [`EndpointConnector`], [`MemoryConnector`], and `SerialConnector` with
//!   the `serial` feature)
//! - [`Transport`] - send / receive / reconnect over the current stream
//! - [`Backoff`] - doubling delay bounded to `[min, max]`

mod backoff;
mod connector;
mod error;
mod transport;

pub use backoff::*;
pub use connector::*;
pub use error::*;
pub use transport::*;
