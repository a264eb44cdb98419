//! Stream factories.
//!
//! A [`Connector`] opens a fresh byte stream each time the transport
//! (re)connects. TCP is always available; serial ports need the `serial`
//! feature. [`MemoryConnector`] hands out in-memory pipes for tests and
//! simulations.

use crate::{TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::debug;

/// Default TCP port of RS-485 to Ethernet bridges.
pub const DEFAULT_TCP_PORT: u16 = 8899;

/// Default serial line speed.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default time allowed for a connect attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// A bidirectional byte stream.
pub trait ByteStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ByteStream for T {}

/// An open stream of any kind.
pub type BoxStream = Box<dyn ByteStream>;

/// Opens byte streams to the bus.
pub trait Connector: Send + Sync + 'static {
    /// Open a new stream.
    fn connect(&self) -> impl Future<Output = TransportResult<BoxStream>> + Send;

    /// Human-readable description of the endpoint, for logs.
    fn describe(&self) -> String;
}

// ============================================================================
// Endpoint
// ============================================================================

fn default_port() -> u16 {
    DEFAULT_TCP_PORT
}

fn default_baud() -> u32 {
    DEFAULT_BAUD_RATE
}

/// Where the bus is reachable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Endpoint {
    /// RS-485 to TCP bridge.
    Tcp {
        /// Host name or address.
        host: String,
        /// TCP port.
        #[serde(default = "default_port")]
        port: u16,
    },
    /// Local serial adapter.
    Serial {
        /// Device path, e.g. `/dev/ttyUSB0`.
        path: String,
        /// Line speed.
        #[serde(default = "default_baud")]
        baud: u32,
    },
}

impl Endpoint {
    /// TCP endpoint on the default port.
    pub fn tcp(host: impl Into<String>) -> Self {
        Endpoint::Tcp {
            host: host.into(),
            port: DEFAULT_TCP_PORT,
        }
    }

    /// Serial endpoint at the default baud rate.
    pub fn serial(path: impl Into<String>) -> Self {
        Endpoint::Serial {
            path: path.into(),
            baud: DEFAULT_BAUD_RATE,
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::tcp("127.0.0.1")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
            Endpoint::Serial { path, baud } => write!(f, "serial://{}@{}", path, baud),
        }
    }
}

// ============================================================================
// Concrete Connectors
// ============================================================================

/// Connects over TCP with a timeout.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Create a TCP connector.
    pub fn new(host: impl Into<String>, port: u16, connect_timeout: Duration) -> Self {
        TcpConnector {
            host: host.into(),
            port,
            connect_timeout,
        }
    }
}

impl Connector for TcpConnector {
    fn connect(&self) -> impl Future<Output = TransportResult<BoxStream>> + Send {
        let addr = format!("{}:{}", self.host, self.port);
        let timeout = self.connect_timeout;
        async move {
            match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
                Ok(Ok(stream)) => {
                    stream.set_nodelay(true)?;
                    Ok(Box::new(stream) as BoxStream)
                }
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(TransportError::ConnectTimeout {
                    endpoint: addr,
                    timeout,
                }),
            }
        }
    }

    fn describe(&self) -> String {
        format!("tcp://{}:{}", self.host, self.port)
    }
}

/// Opens a local serial port.
#[cfg(feature = "serial")]
#[derive(Debug, Clone)]
pub struct SerialConnector {
    path: String,
    baud: u32,
}

#[cfg(feature = "serial")]
impl SerialConnector {
    /// Create a serial connector.
    pub fn new(path: impl Into<String>, baud: u32) -> Self {
        SerialConnector {
            path: path.into(),
            baud,
        }
    }
}

#[cfg(feature = "serial")]
impl Connector for SerialConnector {
    fn connect(&self) -> impl Future<Output = TransportResult<BoxStream>> + Send {
        let builder = tokio_serial::new(self.path.clone(), self.baud);
        async move {
            use tokio_serial::SerialPortBuilderExt;
            let port = builder
                .open_native_async()
                .map_err(|e| TransportError::Io(io::Error::new(io::ErrorKind::Other, e)))?;
            Ok(Box::new(port) as BoxStream)
        }
    }

    fn describe(&self) -> String {
        format!("serial://{}@{}", self.path, self.baud)
    }
}

/// Connector chosen from an [`Endpoint`] at runtime.
#[derive(Debug, Clone)]
pub struct EndpointConnector {
    endpoint: Endpoint,
    connect_timeout: Duration,
}

impl EndpointConnector {
    /// Create a connector for `endpoint`.
    pub fn new(endpoint: Endpoint, connect_timeout: Duration) -> Self {
        EndpointConnector {
            endpoint,
            connect_timeout,
        }
    }

    /// The configured endpoint.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl Connector for EndpointConnector {
    fn connect(&self) -> impl Future<Output = TransportResult<BoxStream>> + Send {
        let endpoint = self.endpoint.clone();
        let connect_timeout = self.connect_timeout;
        async move {
            match endpoint {
                Endpoint::Tcp { host, port } => {
                    TcpConnector::new(host, port, connect_timeout).connect().await
                }
                #[cfg(feature = "serial")]
                Endpoint::Serial { path, baud } => SerialConnector::new(path, baud).connect().await,
                #[cfg(not(feature = "serial"))]
                Endpoint::Serial { path, .. } => Err(TransportError::Unsupported(format!(
                    "serial port {} (built without the `serial` feature)",
                    path
                ))),
            }
        }
    }

    fn describe(&self) -> String {
        self.endpoint.to_string()
    }
}

// ============================================================================
// In-Memory Connector
// ============================================================================

const MEMORY_PIPE_CAPACITY: usize = 4096;

struct MemoryShared {
    peers: mpsc::UnboundedSender<DuplexStream>,
    refuse: AtomicBool,
    attempts: AtomicU64,
}

/// Connector backed by in-memory pipes.
///
/// Every successful connect creates a new pipe and hands the far end to the
/// paired [`MemoryBus`].
#[derive(Clone)]
pub struct MemoryConnector {
    shared: Arc<MemoryShared>,
}

/// Far side of a [`MemoryConnector`]; plays the part of the bus.
pub struct MemoryBus {
    peers: mpsc::UnboundedReceiver<DuplexStream>,
}

impl MemoryConnector {
    /// Create a connector and the bus side it connects to.
    pub fn new() -> (MemoryConnector, MemoryBus) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connector = MemoryConnector {
            shared: Arc::new(MemoryShared {
                peers: tx,
                refuse: AtomicBool::new(false),
                attempts: AtomicU64::new(0),
            }),
        };
        (connector, MemoryBus { peers: rx })
    }

    /// Make subsequent connect attempts fail (or succeed again).
    pub fn set_refuse(&self, refuse: bool) {
        self.shared.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Number of connect attempts so far, failed ones included.
    pub fn attempts(&self) -> u64 {
        self.shared.attempts.load(Ordering::SeqCst)
    }
}

impl Connector for MemoryConnector {
    fn connect(&self) -> impl Future<Output = TransportResult<BoxStream>> + Send {
        let shared = self.shared.clone();
        async move {
            shared.attempts.fetch_add(1, Ordering::SeqCst);
            if shared.refuse.load(Ordering::SeqCst) {
                return Err(io::Error::from(io::ErrorKind::ConnectionRefused).into());
            }
            let (near, far) = tokio::io::duplex(MEMORY_PIPE_CAPACITY);
            shared
                .peers
                .send(far)
                .map_err(|_| TransportError::Io(io::Error::from(io::ErrorKind::ConnectionRefused)))?;
            debug!("memory pipe opened");
            Ok(Box::new(near) as BoxStream)
        }
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

impl MemoryBus {
    /// Wait for the next connection.
    pub async fn accept(&mut self) -> Option<DuplexStream> {
        self.peers.recv().await
    }

    /// Take a connection that is already pending.
    pub fn try_accept(&mut self) -> Option<DuplexStream> {
        self.peers.try_recv().ok()
    }
}
