//! Connection lifecycle over a [`Connector`].

use crate::backoff::Backoff;
use crate::connector::{BoxStream, Connector};
use crate::{TransportError, TransportResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default limit on a single write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Owns the current stream and reconnects it with backoff.
///
/// All methods take `&self`; the reader and writer halves sit behind
/// separate async locks so one task can block in [`receive`](Self::receive)
/// while another sends.
pub struct Transport<C: Connector> {
    connector: C,
    reader: Mutex<Option<ReadHalf<BoxStream>>>,
    writer: Mutex<Option<WriteHalf<BoxStream>>>,
    connected: AtomicBool,
    /// Bumped on every successful connect.
    generation: AtomicU64,
    reconnects: AtomicU64,
    last_activity: parking_lot::Mutex<Instant>,
    write_timeout: Duration,
    /// Held for the whole of a reconnect attempt.
    backoff: Mutex<Backoff>,
}

impl<C: Connector> Transport<C> {
    /// Create a transport; nothing is opened until [`open`](Self::open).
    pub fn new(connector: C, backoff: Backoff) -> Self {
        Transport {
            connector,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            connected: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            reconnects: AtomicU64::new(0),
            last_activity: parking_lot::Mutex::new(Instant::now()),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            backoff: Mutex::new(backoff),
        }
    }

    /// Limit how long [`send`](Self::send) may block on a stalled peer.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// The connector in use.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Open a stream, replacing any current one.
    pub async fn open(&self) -> TransportResult<()> {
        self.establish().await?;
        self.backoff.lock().await.reset();
        Ok(())
    }

    /// Close the current stream, if any.
    pub async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.reader.lock().await.take();
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        debug!(endpoint = %self.connector.describe(), "transport closed");
    }

    /// Write all of `data`, returning the number of bytes written.
    ///
    /// A write that does not finish within the write timeout drops the
    /// stream and marks the connection down.
    pub async fn send(&self, data: &[u8]) -> TransportResult<usize> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let write = async {
            writer.write_all(data).await?;
            writer.flush().await
        };

        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(Ok(())) => {
                self.touch();
                Ok(data.len())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "send failed");
                guard.take();
                self.mark_down();
                Err(e.into())
            }
            Err(_) => {
                warn!(timeout_ms = self.write_timeout.as_millis() as u64, "send stalled");
                guard.take();
                self.mark_down();
                Err(TransportError::WriteTimeout(self.write_timeout))
            }
        }
    }

    /// Read up to `max` bytes, waiting at most `timeout`.
    ///
    /// A timeout yields an empty vector. End of stream is reported as
    /// [`TransportError::Closed`] and marks the connection down.
    pub async fn receive(&self, max: usize, timeout: Duration) -> TransportResult<Vec<u8>> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(TransportError::NotConnected)?;

        let mut buf = vec![0u8; max];
        match tokio::time::timeout(timeout, reader.read(&mut buf)).await {
            Err(_) => Ok(Vec::new()),
            Ok(Ok(0)) => {
                info!(endpoint = %self.connector.describe(), "connection closed by peer");
                guard.take();
                self.mark_down();
                Err(TransportError::Closed)
            }
            Ok(Ok(n)) => {
                self.touch();
                buf.truncate(n);
                Ok(buf)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "receive failed");
                guard.take();
                self.mark_down();
                Err(e.into())
            }
        }
    }

    /// Whether a stream is currently open.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Time since the last successful send or non-empty receive.
    pub fn idle_since(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Number of successful reconnects.
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::SeqCst)
    }

    /// Connection generation, bumped on every successful connect.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Drop the current stream, wait out the backoff delay and connect again.
    ///
    /// Concurrent callers collapse into one attempt: a caller that finds a
    /// newer connection already up when it gets the lock returns at once.
    pub async fn reconnect(&self) -> TransportResult<()> {
        let observed = self.generation();
        let mut backoff = self.backoff.lock().await;
        if self.generation() != observed && self.is_connected() {
            debug!("reconnect already completed by another task");
            return Ok(());
        }

        self.connected.store(false, Ordering::SeqCst);
        self.reader.lock().await.take();
        self.writer.lock().await.take();

        let delay = backoff.next_delay();
        info!(
            endpoint = %self.connector.describe(),
            delay_ms = delay.as_millis() as u64,
            "reconnecting"
        );
        tokio::time::sleep(delay).await;

        match self.establish().await {
            Ok(()) => {
                backoff.reset();
                self.reconnects.fetch_add(1, Ordering::SeqCst);
                info!(endpoint = %self.connector.describe(), "reconnected");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, next_delay_ms = backoff.current().as_millis() as u64, "reconnect failed");
                Err(e)
            }
        }
    }

    async fn establish(&self) -> TransportResult<()> {
        let stream = self.connector.connect().await?;
        let (read_half, write_half) = tokio::io::split(stream);
        *self.reader.lock().await = Some(read_half);
        *self.writer.lock().await = Some(write_half);
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.connected.store(true, Ordering::SeqCst);
        self.touch();
        info!(endpoint = %self.connector.describe(), "connected");
        Ok(())
    }

    fn mark_down(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }
}
