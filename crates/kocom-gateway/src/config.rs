//! Gateway configuration.
//!
//! Durations are stored in milliseconds so the YAML form stays flat:
//!
//! ```yaml
//! endpoint:
//!   type: tcp
//!   host: 192.168.0.40
//! retry_max: 3
//! confirm_timeout_ms: 1000
//! discovery:
//!   enabled: true
//!   light: [0, 1, 2]
//! ```

use crate::{GatewayError, GatewayResult};
use kocom_common::{DeviceKey, DeviceType};
use kocom_transport::{Backoff, Endpoint, EndpointConnector};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Runtime configuration for a [`Gateway`](crate::Gateway).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Where the bus is reached.
    pub endpoint: Endpoint,
    /// Limit on a single connect attempt.
    pub connect_timeout_ms: u64,
    /// Limit on a single write to the bus.
    pub write_timeout_ms: u64,
    /// First reconnect delay.
    pub backoff_min_ms: u64,
    /// Reconnect delay ceiling.
    pub backoff_max_ms: u64,
    /// How long one receive call waits for bytes.
    pub poll_interval_ms: u64,
    /// Most bytes taken per receive call.
    pub read_budget: usize,
    /// Line silence required before transmitting.
    pub idle_gap_ms: u64,
    /// Longest wait for the line to go quiet; the send proceeds after it.
    pub idle_wait_max_ms: u64,
    /// Send attempts per user command.
    pub retry_max: u32,
    /// Pause between attempts.
    pub retry_gap_ms: u64,
    /// Base confirmation timeout; some devices raise it.
    pub confirm_timeout_ms: u64,
    /// Commands that may wait in the send queue.
    pub queue_capacity: usize,
    /// Consecutive failed commands that force a reconnect.
    pub failure_threshold: u32,
    /// Buffered events per subscriber.
    pub event_capacity: usize,
    /// Startup query sweep.
    pub discovery: DiscoveryConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            endpoint: Endpoint::default(),
            connect_timeout_ms: 5000,
            write_timeout_ms: 1000,
            backoff_min_ms: 1000,
            backoff_max_ms: 30_000,
            poll_interval_ms: 50,
            read_budget: 512,
            idle_gap_ms: 200,
            idle_wait_max_ms: 1000,
            retry_max: 3,
            retry_gap_ms: 150,
            confirm_timeout_ms: 1000,
            queue_capacity: 32,
            failure_threshold: 5,
            event_capacity: 256,
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl GatewayConfig {
    /// Parse YAML text.
    pub fn from_yaml_str(text: &str) -> GatewayResult<Self> {
        let config: GatewayConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GatewayError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Reject settings the gateway cannot run with.
    pub fn validate(&self) -> GatewayResult<()> {
        fn nonzero(field: &'static str, value: u64) -> GatewayResult<()> {
            if value == 0 {
                return Err(GatewayError::InvalidConfig {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
            Ok(())
        }

        nonzero("queue_capacity", self.queue_capacity as u64)?;
        nonzero("event_capacity", self.event_capacity as u64)?;
        nonzero("read_budget", self.read_budget as u64)?;
        nonzero("retry_max", self.retry_max as u64)?;
        nonzero("failure_threshold", self.failure_threshold as u64)?;
        nonzero("poll_interval_ms", self.poll_interval_ms)?;
        nonzero("confirm_timeout_ms", self.confirm_timeout_ms)?;
        nonzero("write_timeout_ms", self.write_timeout_ms)?;
        nonzero("backoff_min_ms", self.backoff_min_ms)?;
        if self.backoff_min_ms > self.backoff_max_ms {
            return Err(GatewayError::InvalidConfig {
                field: "backoff_min_ms",
                reason: format!(
                    "{} exceeds backoff_max_ms ({})",
                    self.backoff_min_ms, self.backoff_max_ms
                ),
            });
        }
        Ok(())
    }

    /// Replace the endpoint.
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Set the send queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Set attempts per command and the pause between them.
    pub fn with_retries(mut self, retry_max: u32, retry_gap: Duration) -> Self {
        self.retry_max = retry_max;
        self.retry_gap_ms = retry_gap.as_millis() as u64;
        self
    }

    /// Set the base confirmation timeout.
    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the required line silence and the longest wait for it.
    pub fn with_idle_gap(mut self, gap: Duration, wait_max: Duration) -> Self {
        self.idle_gap_ms = gap.as_millis() as u64;
        self.idle_wait_max_ms = wait_max.as_millis() as u64;
        self
    }

    /// Set the reconnect delay bounds.
    pub fn with_backoff(mut self, min: Duration, max: Duration) -> Self {
        self.backoff_min_ms = min.as_millis() as u64;
        self.backoff_max_ms = max.as_millis() as u64;
        self
    }

    /// Set the consecutive failure count that forces a reconnect.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Replace the discovery settings.
    pub fn with_discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn idle_gap(&self) -> Duration {
        Duration::from_millis(self.idle_gap_ms)
    }

    pub fn idle_wait_max(&self) -> Duration {
        Duration::from_millis(self.idle_wait_max_ms)
    }

    pub fn retry_gap(&self) -> Duration {
        Duration::from_millis(self.retry_gap_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    /// Reconnect backoff built from the configured bounds.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.backoff_min_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }

    /// Connector for the configured endpoint.
    pub fn connector(&self) -> EndpointConnector {
        EndpointConnector::new(self.endpoint.clone(), self.connect_timeout())
    }
}

/// Rooms to query at startup, per device type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Run the sweep when the gateway starts.
    pub enabled: bool,
    pub light: Vec<u8>,
    pub outlet: Vec<u8>,
    pub thermostat: Vec<u8>,
    pub airconditioner: Vec<u8>,
    pub ventilation: Vec<u8>,
    pub gasvalve: Vec<u8>,
    pub elevator: Vec<u8>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            enabled: false,
            light: (0..=4).collect(),
            outlet: (0..=4).collect(),
            thermostat: (0..=4).collect(),
            airconditioner: (0..=4).collect(),
            ventilation: vec![0],
            gasvalve: vec![0],
            elevator: vec![0],
        }
    }
}

impl DiscoveryConfig {
    /// Default room lists with the sweep switched on.
    pub fn enabled() -> Self {
        DiscoveryConfig {
            enabled: true,
            ..Default::default()
        }
    }

    /// Primary identities to query, in sweep order.
    pub fn targets(&self) -> Vec<DeviceKey> {
        let groups: [(DeviceType, &[u8]); 7] = [
            (DeviceType::Light, &self.light),
            (DeviceType::Outlet, &self.outlet),
            (DeviceType::Thermostat, &self.thermostat),
            (DeviceType::AirConditioner, &self.airconditioner),
            (DeviceType::Ventilation, &self.ventilation),
            (DeviceType::GasValve, &self.gasvalve),
            (DeviceType::Elevator, &self.elevator),
        ];
        groups
            .iter()
            .flat_map(|(device_type, rooms)| {
                rooms
                    .iter()
                    .map(move |room| DeviceKey::primary(*device_type, *room, 0))
            })
            .collect()
    }
}
