//! Metric declarations for the Kocom wallpad gateway.
//!
//! Every metric the gateway records is declared here as a [`Metric`]
//! constant, so names and units live in one place. The `metrics` crate is
//! re-exported; install any recorder before calling [`describe_metrics`].
//!
//! # Example
//!
//! ```rust
//! use kocom_metrics::{metric_defs, CommandLabels};
//!
//! let labels = CommandLabels::new("light", "turn_on");
//! kocom_metrics::metrics::counter!(metric_defs::COMMANDS_SUBMITTED.name, &labels.to_labels())
//!     .increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

impl MetricKind {
    /// Returns the kind as a lowercase string.
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use kocom_metrics::{Metric, MetricKind};
/// use kocom_metrics::metrics::Unit;
///
/// const FRAMES: Metric = Metric::counter("kocom.frames.decoded")
///     .with_description("Frames decoded")
///     .with_unit(Unit::Count);
///
/// assert_eq!(FRAMES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "kocom.frames.decoded").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a counter declaration.
    pub const fn counter(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Counter)
    }

    /// Creates a gauge declaration.
    pub const fn gauge(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Gauge)
    }

    /// Creates a histogram declaration.
    pub const fn histogram(name: &'static str) -> Self {
        Self::with_kind(name, MetricKind::Histogram)
    }

    const fn with_kind(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Sets the description.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the gateway.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels on per-command metrics.
    pub const COMMAND_LABELS: &[&str] = &["device_type", "action"];

    // ========================================================================
    // Bus framing
    // ========================================================================

    /// Frames that passed framing and checksum.
    pub const FRAMES_DECODED: Metric = Metric::counter("kocom.frames.decoded")
        .with_description("Frames decoded from the bus")
        .with_unit(Unit::Count);

    /// Bytes discarded while resynchronising on the frame prefix.
    pub const FRAMING_ERRORS: Metric = Metric::counter("kocom.frames.framing_errors")
        .with_description("Candidate frames rejected for a bad prefix or suffix")
        .with_unit(Unit::Count);

    /// Frames dropped on checksum mismatch.
    pub const CHECKSUM_ERRORS: Metric = Metric::counter("kocom.frames.checksum_errors")
        .with_description("Frames dropped for a checksum mismatch")
        .with_unit(Unit::Count);

    // ========================================================================
    // Commands
    // ========================================================================

    /// Commands accepted into the queue.
    pub const COMMANDS_SUBMITTED: Metric = Metric::counter("kocom.commands.submitted")
        .with_description("Commands accepted into the send queue")
        .with_unit(Unit::Count)
        .with_labels(COMMAND_LABELS);

    /// Commands refused because the queue was full or the gateway stopped.
    pub const COMMANDS_REJECTED: Metric = Metric::counter("kocom.commands.rejected")
        .with_description("Commands refused at submission")
        .with_unit(Unit::Count)
        .with_labels(COMMAND_LABELS);

    /// Commands confirmed by a matching state report.
    pub const COMMANDS_SUCCEEDED: Metric = Metric::counter("kocom.commands.succeeded")
        .with_description("Commands confirmed by the device")
        .with_unit(Unit::Count)
        .with_labels(COMMAND_LABELS);

    /// Commands that failed to encode or exhausted their retries.
    pub const COMMANDS_FAILED: Metric = Metric::counter("kocom.commands.failed")
        .with_description("Commands that failed to encode or confirm")
        .with_unit(Unit::Count)
        .with_labels(COMMAND_LABELS);

    /// Send attempts, retries included.
    pub const COMMAND_ATTEMPTS: Metric = Metric::counter("kocom.commands.attempts")
        .with_description("Command frames written to the bus")
        .with_unit(Unit::Count)
        .with_labels(COMMAND_LABELS);

    /// Time from first send to confirmation.
    pub const CONFIRM_LATENCY: Metric = Metric::histogram("kocom.commands.confirm_latency_ms")
        .with_description("Time from first send to confirmation")
        .with_unit(Unit::Milliseconds)
        .with_labels(COMMAND_LABELS);

    // ========================================================================
    // Transport and registry
    // ========================================================================

    /// Successful reconnects.
    pub const TRANSPORT_RECONNECTS: Metric = Metric::counter("kocom.transport.reconnects")
        .with_description("Successful transport reconnects")
        .with_unit(Unit::Count);

    /// Devices in the registry.
    pub const REGISTRY_DEVICES: Metric = Metric::gauge("kocom.registry.devices")
        .with_description("Device states held by the registry")
        .with_unit(Unit::Count);

    /// All metric definitions.
    pub const ALL: &[&Metric] = &[
        &FRAMES_DECODED,
        &FRAMING_ERRORS,
        &CHECKSUM_ERRORS,
        &COMMANDS_SUBMITTED,
        &COMMANDS_REJECTED,
        &COMMANDS_SUCCEEDED,
        &COMMANDS_FAILED,
        &COMMAND_ATTEMPTS,
        &CONFIRM_LATENCY,
        &TRANSPORT_RECONNECTS,
        &REGISTRY_DEVICES,
    ];
}

/// Labels for per-command metrics.
#[derive(Debug, Clone)]
pub struct CommandLabels {
    /// Device type name ("light", "thermostat", ...).
    pub device_type: String,
    /// Action name ("turn_on", "set_temperature", ...).
    pub action: String,
}

impl CommandLabels {
    /// Creates labels for one command.
    pub fn new(device_type: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            device_type: device_type.into(),
            action: action.into(),
        }
    }

    /// Converts to the `metrics` crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        vec![
            ("device_type", self.device_type.clone()),
            ("action", self.action.clone()),
        ]
    }
}

/// Describes all gateway metrics.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::FRAMES_DECODED.name, "kocom.frames.decoded");
        assert_eq!(metric_defs::FRAMES_DECODED.kind, MetricKind::Counter);
        assert_eq!(metric_defs::CONFIRM_LATENCY.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::CONFIRM_LATENCY.unit, Some(Unit::Milliseconds));
        assert_eq!(metric_defs::REGISTRY_DEVICES.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::COMMANDS_FAILED.labels, &["device_type", "action"]);
    }

    #[test]
    fn test_all_metrics_unique() {
        let mut names: Vec<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), 11);
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 11);
        assert!(names.iter().all(|n| n.starts_with("kocom.")));
    }

    #[test]
    fn test_command_labels() {
        let labels = CommandLabels::new("light", "turn_on").to_labels();
        assert!(labels.contains(&("device_type", "light".to_string())));
        assert!(labels.contains(&("action", "turn_on".to_string())));
    }

    #[test]
    fn test_metric_minimal() {
        const MINIMAL: Metric = Metric::counter("minimal");
        assert_eq!(MINIMAL.description, "");
        assert_eq!(MINIMAL.unit, None);
        assert_eq!(MINIMAL.labels, &[] as &[&str]);
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
