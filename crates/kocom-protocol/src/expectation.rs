//! Confirmation predicates for sent commands.
//!
//! The bus has no request ids: a command is confirmed when a later state
//! report for the same identity shows the requested effect. An
//! [`Expectation`] pairs that identity with a [`Condition`] and a timeout.

use kocom_common::{DeviceKey, DeviceState, Value};
use std::time::Duration;

/// Default time to wait for a confirming report.
pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_millis(1000);

/// Minimum wait for slow actuators (gas valve) and setpoint changes.
pub const SLOW_CONFIRM_TIMEOUT: Duration = Duration::from_millis(1500);

/// What a confirming state must show.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Nothing confirms; the wait always times out.
    Never,
    /// Any report for the identity confirms.
    AnyUpdate,
    /// The state reads as on (`true`) or off (`false`).
    Power(bool),
    /// A field of a map-shaped value equals the expected value.
    Field {
        /// Field name, e.g. `hvac_mode`.
        name: &'static str,
        /// Expected value.
        expected: Value,
    },
}

impl Condition {
    /// Shorthand for a string field.
    pub fn field(name: &'static str, expected: impl Into<Value>) -> Self {
        Condition::Field {
            name,
            expected: expected.into(),
        }
    }

    /// Evaluate against a state already known to have the right identity.
    pub fn matches(&self, state: &DeviceState) -> bool {
        match self {
            Condition::Never => false,
            Condition::AnyUpdate => true,
            Condition::Power(on) => state.is_on() == *on,
            Condition::Field { name, expected } => state
                .field(name)
                .map(|actual| values_equal(actual, expected))
                .unwrap_or(false),
        }
    }
}

/// A condition scoped to one identity with a deadline.
#[derive(Debug, Clone, PartialEq)]
pub struct Expectation {
    /// Identity the confirming state must have.
    pub key: DeviceKey,
    /// What the confirming state must show.
    pub condition: Condition,
    /// How long to wait per attempt.
    pub timeout: Duration,
}

impl Expectation {
    /// Create an expectation.
    pub fn new(key: DeviceKey, condition: Condition, timeout: Duration) -> Self {
        Expectation {
            key,
            condition,
            timeout,
        }
    }

    /// Whether `state` confirms this expectation.
    pub fn matches(&self, state: &DeviceState) -> bool {
        state.key == self.key && self.condition.matches(state)
    }
}

// Numbers compare by value so an integer request matches a float report.
fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
        _ => actual == expected,
    }
}
