//! Outstanding confirmation waits.

use kocom_common::DeviceState;
use kocom_protocol::Expectation;
use tokio::sync::oneshot;
use tracing::trace;

struct Waiter {
    id: u64,
    expectation: Expectation,
    tx: oneshot::Sender<DeviceState>,
}

/// Commands waiting for a confirming state report.
///
/// Each waiter resolves at most once. Dropping the list (or calling
/// [`clear`](Self::clear)) cancels every receiver.
#[derive(Default)]
pub struct Waiters {
    waiters: Vec<Waiter>,
    next_id: u64,
}

impl Waiters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an expectation; the receiver yields the confirming state.
    pub fn register(&mut self, expectation: Expectation) -> (u64, oneshot::Receiver<DeviceState>) {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id;
        self.next_id += 1;
        self.waiters.push(Waiter {
            id,
            expectation,
            tx,
        });
        (id, rx)
    }

    /// Resolve and remove every waiter `state` satisfies.
    ///
    /// Returns how many were resolved.
    pub fn notify(&mut self, state: &DeviceState) -> usize {
        let mut resolved = 0;
        let mut i = 0;
        while i < self.waiters.len() {
            if self.waiters[i].expectation.matches(state) {
                let waiter = self.waiters.swap_remove(i);
                trace!(id = waiter.id, key = %state.key, "waiter resolved");
                // The receiver may already have timed out.
                let _ = waiter.tx.send(state.clone());
                resolved += 1;
            } else {
                i += 1;
            }
        }
        resolved
    }

    /// Forget a waiter, e.g. after its timeout.
    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.waiters.len();
        self.waiters.retain(|w| w.id != id);
        self.waiters.len() != before
    }

    /// Drop every waiter; their receivers see cancellation.
    pub fn clear(&mut self) {
        self.waiters.clear();
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kocom_common::{DeviceKey, DeviceType, Platform};
    use kocom_protocol::{Condition, DEFAULT_CONFIRM_TIMEOUT};

    fn light(room: u8, on: bool) -> DeviceState {
        DeviceState::new(DeviceKey::primary(DeviceType::Light, room, 0), Platform::Light, on)
    }

    fn expect_off(room: u8) -> Expectation {
        Expectation::new(
            DeviceKey::primary(DeviceType::Light, room, 0),
            Condition::Power(false),
            DEFAULT_CONFIRM_TIMEOUT,
        )
    }

    #[test]
    fn test_notify_matching_only() {
        let mut waiters = Waiters::new();
        let (_, mut rx) = waiters.register(expect_off(1));

        assert_eq!(waiters.notify(&light(2, false)), 0);
        assert_eq!(waiters.notify(&light(1, true)), 0);
        assert!(rx.try_recv().is_err());

        assert_eq!(waiters.notify(&light(1, false)), 1);
        assert_eq!(rx.try_recv().unwrap(), light(1, false));
        assert!(waiters.is_empty());
    }

    #[test]
    fn test_notify_resolves_all_matching() {
        let mut waiters = Waiters::new();
        let (_, mut a) = waiters.register(expect_off(1));
        let (_, mut b) = waiters.register(expect_off(1));
        let (_, _c) = waiters.register(expect_off(2));

        assert_eq!(waiters.notify(&light(1, false)), 2);
        assert!(a.try_recv().is_ok());
        assert!(b.try_recv().is_ok());
        assert_eq!(waiters.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let mut waiters = Waiters::new();
        let (id, _rx) = waiters.register(expect_off(1));
        assert!(waiters.remove(id));
        assert!(!waiters.remove(id));

        let (_, mut rx) = waiters.register(expect_off(1));
        waiters.clear();
        assert!(matches!(rx.try_recv(), Err(oneshot::error::TryRecvError::Closed)));
    }
}
