//! Process-wide failure signal
//!
//! A single-shot shutdown gate. The first [`FailureSignal::signal`] call wins
//! and wakes every waiter; later calls are dropped without blocking.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Why the service is going down
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason(String);

impl FailureReason {
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared at-most-once failure channel
#[derive(Clone)]
pub struct FailureSignal {
    tx: Arc<watch::Sender<Option<FailureReason>>>,
}

impl Default for FailureSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the signal. Returns `true` only for the call that fired it.
    pub fn signal(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let fired = self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(FailureReason(reason.clone()));
            true
        });

        if fired {
            tracing::error!(reason = %reason, "Failure signal raised");
        } else {
            tracing::debug!(reason = %reason, "Failure signal already raised, dropping");
        }
        fired
    }

    pub fn has_fired(&self) -> bool {
        self.tx.borrow().is_some()
    }

    pub fn reason(&self) -> Option<FailureReason> {
        self.tx.borrow().clone()
    }

    /// Resolve once the signal has fired, immediately if it already has.
    pub async fn wait(&self) -> FailureReason {
        let mut rx = self.tx.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(reason) = current {
                return reason;
            }
            // The sender lives as long as `self`, so this only errors if
            // the channel is torn down underneath us.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_signal_wins() {
        let signal = FailureSignal::new();
        assert!(!signal.has_fired());

        assert!(signal.signal("first"));
        assert!(!signal.signal("second"));
        assert!(!signal.clone().signal("third"));

        assert!(signal.has_fired());
        assert_eq!(signal.reason().unwrap().message(), "first");
    }

    #[tokio::test]
    async fn test_wait_wakes_pending_waiters() {
        let signal = FailureSignal::new();

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.wait().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        signal.signal("listener closed");

        for waiter in waiters {
            let reason = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should wake")
                .unwrap();
            assert_eq!(reason.message(), "listener closed");
        }
    }

    #[tokio::test]
    async fn test_wait_after_signal_returns_immediately() {
        let signal = FailureSignal::new();
        signal.signal("already down");

        let reason = tokio::time::timeout(Duration::from_millis(100), signal.wait())
            .await
            .expect("should not block");
        assert_eq!(reason.to_string(), "already down");
    }

    #[tokio::test]
    async fn test_concurrent_signals_fire_once() {
        let signal = FailureSignal::new();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let signal = signal.clone();
                tokio::spawn(async move { signal.signal(format!("worker {}", i)) })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
