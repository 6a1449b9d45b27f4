//! Admission gate: a per-message-type counting semaphore bounding
//! in-flight handler invocations.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::error::DispatchError;

/// Bounded-concurrency primitive limiting simultaneous handler
/// invocations for one message type.
///
/// The gate owns a fixed capacity and a count of available slots.
/// Slots are consumed by [`AdmissionGate::admit`] and returned when the
/// resulting [`AdmissionPermit`] is dropped, so a release always pairs
/// with a prior acquire on every exit path, whether the handler
/// succeeded, failed, or observed cancellation partway through.
pub struct AdmissionGate {
    capacity: usize,
    slots: Arc<Semaphore>,
}

/// Proof of admission through an [`AdmissionGate`].
///
/// Dropping the permit returns the slot to the gate.
#[must_use = "dropping the permit releases the slot immediately"]
pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

impl AdmissionGate {
    /// Create a gate with the given capacity.
    ///
    /// A limit of 0 is normalized to 1: a gate that admits nothing
    /// would deadlock every dispatch.
    pub fn new(limit: usize) -> Self {
        let capacity = limit.max(1);
        AdmissionGate {
            capacity,
            slots: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// The maximum number of simultaneous admissions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many slots are currently free. Never exceeds `capacity`.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Wait for a free slot, or fail with [`DispatchError::Cancelled`]
    /// if `ct` fires first.
    ///
    /// This is the dispatcher's only suspension point where one call
    /// waits on other in-flight calls. The wait is cooperative (no
    /// worker thread is occupied) and a cancelled wait consumes no
    /// slot. Wait order is whatever the underlying semaphore provides:
    /// FIFO in practice, best-effort by contract.
    pub async fn admit(&self, ct: &CancellationToken) -> Result<AdmissionPermit, DispatchError> {
        tokio::select! {
            // Checked first: an already-cancelled token never admits,
            // even when slots are free.
            biased;
            _ = ct.cancelled() => Err(DispatchError::Cancelled),
            permit = Arc::clone(&self.slots).acquire_owned() => {
                // The semaphore is never closed; treat a closed gate as
                // a cancelled dispatch rather than panicking.
                permit
                    .map(|permit| AdmissionPermit { _permit: permit })
                    .map_err(|_| DispatchError::Cancelled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn zero_limit_normalizes_to_one() {
        let gate = AdmissionGate::new(0);
        assert_eq!(gate.capacity(), 1);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn permits_return_on_drop() {
        let gate = AdmissionGate::new(2);
        let ct = CancellationToken::new();

        let first = gate.admit(&ct).await.unwrap();
        let second = gate.admit(&ct).await.unwrap();
        assert_eq!(gate.available(), 0);

        drop(first);
        assert_eq!(gate.available(), 1);
        drop(second);
        assert_eq!(gate.available(), 2);
    }

    #[tokio::test]
    async fn cancelled_wait_consumes_no_slot() {
        let gate = AdmissionGate::new(1);
        let ct = CancellationToken::new();

        let held = gate.admit(&ct).await.unwrap();

        let waiter = CancellationToken::new();
        waiter.cancel();
        let result = gate.admit(&waiter).await;
        assert!(matches!(result, Err(DispatchError::Cancelled)));

        drop(held);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn waiter_proceeds_once_a_slot_frees() {
        let gate = Arc::new(AdmissionGate::new(1));
        let ct = CancellationToken::new();

        let held = gate.admit(&ct).await.unwrap();

        let waiting = {
            let gate = Arc::clone(&gate);
            let ct = ct.clone();
            tokio::spawn(async move { gate.admit(&ct).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiting.is_finished());

        drop(held);
        waiting.await.unwrap().unwrap();
    }
}
