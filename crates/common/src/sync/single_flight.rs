//! Single-flight execution of an async operation
//!
//! At most one operation is pending per [`SingleFlight`] at any time. Callers
//! that arrive while it is pending join the same shared future instead of
//! starting their own, and all of them observe the same result.
//!
//! The slot clears itself from inside the operation before the result is
//! published, so no joiner can resume while the settled flight is still
//! visible to new callers. Each flight carries a generation number and only
//! ever clears its own slot.

use std::future::Future;
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tracing::trace;

type Flight<T> = Shared<BoxFuture<'static, T>>;

/// Whether a caller started the operation or joined one already pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRole {
    /// This caller created the flight and its operation was executed.
    Leader,
    /// This caller joined a pending flight; its operation was never invoked.
    Follower,
}

struct Slot<T> {
    generation: u64,
    pending: Option<(u64, Flight<T>)>,
}

/// Process-wide (or per-owner) memoization of one in-progress async operation.
pub struct SingleFlight<T: Clone> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty single-flight holder.
    pub fn new() -> Self {
        Self { slot: Arc::new(Mutex::new(Slot { generation: 0, pending: None })) }
    }

    /// Run `op`, or join the operation already in flight.
    ///
    /// `op` is only invoked when no flight is pending. The returned role tells
    /// the caller which case applied.
    pub async fn run<F, Fut>(&self, op: F) -> (T, FlightRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (flight, role) = {
            let mut slot = self.slot.lock();
            if let Some((generation, flight)) = &slot.pending {
                trace!(generation, "joining in-flight operation");
                (flight.clone(), FlightRole::Follower)
            } else {
                slot.generation = slot.generation.wrapping_add(1);
                let generation = slot.generation;
                let flight = Self::launch(Arc::downgrade(&self.slot), generation, op());
                slot.pending = Some((generation, flight.clone()));
                trace!(generation, "started new operation");
                (flight, FlightRole::Leader)
            }
        };

        (flight.await, role)
    }

    /// Whether an operation is currently pending.
    pub fn is_in_flight(&self) -> bool {
        self.slot.lock().pending.is_some()
    }

    /// Number of flights started so far.
    pub fn generation(&self) -> u64 {
        self.slot.lock().generation
    }

    fn launch<Fut>(slot: Weak<Mutex<Slot<T>>>, generation: u64, op: Fut) -> Flight<T>
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        async move {
            let value = op.await;
            if let Some(slot) = slot.upgrade() {
                let mut slot = slot.lock();
                if matches!(&slot.pending, Some((current, _)) if *current == generation) {
                    slot.pending = None;
                }
            }
            value
        }
        .boxed()
        .shared()
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("SingleFlight")
            .field("generation", &slot.generation)
            .field("in_flight", &slot.pending.is_some())
            .finish()
    }
}
