//! Single-flight lazy initialization.
//!
//! [`SingleFlight`] memoizes one value produced by an async initializer.
//! Callers that arrive while initialization is in progress join the
//! in-flight future instead of starting another one, and all of them see
//! the same outcome. A failed attempt is forgotten so the next caller
//! starts fresh; a successful one is kept until explicitly invalidated.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;

type Flight<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

enum Slot<T, E>
where
    T: Clone,
    E: Clone,
{
    Empty,
    Pending { attempt: u64, flight: Flight<T, E> },
    Ready(T),
}

/// Observable lifecycle of a [`SingleFlight`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    /// Nothing loaded and nothing in progress.
    Empty,
    /// An initializer is running.
    Pending,
    /// A value is memoized.
    Ready,
}

/// A lazily initialized, single-flight value.
pub struct SingleFlight<T, E>
where
    T: Clone,
    E: Clone,
{
    slot: Mutex<Slot<T, E>>,
    next_attempt: AtomicU64,
    started: AtomicUsize,
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create an empty cell.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            next_attempt: AtomicU64::new(0),
            started: AtomicUsize::new(0),
        }
    }

    /// Return the memoized value, joining or starting initialization.
    ///
    /// `init` is only called when the cell is empty. Concurrent callers
    /// share the future it returns.
    pub async fn get_or_init<F, Fut>(&self, init: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let (attempt, flight) = {
            let mut slot = self.slot.lock().await;
            match &*slot {
                Slot::Ready(value) => return Ok(value.clone()),
                Slot::Pending { attempt, flight } => (*attempt, flight.clone()),
                Slot::Empty => {
                    let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
                    self.started.fetch_add(1, Ordering::Relaxed);
                    let flight = init().boxed().shared();
                    *slot = Slot::Pending {
                        attempt,
                        flight: flight.clone(),
                    };
                    (attempt, flight)
                }
            }
        };

        let outcome = flight.await;

        // The first joined caller to get here settles the slot; the rest
        // find it already settled.
        let mut slot = self.slot.lock().await;
        if matches!(&*slot, Slot::Pending { attempt: a, .. } if *a == attempt) {
            *slot = match &outcome {
                Ok(value) => Slot::Ready(value.clone()),
                Err(_) => Slot::Empty,
            };
        }
        outcome
    }

    /// The memoized value, if any. Never starts initialization.
    pub async fn get(&self) -> Option<T> {
        match &*self.slot.lock().await {
            Slot::Ready(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// Forget the memoized value if `is_stale` says so.
    ///
    /// Returns `true` when the value was dropped. An in-flight
    /// initialization is never interrupted.
    pub async fn invalidate_if(&self, is_stale: impl FnOnce(&T) -> bool) -> bool {
        let mut slot = self.slot.lock().await;
        let stale = match &*slot {
            Slot::Ready(value) => is_stale(value),
            _ => false,
        };
        if stale {
            *slot = Slot::Empty;
        }
        stale
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> FlightState {
        match &*self.slot.lock().await {
            Slot::Empty => FlightState::Empty,
            Slot::Pending { .. } => FlightState::Pending,
            Slot::Ready(_) => FlightState::Ready,
        }
    }

    /// How many initializers have been started over the cell's lifetime.
    pub fn attempts(&self) -> usize {
        self.started.load(Ordering::Relaxed)
    }
}

impl<T, E> Default for SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
