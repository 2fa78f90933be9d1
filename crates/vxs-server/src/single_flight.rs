//! Request coalescing for concurrent identical requests.
//!
//! While a request for a key is in flight, later callers with the same key
//! await the first caller's future instead of starting their own work.

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for coalesced calls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SingleFlightStats {
    /// Calls received.
    pub total: u64,
    /// Calls that joined an in-flight future.
    pub coalesced: u64,
    /// Keys currently in flight.
    pub in_flight: usize,
}

struct Flight<V> {
    id: u64,
    future: Shared<BoxFuture<'static, V>>,
}

pub struct SingleFlight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + Send + Sync + 'static,
{
    in_flight: Mutex<HashMap<K, Flight<V>>>,
    next_id: AtomicU64,
    total: AtomicU64,
    coalesced: AtomicU64,
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self {
            in_flight: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            total: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `work` for `key`, or joins the run already in flight.
    ///
    /// `work` is only called when no run for `key` is in flight. The entry
    /// is removed once the run completes, so a later call starts fresh.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        self.total.fetch_add(1, Ordering::Relaxed);

        let (id, future) = {
            let mut in_flight = self.in_flight.lock();
            match in_flight.get(&key) {
                Some(flight) => {
                    self.coalesced.fetch_add(1, Ordering::Relaxed);
                    (flight.id, flight.future.clone())
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let future = work().boxed().shared();
                    in_flight.insert(
                        key.clone(),
                        Flight {
                            id,
                            future: future.clone(),
                        },
                    );
                    (id, future)
                }
            }
        };

        let result = future.await;

        // any waiter may finish first if the leader was dropped
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(&key).is_some_and(|flight| flight.id == id) {
            in_flight.remove(&key);
        }
        result
    }

    pub fn stats(&self) -> SingleFlightStats {
        SingleFlightStats {
            total: self.total.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            in_flight: self.in_flight.lock().len(),
        }
    }
}
