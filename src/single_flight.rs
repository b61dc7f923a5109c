use dashmap::DashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// Registry of per-key async locks.
///
/// At most one flight per key runs at a time; unrelated keys never wait on
/// each other. Locks are created on demand and dropped once nobody holds or
/// waits on them.
#[derive(Debug, Default)]
pub struct SingleFlight {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self { locks: DashMap::new() }
    }

    pub async fn acquire(&self, key: &str) -> FlightGuard<'_> {
        let lock = self.locks.entry(key.to_owned()).or_default().clone();
        let pending = PendingFlight {
            registry: self,
            key: key.to_owned(),
            wait: Some(Box::pin(lock.lock_owned())),
        };
        let guard = pending.await;
        trace!(key, "flight acquired");
        FlightGuard { registry: self, key: key.to_owned(), guard: Some(guard) }
    }

    /// Number of keys with a live lock.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }

    fn release(&self, key: &str) {
        self.locks.remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

type LockWait = Pin<Box<dyn Future<Output = OwnedMutexGuard<()>> + Send>>;

/// Caller waiting for a key's lock. A waiter dropped before it gets the
/// lock still cleans up the registry entry.
struct PendingFlight<'a> {
    registry: &'a SingleFlight,
    key: String,
    wait: Option<LockWait>,
}

impl Future for PendingFlight<'_> {
    type Output = OwnedMutexGuard<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.wait.as_mut() {
            Some(wait) => wait.as_mut().poll(cx),
            None => Poll::Pending,
        }
    }
}

impl Drop for PendingFlight<'_> {
    fn drop(&mut self) {
        // drop the wait first so its clone of the lock no longer counts
        drop(self.wait.take());
        self.registry.release(&self.key);
    }
}

pub struct FlightGuard<'a> {
    registry: &'a SingleFlight,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        // release first so the strong count only reflects waiters
        drop(self.guard.take());
        self.registry.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn lock_is_removed_after_release() {
        let flights = SingleFlight::new();
        {
            let _guard = flights.acquire("a").await;
            assert_eq!(flights.in_flight(), 1);
        }
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_key_is_serialized() {
        let flights = Arc::new(SingleFlight::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let flights = flights.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = flights.acquire("same").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn abandoned_waiter_does_not_leave_lock_behind() {
        let flights = SingleFlight::new();
        let holder = flights.acquire("k").await;

        let mut waiter = Box::pin(flights.acquire("k"));
        assert!(tokio::time::timeout(Duration::from_millis(20), &mut waiter).await.is_err());

        // released while the waiter is still queued, then the waiter gives up
        drop(holder);
        assert_eq!(flights.in_flight(), 1);
        drop(waiter);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let flights = SingleFlight::new();
        let _a = flights.acquire("a").await;
        let b = tokio::time::timeout(Duration::from_millis(200), flights.acquire("b")).await;
        assert!(b.is_ok());
    }
}
