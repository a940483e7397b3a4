//! Single-slot TTL cache used for the token catalog and aggregated news.
//!
//! The cached value lives for the configured TTL after its last refresh;
//! expiry is checked on read, there is no background eviction. The refresh
//! path is guarded by an async mutex so concurrent readers with a stale slot
//! cannot trigger duplicate upstream fetches. The clock is injected to make
//! TTL behavior deterministic in tests.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::Result;

/// Monotonic time source. Swappable for tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Production clock backed by `Instant::now`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Slot<T> {
    value: T,
    refreshed_at: Instant,
}

/// A TTL cache holding one value for the process lifetime.
pub struct TtlCache<T> {
    slot: Mutex<Option<Slot<T>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
            clock,
        }
    }

    /// Return the cached value if it is younger than the TTL.
    pub async fn get(&self) -> Option<T> {
        let slot = self.slot.lock().await;
        match slot.as_ref() {
            Some(s) if self.clock.now().duration_since(s.refreshed_at) < self.ttl => {
                Some(s.value.clone())
            }
            _ => None,
        }
    }

    /// Return the cached value, refreshing it through `refresh` if the slot
    /// is empty or stale. The lock is held across the refresh so only one
    /// caller hits the upstream at a time.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(s) = slot.as_ref() {
            if self.clock.now().duration_since(s.refreshed_at) < self.ttl {
                return Ok(s.value.clone());
            }
        }

        let value = refresh().await?;
        *slot = Some(Slot {
            value: value.clone(),
            refreshed_at: self.clock.now(),
        });
        Ok(value)
    }
}

#[cfg(test)]
pub(crate) mod test_clock {
    use super::Clock;
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Manually advanced clock for deterministic TTL tests.
    pub struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                now: Mutex::new(Instant::now()),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_clock::ManualClock;
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_fresh_value_is_served_from_cache() {
        let clock = Arc::new(ManualClock::new());
        let cache: TtlCache<u32> = TtlCache::with_clock(Duration::from_secs(60), clock.clone());
        let refreshes = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_refresh(|| async {
                    refreshes.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await
                .unwrap();
            assert_eq!(value, 7);
        }

        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_value_triggers_refresh() {
        let clock = Arc::new(ManualClock::new());
        let cache: TtlCache<u32> = TtlCache::with_clock(Duration::from_secs(60), clock.clone());
        let refreshes = AtomicUsize::new(0);

        let _ = cache
            .get_or_refresh(|| async {
                refreshes.fetch_add(1, Ordering::SeqCst);
                Ok(1)
            })
            .await
            .unwrap();

        clock.advance(Duration::from_secs(61));
        assert!(cache.get().await.is_none());

        let value = cache
            .get_or_refresh(|| async {
                refreshes.fetch_add(1, Ordering::SeqCst);
                Ok(2)
            })
            .await
            .unwrap();

        assert_eq!(value, 2);
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_slot_empty() {
        let cache: TtlCache<u32> = TtlCache::new(Duration::from_secs(60));

        let result = cache
            .get_or_refresh(|| async { Err(crate::Error::Other("upstream down".to_string())) })
            .await;
        assert!(result.is_err());
        assert!(cache.get().await.is_none());
    }
}
