//! Pacing of image-generation calls.
//!
//! Image APIs enforce per-minute request limits. A [`Pacer`] spaces the
//! *start* of consecutive calls: [`FixedInterval`] hands out one slot per
//! interval across all in-flight tasks, so it caps aggregate throughput
//! whether images are rendered one by one or with bounded concurrency.
//! [`NoPacing`] is injected in tests.

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Duration, Instant};

/// Gate awaited before every image-generation call.
#[async_trait]
pub trait Pacer: Send + Sync {
    /// Resolve when the next call may start.
    async fn wait(&self);
}

/// At most one call start per `interval`.
pub struct FixedInterval {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl FixedInterval {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

#[async_trait]
impl Pacer for FixedInterval {
    async fn wait(&self) {
        // Reserve a slot under the lock, sleep outside it.
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(t) if t > now => t,
                _ => now,
            };
            *next = Some(slot + self.interval);
            slot
        };
        sleep_until(slot).await;
    }
}

/// Never waits.
pub struct NoPacing;

#[async_trait]
impl Pacer for NoPacing {
    async fn wait(&self) {}
}
