//! Fetch throttling driven by the decode worker
//!
//! The decode worker cannot slow the network down itself; it asks the fetch
//! layer to hold off (`delay`) when decoded data piles up, lets it continue
//! (`undelay`) once there is room again, and stops it (`pause`) after a
//! cache write failure.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::debug;

/// Flow control the decode worker applies to the fetch layer
pub trait FetchThrottle: Send + Sync {
    /// Hold off fetching until [`FetchThrottle::undelay`]
    fn delay(&self);

    /// Resume fetching after a delay
    fn undelay(&self);

    /// Stop fetching altogether until resumed by the user
    fn pause(&self);

    /// Check if fetching is currently delayed
    fn is_delayed(&self) -> bool;
}

/// Shared throttle flags with a wake-up for waiting fetchers
///
/// Clones share state.
///
/// # Example
///
/// ```
/// use yenc_decoder::throttle::{FetchThrottle, SharedThrottle};
///
/// let throttle = SharedThrottle::new();
/// throttle.delay();
/// assert!(throttle.is_delayed());
/// throttle.undelay();
/// assert!(!throttle.is_delayed());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedThrottle {
    inner: Arc<ThrottleInner>,
}

#[derive(Debug, Default)]
struct ThrottleInner {
    delayed: AtomicBool,
    paused: AtomicBool,
    released: Notify,
}

impl SharedThrottle {
    /// Create an open (not delayed, not paused) throttle
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if fetching was paused
    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::Acquire)
    }

    /// Clear a pause
    pub fn resume(&self) {
        self.inner.paused.store(false, Ordering::Release);
        self.inner.released.notify_waiters();
    }

    /// Wait until fetching is neither delayed nor paused
    pub async fn wait_released(&self) {
        loop {
            let notified = self.inner.released.notified();
            tokio::pin!(notified);
            // Register before checking so a release in between is not lost
            notified.as_mut().enable();
            if !self.is_delayed() && !self.is_paused() {
                return;
            }
            notified.await;
        }
    }
}

impl FetchThrottle for SharedThrottle {
    fn delay(&self) {
        if !self.inner.delayed.swap(true, Ordering::AcqRel) {
            debug!("Fetching delayed");
        }
    }

    fn undelay(&self) {
        if self.inner.delayed.swap(false, Ordering::AcqRel) {
            debug!("Fetching resumed");
        }
        self.inner.released.notify_waiters();
    }

    fn pause(&self) {
        self.inner.paused.store(true, Ordering::Release);
    }

    fn is_delayed(&self) -> bool {
        self.inner.delayed.load(Ordering::Acquire)
    }
}
