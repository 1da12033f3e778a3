//! Time-windowed caching of EC samples
//!
//! RPM and PWM reads go through a [`CachedSample`] so that a busy sensor
//! consumer cannot hammer the EC. Freshness is judged against a [`Clock`] so
//! the window can be driven deterministically in tests.

use gpdfan_core::Result;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source
pub trait Clock: Send {
    fn now(&self) -> Instant;
}

/// The real monotonic clock
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// One cache line: a value and when it was last fetched.
#[derive(Debug, Clone)]
pub struct CachedSample<T> {
    value: T,
    last_update: Option<Instant>,
}

impl<T: Copy> CachedSample<T> {
    /// Empty line; the first read always fetches.
    pub fn new(initial: T) -> Self {
        Self {
            value: initial,
            last_update: None,
        }
    }

    /// Whether a read at `now` would go to hardware
    pub fn is_stale(&self, now: Instant, interval: Duration) -> bool {
        match self.last_update {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= interval,
        }
    }

    /// Return the cached value, refetching once it is `interval` old.
    ///
    /// A failed fetch leaves both value and timestamp untouched.
    pub fn get_or_refresh<F>(&mut self, now: Instant, interval: Duration, fetch: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        if self.is_stale(now, interval) {
            let value = fetch()?;
            self.value = value;
            self.last_update = Some(now);
        }
        Ok(self.value)
    }

    /// Store a value known to match hardware as of `now`
    pub fn prime(&mut self, value: T, now: Instant) {
        self.value = value;
        self.last_update = Some(now);
    }

    /// Force the next read to fetch
    pub fn invalidate(&mut self) {
        self.last_update = None;
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }
}
