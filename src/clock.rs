// src/clock.rs - Monotonic millisecond time sources
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// A wrapping 32-bit millisecond counter.
///
/// Consumers must compare instants with wrapping subtraction; the counter
/// rolls over roughly every 49.7 days.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Milliseconds elapsed since construction, truncated to 32 bits.
#[derive(Debug, Clone)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// A clock that only moves when told to. Shareable across threads.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU32,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self { now: AtomicU32::new(start_ms) }
    }

    pub fn set(&self, now_ms: u32) {
        self.now.store(now_ms, Ordering::Relaxed);
    }

    pub fn advance(&self, delta_ms: u32) {
        let now = self.now.load(Ordering::Relaxed);
        self.now.store(now.wrapping_add(delta_ms), Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }
}

/// Milliseconds from `earlier` to `later`, tolerating counter wraparound.
pub fn elapsed_ms(later: u32, earlier: u32) -> u32 {
    later.wrapping_sub(earlier)
}

/// True when `a` is strictly later than `b` on the wrapping timeline.
pub fn is_later(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance_wraps() {
        let clock = ManualClock::new(u32::MAX - 5);
        clock.advance(10);
        assert_eq!(clock.now_ms(), 4);
        assert_eq!(elapsed_ms(clock.now_ms(), u32::MAX - 5), 10);
    }

    #[test]
    fn test_is_later_across_wrap() {
        assert!(is_later(1000, u32::MAX - 1000));
        assert!(!is_later(u32::MAX - 1000, 1000));
        assert!(!is_later(5, 5));
    }

    #[test]
    fn test_shared_clock_through_arc() {
        let clock = Arc::new(ManualClock::new(0));
        let view = clock.clone();
        clock.set(1234);
        assert_eq!(view.now_ms(), 1234);
    }
}
