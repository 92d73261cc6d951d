// src/control/trend.rs - Time-weighted linear trend over recent sensor readings
//
// One writer (the probe's notification context) feeds readings into a
// `TrendAnalyzer`; any number of readers on the control loop query the
// shared `TrendEstimate`. Readers never block and never observe a
// half-written result.
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering, fence};

use crate::clock::is_later;

/// Readings kept in the regression window.
pub const CAPACITY: usize = 15;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Reading {
    value: f32,
    time_ms: u32,
}

/// Least-squares line through the current window, anchored at the newest reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalysisResult {
    pub last_update_ms: u32,
    pub intercept: f32,
    pub slope: f32,
    /// Readings in the window; zero until the first reading arrives.
    pub samples: u32,
}

impl AnalysisResult {
    /// Extrapolated value at `time_ms`.
    pub fn value_at(&self, time_ms: u32) -> f32 {
        let dt = time_ms.wrapping_sub(self.last_update_ms) as i32;
        dt as f32 * self.slope + self.intercept
    }
}

#[derive(Debug, Default)]
struct ResultSlot {
    last_update_ms: AtomicU32,
    intercept: AtomicU32,
    slope: AtomicU32,
    samples: AtomicU32,
}

impl ResultSlot {
    fn store(&self, result: &AnalysisResult) {
        self.last_update_ms.store(result.last_update_ms, Ordering::Relaxed);
        self.intercept.store(result.intercept.to_bits(), Ordering::Relaxed);
        self.slope.store(result.slope.to_bits(), Ordering::Relaxed);
        self.samples.store(result.samples, Ordering::Relaxed);
    }

    fn load(&self) -> AnalysisResult {
        AnalysisResult {
            last_update_ms: self.last_update_ms.load(Ordering::Relaxed),
            intercept: f32::from_bits(self.intercept.load(Ordering::Relaxed)),
            slope: f32::from_bits(self.slope.load(Ordering::Relaxed)),
            samples: self.samples.load(Ordering::Relaxed),
        }
    }
}

/// Double-buffered, lock-free view of the latest [`AnalysisResult`].
///
/// `published` counts completed publications; its low bit selects the live
/// slot. `writing` is the generation currently being prepared in the other
/// slot. A reader that was lapped (the writer started refilling the slot it
/// was reading) notices through `writing` and retries.
#[derive(Debug, Default)]
pub struct TrendEstimate {
    slots: [ResultSlot; 2],
    published: AtomicU32,
    writing: AtomicU32,
}

impl TrendEstimate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest complete result.
    pub fn result(&self) -> AnalysisResult {
        loop {
            let generation = self.published.load(Ordering::Acquire);
            let result = self.slots[(generation & 1) as usize].load();
            fence(Ordering::Acquire);
            let writing = self.writing.load(Ordering::Relaxed);
            if writing.wrapping_sub(generation) <= 1 {
                return result;
            }
            std::hint::spin_loop();
        }
    }

    pub fn value(&self, time_ms: u32) -> f32 {
        self.result().value_at(time_ms)
    }

    /// Slope in value units per millisecond.
    pub fn slope(&self) -> f32 {
        self.result().slope
    }

    pub fn last_update_ms(&self) -> u32 {
        self.result().last_update_ms
    }

    /// False until a reading has been published, and again after a clear.
    pub fn has_data(&self) -> bool {
        self.result().samples > 0
    }

    // Single writer only: callers hold the owning `TrendAnalyzer` mutably.
    fn publish(&self, result: &AnalysisResult) {
        let next = self.published.load(Ordering::Relaxed).wrapping_add(1);
        self.writing.store(next, Ordering::Relaxed);
        fence(Ordering::Release);
        self.slots[(next & 1) as usize].store(result);
        self.published.store(next, Ordering::Release);
    }
}

/// Writer side: owns the bounded reading history and publishes a fresh
/// regression into the shared [`TrendEstimate`] after every insertion.
#[derive(Debug)]
pub struct TrendAnalyzer {
    // Ascending by time; only `history[..count]` is meaningful.
    history: [Reading; CAPACITY],
    count: usize,
    estimate: Arc<TrendEstimate>,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendAnalyzer {
    pub fn new() -> Self {
        Self {
            history: [Reading::default(); CAPACITY],
            count: 0,
            estimate: Arc::new(TrendEstimate::new()),
        }
    }

    /// Shared handle for readers on other contexts.
    pub fn estimate(&self) -> Arc<TrendEstimate> {
        self.estimate.clone()
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Insert a reading in time order. Once the window is full the oldest
    /// reading is displaced; a reading older than the whole full window is
    /// ignored.
    pub fn add_reading(&mut self, value: f32, time_ms: u32) {
        tracing::trace!("TrendAnalyzer::add_reading(value={}, time_ms={})", value, time_ms);

        let reading = Reading { value, time_ms };
        let at = self.history[..self.count]
            .partition_point(|r| !is_later(r.time_ms, reading.time_ms));

        if self.count < CAPACITY {
            self.history.copy_within(at..self.count, at + 1);
            self.history[at] = reading;
            self.count += 1;
        } else if at == 0 {
            return;
        } else {
            self.history.copy_within(1..at, 0);
            self.history[at - 1] = reading;
        }

        let result = self.regression();
        self.estimate.publish(&result);
    }

    /// Drop all history and publish an empty estimate.
    pub fn clear(&mut self) {
        tracing::debug!("TrendAnalyzer::clear()");
        self.count = 0;
        self.estimate.publish(&AnalysisResult::default());
    }

    pub fn value(&self, time_ms: u32) -> f32 {
        self.estimate.value(time_ms)
    }

    pub fn slope(&self) -> f32 {
        self.estimate.slope()
    }

    pub fn last_update_ms(&self) -> u32 {
        self.estimate.last_update_ms()
    }

    fn regression(&self) -> AnalysisResult {
        let window = &self.history[..self.count];
        let Some(newest) = window.last() else {
            return AnalysisResult::default();
        };
        let last_update_ms = newest.time_ms;
        let n = window.len() as f64;
        let samples = window.len() as u32;

        // Time relative to the newest reading keeps magnitudes small and puts
        // the intercept at `last_update_ms`.
        let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
        for r in window {
            let x = f64::from(r.time_ms.wrapping_sub(last_update_ms) as i32);
            let y = f64::from(r.value);
            sum_x += x;
            sum_y += y;
            sum_xy += x * y;
            sum_xx += x * x;
        }

        let denominator = n * sum_xx - sum_x * sum_x;
        if window.len() < 2 || denominator.abs() < f64::from(f32::EPSILON) {
            return AnalysisResult {
                last_update_ms,
                intercept: (sum_y / n) as f32,
                slope: 0.0,
                samples,
            };
        }

        let slope = (n * sum_xy - sum_x * sum_y) / denominator;
        let intercept = (sum_y - slope * sum_x) / n;
        AnalysisResult {
            last_update_ms,
            intercept: intercept as f32,
            slope: slope as f32,
            samples,
        }
    }
}
