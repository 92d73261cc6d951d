// src/signal/mod.rs - Timed step-table sequencers for user feedback
pub mod beeper;
pub mod blinker;

pub use beeper::{BeepSignal, Beeper};
pub use blinker::{BlinkSignal, Blinker};

use crate::clock::elapsed_ms;

/// One entry of a sequence: emit `output`, hold it for `duration_ms`, then
/// move on to `next` (or stay here forever when `next` is `None`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step<T> {
    pub duration_ms: u32,
    pub output: T,
    pub next: Option<usize>,
}

impl<T> Step<T> {
    pub const fn new(duration_ms: u32, output: T, next: Option<usize>) -> Self {
        Self { duration_ms, output, next }
    }
}

/// Walks a table of [`Step`]s against a millisecond clock.
#[derive(Debug, Clone)]
pub struct Sequencer<T> {
    steps: Vec<Step<T>>,
    current: usize,
    step_started_ms: u32,
}

impl<T: Copy> Sequencer<T> {
    pub fn new(steps: Vec<Step<T>>) -> Self {
        debug_assert!(!steps.is_empty());
        Self {
            steps,
            current: 0,
            step_started_ms: 0,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// Jump to `index` and return the output to apply now.
    pub fn start(&mut self, index: usize, now_ms: u32) -> T {
        self.current = index;
        self.step_started_ms = now_ms;
        self.steps[index].output
    }

    /// Apply every step whose start time has arrived, in order.
    ///
    /// Step start times accumulate from the previous step's start rather
    /// than from `now_ms`, so a late call catches up without drifting.
    pub fn advance(&mut self, now_ms: u32, mut apply: impl FnMut(T)) {
        // A full lap of the table is the most a single call can need
        // unless the caller stalled for longer than a whole cycle.
        for _ in 0..self.steps.len() {
            let step = self.steps[self.current];
            let Some(next) = step.next else {
                return;
            };
            if elapsed_ms(now_ms, self.step_started_ms) < step.duration_ms {
                return;
            }
            self.step_started_ms = self.step_started_ms.wrapping_add(step.duration_ms);
            self.current = next;
            apply(self.steps[next].output);
        }
        // Stalled: restart the current step from now instead of replaying.
        let step = self.steps[self.current];
        if step.next.is_some() && elapsed_ms(now_ms, self.step_started_ms) >= step.duration_ms {
            self.step_started_ms = now_ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<Step<u8>> {
        vec![
            Step::new(0, 0, None),
            Step::new(10, 1, Some(2)),
            Step::new(20, 2, Some(0)),
        ]
    }

    #[test]
    fn test_terminal_step_holds() {
        let mut seq = Sequencer::new(table());
        assert_eq!(seq.start(0, 100), 0);
        let mut applied = Vec::new();
        seq.advance(10_000, |o| applied.push(o));
        assert!(applied.is_empty());
        assert_eq!(seq.current(), 0);
    }

    #[test]
    fn test_steps_applied_in_order_on_late_update() {
        let mut seq = Sequencer::new(table());
        assert_eq!(seq.start(1, 0), 1);
        let mut applied = Vec::new();
        seq.advance(9, |o| applied.push(o));
        assert!(applied.is_empty());
        seq.advance(35, |o| applied.push(o));
        assert_eq!(applied, vec![2, 0]);
        assert_eq!(seq.current(), 0);
    }

    #[test]
    fn test_wraparound() {
        let mut seq = Sequencer::new(table());
        seq.start(1, u32::MAX - 4);
        let mut applied = Vec::new();
        seq.advance(4, |o| applied.push(o));
        assert!(applied.is_empty());
        seq.advance(5, |o| applied.push(o));
        assert_eq!(applied, vec![2]);
    }

    #[test]
    fn test_stalled_repeating_table_is_bounded() {
        let steps = vec![
            Step::new(0, 0, None),
            Step::new(10, 1, Some(2)),
            Step::new(10, 2, Some(1)),
        ];
        let mut seq = Sequencer::new(steps);
        seq.start(1, 0);
        let mut count = 0;
        seq.advance(1_000_000, |_| count += 1);
        assert_eq!(count, 3);
    }
}
