// src/hardware/digipot.rs - Up/down digital potentiometer driver
use super::{DelayUs, DigitalWritePin, PinState, Potentiometer};

const EDGE_DELAY_US: u32 = 2;

/// Steps logged only when the wiper moved further than this since the last log line.
const LOG_STEP_DELTA: i32 = 5;

/// Three-wire increment/up-down/chip-select potentiometer (X9C-style).
///
/// The wiper position is not readable from the chip, so the driver parks it
/// at step 0 on construction and tracks it from there.
pub struct DigiPot<P, D> {
    inc: P,
    ud: P,
    cs: P,
    delay: D,
    current_step: i32,
    logged_step: i32,
}

impl<P: DigitalWritePin, D: DelayUs> DigiPot<P, D> {
    pub const NUM_STEPS: i32 = 100;

    pub fn new(inc: P, ud: P, cs: P, delay: D) -> Self {
        let mut pot = Self {
            inc,
            ud,
            cs,
            delay,
            current_step: 0,
            logged_step: 0,
        };
        pot.inc.set(PinState::High);
        pot.pulse(false, Self::NUM_STEPS);
        pot
    }

    pub fn step(&self) -> i32 {
        self.current_step
    }

    fn pulse(&mut self, up: bool, count: i32) {
        self.ud.set(if up { PinState::High } else { PinState::Low });
        self.delay.delay_us(EDGE_DELAY_US);
        self.cs.set(PinState::Low);
        self.delay.delay_us(EDGE_DELAY_US);
        for _ in 0..count {
            self.inc.set(PinState::Low);
            self.delay.delay_us(EDGE_DELAY_US);
            self.inc.set(PinState::High);
            self.delay.delay_us(EDGE_DELAY_US);
        }
        self.cs.set(PinState::High);
        self.delay.delay_us(EDGE_DELAY_US);
    }
}

impl<P: DigitalWritePin, D: DelayUs> Potentiometer for DigiPot<P, D> {
    fn set_position(&mut self, position: f32) {
        let max_step = Self::NUM_STEPS - 1;
        let step = (position.clamp(0.0, 1.0) * max_step as f32).round() as i32;
        if step == self.current_step {
            return;
        }

        if (step - self.logged_step).abs() > LOG_STEP_DELTA {
            tracing::debug!("DigiPot position {:.3} (step {})", position, step);
            self.logged_step = step;
        }

        self.pulse(step > self.current_step, (step - self.current_step).abs());
        self.current_step = step;
    }

    fn position(&self) -> f32 {
        self.current_step as f32 / (Self::NUM_STEPS - 1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Line {
        Inc,
        Ud,
        Cs,
    }

    type Trace = Rc<RefCell<Vec<(Line, PinState)>>>;

    struct RecordingPin {
        line: Line,
        trace: Trace,
    }

    impl DigitalWritePin for RecordingPin {
        fn set(&mut self, state: PinState) {
            self.trace.borrow_mut().push((self.line, state));
        }
    }

    struct NoDelay;

    impl DelayUs for NoDelay {
        fn delay_us(&mut self, _us: u32) {}
    }

    fn pot() -> (DigiPot<RecordingPin, NoDelay>, Trace) {
        let trace: Trace = Rc::new(RefCell::new(Vec::new()));
        let pin = |line| RecordingPin { line, trace: trace.clone() };
        let pot = DigiPot::new(pin(Line::Inc), pin(Line::Ud), pin(Line::Cs), NoDelay);
        (pot, trace)
    }

    fn inc_pulses(trace: &Trace) -> usize {
        trace
            .borrow()
            .iter()
            .filter(|(line, state)| *line == Line::Inc && *state == PinState::Low)
            .count()
    }

    #[test]
    fn test_construction_parks_wiper_at_zero() {
        let (pot, trace) = pot();
        assert_eq!(inc_pulses(&trace), 100);
        assert!(trace.borrow().contains(&(Line::Ud, PinState::Low)));
        assert_eq!(pot.position(), 0.0);
    }

    #[test]
    fn test_set_position_pulses_difference() {
        let (mut pot, trace) = pot();
        trace.borrow_mut().clear();

        pot.set_position(0.5);
        // round(0.5 * 99) = 50
        assert_eq!(pot.step(), 50);
        assert_eq!(inc_pulses(&trace), 50);
        assert_eq!(trace.borrow()[0], (Line::Ud, PinState::High));

        trace.borrow_mut().clear();
        pot.set_position(0.25);
        assert_eq!(pot.step(), 25);
        assert_eq!(inc_pulses(&trace), 25);
        assert_eq!(trace.borrow()[0], (Line::Ud, PinState::Low));
    }

    #[test]
    fn test_same_step_is_noop() {
        let (mut pot, trace) = pot();
        pot.set_position(0.5);
        trace.borrow_mut().clear();
        pot.set_position(0.501);
        assert!(trace.borrow().is_empty());
    }

    #[test]
    fn test_position_is_clamped() {
        let (mut pot, _trace) = pot();
        pot.set_position(1.7);
        assert_eq!(pot.step(), 99);
        assert_eq!(pot.position(), 1.0);
        pot.set_position(-0.3);
        assert_eq!(pot.step(), 0);
    }
}
