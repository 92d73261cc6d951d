// src/signal/blinker.rs - Status LED patterns (active-low LED)
use super::{Sequencer, Step};
use crate::hardware::{DigitalWritePin, PinState};

const FLASH_MS: u32 = 100;
const REPEAT_GAP_MS: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlinkSignal {
    #[default]
    None,
    Once,
    Repeat,
}

impl BlinkSignal {
    fn first_step(self) -> usize {
        match self {
            BlinkSignal::None => 0,
            BlinkSignal::Once => 1,
            BlinkSignal::Repeat => 2,
        }
    }
}

fn steps() -> Vec<Step<PinState>> {
    vec![
        Step::new(0, PinState::High, None),
        Step::new(FLASH_MS, PinState::Low, Some(0)),
        Step::new(FLASH_MS, PinState::Low, Some(3)),
        Step::new(REPEAT_GAP_MS, PinState::High, Some(2)),
    ]
}

pub struct Blinker<W> {
    pin: W,
    sequencer: Sequencer<PinState>,
    signal: BlinkSignal,
}

impl<W: DigitalWritePin> Blinker<W> {
    pub fn new(mut pin: W) -> Self {
        pin.set(PinState::High);
        Self {
            pin,
            sequencer: Sequencer::new(steps()),
            signal: BlinkSignal::None,
        }
    }

    pub fn blink(&mut self, signal: BlinkSignal, now_ms: u32) {
        if signal != self.signal {
            tracing::trace!("Blinker {:?} -> {:?}", self.signal, signal);
        }
        self.signal = signal;
        let state = self.sequencer.start(signal.first_step(), now_ms);
        self.pin.set(state);
    }

    pub fn update(&mut self, now_ms: u32) {
        let pin = &mut self.pin;
        self.sequencer.advance(now_ms, |state| pin.set(state));
    }

    pub fn signal(&self) -> BlinkSignal {
        self.signal
    }

    pub fn pin(&self) -> &W {
        &self.pin
    }
}
