// src/signal/beeper.rs - Audible status signals
use std::fmt;

use super::{Sequencer, Step};
use crate::config::BeeperConfig;
use crate::hardware::Buzzer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeepSignal {
    #[default]
    None,
    /// Rising pair: low then high.
    Accept,
    /// Falling pair: high then low.
    Reject,
    /// Two low chirps and a long pause, repeated until replaced.
    Error,
}

impl BeepSignal {
    fn first_step(self) -> usize {
        match self {
            BeepSignal::None => 0,
            BeepSignal::Accept => 1,
            BeepSignal::Reject => 2,
            BeepSignal::Error => 3,
        }
    }
}

impl fmt::Display for BeepSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BeepSignal::None => "NONE",
            BeepSignal::Accept => "ACCEPT",
            BeepSignal::Reject => "REJECT",
            BeepSignal::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// `None` output means silence.
fn steps(config: &BeeperConfig) -> Vec<Step<Option<u16>>> {
    let tone = config.tone_ms.max(1);
    let pause = config.pause_ms.max(1);
    let low = Some(config.low_freq_hz);
    let high = Some(config.high_freq_hz);
    vec![
        Step::new(0, None, None),
        Step::new(tone, low, Some(4)),
        Step::new(tone, high, Some(5)),
        Step::new(tone, low, Some(6)),
        Step::new(tone, high, Some(0)),
        Step::new(tone, low, Some(0)),
        Step::new(tone, None, Some(7)),
        Step::new(tone, low, Some(8)),
        Step::new(pause, None, Some(3)),
    ]
}

pub struct Beeper<Z> {
    buzzer: Z,
    sequencer: Sequencer<Option<u16>>,
    signal: BeepSignal,
    started_ms: u32,
}

impl<Z: Buzzer> Beeper<Z> {
    pub fn new(mut buzzer: Z, config: &BeeperConfig) -> Self {
        buzzer.disable();
        Self {
            buzzer,
            sequencer: Sequencer::new(steps(config)),
            signal: BeepSignal::None,
            started_ms: 0,
        }
    }

    /// Restart with `signal`; its first tone sounds immediately.
    pub fn beep(&mut self, signal: BeepSignal, now_ms: u32) {
        tracing::debug!("Beeper signal {}", signal);
        self.signal = signal;
        self.started_ms = now_ms;
        let tone = self.sequencer.start(signal.first_step(), now_ms);
        apply(&mut self.buzzer, tone);
    }

    pub fn update(&mut self, now_ms: u32) {
        let buzzer = &mut self.buzzer;
        self.sequencer.advance(now_ms, |tone| apply(buzzer, tone));
    }

    /// Most recently requested signal.
    pub fn signal(&self) -> BeepSignal {
        self.signal
    }

    pub fn started_ms(&self) -> u32 {
        self.started_ms
    }

    pub fn buzzer(&self) -> &Z {
        &self.buzzer
    }
}

fn apply<Z: Buzzer>(buzzer: &mut Z, tone: Option<u16>) {
    match tone {
        Some(frequency_hz) => buzzer.enable(frequency_hz),
        None => buzzer.disable(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct ToneLog {
        tones: Vec<Option<u16>>,
    }

    impl Buzzer for ToneLog {
        fn enable(&mut self, frequency_hz: u16) {
            self.tones.push(Some(frequency_hz));
        }

        fn disable(&mut self) {
            self.tones.push(None);
        }
    }

    fn beeper() -> Beeper<ToneLog> {
        Beeper::new(ToneLog::default(), &BeeperConfig::default())
    }

    fn run(beeper: &mut Beeper<ToneLog>, from_ms: u32, to_ms: u32) {
        for now in (from_ms..=to_ms).step_by(10) {
            beeper.update(now);
        }
    }

    #[test]
    fn test_starts_silent() {
        let beeper = beeper();
        assert_eq!(beeper.signal(), BeepSignal::None);
        assert_eq!(beeper.buzzer().tones, vec![None]);
    }

    #[test]
    fn test_accept_rises() {
        let mut beeper = beeper();
        beeper.beep(BeepSignal::Accept, 1000);
        run(&mut beeper, 1000, 1500);
        assert_eq!(beeper.buzzer().tones, vec![None, Some(800), Some(1200), None]);
    }

    #[test]
    fn test_reject_falls() {
        let mut beeper = beeper();
        beeper.beep(BeepSignal::Reject, 0);
        run(&mut beeper, 0, 500);
        assert_eq!(beeper.buzzer().tones, vec![None, Some(1200), Some(800), None]);
    }

    #[test]
    fn test_error_repeats_until_replaced() {
        let mut beeper = beeper();
        beeper.beep(BeepSignal::Error, 0);
        // low, silent, low, pause: 1300ms per cycle
        run(&mut beeper, 0, 1300);
        assert_eq!(
            beeper.buzzer().tones,
            vec![None, Some(800), None, Some(800), None, Some(800)]
        );

        beeper.beep(BeepSignal::None, 1310);
        let before = beeper.buzzer().tones.len();
        run(&mut beeper, 1310, 5000);
        assert_eq!(beeper.buzzer().tones.len(), before);
        assert_eq!(beeper.buzzer().tones.last(), Some(&None));
        assert_eq!(beeper.signal(), BeepSignal::None);
    }

    #[test]
    fn test_signal_names() {
        assert_eq!(BeepSignal::Error.to_string(), "ERROR");
        assert_eq!(BeepSignal::default(), BeepSignal::None);
    }
}
