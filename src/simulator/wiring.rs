// src/simulator/wiring.rs - Simulated board lines shared between the interposer and the stove
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::hardware::{AnalogReadPin, Buzzer, DelayUs, DigitalWritePin, PinState};

const WIPER_MAX_STEP: u32 = 99;

/// Every signal that crosses the board, as atomics so the probe task can
/// read the water temperature while the main loop drives the rest.
#[derive(Debug, Default)]
pub struct SimWiring {
    user_dial: AtomicU32,
    water_temp: AtomicU32,
    wiper_step: AtomicU32,
    bypass_high: AtomicBool,
    buzzer_hz: AtomicU32,
    led_low: AtomicBool,
    x9c_selected: AtomicBool,
    x9c_up: AtomicBool,
    x9c_inc_high: AtomicBool,
}

impl SimWiring {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_user_dial(&self, reading: f32) {
        self.user_dial.store(reading.to_bits(), Ordering::Relaxed);
    }

    pub fn user_dial(&self) -> f32 {
        f32::from_bits(self.user_dial.load(Ordering::Relaxed))
    }

    pub fn set_water_temp(&self, temp_c: f32) {
        self.water_temp.store(temp_c.to_bits(), Ordering::Relaxed);
    }

    pub fn water_temp(&self) -> f32 {
        f32::from_bits(self.water_temp.load(Ordering::Relaxed))
    }

    pub fn wiper_step(&self) -> u32 {
        self.wiper_step.load(Ordering::Relaxed)
    }

    /// Wiper position as a fraction of the track.
    pub fn wiper(&self) -> f32 {
        self.wiper_step() as f32 / WIPER_MAX_STEP as f32
    }

    pub fn is_bypass_high(&self) -> bool {
        self.bypass_high.load(Ordering::Relaxed)
    }

    /// What the stove's own dial input sees: the user's knob while the
    /// bypass relay is released, the interposer's potentiometer otherwise.
    pub fn knob_reading(&self) -> f32 {
        if self.is_bypass_high() {
            self.wiper()
        } else {
            self.user_dial()
        }
    }

    pub fn buzzer_hz(&self) -> Option<u16> {
        match self.buzzer_hz.load(Ordering::Relaxed) {
            0 => None,
            hz => Some(hz as u16),
        }
    }

    pub fn is_led_on(&self) -> bool {
        self.led_low.load(Ordering::Relaxed)
    }

    fn x9c_edge(&self, line: X9cLine, state: PinState) {
        match line {
            X9cLine::Select => self.x9c_selected.store(state == PinState::Low, Ordering::Relaxed),
            X9cLine::UpDown => self.x9c_up.store(state == PinState::High, Ordering::Relaxed),
            X9cLine::Increment => {
                let was_high = self.x9c_inc_high.swap(state == PinState::High, Ordering::Relaxed);
                // The chip moves the wiper on a falling INC edge while selected.
                if was_high && state == PinState::Low && self.x9c_selected.load(Ordering::Relaxed) {
                    let step = self.wiper_step();
                    let next = if self.x9c_up.load(Ordering::Relaxed) {
                        (step + 1).min(WIPER_MAX_STEP)
                    } else {
                        step.saturating_sub(1)
                    };
                    self.wiper_step.store(next, Ordering::Relaxed);
                }
            }
        }
    }
}

/// The user's knob as seen by the interposer.
pub struct UserDialPin(pub Arc<SimWiring>);

impl AnalogReadPin for UserDialPin {
    fn read(&mut self) -> f32 {
        self.0.user_dial()
    }
}

/// The stove's dial input, downstream of the bypass relay.
pub struct KnobLine(pub Arc<SimWiring>);

impl AnalogReadPin for KnobLine {
    fn read(&mut self) -> f32 {
        self.0.knob_reading()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum X9cLine {
    Increment,
    UpDown,
    Select,
}

/// One control line of the simulated X9C potentiometer chip.
pub struct X9cPin {
    line: X9cLine,
    wiring: Arc<SimWiring>,
}

impl X9cPin {
    pub fn new(line: X9cLine, wiring: Arc<SimWiring>) -> Self {
        Self { line, wiring }
    }
}

impl DigitalWritePin for X9cPin {
    fn set(&mut self, state: PinState) {
        self.wiring.x9c_edge(self.line, state);
    }
}

pub struct BypassPin(pub Arc<SimWiring>);

impl DigitalWritePin for BypassPin {
    fn set(&mut self, state: PinState) {
        self.0.bypass_high.store(state == PinState::High, Ordering::Relaxed);
    }
}

/// Active-low status LED.
pub struct StatusLed(pub Arc<SimWiring>);

impl DigitalWritePin for StatusLed {
    fn set(&mut self, state: PinState) {
        self.0.led_low.store(state == PinState::Low, Ordering::Relaxed);
    }
}

pub struct SimBuzzer(pub Arc<SimWiring>);

impl Buzzer for SimBuzzer {
    fn enable(&mut self, frequency_hz: u16) {
        self.0.buzzer_hz.store(u32::from(frequency_hz), Ordering::Relaxed);
    }

    fn disable(&mut self) {
        self.0.buzzer_hz.store(0, Ordering::Relaxed);
    }
}

/// Edge timing is irrelevant on the host.
pub struct NoDelay;

impl DelayUs for NoDelay {
    fn delay_us(&mut self, _us: u32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::{DigiPot, Potentiometer};

    fn digipot(wiring: &Arc<SimWiring>) -> DigiPot<X9cPin, NoDelay> {
        DigiPot::new(
            X9cPin::new(X9cLine::Increment, wiring.clone()),
            X9cPin::new(X9cLine::UpDown, wiring.clone()),
            X9cPin::new(X9cLine::Select, wiring.clone()),
            NoDelay,
        )
    }

    #[test]
    fn test_digipot_drives_simulated_chip() {
        let wiring = SimWiring::new();
        let mut pot = digipot(&wiring);
        assert_eq!(wiring.wiper_step(), 0);

        pot.set_position(0.5);
        assert_eq!(wiring.wiper_step(), 50);
        assert_eq!(pot.step(), 50);

        pot.set_position(0.2);
        assert_eq!(wiring.wiper_step(), 20);

        pot.set_position(1.0);
        assert_eq!(wiring.wiper_step(), 99);
        assert_eq!(wiring.wiper(), 1.0);
    }

    #[test]
    fn test_knob_line_follows_bypass_relay() {
        let wiring = SimWiring::new();
        let mut pot = digipot(&wiring);
        pot.set_position(0.3);
        wiring.set_user_dial(0.8);

        let mut knob = KnobLine(wiring.clone());
        assert_eq!(knob.read(), 0.8);

        BypassPin(wiring.clone()).set(PinState::High);
        assert!((knob.read() - 30.0 / 99.0).abs() < 1e-6);
    }

    #[test]
    fn test_buzzer_and_led() {
        let wiring = SimWiring::new();
        let mut buzzer = SimBuzzer(wiring.clone());
        buzzer.enable(1200);
        assert_eq!(wiring.buzzer_hz(), Some(1200));
        buzzer.disable();
        assert_eq!(wiring.buzzer_hz(), None);

        let mut led = StatusLed(wiring.clone());
        led.set(PinState::Low);
        assert!(wiring.is_led_on());
        led.set(PinState::High);
        assert!(!wiring.is_led_on());
    }
}
