// src/stove/dial.rs - Debounced interpretation of the stove power dial
use crate::config::ThrottleConfig;
use crate::hardware::AnalogReadPin;

use super::ThrottleRequest;

const WINDOW: usize = 4;

/// Smooths the raw dial reading and turns it into a [`ThrottleRequest`].
///
/// Zones, by smoothed reading:
/// - below `min`: off, base 0
/// - `min..max`: base ramps linearly as `reading / max`, reaching 1.0 at `max`
/// - below `arm`: boost counter cleared, not armed
/// - `arm..boost`: boost armed
/// - `boost` and above: one boost increment per arming, up to `num_boosts`
pub struct StoveDial<A> {
    pin: A,
    config: ThrottleConfig,
    readings: [f32; WINDOW],
    reading: f32,
    throttle: ThrottleRequest,
    boost_armed: bool,
    logged: ThrottleRequest,
}

impl<A: AnalogReadPin> StoveDial<A> {
    pub fn new(pin: A, config: ThrottleConfig) -> Self {
        debug_assert!(config.min < config.max);
        debug_assert!(config.max < config.arm);
        debug_assert!(config.arm < config.boost);
        Self {
            pin,
            config,
            readings: [0.0; WINDOW],
            reading: 0.0,
            throttle: ThrottleRequest::OFF,
            boost_armed: false,
            logged: ThrottleRequest::OFF,
        }
    }

    /// Sample the pin and recompute the throttle.
    pub fn update(&mut self) {
        self.readings.rotate_left(1);
        self.readings[WINDOW - 1] = self.pin.read();

        // f64 keeps the mean of identical samples exact.
        let sum: f64 = self.readings.iter().map(|&r| f64::from(r)).sum();
        let mean = (sum / WINDOW as f64) as f32;
        let reading = (mean / self.config.input_scale).clamp(0.0, 1.0);
        self.reading = reading;

        self.throttle.base = if reading < self.config.min {
            0.0
        } else {
            (reading / self.config.max).min(1.0)
        };

        if reading < self.config.arm {
            self.throttle.boost = 0;
            self.boost_armed = false;
        } else if reading < self.config.boost {
            self.boost_armed = true;
        } else if self.boost_armed && self.throttle.boost < self.config.num_boosts {
            self.throttle.boost += 1;
            self.boost_armed = false;
        }

        if !self.throttle.is_near(&self.logged) {
            tracing::debug!(
                "StoveDial throttle {:.3}, boost {}",
                self.throttle.base,
                self.throttle.boost
            );
            self.logged = self.throttle;
        }
    }

    /// Smoothed base level in `[0, 1]`.
    pub fn position(&self) -> f32 {
        self.throttle.base
    }

    pub fn throttle(&self) -> ThrottleRequest {
        self.throttle
    }

    /// Smoothed, scaled raw reading.
    pub fn reading(&self) -> f32 {
        self.reading
    }

    pub fn is_off(&self) -> bool {
        self.reading < self.config.min
    }

    pub fn is_boil(&self) -> bool {
        self.reading >= self.config.boil
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    pub fn pin_mut(&mut self) -> &mut A {
        &mut self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPin(f32);

    impl AnalogReadPin for FixedPin {
        fn read(&mut self) -> f32 {
            self.0
        }
    }

    fn config() -> ThrottleConfig {
        ThrottleConfig {
            min: 0.1,
            max: 0.6,
            arm: 0.7,
            boost: 0.8,
            boil: 0.9,
            num_boosts: 2,
            input_scale: 1.0,
        }
    }

    fn settle(dial: &mut StoveDial<FixedPin>, reading: f32) {
        dial.pin_mut().0 = reading;
        for _ in 0..WINDOW {
            dial.update();
        }
    }

    #[test]
    fn test_initial_state() {
        let dial = StoveDial::new(FixedPin(0.0), config());
        assert_eq!(dial.position(), 0.0);
        assert_eq!(dial.throttle().boost, 0);
        assert!(dial.is_off());
    }

    #[test]
    fn test_moving_average() {
        let mut dial = StoveDial::new(FixedPin(0.4), config());
        dial.update();
        // [0, 0, 0, 0.4] -> 0.1
        assert!((dial.reading() - 0.1).abs() < 1e-6);
        dial.update();
        assert!((dial.reading() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_level_mapping() {
        let mut dial = StoveDial::new(FixedPin(0.0), config());

        settle(&mut dial, 0.05);
        assert_eq!(dial.position(), 0.0);
        assert!(dial.is_off());

        settle(&mut dial, 0.1);
        assert!(!dial.is_off());
        assert!((dial.position() - 0.1 / 0.6).abs() < 1e-6);

        settle(&mut dial, 0.3);
        assert!((dial.position() - 0.5).abs() < 1e-6);

        settle(&mut dial, 0.6);
        assert_eq!(dial.position(), 1.0);

        settle(&mut dial, 0.75);
        assert_eq!(dial.position(), 1.0);
        assert!(!dial.is_boil());

        settle(&mut dial, 0.95);
        assert!(dial.is_boil());
    }

    #[test]
    fn test_readings_are_clamped_and_scaled() {
        let mut cfg = config();
        cfg.input_scale = 0.5;
        let mut dial = StoveDial::new(FixedPin(0.15), cfg);
        for _ in 0..WINDOW {
            dial.update();
        }
        assert!((dial.reading() - 0.3).abs() < 1e-6);

        settle(&mut dial, 0.9);
        assert_eq!(dial.reading(), 1.0);
    }

    #[test]
    fn test_boost_counts_once_per_arming() {
        let mut dial = StoveDial::new(FixedPin(0.0), config());

        settle(&mut dial, 0.65);
        assert_eq!(dial.throttle().boost, 0);

        // Passing through the arm zone, then into the boost zone
        settle(&mut dial, 0.75);
        settle(&mut dial, 0.85);
        assert_eq!(dial.throttle().boost, 1);

        // Held in the boost zone: no further increments
        for _ in 0..50 {
            dial.update();
        }
        assert_eq!(dial.throttle().boost, 1);

        settle(&mut dial, 0.75);
        assert_eq!(dial.throttle().boost, 1);
        settle(&mut dial, 0.85);
        assert_eq!(dial.throttle().boost, 2);

        // Capped at num_boosts
        settle(&mut dial, 0.75);
        settle(&mut dial, 0.85);
        assert_eq!(dial.throttle().boost, 2);

        // Below arm resets
        settle(&mut dial, 0.65);
        assert_eq!(dial.throttle().boost, 0);
        assert_eq!(dial.position(), 1.0);
    }

    #[test]
    fn test_boost_requires_arm_zone_visit() {
        let mut dial = StoveDial::new(FixedPin(0.0), config());
        settle(&mut dial, 0.6);
        // Jump straight into the boost zone; the moving average still
        // crosses the arm zone on the way up.
        dial.pin_mut().0 = 0.9;
        dial.update();
        // 0.675: below arm
        assert_eq!(dial.throttle().boost, 0);
        dial.update();
        // 0.75: armed
        assert_eq!(dial.throttle().boost, 0);
        dial.update();
        // 0.825: boost
        assert_eq!(dial.throttle().boost, 1);
    }
}
