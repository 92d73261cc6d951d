// src/stove/actuator.rs - Drives the potentiometer that stands in for the stove dial
use crate::clock::elapsed_ms;
use crate::config::ThrottleConfig;
use crate::hardware::{DigitalWritePin, PinState, Potentiometer};

use super::ThrottleRequest;

/// Minimum dwell between boost pulse edges.
pub const BOOST_PULSE_MS: u32 = 1_000;

/// Converts throttle requests into potentiometer positions.
///
/// In bypass the bypass pin is low and the appliance sees the user's dial
/// directly. Otherwise boost levels are reached by pulsing the pot to full
/// and back to just above `max`, one increment per pulse pair, at most one
/// edge per [`BOOST_PULSE_MS`].
pub struct StoveActuator<P, W> {
    pot: P,
    bypass_pin: W,
    config: ThrottleConfig,
    target: ThrottleRequest,
    current_boost: u32,
    is_bypass: bool,
    boost_pulse_active: bool,
    last_boost_change_ms: u32,
    logged: ThrottleRequest,
}

impl<P: Potentiometer, W: DigitalWritePin> StoveActuator<P, W> {
    pub fn new(pot: P, mut bypass_pin: W, config: ThrottleConfig) -> Self {
        bypass_pin.set(PinState::Low);
        Self {
            pot,
            bypass_pin,
            current_boost: config.num_boosts,
            config,
            target: ThrottleRequest::OFF,
            is_bypass: true,
            boost_pulse_active: false,
            last_boost_change_ms: 0,
            logged: ThrottleRequest::OFF,
        }
    }

    /// Position just below `max`, used to cancel boosts.
    pub fn deboost_value(&self) -> f32 {
        self.config.max - (self.config.arm - self.config.max) / 2.0
    }

    /// Position just above `max`, the low half of a boost pulse.
    pub fn arm_value(&self) -> f32 {
        self.config.max + (self.config.arm - self.config.max) / 2.0
    }

    /// Hand the appliance back to the user's dial.
    pub fn set_bypass(&mut self) {
        if self.is_bypass {
            return;
        }
        tracing::info!("StoveActuator bypass engaged");
        self.bypass_pin.set(PinState::Low);
        // Whatever the user does in bypass may leave the appliance boosted.
        self.current_boost = self.config.num_boosts;
        self.is_bypass = true;
        self.boost_pulse_active = false;
    }

    pub fn set_throttle(&mut self, throttle: ThrottleRequest, now_ms: u32) {
        if self.is_bypass || !throttle.is_near(&self.logged) {
            tracing::debug!(
                "StoveActuator::set_throttle(base={:.3}, boost={})",
                throttle.base,
                throttle.boost
            );
            self.logged = throttle;
        }
        self.target = throttle;

        if self.is_bypass {
            tracing::info!("StoveActuator bypass released");
            self.bypass_pin.set(PinState::High);
            self.is_bypass = false;
            let position = (throttle.base * self.config.max).min(self.deboost_value());
            self.pot.set_position(position);
            self.current_boost = 0;
            self.boost_pulse_active = false;
            self.last_boost_change_ms = now_ms;
            return;
        }

        self.update(now_ms);
    }

    /// Advance the boost sequencer.
    pub fn update(&mut self, now_ms: u32) {
        if self.is_bypass {
            return;
        }

        let arm_value = self.arm_value();
        let position = (self.target.base * self.config.max).min(arm_value);

        if self.target.boost == self.current_boost {
            if self.boost_pulse_active {
                // Abandoned mid-pair: the appliance may have counted the high
                // edge, so drop below arm and rebuild from zero.
                self.pot.set_position(position.min(self.deboost_value()));
                self.current_boost = 0;
                self.boost_pulse_active = false;
                self.last_boost_change_ms = now_ms;
                return;
            }
            self.pot.set_position(position);
            return;
        }

        if self.target.boost < self.current_boost {
            self.pot.set_position(position.min(self.deboost_value()));
            self.current_boost = 0;
            self.boost_pulse_active = false;
            self.last_boost_change_ms = now_ms;
            return;
        }

        if elapsed_ms(now_ms, self.last_boost_change_ms) < BOOST_PULSE_MS {
            return;
        }

        if self.boost_pulse_active {
            self.pot.set_position(arm_value);
            self.current_boost += 1;
            tracing::debug!("StoveActuator boost {}/{}", self.current_boost, self.target.boost);
        } else {
            self.pot.set_position(1.0);
        }

        self.boost_pulse_active = !self.boost_pulse_active;
        self.last_boost_change_ms = now_ms;
    }

    pub fn target(&self) -> ThrottleRequest {
        self.target
    }

    pub fn current_boost(&self) -> u32 {
        self.current_boost
    }

    pub fn is_bypass(&self) -> bool {
        self.is_bypass
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }

    pub fn pot(&self) -> &P {
        &self.pot
    }

    pub fn bypass_pin(&self) -> &W {
        &self.bypass_pin
    }
}
