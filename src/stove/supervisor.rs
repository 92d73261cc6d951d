// src/stove/supervisor.rs - Top-level state machine tying dial, probe and stove together
use std::fmt;

use crate::clock::{Clock, elapsed_ms};
use crate::config::{BoostRounding, StoveConfig};
use crate::control::ThermalController;
use crate::hardware::{AnalogReadPin, Buzzer, DigitalWritePin, Potentiometer, Thermometer};
use crate::signal::{BeepSignal, Beeper};

use super::{StoveActuator, StoveDial, ThrottleRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Waiting for dial activity, probe radio off.
    Sleep,
    /// Waiting for the probe to connect.
    Scanning,
    /// Probe connected, waiting for the dial to reach the boil position.
    Connected,
    Activating,
    /// Closed-loop temperature control.
    Active,
    /// Probe data went stale while active.
    Disconnected,
    Cooldown,
}

impl SupervisorState {
    pub fn name(&self) -> &'static str {
        match self {
            SupervisorState::Sleep => "SLEEP",
            SupervisorState::Scanning => "SCANNING",
            SupervisorState::Connected => "CONNECTED",
            SupervisorState::Activating => "ACTIVATING",
            SupervisorState::Active => "ACTIVE",
            SupervisorState::Disconnected => "DISCONNECTED",
            SupervisorState::Cooldown => "COOLDOWN",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Split a controller power fraction into a base level and boost count.
///
/// Up to `base_power_ratio` the stove runs unboosted with a proportional
/// base; above it the base is full and the excess is spread over
/// `num_boosts` levels using the configured rounding.
pub fn power_to_throttle(power: f32, config: &StoveConfig, num_boosts: u32) -> ThrottleRequest {
    let ratio = config.base_power_ratio;
    if power <= ratio {
        return ThrottleRequest::new((power / ratio).max(0.0), 0);
    }

    let level = (power - ratio) / (1.0 - ratio) * num_boosts as f32;
    let boost = match config.boost_rounding {
        BoostRounding::Round => level.round(),
        // Float error can land an exact level just above an integer.
        BoostRounding::Ceil => (level - 1e-4).ceil(),
    };
    ThrottleRequest::new(1.0, (boost.max(0.0) as u32).min(num_boosts))
}

pub struct StoveSupervisor<A, P, W, Z, T, C> {
    dial: StoveDial<A>,
    actuator: StoveActuator<P, W>,
    controller: ThermalController,
    beeper: Beeper<Z>,
    thermometer: T,
    clock: C,
    config: StoveConfig,
    state: SupervisorState,
    state_entry_ms: u32,
    dial_off_start_ms: u32,
    has_beeped_connected: bool,
    commanded_position: Option<f32>,
}

impl<A, P, W, Z, T, C> StoveSupervisor<A, P, W, Z, T, C>
where
    A: AnalogReadPin,
    P: Potentiometer,
    W: DigitalWritePin,
    Z: Buzzer,
    T: Thermometer,
    C: Clock,
{
    /// Starts in [`SupervisorState::Sleep`] without running its entry actions;
    /// the actuator is already bypassed and the probe is not yet started.
    pub fn new(
        dial: StoveDial<A>,
        actuator: StoveActuator<P, W>,
        controller: ThermalController,
        beeper: Beeper<Z>,
        thermometer: T,
        clock: C,
        config: StoveConfig,
    ) -> Self {
        let now = clock.now_ms();
        Self {
            dial,
            actuator,
            controller,
            beeper,
            thermometer,
            clock,
            config,
            state: SupervisorState::Sleep,
            state_entry_ms: now,
            dial_off_start_ms: now,
            has_beeped_connected: false,
            commanded_position: None,
        }
    }

    /// One polling tick.
    pub fn update(&mut self) {
        let now = self.clock.now_ms();
        self.dial.update();
        self.beeper.update(now);

        if !self.dial.is_off() {
            self.dial_off_start_ms = now;
        }

        match self.state {
            SupervisorState::Sleep | SupervisorState::Cooldown => {
                if !self.dial.is_off() {
                    return self.transition_to(SupervisorState::Scanning, now);
                }
            }
            _ => {
                if self.dial.is_off()
                    && elapsed_ms(now, self.dial_off_start_ms) > self.config.cooldown_after_ms
                {
                    return self.transition_to(SupervisorState::Cooldown, now);
                }
            }
        }

        let in_state = elapsed_ms(now, self.state_entry_ms);
        match self.state {
            SupervisorState::Sleep => {}
            SupervisorState::Scanning => {
                if self.thermometer.connected() {
                    self.transition_to(SupervisorState::Connected, now);
                }
            }
            SupervisorState::Connected => {
                if !self.thermometer.connected() {
                    self.transition_to(SupervisorState::Scanning, now);
                } else if self.dial.is_boil() {
                    self.transition_to(SupervisorState::Activating, now);
                }
            }
            SupervisorState::Activating => {
                if in_state >= self.config.activate_after_ms {
                    self.transition_to(SupervisorState::Active, now);
                }
            }
            SupervisorState::Active => {
                if in_state < self.config.settle_ms {
                    return;
                }
                if self.is_data_stale(now) {
                    return self.transition_to(SupervisorState::Disconnected, now);
                }
                self.regulate(now);
            }
            SupervisorState::Disconnected => {
                if !self.is_data_stale(now) {
                    self.transition_to(SupervisorState::Active, now);
                }
            }
            SupervisorState::Cooldown => {
                if in_state > self.config.sleep_after_ms {
                    self.transition_to(SupervisorState::Sleep, now);
                }
            }
        }
    }

    fn regulate(&mut self, now: u32) {
        let position = self.dial.position();
        let moved = match self.commanded_position {
            Some(commanded) => (position - commanded).abs() > self.config.target_deadband,
            None => true,
        };
        if moved {
            let target = self.config.min_temp_c
                + position * (self.config.max_temp_c - self.config.min_temp_c);
            self.controller.set_target_temp(target);
            self.commanded_position = Some(position);
        }

        self.controller.update(now);
        let throttle = power_to_throttle(
            self.controller.power(),
            &self.config,
            self.actuator.config().num_boosts,
        );
        self.actuator.set_throttle(throttle, now);
    }

    // No reading at all counts as stale. The probe task may publish a
    // reading stamped slightly after `now`, which is fresh.
    fn is_data_stale(&self, now: u32) -> bool {
        let estimate = self.controller.estimate();
        if !estimate.has_data() {
            return true;
        }
        let age = now.wrapping_sub(estimate.last_update_ms());
        if (age as i32) < 0 {
            return false;
        }
        age > self.config.data_timeout_ms
    }

    fn transition_to(&mut self, new_state: SupervisorState, now: u32) {
        if self.state == new_state {
            return;
        }

        tracing::info!("StoveSupervisor: {} -> {}", self.state, new_state);
        self.state = new_state;
        self.state_entry_ms = now;

        if !matches!(new_state, SupervisorState::Active | SupervisorState::Disconnected) {
            self.actuator.set_bypass();
        }

        match new_state {
            SupervisorState::Sleep => {
                self.thermometer.stop();
                if !self.has_beeped_connected {
                    self.beeper.beep(BeepSignal::Reject, now);
                }
                self.has_beeped_connected = false;
            }
            SupervisorState::Scanning => {
                self.thermometer.start();
            }
            SupervisorState::Connected => {
                if !self.has_beeped_connected {
                    self.beeper.beep(BeepSignal::Accept, now);
                }
                self.has_beeped_connected = true;
            }
            SupervisorState::Activating => {}
            SupervisorState::Active => {
                self.actuator.set_throttle(ThrottleRequest::OFF, now);
                self.commanded_position = None;
                self.beeper.beep(BeepSignal::None, now);
            }
            SupervisorState::Disconnected => {
                tracing::warn!(
                    "Temperature data stale (last update {}ms, now {}ms), stove throttled to zero",
                    self.controller.estimate().last_update_ms(),
                    now
                );
                self.actuator.set_throttle(ThrottleRequest::OFF, now);
                self.beeper.beep(BeepSignal::Error, now);
            }
            SupervisorState::Cooldown => {
                self.beeper.beep(BeepSignal::None, now);
            }
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn state_entry_ms(&self) -> u32 {
        self.state_entry_ms
    }

    pub fn config(&self) -> &StoveConfig {
        &self.config
    }

    pub fn dial(&self) -> &StoveDial<A> {
        &self.dial
    }

    pub fn dial_mut(&mut self) -> &mut StoveDial<A> {
        &mut self.dial
    }

    pub fn actuator(&self) -> &StoveActuator<P, W> {
        &self.actuator
    }

    pub fn controller(&self) -> &ThermalController {
        &self.controller
    }

    pub fn beeper(&self) -> &Beeper<Z> {
        &self.beeper
    }

    pub fn thermometer(&self) -> &T {
        &self.thermometer
    }

    pub fn thermometer_mut(&mut self) -> &mut T {
        &mut self.thermometer
    }
}
