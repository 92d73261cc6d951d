// src/simulator/plant.rs - The stove appliance and the pot of water on it
use crate::config::{SimConfig, ThermalConfig};
use crate::stove::StoveDial;

use super::wiring::KnobLine;

const BOILING_C: f32 = 100.0;

/// First-order thermal model of a pot of water.
#[derive(Debug, Clone)]
pub struct Kettle {
    temp_c: f32,
    ambient_c: f32,
    heater_w: f32,
    loss_w_per_c: f32,
    capacity_j_per_c: f32,
}

impl Kettle {
    pub fn new(sim: &SimConfig, thermal: &ThermalConfig) -> Self {
        Self {
            temp_c: thermal.ambient_temp,
            ambient_c: thermal.ambient_temp,
            heater_w: sim.heater_w,
            loss_w_per_c: sim.loss_w_per_c,
            capacity_j_per_c: sim.capacity_j_per_c,
        }
    }

    pub fn temp_c(&self) -> f32 {
        self.temp_c
    }

    /// Advance by `dt_ms` with the heater at `power` (fraction of `heater_w`).
    pub fn step(&mut self, power: f32, dt_ms: u32) {
        let dt_s = dt_ms as f32 / 1000.0;
        let heat_w = self.heater_w * power.max(0.0);
        let loss_w = self.loss_w_per_c * (self.temp_c - self.ambient_c);
        self.temp_c += (heat_w - loss_w) * dt_s / self.capacity_j_per_c;
        // Extra heat goes into evaporation.
        self.temp_c = self.temp_c.min(BOILING_C);
    }
}

/// The appliance's own control electronics reading its dial input.
pub struct SimStove {
    dial: StoveDial<KnobLine>,
    boost_step: f32,
}

impl SimStove {
    pub fn new(knob: KnobLine, sim: &SimConfig) -> Self {
        Self {
            dial: StoveDial::new(knob, sim.appliance),
            boost_step: sim.boost_step,
        }
    }

    pub fn update(&mut self) {
        self.dial.update();
    }

    /// Heater output as a fraction of the nominal heater power.
    pub fn heat_fraction(&self) -> f32 {
        if self.dial.is_off() {
            return 0.0;
        }
        let throttle = self.dial.throttle();
        throttle.base + throttle.boost as f32 * self.boost_step
    }

    pub fn dial(&self) -> &StoveDial<KnobLine> {
        &self.dial
    }
}
