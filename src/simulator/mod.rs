// src/simulator/mod.rs - Host-side simulation of the interposer, stove and probe
//
// The interposer core runs unchanged against simulated wiring: the user's
// knob, an X9C potentiometer chip, the bypass relay, buzzer and LED. The
// stove appliance reads whatever the relay routes to it and heats a kettle;
// a simulated probe samples the kettle from its own task.
pub mod plant;
pub mod probe;
pub mod wiring;

use std::fmt;
use std::sync::Arc;

use crate::clock::{Clock, elapsed_ms};
use crate::config::Config;
use crate::control::{ThermalController, TrendAnalyzer};
use crate::hardware::DigiPot;
use crate::signal::{BlinkSignal, Blinker, Beeper};
use crate::stove::{StoveActuator, StoveDial, StoveSupervisor, SupervisorState};

pub use plant::{Kettle, SimStove};
pub use probe::{ProbeLink, ProbeRadio, SimProbe, run_probe};
pub use wiring::{
    BypassPin, KnobLine, NoDelay, SimBuzzer, SimWiring, StatusLed, UserDialPin, X9cLine, X9cPin,
};

/// Milliseconds since the runtime started, following tokio's (possibly paused) clock.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            start: tokio::time::Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

pub type SimPot = DigiPot<X9cPin, NoDelay>;

pub type SimSupervisor<C> =
    StoveSupervisor<UserDialPin, SimPot, BypassPin, SimBuzzer, SimProbe<C>, C>;

/// Aggregates reported at the end of a run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimSummary {
    pub elapsed_ms: u32,
    pub final_state: Option<SupervisorState>,
    pub transitions: u32,
    pub active_ms: u32,
    pub max_water_c: f32,
    pub final_water_c: f32,
    pub max_boost: u32,
}

impl fmt::Display for SimSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.final_state.map_or("-", |s| s.name());
        write!(
            f,
            "{:.1}s simulated, final state {}, {} transitions, {:.1}s active, water {:.1}°C (max {:.1}°C), max boost {}",
            self.elapsed_ms as f32 / 1000.0,
            state,
            self.transitions,
            self.active_ms as f32 / 1000.0,
            self.final_water_c,
            self.max_water_c,
            self.max_boost
        )
    }
}

/// Status LED pattern for a supervisor state entry.
pub fn blink_for(state: SupervisorState) -> BlinkSignal {
    match state {
        SupervisorState::Scanning => BlinkSignal::Repeat,
        SupervisorState::Connected | SupervisorState::Active => BlinkSignal::Once,
        _ => BlinkSignal::None,
    }
}

pub struct Simulation<C> {
    config: Config,
    wiring: Arc<SimWiring>,
    supervisor: SimSupervisor<C>,
    blinker: Blinker<StatusLed>,
    stove: SimStove,
    kettle: Kettle,
    clock: C,
    start_ms: u32,
    last_tick_ms: u32,
    last_status_ms: u32,
    last_state: SupervisorState,
    script_index: usize,
    summary: SimSummary,
}

impl<C: Clock + Clone> Simulation<C> {
    /// Wire everything up. The returned [`ProbeRadio`] owns the trend
    /// analyzer's writer side and must be driven separately, normally by
    /// spawning [`run_probe`].
    pub fn new(config: Config, clock: C) -> (Self, ProbeRadio<C>) {
        let wiring = SimWiring::new();
        let link = ProbeLink::new(config.sim.probe_connect_ms);
        let analyzer = TrendAnalyzer::new();

        let pot = DigiPot::new(
            X9cPin::new(X9cLine::Increment, wiring.clone()),
            X9cPin::new(X9cLine::UpDown, wiring.clone()),
            X9cPin::new(X9cLine::Select, wiring.clone()),
            NoDelay,
        );
        let supervisor = StoveSupervisor::new(
            StoveDial::new(UserDialPin(wiring.clone()), config.throttle),
            StoveActuator::new(pot, BypassPin(wiring.clone()), config.throttle),
            ThermalController::new(analyzer.estimate(), config.thermal),
            Beeper::new(SimBuzzer(wiring.clone()), &config.beeper),
            SimProbe::new(link.clone(), clock.clone()),
            clock.clone(),
            config.stove,
        );
        let radio = ProbeRadio::new(link, wiring.clone(), analyzer, clock.clone(), &config.sim);

        let kettle = Kettle::new(&config.sim, &config.thermal);
        wiring.set_water_temp(kettle.temp_c());
        let stove = SimStove::new(KnobLine(wiring.clone()), &config.sim);
        let now = clock.now_ms();

        let simulation = Self {
            blinker: Blinker::new(StatusLed(wiring.clone())),
            config,
            wiring,
            supervisor,
            stove,
            kettle,
            clock,
            start_ms: now,
            last_tick_ms: now,
            last_status_ms: now,
            last_state: SupervisorState::Sleep,
            script_index: 0,
            summary: SimSummary::default(),
        };
        (simulation, radio)
    }

    /// Run one control-loop iteration and advance the plant to the current time.
    pub fn tick(&mut self) {
        let now = self.clock.now_ms();
        let dt = elapsed_ms(now, self.last_tick_ms);
        let since_start = elapsed_ms(now, self.start_ms);

        self.apply_dial_script(since_start);

        self.supervisor.update();
        let state = self.supervisor.state();
        if state != self.last_state {
            self.summary.transitions += 1;
            self.blinker.blink(blink_for(state), now);
            self.last_state = state;
        }
        self.blinker.update(now);

        self.stove.update();
        self.kettle.step(self.stove.heat_fraction(), dt);
        self.wiring.set_water_temp(self.kettle.temp_c());

        if state == SupervisorState::Active {
            self.summary.active_ms += dt;
        }
        let actuator = self.supervisor.actuator();
        if !actuator.is_bypass() {
            self.summary.max_boost = self.summary.max_boost.max(actuator.current_boost());
        }
        self.summary.max_water_c = self.summary.max_water_c.max(self.kettle.temp_c());
        self.summary.final_water_c = self.kettle.temp_c();
        self.summary.final_state = Some(state);
        self.summary.elapsed_ms = since_start;

        if elapsed_ms(now, self.last_status_ms) >= self.config.sim.status_every_ms {
            self.last_status_ms = now;
            self.log_status(since_start);
        }
        self.last_tick_ms = now;
    }

    fn apply_dial_script(&mut self, since_start: u32) {
        while let Some(step) = self.config.sim.dial.get(self.script_index) {
            if step.at_ms > since_start {
                break;
            }
            tracing::info!("User turns the dial to {:.2}", step.reading);
            self.wiring.set_user_dial(step.reading);
            self.script_index += 1;
        }
    }

    fn log_status(&self, since_start: u32) {
        let controller = self.supervisor.controller();
        let actuator = self.supervisor.actuator();
        let target = actuator.target();
        tracing::info!(
            "t={:>6.1}s {:<12} water={:>5.1}°C target={:>5.1}°C power={:.2} throttle={:.2}+{} boost={}/{} heat={:.2} lid_open={} buzzer={:?} led={}",
            since_start as f32 / 1000.0,
            self.supervisor.state().name(),
            self.kettle.temp_c(),
            controller.target_temp(),
            controller.power(),
            target.base,
            target.boost,
            actuator.current_boost(),
            self.stove.dial().throttle().boost,
            self.stove.heat_fraction(),
            controller.is_lid_open(),
            self.wiring.buzzer_hz(),
            self.wiring.is_led_on()
        );
    }

    pub fn supervisor(&self) -> &SimSupervisor<C> {
        &self.supervisor
    }

    pub fn wiring(&self) -> &Arc<SimWiring> {
        &self.wiring
    }

    pub fn kettle(&self) -> &Kettle {
        &self.kettle
    }

    pub fn stove(&self) -> &SimStove {
        &self.stove
    }

    pub fn blinker(&self) -> &Blinker<StatusLed> {
        &self.blinker
    }

    pub fn summary(&self) -> &SimSummary {
        &self.summary
    }
}
