// src/lib.rs - Stove interposer control core
//
// Sits between a stove's power dial and its control board: reads the dial,
// drives a digital potentiometer in its place, and regulates the pot
// temperature from a wireless probe once the dial is turned to "boil".
pub mod clock;
pub mod config;
pub mod control;
pub mod hardware;
pub mod signal;
pub mod simulator;
pub mod stove;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError, load_config};
pub use control::{ThermalController, TrendAnalyzer, TrendEstimate};
pub use stove::{StoveActuator, StoveDial, StoveSupervisor, SupervisorState, ThrottleRequest};
