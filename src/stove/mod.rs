// src/stove/mod.rs - Stove-side control: dial input, actuator output, supervision
pub mod actuator;
pub mod dial;
pub mod supervisor;
pub mod throttle;

pub use actuator::StoveActuator;
pub use dial::StoveDial;
pub use supervisor::{StoveSupervisor, SupervisorState, power_to_throttle};
pub use throttle::ThrottleRequest;
