// src/hardware/mod.rs - Capability traits for the interposer's I/O collaborators
//
// The control core is generic over these; concrete pin, buzzer and radio
// drivers live outside the crate (or in `crate::simulator` on a host).
pub mod digipot;
pub mod sfloat;

pub use digipot::DigiPot;

/// Logic level of a digital output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinState {
    Low,
    High,
}

/// An analog input normalised to 0..1.
pub trait AnalogReadPin {
    fn read(&mut self) -> f32;
}

pub trait DigitalWritePin {
    fn set(&mut self, state: PinState);
}

/// A positioner such as a digital potentiometer wiper.
///
/// `set_position` must be idempotent; quantisation is the driver's concern.
pub trait Potentiometer {
    fn set_position(&mut self, position: f32);
    fn position(&self) -> f32;
}

/// A tone generator.
pub trait Buzzer {
    fn enable(&mut self, frequency_hz: u16);
    fn disable(&mut self);
}

/// A wireless temperature probe link.
///
/// Readings are not returned here; the radio layer pushes decoded samples
/// into a [`crate::control::TrendAnalyzer`] from its own context.
pub trait Thermometer {
    fn start(&mut self);
    fn stop(&mut self);
    fn connected(&self) -> bool;
}

/// Busy-wait delay used by bit-banged drivers.
pub trait DelayUs {
    fn delay_us(&mut self, us: u32);
}
