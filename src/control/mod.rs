// src/control/mod.rs - Closed-loop temperature estimation and control
pub mod thermal;
pub mod trend;

pub use thermal::ThermalController;
pub use trend::{AnalysisResult, TrendAnalyzer, TrendEstimate};
