// src/control/thermal.rs - Predictive proportional temperature controller
use std::sync::Arc;

use super::trend::TrendEstimate;
use crate::config::ThermalConfig;

/// Turns a target temperature into a heater power fraction in `[0, 1]`.
///
/// The error is taken against the trend extrapolated `system_lag_ms` into
/// the future, and a heat-loss term proportional to the excess over ambient
/// is added. A sharply falling trend is treated as an open lid: the output
/// is frozen until the trend recovers.
#[derive(Debug, Clone)]
pub struct ThermalController {
    estimate: Arc<TrendEstimate>,
    config: ThermalConfig,
    target_temp: f32,
    power: f32,
    lid_open: bool,
}

impl ThermalController {
    pub fn new(estimate: Arc<TrendEstimate>, config: ThermalConfig) -> Self {
        Self {
            estimate,
            target_temp: config.ambient_temp,
            config,
            power: 0.0,
            lid_open: false,
        }
    }

    pub fn target_temp(&self) -> f32 {
        self.target_temp
    }

    pub fn set_target_temp(&mut self, temp: f32) {
        tracing::info!("Setting target temperature: {:.1}°C", temp);
        self.target_temp = temp;
    }

    /// Last computed power fraction.
    pub fn power(&self) -> f32 {
        self.power
    }

    pub fn is_lid_open(&self) -> bool {
        self.lid_open
    }

    pub fn estimate(&self) -> &Arc<TrendEstimate> {
        &self.estimate
    }

    pub fn config(&self) -> &ThermalConfig {
        &self.config
    }

    pub fn update(&mut self, now_ms: u32) {
        let trend = self.estimate.result();
        let threshold = self.config.lid_open_threshold;

        if trend.slope < -threshold && !self.lid_open {
            tracing::info!(
                "Lid open detected (slope {:.5}°C/ms), holding power {:.3}",
                trend.slope,
                self.power
            );
            self.lid_open = true;
        }

        if self.lid_open {
            if trend.slope < threshold {
                return;
            }
            tracing::info!("Lid closed (slope {:.5}°C/ms)", trend.slope);
            self.lid_open = false;
        }

        let predicted_temp = trend.value_at(now_ms.wrapping_add(self.config.system_lag_ms));
        let error = self.target_temp - predicted_temp;
        let p_out = error * self.config.p_factor;

        let current_temp = trend.value_at(now_ms);
        let loss = (current_temp - self.config.ambient_temp) * self.config.heat_loss_factor;

        self.power = (p_out + loss).clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::TrendAnalyzer;

    fn controller() -> (TrendAnalyzer, ThermalController) {
        let analyzer = TrendAnalyzer::new();
        let controller = ThermalController::new(analyzer.estimate(), ThermalConfig::default());
        (analyzer, controller)
    }

    #[test]
    fn test_target_defaults_to_ambient() {
        let (_analyzer, controller) = controller();
        assert_eq!(controller.target_temp(), 20.0);
        assert_eq!(controller.power(), 0.0);
        assert!(!controller.is_lid_open());
    }

    #[test]
    fn test_proportional_with_heat_loss() {
        let (mut analyzer, mut controller) = controller();
        analyzer.add_reading(50.0, 0);
        analyzer.add_reading(50.0, 1000);
        controller.set_target_temp(53.0);
        controller.update(1000);
        // p_out = (53 - 50) * 0.1 = 0.3, loss = (50 - 20) * 0.01 = 0.3
        assert!((controller.power() - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_prediction_uses_system_lag() {
        let (mut analyzer, mut controller) = controller();
        // Rising 1°C per 10s: predicted temp 10s ahead is 51°C.
        analyzer.add_reading(49.0, 0);
        analyzer.add_reading(50.0, 10_000);
        controller.set_target_temp(53.0);
        controller.update(10_000);
        // p_out = (53 - 51) * 0.1 = 0.2, loss = 0.3
        assert!((controller.power() - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_output_clamped() {
        let (mut analyzer, mut controller) = controller();
        analyzer.add_reading(20.0, 0);
        controller.set_target_temp(200.0);
        controller.update(0);
        assert_eq!(controller.power(), 1.0);

        controller.set_target_temp(0.0);
        controller.update(0);
        assert_eq!(controller.power(), 0.0);
    }

    #[test]
    fn test_lid_open_holds_power_until_slope_recovers() {
        let (mut analyzer, mut controller) = controller();
        analyzer.add_reading(60.0, 0);
        analyzer.add_reading(60.0, 1000);
        controller.set_target_temp(62.0);
        controller.update(1000);
        let held = controller.power();
        assert!(held > 0.0);

        // Drop of 1°C/s is -0.001°C/ms, beyond the -0.0005 threshold.
        analyzer.clear();
        analyzer.add_reading(60.0, 2000);
        analyzer.add_reading(58.0, 4000);
        controller.set_target_temp(100.0);
        controller.update(4000);
        assert!(controller.is_lid_open());
        assert_eq!(controller.power(), held);

        // Flat is not enough to release the latch.
        analyzer.clear();
        analyzer.add_reading(58.0, 5000);
        analyzer.add_reading(58.0, 6000);
        controller.update(6000);
        assert!(controller.is_lid_open());
        assert_eq!(controller.power(), held);

        // Rising faster than the threshold releases it.
        analyzer.add_reading(60.0, 7000);
        controller.update(7000);
        assert!(!controller.is_lid_open());
        assert_eq!(controller.power(), 1.0);
    }
}
