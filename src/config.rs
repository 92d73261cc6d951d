//! # Interposer Configuration
//!
//! All thresholds and tuning constants for the dial, actuator, thermal
//! controller, supervisor, beeper and host simulator. Every field has a
//! default, so an empty file is a valid configuration.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [throttle]
//! max = 0.7
//! num_boosts = 2
//!
//! [thermal]
//! p_factor = 0.12
//!
//! [stove]
//! max_temp_c = 220.0
//! boost_rounding = "ceil"
//! ```
//!
//! ## Example: Rust Usage
//!
//! ```rust
//! use stove_interposer::config::{BoostRounding, Config};
//! let config: Config = toml::from_str("[stove]\nboost_rounding = \"ceil\"").unwrap();
//! assert_eq!(config.stove.boost_rounding, BoostRounding::Ceil);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct for the interposer and its host simulator.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub thermal: ThermalConfig,
    #[serde(default)]
    pub stove: StoveConfig,
    #[serde(default)]
    pub beeper: BeeperConfig,
    #[serde(default)]
    pub sim: SimConfig,
}

/// Maps a normalized dial reading onto a stove throttle.
///
/// Thresholds must be strictly increasing: `min < max < arm < boost < boil`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ThrottleConfig {
    /// Below this the dial is off and the base level is 0.
    #[serde(default = "default_throttle_min")]
    pub min: f32,
    /// Base level reaches 1.0 here.
    #[serde(default = "default_throttle_max")]
    pub max: f32,
    /// Boost counter is cleared below, armed between `arm` and `boost`.
    #[serde(default = "default_throttle_arm")]
    pub arm: f32,
    /// Crossing this while armed increments the boost counter.
    #[serde(default = "default_throttle_boost")]
    pub boost: f32,
    /// Automatic (temperature regulated) mode is requested above this.
    #[serde(default = "default_throttle_boil")]
    pub boil: f32,
    #[serde(default = "default_num_boosts")]
    pub num_boosts: u32,
    /// Raw readings are divided by this (voltage divider correction).
    #[serde(default = "default_input_scale")]
    pub input_scale: f32,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            min: default_throttle_min(),
            max: default_throttle_max(),
            arm: default_throttle_arm(),
            boost: default_throttle_boost(),
            boil: default_throttle_boil(),
            num_boosts: default_num_boosts(),
            input_scale: default_input_scale(),
        }
    }
}

impl ThrottleConfig {
    /// Validate threshold ordering and counts.
    pub fn validate(&self) -> Result<(), String> {
        let ordered = [self.min, self.max, self.arm, self.boost, self.boil];
        if self.min < 0.0 || self.boil > 1.0 {
            return Err("Throttle thresholds must lie within [0, 1]".to_string());
        }
        if ordered.windows(2).any(|w| w[0] >= w[1]) {
            return Err(format!(
                "Throttle thresholds must be strictly increasing: min={} max={} arm={} boost={} boil={}",
                self.min, self.max, self.arm, self.boost, self.boil
            ));
        }
        if self.num_boosts == 0 {
            return Err("num_boosts must be at least 1".to_string());
        }
        if self.input_scale <= 0.0 {
            return Err("input_scale must be > 0".to_string());
        }
        Ok(())
    }
}

/// Predictive proportional controller tuning.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ThermalConfig {
    /// Power per degree of predicted error (1/°C).
    #[serde(default = "default_p_factor")]
    pub p_factor: f32,
    /// Power per degree above ambient (1/°C).
    #[serde(default = "default_heat_loss_factor")]
    pub heat_loss_factor: f32,
    /// Lookahead used for the prediction (ms).
    #[serde(default = "default_system_lag_ms")]
    pub system_lag_ms: u32,
    /// Slope magnitude that latches/releases the lid-open freeze (°C/ms).
    #[serde(default = "default_lid_open_threshold")]
    pub lid_open_threshold: f32,
    #[serde(default = "default_ambient_temp")]
    pub ambient_temp: f32,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            p_factor: default_p_factor(),
            heat_loss_factor: default_heat_loss_factor(),
            system_lag_ms: default_system_lag_ms(),
            lid_open_threshold: default_lid_open_threshold(),
            ambient_temp: default_ambient_temp(),
        }
    }
}

/// How the excess power above `base_power_ratio` is turned into boost levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoostRounding {
    #[default]
    Round,
    Ceil,
}

/// Supervisor timing and temperature range.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct StoveConfig {
    /// Target temperature with the dial at its lowest position.
    #[serde(default = "default_min_temp_c")]
    pub min_temp_c: f32,
    /// Target temperature with the dial at its highest position.
    #[serde(default = "default_max_temp_c")]
    pub max_temp_c: f32,
    /// Fraction of controller power reachable without boosting.
    #[serde(default = "default_base_power_ratio")]
    pub base_power_ratio: f32,
    #[serde(default = "default_data_timeout_ms")]
    pub data_timeout_ms: u32,
    /// How long the dial must stay off before cooling down.
    #[serde(default = "default_cooldown_after_ms")]
    pub cooldown_after_ms: u32,
    /// Warm-up hold between CONNECTED and ACTIVE.
    #[serde(default = "default_activate_after_ms")]
    pub activate_after_ms: u32,
    /// Control is ignored for this long after entering ACTIVE.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u32,
    #[serde(default = "default_sleep_after_ms")]
    pub sleep_after_ms: u32,
    /// Dial movement needed before the target temperature is recomputed.
    #[serde(default = "default_target_deadband")]
    pub target_deadband: f32,
    #[serde(default)]
    pub boost_rounding: BoostRounding,
}

impl Default for StoveConfig {
    fn default() -> Self {
        Self {
            min_temp_c: default_min_temp_c(),
            max_temp_c: default_max_temp_c(),
            base_power_ratio: default_base_power_ratio(),
            data_timeout_ms: default_data_timeout_ms(),
            cooldown_after_ms: default_cooldown_after_ms(),
            activate_after_ms: default_activate_after_ms(),
            settle_ms: default_settle_ms(),
            sleep_after_ms: default_sleep_after_ms(),
            target_deadband: default_target_deadband(),
            boost_rounding: BoostRounding::default(),
        }
    }
}

/// Tone sequencer timings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct BeeperConfig {
    #[serde(default = "default_low_freq_hz")]
    pub low_freq_hz: u16,
    #[serde(default = "default_high_freq_hz")]
    pub high_freq_hz: u16,
    #[serde(default = "default_tone_ms")]
    pub tone_ms: u32,
    /// Silence between repetitions of the ERROR signal.
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u32,
}

impl Default for BeeperConfig {
    fn default() -> Self {
        Self {
            low_freq_hz: default_low_freq_hz(),
            high_freq_hz: default_high_freq_hz(),
            tone_ms: default_tone_ms(),
            pause_ms: default_pause_ms(),
        }
    }
}

/// A point of the simulated user's dial script.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DialStep {
    pub at_ms: u32,
    pub reading: f32,
}

/// Host simulator settings: probe behaviour, kettle physics and dial script.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SimConfig {
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u32,
    #[serde(default = "default_probe_connect_ms")]
    pub probe_connect_ms: u32,
    /// Uniform noise amplitude added to each probe sample (°C).
    #[serde(default = "default_probe_noise_c")]
    pub probe_noise_c: f32,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_heater_w")]
    pub heater_w: f32,
    /// Heater power added per boost level, as a fraction of `heater_w`.
    #[serde(default = "default_boost_step")]
    pub boost_step: f32,
    #[serde(default = "default_loss_w_per_c")]
    pub loss_w_per_c: f32,
    #[serde(default = "default_capacity_j_per_c")]
    pub capacity_j_per_c: f32,
    #[serde(default = "default_status_every_ms")]
    pub status_every_ms: u32,
    #[serde(default = "default_dial_script")]
    pub dial: Vec<DialStep>,
    /// The appliance's own dial zones, applied to whatever its knob line sees.
    #[serde(default = "default_appliance")]
    pub appliance: ThrottleConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: default_probe_interval_ms(),
            probe_connect_ms: default_probe_connect_ms(),
            probe_noise_c: default_probe_noise_c(),
            seed: default_seed(),
            heater_w: default_heater_w(),
            boost_step: default_boost_step(),
            loss_w_per_c: default_loss_w_per_c(),
            capacity_j_per_c: default_capacity_j_per_c(),
            status_every_ms: default_status_every_ms(),
            dial: default_dial_script(),
            appliance: default_appliance(),
        }
    }
}

impl StoveConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_temp_c >= self.max_temp_c {
            return Err("min_temp_c must be below max_temp_c".to_string());
        }
        if self.base_power_ratio <= 0.0 || self.base_power_ratio >= 1.0 {
            return Err("base_power_ratio must be between 0 and 1 (exclusive)".to_string());
        }
        // Readings stamped up to half the clock range ahead count as fresh.
        if self.data_timeout_ms == 0 || self.data_timeout_ms > i32::MAX as u32 {
            return Err(format!(
                "data_timeout_ms must be in 1..={}, got {}",
                i32::MAX,
                self.data_timeout_ms
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Validate every section; the first failure wins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.throttle.validate().map_err(ConfigError::Invalid)?;
        self.stove.validate().map_err(ConfigError::Invalid)?;
        if self.thermal.lid_open_threshold < 0.0 {
            return Err(ConfigError::Invalid(
                "lid_open_threshold must be >= 0".to_string(),
            ));
        }
        if self.beeper.tone_ms == 0 || self.beeper.pause_ms == 0 {
            return Err(ConfigError::Invalid(
                "beeper tone_ms and pause_ms must be > 0".to_string(),
            ));
        }
        self.sim.appliance.validate().map_err(ConfigError::Invalid)?;
        if self.sim.probe_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "probe_interval_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

// Default value functions
fn default_throttle_min() -> f32 { 0.05 }
fn default_throttle_max() -> f32 { 0.7 }
fn default_throttle_arm() -> f32 { 0.78 }
fn default_throttle_boost() -> f32 { 0.82 }
fn default_throttle_boil() -> f32 { 0.9 }
fn default_num_boosts() -> u32 { 2 }
fn default_input_scale() -> f32 { 1.0 }
fn default_p_factor() -> f32 { 0.1 }
fn default_heat_loss_factor() -> f32 { 0.01 }
fn default_system_lag_ms() -> u32 { 10_000 }
fn default_lid_open_threshold() -> f32 { 0.0005 }
fn default_ambient_temp() -> f32 { 20.0 }
fn default_min_temp_c() -> f32 { 20.0 }
fn default_max_temp_c() -> f32 { 250.0 }
fn default_base_power_ratio() -> f32 { 0.8 }
fn default_data_timeout_ms() -> u32 { 30_000 }
fn default_cooldown_after_ms() -> u32 { 1_000 }
fn default_activate_after_ms() -> u32 { 3_000 }
fn default_settle_ms() -> u32 { 300 }
fn default_sleep_after_ms() -> u32 { 10_000 }
fn default_target_deadband() -> f32 { 0.02 }
fn default_low_freq_hz() -> u16 { 800 }
fn default_high_freq_hz() -> u16 { 1200 }
fn default_tone_ms() -> u32 { 100 }
fn default_pause_ms() -> u32 { 1_000 }
fn default_probe_interval_ms() -> u32 { 1_000 }
fn default_probe_connect_ms() -> u32 { 2_000 }
fn default_probe_noise_c() -> f32 { 0.05 }
fn default_seed() -> u64 { 7 }
fn default_heater_w() -> f32 { 1_800.0 }
fn default_boost_step() -> f32 { 0.2 }
fn default_loss_w_per_c() -> f32 { 4.0 }
fn default_capacity_j_per_c() -> f32 { 8_400.0 }
fn default_status_every_ms() -> u32 { 10_000 }

fn default_dial_script() -> Vec<DialStep> {
    vec![
        DialStep { at_ms: 0, reading: 0.0 },
        DialStep { at_ms: 1_000, reading: 0.95 },
        DialStep { at_ms: 8_000, reading: 0.2 },
    ]
}

// Zones sit between the interposer's deboost, hold and arm positions after
// the pot's 1/99 quantisation.
fn default_appliance() -> ThrottleConfig {
    ThrottleConfig {
        min: 0.05,
        max: 0.68,
        arm: 0.69,
        boost: 0.86,
        boil: 0.95,
        num_boosts: 2,
        input_scale: 1.0,
    }
}

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        tracing::error!("Failed to read config file '{}': {}", path, e);
        ConfigError::Io(e)
    })?;
    let config: Config = toml::from_str(&contents).map_err(|e| {
        tracing::error!("Failed to parse config TOML: {}", e);
        ConfigError::Toml(e)
    })?;
    config.validate()?;
    Ok(config)
}
