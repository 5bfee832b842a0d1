//! Runtime configuration for the detection core.
//!
//! These are the structs the manager and filter bank consume. They are
//! separate from the TOML-deserialized config in `kegmon_config`; see
//! `conversions` for the bridge.

use crate::filters::FilterKind;

/// Thresholds, dwell durations and filter selection shared by all channels.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionCfg {
    /// Filter whose output feeds level comparisons.
    pub stability_filter: FilterKind,
    /// Filter whose output feeds slope computation.
    pub pour_filter: FilterKind,
    /// Hold time within the stability window before Stabilizing/Restabilizing -> Stable.
    pub stabilization_ms: u64,
    /// Minimum time in Pouring before a pour can complete.
    pub pour_ms: u64,
    /// Expected dwell in KegAbsent (confidence only).
    pub keg_absence_ms: u64,
    /// Hold time within the stability window before ReplacingKeg -> Stable.
    pub keg_replacement_ms: u64,
    /// Readings below this count as "no keg".
    pub weight_absent_kg: f32,
    /// Largest tolerated rise over the stable anchor.
    pub level_increase_kg: f32,
    /// Largest tolerated drop below the stable anchor.
    pub level_decrease_kg: f32,
    /// Negative kg/s; an average slope below it starts a pour.
    pub pour_slope_kg_per_s: f32,
}

impl Default for DetectionCfg {
    fn default() -> Self {
        Self {
            stability_filter: FilterKind::Median,
            pour_filter: FilterKind::Kalman,
            stabilization_ms: 10_000,
            pour_ms: 10_000,
            keg_absence_ms: 10_000,
            keg_replacement_ms: 30_000,
            weight_absent_kg: 1.0,
            level_increase_kg: 1.0,
            level_decrease_kg: 0.1,
            pour_slope_kg_per_s: -0.05,
        }
    }
}

/// Per-channel keg calibration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelCfg {
    pub keg_weight_kg: f32,
    pub max_valid_weight_kg: f32,
    /// Single serving size; pours above it are split. `<= 0` disables splitting.
    pub glass_volume_l: f32,
    pub final_gravity: f32,
}

impl ChannelCfg {
    /// Lower bound of the valid weight range.
    pub const MIN_VALID_WEIGHT_KG: f32 = 0.0;
}

impl Default for ChannelCfg {
    fn default() -> Self {
        Self {
            keg_weight_kg: 4.0,
            max_valid_weight_kg: 30.0,
            glass_volume_l: 0.4,
            final_gravity: 1.0,
        }
    }
}

/// Tuning shared by every filter instance of a bank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub window: usize,
    pub ema_alpha: f32,
    pub zscore_threshold: f32,
    pub hampel_threshold: f32,
    pub complementary_alpha: f32,
    pub alpha_beta_alpha: f32,
    pub alpha_beta_beta: f32,
    pub cutoff_hz: f32,
    pub sample_rate_hz: f32,
    pub chebyshev_ripple_db: f32,
    pub fir_order: usize,
    pub kalman_process_noise: f32,
    pub kalman_measurement_noise: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            window: 5,
            ema_alpha: 0.3,
            zscore_threshold: 3.5,
            hampel_threshold: 3.0,
            complementary_alpha: 0.7,
            alpha_beta_alpha: 0.9,
            alpha_beta_beta: 0.5,
            cutoff_hz: 2.0,
            sample_rate_hz: 10.0,
            chebyshev_ripple_db: 0.5,
            fir_order: 5,
            kalman_process_noise: 0.001,
            kalman_measurement_noise: 0.1,
        }
    }
}
