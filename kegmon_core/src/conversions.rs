//! `From` implementations bridging `kegmon_config` types to `kegmon_core` types.

use kegmon_config::FilterChoice;
use kegmon_traits::{CHANNEL_COUNT, Channel};

use crate::config::{ChannelCfg, DetectionCfg, FilterParams};
use crate::filters::FilterKind;

// ── FilterKind ───────────────────────────────────────────────────────────────

impl From<FilterChoice> for FilterKind {
    fn from(c: FilterChoice) -> Self {
        match c {
            FilterChoice::Raw => Self::Raw,
            FilterChoice::MovingAverage => Self::MovingAverage,
            FilterChoice::Ema => Self::Ema,
            FilterChoice::WeightedMa => Self::WeightedMa,
            FilterChoice::Median => Self::Median,
            FilterChoice::ZScore => Self::ZScore,
            FilterChoice::Hampel => Self::Hampel,
            FilterChoice::Complementary => Self::Complementary,
            FilterChoice::AlphaBeta => Self::AlphaBeta,
            FilterChoice::Butterworth => Self::Butterworth,
            FilterChoice::Fir => Self::Fir,
            FilterChoice::Chebyshev => Self::Chebyshev,
            FilterChoice::Kalman => Self::Kalman,
        }
    }
}

// ── DetectionCfg ─────────────────────────────────────────────────────────────

impl From<&kegmon_config::DetectionCfg> for DetectionCfg {
    fn from(c: &kegmon_config::DetectionCfg) -> Self {
        Self {
            stability_filter: c.stability_filter.into(),
            pour_filter: c.pour_filter.into(),
            stabilization_ms: c.stabilization_ms,
            pour_ms: c.pour_ms,
            keg_absence_ms: c.keg_absence_ms,
            keg_replacement_ms: c.keg_replacement_ms,
            weight_absent_kg: c.weight_absent_kg,
            level_increase_kg: c.level_increase_kg,
            level_decrease_kg: c.level_decrease_kg,
            pour_slope_kg_per_s: c.pour_slope_kg_per_s,
        }
    }
}

// ── FilterParams ─────────────────────────────────────────────────────────────

impl From<&kegmon_config::FiltersCfg> for FilterParams {
    fn from(c: &kegmon_config::FiltersCfg) -> Self {
        Self {
            window: c.window,
            ema_alpha: c.ema_alpha,
            zscore_threshold: c.zscore_threshold,
            hampel_threshold: c.hampel_threshold,
            complementary_alpha: c.complementary_alpha,
            alpha_beta_alpha: c.alpha_beta_alpha,
            alpha_beta_beta: c.alpha_beta_beta,
            cutoff_hz: c.cutoff_hz,
            sample_rate_hz: c.sample_rate_hz,
            chebyshev_ripple_db: c.chebyshev_ripple_db,
            fir_order: c.fir_order,
            kalman_process_noise: c.kalman_process_noise,
            kalman_measurement_noise: c.kalman_measurement_noise,
        }
    }
}

// ── ChannelCfg ───────────────────────────────────────────────────────────────

impl From<&kegmon_config::ChannelCfg> for ChannelCfg {
    fn from(c: &kegmon_config::ChannelCfg) -> Self {
        Self {
            keg_weight_kg: c.keg_weight_kg,
            max_valid_weight_kg: c.max_valid_weight_kg,
            glass_volume_l: c.glass_volume_l,
            final_gravity: c.final_gravity,
        }
    }
}

/// Per-channel calibration for all four channels, defaulting unlisted ones.
pub fn channel_cfgs(cfg: &kegmon_config::Config) -> [ChannelCfg; CHANNEL_COUNT] {
    Channel::ALL.map(|ch| ChannelCfg::from(&cfg.channel(ch.index())))
}
