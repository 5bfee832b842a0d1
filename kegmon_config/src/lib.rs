#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the keg monitor.
//!
//! - `Config` and sub-structs are deserialized from TOML; every section is
//!   optional and falls back to the documented defaults.
//! - `Config::validate()` rejects values the detection core cannot use,
//!   naming the offending field in the error message.
use serde::Deserialize;

/// Upper bound on `[[channels]]` entries (one per load cell).
pub const MAX_CHANNELS: usize = 4;

/// Filter selection by name, as written in `[detection]`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilterChoice {
    Raw,
    MovingAverage,
    Ema,
    WeightedMa,
    #[default]
    Median,
    ZScore,
    Hampel,
    Complementary,
    AlphaBeta,
    Butterworth,
    Fir,
    Chebyshev,
    Kalman,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DetectionCfg {
    /// Filter whose output feeds level comparisons.
    pub stability_filter: FilterChoice,
    /// Filter whose output feeds slope computation.
    pub pour_filter: FilterChoice,
    pub stabilization_ms: u64,
    pub pour_ms: u64,
    pub keg_absence_ms: u64,
    pub keg_replacement_ms: u64,
    pub weight_absent_kg: f32,
    pub level_increase_kg: f32,
    pub level_decrease_kg: f32,
    /// Negative: average slope below this starts a pour.
    pub pour_slope_kg_per_s: f32,
}

impl Default for DetectionCfg {
    fn default() -> Self {
        Self {
            stability_filter: FilterChoice::Median,
            pour_filter: FilterChoice::Kalman,
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FiltersCfg {
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
    /// 5 selects the short FIR kernel, anything larger the 7-tap one.
    pub fir_order: usize,
    pub kalman_process_noise: f32,
    pub kalman_measurement_noise: f32,
}

impl Default for FiltersCfg {
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

/// Per-channel keg calibration.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChannelCfg {
    /// Empty keg weight; readings at or above count as a keg present.
    pub keg_weight_kg: f32,
    pub max_valid_weight_kg: f32,
    pub glass_volume_l: f32,
    pub final_gravity: f32,
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SamplingCfg {
    pub rate_hz: u32,
    /// Per-read timeout handed to the weight source (ms). Also accepts "sensor_ms".
    #[serde(alias = "sensor_ms")]
    pub timeout_ms: u64,
}

impl Default for SamplingCfg {
    fn default() -> Self {
        Self {
            rate_hz: 10,
            timeout_ms: 150,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub detection: DetectionCfg,
    pub filters: FiltersCfg,
    /// Listed in channel order U1..U4; missing trailing channels use defaults.
    pub channels: Vec<ChannelCfg>,
    pub sampling: SamplingCfg,
    pub logging: Logging,
}

impl Config {
    /// Calibration for the zero-based channel `idx`, defaulted when not listed.
    pub fn channel(&self, idx: usize) -> ChannelCfg {
        self.channels.get(idx).cloned().unwrap_or_default()
    }

    pub fn validate(&self) -> eyre::Result<()> {
        // Detection
        let d = &self.detection;
        if !(d.weight_absent_kg.is_finite() && d.weight_absent_kg >= 0.0) {
            eyre::bail!("detection.weight_absent_kg must be >= 0");
        }
        if !(d.level_increase_kg.is_finite() && d.level_increase_kg >= 0.0) {
            eyre::bail!("detection.level_increase_kg must be >= 0");
        }
        if !(d.level_decrease_kg.is_finite() && d.level_decrease_kg >= 0.0) {
            eyre::bail!("detection.level_decrease_kg must be >= 0");
        }
        if !(d.pour_slope_kg_per_s.is_finite() && d.pour_slope_kg_per_s < 0.0) {
            eyre::bail!("detection.pour_slope_kg_per_s must be < 0");
        }
        for (name, ms) in [
            ("stabilization_ms", d.stabilization_ms),
            ("pour_ms", d.pour_ms),
            ("keg_absence_ms", d.keg_absence_ms),
            ("keg_replacement_ms", d.keg_replacement_ms),
        ] {
            if ms > 24 * 60 * 60 * 1000 {
                eyre::bail!("detection.{name} is unreasonably large (>24h)");
            }
        }

        // Filters
        let f = &self.filters;
        if f.window == 0 || f.window > 64 {
            eyre::bail!("filters.window must be in [1, 64]");
        }
        for (name, a) in [
            ("ema_alpha", f.ema_alpha),
            ("complementary_alpha", f.complementary_alpha),
            ("alpha_beta_alpha", f.alpha_beta_alpha),
            ("alpha_beta_beta", f.alpha_beta_beta),
        ] {
            if !(a > 0.0 && a <= 1.0) {
                eyre::bail!("filters.{name} must be in (0.0, 1.0]");
            }
        }
        for (name, v) in [
            ("zscore_threshold", f.zscore_threshold),
            ("hampel_threshold", f.hampel_threshold),
            ("cutoff_hz", f.cutoff_hz),
            ("sample_rate_hz", f.sample_rate_hz),
            ("chebyshev_ripple_db", f.chebyshev_ripple_db),
            ("kalman_measurement_noise", f.kalman_measurement_noise),
        ] {
            if !(v.is_finite() && v > 0.0) {
                eyre::bail!("filters.{name} must be > 0");
            }
        }
        if !(f.kalman_process_noise.is_finite() && f.kalman_process_noise >= 0.0) {
            eyre::bail!("filters.kalman_process_noise must be >= 0");
        }
        if f.fir_order == 0 {
            eyre::bail!("filters.fir_order must be >= 1");
        }

        // Channels
        if self.channels.len() > MAX_CHANNELS {
            eyre::bail!(
                "at most {MAX_CHANNELS} [[channels]] entries are supported, got {}",
                self.channels.len()
            );
        }
        for (i, c) in self.channels.iter().enumerate() {
            let n = i + 1;
            if !(c.keg_weight_kg.is_finite() && c.keg_weight_kg >= 0.0) {
                eyre::bail!("channels[U{n}].keg_weight_kg must be >= 0");
            }
            if !(c.max_valid_weight_kg.is_finite() && c.max_valid_weight_kg > 0.0) {
                eyre::bail!("channels[U{n}].max_valid_weight_kg must be > 0");
            }
            if c.keg_weight_kg > c.max_valid_weight_kg {
                eyre::bail!("channels[U{n}].keg_weight_kg must not exceed max_valid_weight_kg");
            }
            if !c.glass_volume_l.is_finite() {
                eyre::bail!("channels[U{n}].glass_volume_l must be finite");
            }
            if !(c.final_gravity.is_finite() && c.final_gravity > 0.0) {
                eyre::bail!("channels[U{n}].final_gravity must be > 0");
            }
        }

        // Sampling
        if self.sampling.rate_hz == 0 {
            eyre::bail!("sampling.rate_hz must be > 0");
        }
        if self.sampling.timeout_ms == 0 {
            eyre::bail!("sampling.timeout_ms must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse a config file. Validation is left to the caller.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {}: {}", path.display(), e))?;
    load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = load_toml("").unwrap();
        assert_eq!(cfg.detection.stability_filter, FilterChoice::Median);
        assert_eq!(cfg.detection.pour_filter, FilterChoice::Kalman);
        assert_eq!(cfg.filters.window, 5);
        assert!(cfg.channels.is_empty());
        assert!((cfg.channel(3).glass_volume_l - 0.4).abs() < f32::EPSILON);
        cfg.validate().unwrap();
    }

    #[test]
    fn filter_names_are_snake_case() {
        let cfg = load_toml(
            r#"
[detection]
stability_filter = "moving_average"
pour_filter = "alpha_beta"
"#,
        )
        .unwrap();
        assert_eq!(cfg.detection.stability_filter, FilterChoice::MovingAverage);
        assert_eq!(cfg.detection.pour_filter, FilterChoice::AlphaBeta);
    }
}
