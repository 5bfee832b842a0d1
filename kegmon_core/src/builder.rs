//! Builder for `ChangeDetection`.
//!
//! Every piece has a usable default, so there is no type-state here; all
//! checks happen in `try_build()`.

use kegmon_traits::clock::Clock;
use kegmon_traits::{CHANNEL_COUNT, Channel};

use crate::config::{ChannelCfg, DetectionCfg};
use crate::conversions::channel_cfgs;
use crate::error::{BuildError, KegmonError, Result};
use crate::manager::ChangeDetection;

#[derive(Default)]
pub struct ChangeDetectionBuilder {
    detection: Option<DetectionCfg>,
    channels: [Option<ChannelCfg>; CHANNEL_COUNT],
    clock: Option<Box<dyn Clock + Send + Sync>>,
}

impl core::fmt::Debug for ChangeDetectionBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChangeDetectionBuilder")
            .field("detection", &self.detection)
            .field("channels", &self.channels)
            .field("custom_clock", &self.clock.is_some())
            .finish()
    }
}

impl ChangeDetectionBuilder {
    pub fn with_detection(mut self, detection: DetectionCfg) -> Self {
        self.detection = Some(detection);
        self
    }

    pub fn with_channel(mut self, channel: Channel, cfg: ChannelCfg) -> Self {
        self.channels[channel.index()] = Some(cfg);
        self
    }

    pub fn with_channels(mut self, channels: [ChannelCfg; CHANNEL_COUNT]) -> Self {
        self.channels = channels.map(Some);
        self
    }

    /// Take detection and channel settings from a loaded config file.
    pub fn with_config(self, cfg: &kegmon_config::Config) -> Self {
        self.with_detection(DetectionCfg::from(&cfg.detection))
            .with_channels(channel_cfgs(cfg))
    }

    /// Provide a custom clock implementation; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn try_build(self) -> Result<ChangeDetection> {
        let detection = self.detection.unwrap_or_default();
        let channels = self.channels.map(Option::unwrap_or_default);
        validate(&detection, &channels)?;
        Ok(ChangeDetection::from_parts(detection, channels, self.clock))
    }
}

impl ChangeDetection {
    /// Build from a loaded config file with the default clock.
    pub fn from_config(cfg: &kegmon_config::Config) -> Result<Self> {
        Self::builder().with_config(cfg).try_build()
    }

    /// Parse, validate and build from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg = kegmon_config::load_toml(text).map_err(KegmonError::from)?;
        cfg.validate()?;
        Self::from_config(&cfg)
    }
}

fn invalid(reason: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(reason))
}

fn validate(det: &DetectionCfg, channels: &[ChannelCfg; CHANNEL_COUNT]) -> Result<()> {
    // ── Detection ────────────────────────────────────────────────────────────
    if !det.pour_slope_kg_per_s.is_finite() || det.pour_slope_kg_per_s >= 0.0 {
        return Err(invalid("pour_slope_kg_per_s must be finite and < 0"));
    }
    for (v, reason) in [
        (det.weight_absent_kg, "weight_absent_kg must be finite and >= 0"),
        (det.level_increase_kg, "level_increase_kg must be finite and >= 0"),
        (det.level_decrease_kg, "level_decrease_kg must be finite and >= 0"),
    ] {
        if !v.is_finite() || v.is_sign_negative() {
            return Err(invalid(reason));
        }
    }

    // ── Channels ─────────────────────────────────────────────────────────────
    for (ch, cfg) in Channel::ALL.into_iter().zip(channels) {
        let fail = |reason: &'static str| -> Result<()> {
            Err(eyre::Report::new(BuildError::InvalidChannel { channel: ch, reason }))
        };
        if !cfg.max_valid_weight_kg.is_finite() || cfg.max_valid_weight_kg <= ChannelCfg::MIN_VALID_WEIGHT_KG {
            return fail("max_valid_weight_kg must be finite and > 0");
        }
        if !cfg.keg_weight_kg.is_finite() || cfg.keg_weight_kg.is_sign_negative() {
            return fail("keg_weight_kg must be finite and >= 0");
        }
        if cfg.keg_weight_kg > cfg.max_valid_weight_kg {
            return fail("keg_weight_kg must not exceed max_valid_weight_kg");
        }
        if !cfg.glass_volume_l.is_finite() {
            return fail("glass_volume_l must be finite");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_syntax_errors_are_config_errors() {
        let err = ChangeDetection::from_toml("[detection\n").err().expect("parse error");
        assert!(matches!(err.downcast_ref::<KegmonError>(), Some(KegmonError::Config(_))));
    }

    #[test]
    fn toml_text_builds_with_overrides() {
        let m = ChangeDetection::from_toml("[detection]\nstability_filter = \"ema\"\n").expect("builds");
        assert_eq!(m.detection_cfg().stability_filter, crate::FilterKind::Ema);
    }

    #[test]
    fn defaults_build() {
        let m = ChangeDetection::builder().try_build();
        assert!(m.is_ok());
    }

    #[test]
    fn positive_pour_slope_is_rejected() {
        let det = DetectionCfg {
            pour_slope_kg_per_s: 0.1,
            ..DetectionCfg::default()
        };
        let err = ChangeDetection::builder()
            .with_detection(det)
            .try_build()
            .err()
            .map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("invalid config: pour_slope_kg_per_s must be finite and < 0")
        );
    }

    #[test]
    fn bad_channel_is_named() {
        let cfg = ChannelCfg {
            keg_weight_kg: 40.0,
            ..ChannelCfg::default()
        };
        let err = ChangeDetection::builder()
            .with_channel(Channel::U3, cfg)
            .try_build()
            .err();
        let be = err.as_ref().and_then(|e| e.downcast_ref::<BuildError>());
        assert!(matches!(
            be,
            Some(BuildError::InvalidChannel {
                channel: Channel::U3,
                ..
            })
        ));
    }
}
