//! Weight to dispensed-volume conversion.

use crate::config::ChannelCfg;

/// Stateless kg -> liters mapping for one channel's calibration.
///
/// Cheap to build; construct one wherever a conversion is needed.
#[derive(Debug, Clone, Copy)]
pub struct WeightVolumeConverter {
    final_gravity: f32,
    glass_volume_l: f32,
}

impl WeightVolumeConverter {
    pub fn new(cfg: &ChannelCfg) -> Self {
        let fg = if cfg.final_gravity.is_finite() && cfg.final_gravity > 0.0 {
            cfg.final_gravity
        } else {
            1.0
        };
        Self {
            final_gravity: fg,
            glass_volume_l: cfg.glass_volume_l,
        }
    }

    #[inline]
    pub fn weight_to_volume(&self, kg: f32) -> f32 {
        kg / self.final_gravity
    }

    /// Servings in `kg` of beer; 0 when the glass size is not positive.
    pub fn weight_to_glasses(&self, kg: f32) -> f32 {
        if self.glass_volume_l > 0.0 {
            self.weight_to_volume(kg) / self.glass_volume_l
        } else {
            0.0
        }
    }
}
