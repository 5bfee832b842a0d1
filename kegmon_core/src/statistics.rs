//! Running per-channel aggregates.
//!
//! `ChangeStatistics` is written as a side effect of state-machine activity;
//! `SampleStatistics` tracks reading health. Both are plain `Copy` values so
//! snapshots can be handed across threads.

use crate::state::ChangeState;

/// Dwell bookkeeping for one lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StateDwell {
    /// Times the state was entered.
    pub entries: u32,
    /// Times the state was left (each contributes to `total_ms`).
    pub exits: u32,
    pub total_ms: u64,
}

impl StateDwell {
    #[allow(clippy::cast_precision_loss)]
    pub fn average_ms(&self) -> f32 {
        if self.exits == 0 {
            0.0
        } else {
            self.total_ms as f32 / self.exits as f32
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChangeStatistics {
    // Pours
    pub total_pours: u32,
    pub total_pour_volume_l: f32,
    pub min_pour_volume_l: Option<f32>,
    pub max_pour_volume_l: Option<f32>,
    pub last_pour_volume_l: Option<f32>,
    pub total_pour_duration_ms: u64,
    pub last_pour_ms: Option<u64>,

    // Kegs
    pub keg_replacements: u32,
    pub keg_removals: u32,
    pub current_keg_start_ms: Option<u64>,
    pub last_keg_weight_kg: f32,
    pub last_keg_removal_ms: Option<u64>,

    // States
    pub state_transitions: u32,
    pub dwell: [StateDwell; ChangeState::COUNT],
    pub stabilization_count: u32,
    pub avg_stabilization_ms: f32,
    pub last_stable_ms: Option<u64>,
}

impl ChangeStatistics {
    pub fn record_pour(&mut self, volume_l: f32, duration_ms: u64, ts_ms: u64) {
        self.total_pours += 1;
        self.total_pour_volume_l += volume_l;
        self.total_pour_duration_ms += duration_ms;
        self.min_pour_volume_l = Some(self.min_pour_volume_l.map_or(volume_l, |m| m.min(volume_l)));
        self.max_pour_volume_l = Some(self.max_pour_volume_l.map_or(volume_l, |m| m.max(volume_l)));
        self.last_pour_volume_l = Some(volume_l);
        self.last_pour_ms = Some(ts_ms);
    }

    pub fn record_keg_replacement(&mut self, weight_kg: f32, ts_ms: u64) {
        self.keg_replacements += 1;
        self.current_keg_start_ms = Some(ts_ms);
        self.last_keg_weight_kg = weight_kg;
    }

    pub fn record_keg_removal(&mut self, ts_ms: u64) {
        self.keg_removals += 1;
        self.last_keg_removal_ms = Some(ts_ms);
    }

    /// Book `dwell_ms` spent in `from` and count the entry into `to`.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_transition(&mut self, from: ChangeState, to: ChangeState, dwell_ms: u64, ts_ms: u64) {
        self.state_transitions += 1;
        let left = &mut self.dwell[from.index()];
        left.exits += 1;
        left.total_ms += dwell_ms;
        self.dwell[to.index()].entries += 1;
        if to == ChangeState::Stable {
            self.stabilization_count += 1;
            let n = self.stabilization_count as f32;
            self.avg_stabilization_ms += (dwell_ms as f32 - self.avg_stabilization_ms) / n;
            self.last_stable_ms = Some(ts_ms);
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn avg_pour_volume_l(&self) -> f32 {
        if self.total_pours == 0 {
            0.0
        } else {
            self.total_pour_volume_l / self.total_pours as f32
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn avg_pour_duration_ms(&self) -> f32 {
        if self.total_pours == 0 {
            0.0
        } else {
            self.total_pour_duration_ms as f32 / self.total_pours as f32
        }
    }

    /// Time since the current keg was installed; 0 when no replacement was seen.
    pub fn keg_age_ms(&self, now_ms: u64) -> u64 {
        self.current_keg_start_ms
            .map_or(0, |start| now_ms.saturating_sub(start))
    }

    pub fn dwell(&self, state: ChangeState) -> &StateDwell {
        &self.dwell[state.index()]
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Reading-health counters for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleStatistics {
    pub total_readings: u32,
    pub valid_readings: u32,
    pub invalid_readings: u32,
    pub first_reading_ms: Option<u64>,
    pub last_reading_ms: Option<u64>,
    pub raw_min: Option<f32>,
    pub raw_max: Option<f32>,
    raw_sum: f64,
    /// Running mean of the stability filter's variance while `Stable`.
    pub stable_variance: f32,
    pub stable_samples: u32,
}

impl SampleStatistics {
    pub fn record_reading(&mut self, raw: Option<f32>, ts_ms: u64) {
        self.total_readings += 1;
        self.first_reading_ms.get_or_insert(ts_ms);
        self.last_reading_ms = Some(ts_ms);
        match raw.filter(|v| v.is_finite()) {
            Some(v) => {
                self.valid_readings += 1;
                self.raw_sum += f64::from(v);
                self.raw_min = Some(self.raw_min.map_or(v, |m| m.min(v)));
                self.raw_max = Some(self.raw_max.map_or(v, |m| m.max(v)));
            }
            None => self.invalid_readings += 1,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn record_stable_variance(&mut self, variance: f32) {
        self.stable_samples += 1;
        let n = self.stable_samples as f32;
        self.stable_variance += (variance - self.stable_variance) / n;
    }

    /// Mean of the valid raw readings.
    #[allow(clippy::cast_possible_truncation)]
    pub fn raw_average(&self) -> f32 {
        if self.valid_readings == 0 {
            0.0
        } else {
            (self.raw_sum / f64::from(self.valid_readings)) as f32
        }
    }

    /// Percentage of readings that were valid.
    #[allow(clippy::cast_precision_loss)]
    pub fn quality_pct(&self) -> f32 {
        if self.total_readings == 0 {
            0.0
        } else {
            self.valid_readings as f32 / self.total_readings as f32 * 100.0
        }
    }

    /// Samples per second between the first and last reading.
    #[allow(clippy::cast_precision_loss)]
    pub fn frequency_hz(&self) -> f32 {
        match (self.first_reading_ms, self.last_reading_ms) {
            (Some(first), Some(last)) if last > first => {
                // n readings span n-1 intervals
                (self.total_readings.saturating_sub(1)) as f32 * 1000.0 / (last - first) as f32
            }
            _ => 0.0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
