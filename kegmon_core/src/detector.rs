//! Per-channel change-detection state machine.
//!
//! One `ChannelDetector` per load cell. Each tick takes the stability filter
//! output (level comparisons) and the pour filter output (slope), both
//! possibly missing, and moves the channel through
//!
//! ```text
//! Idle -> Stabilizing -> Stable <-> Pouring -> Restabilizing -> Stable
//!    * -> KegAbsent -> ReplacingKeg -> Stable
//!    * -> InvalidWeight -> Stabilizing
//! ```
//!
//! Every (state, input) pair has a defined outcome; nothing here fails.

use kegmon_traits::Channel;
use tracing::{debug, info, trace, warn};

use crate::config::{ChannelCfg, DetectionCfg};
use crate::convert::WeightVolumeConverter;
use crate::event::{ChangeEvent, EventKind, PourDetails};
use crate::queue::{EVENT_QUEUE_CAPACITY, EventQueue};
use crate::state::ChangeState;
use crate::statistics::ChangeStatistics;
use crate::util::ms_to_secs;

/// Where a tick's side effects go: events to the queue, aggregates to stats.
pub(crate) struct Effects<'a> {
    pub(crate) queue: &'a EventQueue,
    pub(crate) stats: &'a mut ChangeStatistics,
}

impl Effects<'_> {
    fn emit(&mut self, event: ChangeEvent) {
        let ts = event.timestamp_ms;
        match &event.kind {
            EventKind::PourCompleted(p) => self.stats.record_pour(p.pour_volume_l, p.duration_ms, ts),
            EventKind::KegReplaced {
                current_weight_kg, ..
            } => self.stats.record_keg_replacement(*current_weight_kg, ts),
            EventKind::KegRemoved { .. } => self.stats.record_keg_removal(ts),
            _ => {}
        }
        self.queue.push(event);
    }
}

/// Running mean of instantaneous kg/s samples since the last reset.
#[derive(Debug, Clone, Copy, Default)]
struct SlopeAccumulator {
    sum: f32,
    count: u32,
    last: Option<(f32, u64)>,
}

impl SlopeAccumulator {
    /// Add one sample. The first sample after a reset only seeds the
    /// accumulator (and counts as a zero slope). Samples with no elapsed time
    /// are skipped.
    fn sample(&mut self, value: Option<f32>, ts_ms: u64) -> Option<f32> {
        let v = value?;
        let Some((prev, prev_ts)) = self.last else {
            self.last = Some((v, ts_ms));
            self.count = 1;
            return Some(0.0);
        };
        let dt = ts_ms.saturating_sub(prev_ts);
        if dt == 0 {
            return None;
        }
        let slope = (v - prev) / ms_to_secs(dt);
        self.sum += slope;
        self.count += 1;
        self.last = Some((v, ts_ms));
        Some(slope)
    }

    #[allow(clippy::cast_precision_loss)]
    fn average(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f32
        }
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PourEnd {
    SlopeRecovered,
    Timeout,
}

#[derive(Debug, Clone)]
pub struct ChannelDetector {
    channel: Channel,
    state: ChangeState,
    previous_state: ChangeState,
    /// Timestamp the current state was entered; `None` before the first tick.
    entered_ms: Option<u64>,
    stable_weight_kg: f32,
    pre_pour_weight_kg: f32,
    previous_weight_kg: f32,
    slope: SlopeAccumulator,
    /// Reference level for passive pour detection.
    baseline_kg: Option<f32>,
    pour_volume_l: f32,
}

impl ChannelDetector {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            state: ChangeState::Idle,
            previous_state: ChangeState::Idle,
            entered_ms: None,
            stable_weight_kg: 0.0,
            pre_pour_weight_kg: 0.0,
            previous_weight_kg: 0.0,
            slope: SlopeAccumulator::default(),
            baseline_kg: None,
            pour_volume_l: 0.0,
        }
    }

    /// Detector already in `state` since `entered_ms`, anchored at `stable_kg`.
    #[cfg(test)]
    pub(crate) fn in_state(channel: Channel, state: ChangeState, stable_kg: f32, entered_ms: u64) -> Self {
        Self {
            state,
            entered_ms: Some(entered_ms),
            stable_weight_kg: stable_kg,
            pre_pour_weight_kg: stable_kg,
            ..Self::new(channel)
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn state(&self) -> ChangeState {
        self.state
    }

    pub fn previous_state(&self) -> ChangeState {
        self.previous_state
    }

    pub fn stable_weight_kg(&self) -> f32 {
        self.stable_weight_kg
    }

    pub fn pre_pour_weight_kg(&self) -> f32 {
        self.pre_pour_weight_kg
    }

    /// Volume dispensed so far in the current (or last) active pour.
    pub fn pour_volume_l(&self) -> f32 {
        self.pour_volume_l
    }

    pub fn baseline_kg(&self) -> Option<f32> {
        self.baseline_kg
    }

    pub fn average_slope(&self) -> f32 {
        self.slope.average()
    }

    pub fn time_in_state_ms(&self, now_ms: u64) -> u64 {
        self.entered_ms.map_or(0, |e| now_ms.saturating_sub(e))
    }

    /// Progress through the current state's expected dwell, `[0, 100]`.
    #[allow(clippy::cast_precision_loss)]
    pub fn confidence(&self, now_ms: u64, det: &DetectionCfg) -> f32 {
        let expected = match self.state {
            ChangeState::Stable => return 100.0,
            ChangeState::Stabilizing => det.stabilization_ms,
            ChangeState::Pouring => det.pour_ms,
            ChangeState::KegAbsent => det.keg_absence_ms,
            ChangeState::ReplacingKeg => det.keg_replacement_ms,
            _ => return 0.0,
        };
        if expected == 0 {
            return 100.0;
        }
        (self.time_in_state_ms(now_ms) as f32 / expected as f32 * 100.0).min(100.0)
    }

    fn is_valid(w: f32, ch: &ChannelCfg) -> bool {
        (ChannelCfg::MIN_VALID_WEIGHT_KG..=ch.max_valid_weight_kg).contains(&w)
    }

    /// Asymmetric tolerance around the stable anchor.
    fn within_window(&self, w: f32, det: &DetectionCfg) -> bool {
        if w < self.stable_weight_kg {
            self.stable_weight_kg - w <= det.level_decrease_kg
        } else {
            w - self.stable_weight_kg <= det.level_increase_kg
        }
    }

    /// Advance one tick.
    pub(crate) fn update(
        &mut self,
        stability: Option<f32>,
        pour: Option<f32>,
        ts: u64,
        det: &DetectionCfg,
        ch: &ChannelCfg,
        fx: &mut Effects<'_>,
    ) {
        let in_state = self.time_in_state_ms(ts);
        let stability = stability.filter(|w| w.is_finite());
        let valid = stability.filter(|w| Self::is_valid(*w, ch));
        let absent = |w: f32| w < det.weight_absent_kg;

        match self.state {
            ChangeState::Idle => match valid {
                None => self.invalid(stability, ts, ch, fx),
                Some(w) if absent(w) => self.transition(ChangeState::KegAbsent, ts, fx),
                Some(_) => self.transition(ChangeState::Stabilizing, ts, fx),
            },

            ChangeState::Stabilizing => match valid {
                None => self.invalid(stability, ts, ch, fx),
                Some(w) if absent(w) => self.transition(ChangeState::KegAbsent, ts, fx),
                Some(w) => {
                    // A zero anchor means nothing has been measured yet.
                    if self.within_window(w, det) || self.stable_weight_kg.abs() < f32::EPSILON {
                        self.stable_weight_kg = w;
                        if in_state >= det.stabilization_ms {
                            self.settle(in_state, ts, ch, fx);
                            // Keeps an existing baseline, so a drain across an
                            // invalid-weight episode is still reported.
                            self.passive_check(ts, det, ch, fx);
                        }
                    } else {
                        self.restart_timer(w, ts);
                    }
                }
            },

            ChangeState::Stable => match valid {
                None => self.invalid(stability, ts, ch, fx),
                Some(w) if absent(w) => self.keg_removed(w, ts, fx),
                Some(w) if w >= self.stable_weight_kg + det.level_increase_kg => {
                    self.keg_replaced(w, ts, fx);
                }
                Some(w) => {
                    if let Some(s) = self.slope.sample(pour, ts) {
                        trace!(channel = %self.channel, slope = s, avg = self.slope.average(), "stable slope");
                    }
                    let avg = self.slope.average();
                    if avg < det.pour_slope_kg_per_s {
                        self.pre_pour_weight_kg = self.stable_weight_kg;
                        self.pour_volume_l = 0.0;
                        self.slope.reset();
                        self.transition(ChangeState::Pouring, ts, fx);
                        fx.emit(ChangeEvent::new(
                            self.channel,
                            ts,
                            EventKind::PourStarted {
                                pre_pour_weight_kg: self.pre_pour_weight_kg,
                                average_slope_kg_per_s: avg,
                            },
                        ));
                    } else {
                        // Drift: follow it, and report a slow drain once it
                        // adds up.
                        self.stable_weight_kg = w;
                        self.passive_check(ts, det, ch, fx);
                    }
                }
            },

            ChangeState::Pouring => match valid {
                None => self.invalid(stability, ts, ch, fx),
                Some(w) if absent(w) => self.keg_removed(w, ts, fx),
                Some(w) => {
                    if let Some(s) = self.slope.sample(pour, ts) {
                        trace!(channel = %self.channel, slope = s, avg = self.slope.average(), "pour slope");
                    }
                    self.pour_volume_l =
                        WeightVolumeConverter::new(ch).weight_to_volume(self.pre_pour_weight_kg - w);
                    if in_state >= det.pour_ms {
                        let avg = self.slope.average();
                        let end = if avg > det.pour_slope_kg_per_s {
                            PourEnd::SlopeRecovered
                        } else {
                            PourEnd::Timeout
                        };
                        debug!(channel = %self.channel, ?end, avg, "pour ended");
                        self.stable_weight_kg = w;
                        self.transition(ChangeState::Restabilizing, ts, fx);
                        let details = pour_details(self.pre_pour_weight_kg, w, in_state, avg, ch);
                        self.emit_pour(details, ts, ch, fx);
                        // Only the active pour is accounted for; any drain
                        // before it stays below the baseline.
                        if let Some(b) = self.baseline_kg.as_mut() {
                            *b -= details.pour_weight_kg;
                        }
                    }
                }
            },

            ChangeState::Restabilizing => match valid {
                None => self.invalid(stability, ts, ch, fx),
                Some(w) if absent(w) => self.keg_removed(w, ts, fx),
                Some(w) if self.within_window(w, det) => {
                    if in_state >= det.stabilization_ms {
                        self.settle(in_state, ts, ch, fx);
                        self.passive_check(ts, det, ch, fx);
                    }
                }
                Some(w) => self.restart_timer(w, ts),
            },

            // A missing reading is ignored while the keg is off the scale.
            ChangeState::KegAbsent => {
                if let Some(w) = stability
                    && w >= ch.keg_weight_kg
                {
                    self.keg_replaced(w, ts, fx);
                }
            }

            ChangeState::ReplacingKeg => match stability {
                None => {}
                Some(w) if absent(w) => self.keg_removed(w, ts, fx),
                Some(w) if self.within_window(w, det) => {
                    if in_state >= det.keg_replacement_ms {
                        self.settle(in_state, ts, ch, fx);
                        self.baseline_kg = Some(self.stable_weight_kg);
                    }
                }
                Some(w) => self.restart_timer(w, ts),
            },

            ChangeState::InvalidWeight => {
                if valid.is_some() {
                    self.transition(ChangeState::Stabilizing, ts, fx);
                }
            }
        }
    }

    fn transition(&mut self, to: ChangeState, ts: u64, fx: &mut Effects<'_>) {
        if self.state == to {
            return;
        }
        let dwell = self.time_in_state_ms(ts);
        fx.stats.record_transition(self.state, to, dwell, ts);
        debug!(channel = %self.channel, from = %self.state, to = %to, dwell_ms = dwell, "state transition");
        self.previous_state = self.state;
        self.state = to;
        self.entered_ms = Some(ts);
    }

    /// Level moved outside the window: re-anchor and start the hold over.
    fn restart_timer(&mut self, w: f32, ts: u64) {
        self.stable_weight_kg = w;
        self.entered_ms = Some(ts);
    }

    /// Enter `Stable` and announce the level held for `dwell_ms`.
    fn settle(&mut self, dwell_ms: u64, ts: u64, ch: &ChannelCfg, fx: &mut Effects<'_>) {
        self.transition(ChangeState::Stable, ts, fx);
        let stable = self.stable_weight_kg;
        fx.emit(ChangeEvent::new(
            self.channel,
            ts,
            EventKind::StableDetected {
                stable_weight_kg: stable,
                stable_volume_l: WeightVolumeConverter::new(ch).weight_to_volume(stable),
                duration_ms: dwell_ms,
            },
        ));
        self.slope.reset();
    }

    fn invalid(&mut self, reading: Option<f32>, ts: u64, ch: &ChannelCfg, fx: &mut Effects<'_>) {
        self.transition(ChangeState::InvalidWeight, ts, fx);
        warn!(channel = %self.channel, weight = ?reading, "invalid weight");
        fx.emit(ChangeEvent::new(
            self.channel,
            ts,
            EventKind::InvalidWeight {
                weight_kg: reading,
                min_valid_weight_kg: ChannelCfg::MIN_VALID_WEIGHT_KG,
                max_valid_weight_kg: ch.max_valid_weight_kg,
            },
        ));
    }

    fn keg_removed(&mut self, w: f32, ts: u64, fx: &mut Effects<'_>) {
        self.previous_weight_kg = self.stable_weight_kg;
        self.transition(ChangeState::KegAbsent, ts, fx);
        info!(channel = %self.channel, previous_kg = self.previous_weight_kg, "keg removed");
        fx.emit(ChangeEvent::new(
            self.channel,
            ts,
            EventKind::KegRemoved {
                previous_weight_kg: self.previous_weight_kg,
                current_weight_kg: w,
            },
        ));
    }

    fn keg_replaced(&mut self, w: f32, ts: u64, fx: &mut Effects<'_>) {
        self.previous_weight_kg = self.stable_weight_kg;
        self.stable_weight_kg = w;
        self.transition(ChangeState::ReplacingKeg, ts, fx);
        info!(channel = %self.channel, previous_kg = self.previous_weight_kg, current_kg = w, "keg replaced");
        fx.emit(ChangeEvent::new(
            self.channel,
            ts,
            EventKind::KegReplaced {
                previous_weight_kg: self.previous_weight_kg,
                current_weight_kg: w,
            },
        ));
    }

    /// Synthesize a pour when the stable level sits clearly below the
    /// baseline. The baseline starts at the first settled level, moves up
    /// with the level and down by every reported pour.
    fn passive_check(&mut self, ts: u64, det: &DetectionCfg, ch: &ChannelCfg, fx: &mut Effects<'_>) {
        let baseline = match self.baseline_kg {
            Some(b) if b >= self.stable_weight_kg => b,
            _ => {
                self.baseline_kg = Some(self.stable_weight_kg);
                return;
            }
        };
        let drop = baseline - self.stable_weight_kg;
        if drop > det.level_decrease_kg {
            info!(channel = %self.channel, baseline, drop, "passive pour detected");
            // Duration and slope are not observable passively.
            let details = pour_details(baseline, self.stable_weight_kg, 0, 0.0, ch);
            self.emit_pour(details, ts, ch, fx);
            self.baseline_kg = Some(self.stable_weight_kg);
        }
    }

    /// Emit a completed pour, split into equal glass-sized shares when it
    /// exceeds the channel's glass volume.
    fn emit_pour(&self, pour: PourDetails, ts: u64, ch: &ChannelCfg, fx: &mut Effects<'_>) {
        let glass = ch.glass_volume_l;
        let volume = pour.pour_volume_l;
        info!(
            channel = %self.channel,
            volume_l = volume,
            weight_kg = pour.pour_weight_kg,
            duration_ms = pour.duration_ms,
            "pour completed"
        );
        if !(glass > 0.0 && volume.is_finite() && volume > glass) {
            fx.emit(ChangeEvent::new(self.channel, ts, EventKind::PourCompleted(pour)));
            return;
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let wanted = (volume / glass).ceil() as usize;
        let n = wanted.min(EVENT_QUEUE_CAPACITY);
        if n < wanted {
            warn!(channel = %self.channel, wanted, emitted = n, "pour split capped");
        }
        #[allow(clippy::cast_precision_loss)]
        let nf = n as f32;
        let n64 = n as u64;
        let share_kg = pour.pour_weight_kg / nf;
        let start = ts.saturating_sub(pour.duration_ms);
        for i in 0..n {
            #[allow(clippy::cast_precision_loss)]
            let fi = i as f32;
            let part = PourDetails {
                pre_pour_weight_kg: pour.pre_pour_weight_kg - share_kg * fi,
                post_pour_weight_kg: pour.pre_pour_weight_kg - share_kg * (fi + 1.0),
                pour_weight_kg: share_kg,
                pour_volume_l: volume / nf,
                duration_ms: pour.duration_ms / n64,
                average_slope_kg_per_s: pour.average_slope_kg_per_s,
            };
            let offset = u128::from(pour.duration_ms) * (i as u128 + 1) / u128::from(n64);
            let at = start.saturating_add(u64::try_from(offset).unwrap_or(u64::MAX));
            fx.emit(ChangeEvent::new(self.channel, at, EventKind::PourCompleted(part)));
        }
    }
}

fn pour_details(pre_kg: f32, post_kg: f32, duration_ms: u64, slope: f32, ch: &ChannelCfg) -> PourDetails {
    let weight = pre_kg - post_kg;
    PourDetails {
        pre_pour_weight_kg: pre_kg,
        post_pour_weight_kg: post_kg,
        pour_weight_kg: weight,
        pour_volume_l: WeightVolumeConverter::new(ch).weight_to_volume(weight),
        duration_ms,
        average_slope_kg_per_s: slope,
    }
}
