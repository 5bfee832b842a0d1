//! Multi-channel change detection manager.
//!
//! `ChangeDetection` owns one state machine per channel and is driven from
//! the sampling context. The application context talks to it through a
//! [`MonitorHandle`], which only touches lock-protected snapshots and the
//! event queue.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use kegmon_traits::clock::{Clock, MonotonicClock};
use kegmon_traits::{CHANNEL_COUNT, Channel};

use crate::bank::FilteredReading;
use crate::builder::ChangeDetectionBuilder;
use crate::config::{ChannelCfg, DetectionCfg};
use crate::convert::WeightVolumeConverter;
use crate::detector::{ChannelDetector, Effects};
use crate::event::ChangeEvent;
use crate::queue::EventQueue;
use crate::state::ChangeState;
use crate::statistics::{ChangeStatistics, SampleStatistics};
use crate::util::lock;

/// Last-known view of one channel, refreshed on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelStatus {
    pub state: ChangeState,
    pub stable_weight_kg: f32,
    pub stable_volume_l: f32,
    pub pour_volume_l: f32,
    pub confidence_pct: f32,
    pub updated_ms: Option<u64>,
}

impl Default for ChannelStatus {
    fn default() -> Self {
        Self {
            state: ChangeState::Idle,
            stable_weight_kg: 0.0,
            stable_volume_l: 0.0,
            pour_volume_l: 0.0,
            confidence_pct: 0.0,
            updated_ms: None,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    queue: EventQueue,
    stats: Mutex<[ChangeStatistics; CHANNEL_COUNT]>,
    samples: Mutex<[SampleStatistics; CHANNEL_COUNT]>,
    status: Mutex<[ChannelStatus; CHANNEL_COUNT]>,
}

/// Cloneable handle for the consuming side.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    shared: Arc<Shared>,
}

impl MonitorHandle {
    /// Pop the oldest pending event.
    pub fn next_event(&self) -> Option<ChangeEvent> {
        self.shared.queue.pop()
    }

    pub fn has_queued_events(&self) -> bool {
        !self.shared.queue.is_empty()
    }

    pub fn pending_event_count(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn statistics(&self, channel: Channel) -> ChangeStatistics {
        lock(&self.shared.stats)[channel.index()]
    }

    pub fn sample_statistics(&self, channel: Channel) -> SampleStatistics {
        lock(&self.shared.samples)[channel.index()]
    }

    pub fn status(&self, channel: Channel) -> ChannelStatus {
        lock(&self.shared.status)[channel.index()]
    }

    pub fn statuses(&self) -> [ChannelStatus; CHANNEL_COUNT] {
        *lock(&self.shared.status)
    }
}

/// Change detection for all channels.
pub struct ChangeDetection {
    detection: DetectionCfg,
    channels: [ChannelCfg; CHANNEL_COUNT],
    detectors: [ChannelDetector; CHANNEL_COUNT],
    shared: Arc<Shared>,
    clock: Box<dyn Clock + Send + Sync>,
    epoch: Instant,
    /// Newest timestamp handed to `update`.
    last_update_ms: u64,
}

impl core::fmt::Debug for ChangeDetection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChangeDetection")
            .field("detection", &self.detection)
            .field("states", &self.detectors.each_ref().map(ChannelDetector::state))
            .field("pending_events", &self.shared.queue.len())
            .finish_non_exhaustive()
    }
}

impl ChangeDetection {
    pub fn builder() -> ChangeDetectionBuilder {
        ChangeDetectionBuilder::default()
    }

    /// Unvalidated constructor; the builder validates and then calls this.
    pub(crate) fn from_parts(
        detection: DetectionCfg,
        channels: [ChannelCfg; CHANNEL_COUNT],
        clock: Option<Box<dyn Clock + Send + Sync>>,
    ) -> Self {
        let clock = clock.unwrap_or_else(|| Box::new(MonotonicClock::new()));
        let epoch = clock.now();
        Self {
            detection,
            channels,
            detectors: Channel::ALL.map(ChannelDetector::new),
            shared: Arc::new(Shared::default()),
            clock,
            epoch,
            last_update_ms: 0,
        }
    }

    /// Milliseconds since this manager was built, on its own clock.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// Time the clock-based accessors measure against: the later of the
    /// manager clock and the newest `update` timestamp, so replayed traces
    /// with their own timeline read sensibly too.
    pub fn reference_ms(&self) -> u64 {
        self.now_ms().max(self.last_update_ms)
    }

    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn detection_cfg(&self) -> &DetectionCfg {
        &self.detection
    }

    pub fn channel_cfg(&self, channel: Channel) -> &ChannelCfg {
        &self.channels[channel.index()]
    }

    /// Swap thresholds and calibration. Channel state and statistics are kept.
    pub fn reload_config(&mut self, detection: DetectionCfg, channels: [ChannelCfg; CHANNEL_COUNT]) {
        tracing::info!(
            stability = %detection.stability_filter,
            pour = %detection.pour_filter,
            "detection config reloaded"
        );
        self.detection = detection;
        self.channels = channels;
    }

    /// Advance `channel` by one tick.
    pub fn update(&mut self, channel: Channel, reading: &FilteredReading, ts: u64) {
        let i = channel.index();
        self.last_update_ms = self.last_update_ms.max(ts);
        let stability = reading.get(self.detection.stability_filter);
        let pour = reading.get(self.detection.pour_filter);
        let ch = self.channels[i];

        {
            let mut stats = lock(&self.shared.stats);
            let mut fx = Effects {
                queue: &self.shared.queue,
                stats: &mut stats[i],
            };
            self.detectors[i].update(stability, pour, ts, &self.detection, &ch, &mut fx);
        }

        let d = &self.detectors[i];
        {
            let mut samples = lock(&self.shared.samples);
            let s = &mut samples[i];
            s.record_reading(reading.raw, ts);
            if d.state() == ChangeState::Stable {
                s.record_stable_variance(reading.variance(self.detection.stability_filter));
            }
        }

        let status = ChannelStatus {
            state: d.state(),
            stable_weight_kg: d.stable_weight_kg(),
            stable_volume_l: WeightVolumeConverter::new(&ch).weight_to_volume(d.stable_weight_kg()),
            pour_volume_l: d.pour_volume_l(),
            confidence_pct: d.confidence(ts, &self.detection),
            updated_ms: Some(ts),
        };
        lock(&self.shared.status)[i] = status;
    }

    /// Mark the start of a monitoring session in the event stream.
    pub fn fire_startup_event(&self, ts: u64) {
        tracing::info!(ts, "monitoring session started");
        self.shared.queue.push(ChangeEvent::startup(ts));
    }

    pub fn get_next_event(&self) -> Option<ChangeEvent> {
        self.shared.queue.pop()
    }

    pub fn has_queued_events(&self) -> bool {
        !self.shared.queue.is_empty()
    }

    pub fn pending_event_count(&self) -> usize {
        self.shared.queue.len()
    }

    pub fn detector(&self, channel: Channel) -> &ChannelDetector {
        &self.detectors[channel.index()]
    }

    pub fn state(&self, channel: Channel) -> ChangeState {
        self.detector(channel).state()
    }

    pub fn state_name(&self, channel: Channel) -> &'static str {
        self.state(channel).name()
    }

    pub fn stable_weight(&self, channel: Channel) -> f32 {
        self.detector(channel).stable_weight_kg()
    }

    pub fn stable_volume(&self, channel: Channel) -> f32 {
        self.converter(channel).weight_to_volume(self.stable_weight(channel))
    }

    /// Servings left, counting only the beer above the keg's own weight.
    pub fn glasses_remaining(&self, channel: Channel) -> f32 {
        let beer_kg = (self.stable_weight(channel) - self.channel_cfg(channel).keg_weight_kg).max(0.0);
        self.converter(channel).weight_to_glasses(beer_kg)
    }

    /// Volume dispensed so far in the current or last active pour.
    pub fn pour_volume(&self, channel: Channel) -> f32 {
        self.detector(channel).pour_volume_l()
    }

    pub fn confidence(&self, channel: Channel) -> f32 {
        self.confidence_at(channel, self.reference_ms())
    }

    pub fn confidence_at(&self, channel: Channel, now_ms: u64) -> f32 {
        self.detector(channel).confidence(now_ms, &self.detection)
    }

    pub fn statistics(&self, channel: Channel) -> ChangeStatistics {
        lock(&self.shared.stats)[channel.index()]
    }

    pub fn sample_statistics(&self, channel: Channel) -> SampleStatistics {
        lock(&self.shared.samples)[channel.index()]
    }

    pub fn last_pour_volume(&self, channel: Channel) -> f32 {
        self.statistics(channel).last_pour_volume_l.unwrap_or(0.0)
    }

    pub fn max_pour_volume(&self, channel: Channel) -> f32 {
        self.statistics(channel).max_pour_volume_l.unwrap_or(0.0)
    }

    pub fn keg_age_ms(&self, channel: Channel) -> u64 {
        self.statistics(channel).keg_age_ms(self.reference_ms())
    }

    /// Clear both change and reading statistics for one channel.
    pub fn reset_statistics(&self, channel: Channel) {
        lock(&self.shared.stats)[channel.index()].reset();
        lock(&self.shared.samples)[channel.index()].reset();
    }

    pub fn reset_all_statistics(&self) {
        for ch in Channel::ALL {
            self.reset_statistics(ch);
        }
    }

    fn converter(&self, channel: Channel) -> WeightVolumeConverter {
        WeightVolumeConverter::new(self.channel_cfg(channel))
    }
}
