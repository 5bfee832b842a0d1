//! Domain events emitted by the change detector.

use kegmon_traits::Channel;

/// Weights, volume and timing of one (possibly synthetic) pour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PourDetails {
    pub pre_pour_weight_kg: f32,
    pub post_pour_weight_kg: f32,
    pub pour_weight_kg: f32,
    pub pour_volume_l: f32,
    pub duration_ms: u64,
    pub average_slope_kg_per_s: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    /// Start of a monitoring session.
    Startup,
    StableDetected {
        stable_weight_kg: f32,
        stable_volume_l: f32,
        duration_ms: u64,
    },
    PourStarted {
        pre_pour_weight_kg: f32,
        average_slope_kg_per_s: f32,
    },
    PourCompleted(PourDetails),
    KegRemoved {
        previous_weight_kg: f32,
        current_weight_kg: f32,
    },
    KegReplaced {
        previous_weight_kg: f32,
        current_weight_kg: f32,
    },
    /// `weight_kg` is `None` when the reading was missing altogether.
    InvalidWeight {
        weight_kg: Option<f32>,
        min_valid_weight_kg: f32,
        max_valid_weight_kg: f32,
    },
}

impl EventKind {
    pub const fn name(&self) -> &'static str {
        match self {
            EventKind::Startup => "startup",
            EventKind::StableDetected { .. } => "stable_detected",
            EventKind::PourStarted { .. } => "pour_started",
            EventKind::PourCompleted(_) => "pour_completed",
            EventKind::KegRemoved { .. } => "keg_removed",
            EventKind::KegReplaced { .. } => "keg_replaced",
            EventKind::InvalidWeight { .. } => "invalid_weight",
        }
    }
}

/// Immutable event record. Startup events carry channel U1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeEvent {
    pub channel: Channel,
    pub timestamp_ms: u64,
    pub kind: EventKind,
}

impl ChangeEvent {
    pub const fn new(channel: Channel, timestamp_ms: u64, kind: EventKind) -> Self {
        Self {
            channel,
            timestamp_ms,
            kind,
        }
    }

    pub const fn startup(timestamp_ms: u64) -> Self {
        Self::new(Channel::U1, timestamp_ms, EventKind::Startup)
    }

    /// Pour details when this is a pour-completed event.
    pub fn pour(&self) -> Option<&PourDetails> {
        match &self.kind {
            EventKind::PourCompleted(p) => Some(p),
            _ => None,
        }
    }
}
