#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Keg level monitoring core (hardware-agnostic).
//!
//! Turns per-channel load-cell samples into keg lifecycle events: stable
//! levels, pours, keg removal and replacement. Raw samples come through the
//! `kegmon_traits::WeightSource` trait.
//!
//! ## Architecture
//!
//! - **Filters**: thirteen smoothing/outlier filters as one closed enum (`filters`)
//! - **Filter bank**: every filter fed the same sample per channel (`bank`)
//! - **State machine**: per-channel lifecycle and pour detection (`detector`)
//! - **Manager**: four channels, statistics and the event queue (`manager`)
//! - **Sampler**: the sampling context as a background thread (`sampler`)
//!
//! Nothing on the per-tick path returns an error or panics. Invalid input is
//! reported as an `InvalidWeight` event and the channel keeps sampling.

pub mod bank;
pub mod builder;
pub mod config;
pub mod conversions;
pub mod convert;
pub mod detector;
pub mod error;
pub mod event;
pub mod filters;
pub mod manager;
pub mod mocks;
pub mod queue;
pub mod sampler;
pub mod state;
pub mod statistics;
pub mod util;

pub use bank::{FilterBank, FilteredReading};
pub use builder::ChangeDetectionBuilder;
pub use config::{ChannelCfg, DetectionCfg, FilterParams};
pub use convert::WeightVolumeConverter;
pub use error::{BuildError, KegmonError, Result};
pub use event::{ChangeEvent, EventKind, PourDetails};
pub use filters::{Filter, FilterKind};
pub use manager::{ChangeDetection, ChannelStatus, MonitorHandle};
pub use queue::{EVENT_QUEUE_CAPACITY, EventQueue};
pub use sampler::{SampledReading, Sampler};
pub use state::ChangeState;
pub use statistics::{ChangeStatistics, SampleStatistics, StateDwell};

pub use kegmon_traits::{CHANNEL_COUNT, Channel};
