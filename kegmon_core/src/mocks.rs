//! Weight sources for tests, demos and the simulator.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use kegmon_traits::clock::Clock;
use kegmon_traits::{CHANNEL_COUNT, Channel, WeightSource};

use crate::error::KegmonError;

type ReadResult = Result<f32, Box<dyn std::error::Error + Send + Sync>>;

/// Replays a fixed list of readings per channel. `None` entries read as a
/// timeout. Once a channel's script runs out it keeps repeating its last
/// entry; a channel with an empty script is reported as disconnected.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    scripts: [VecDeque<Option<f32>>; CHANNEL_COUNT],
    last: [Option<Option<f32>>; CHANNEL_COUNT],
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, channel: Channel, readings: impl IntoIterator<Item = Option<f32>>) -> Self {
        self.scripts[channel.index()].extend(readings);
        self
    }
}

impl WeightSource for ScriptedSource {
    fn read_kg(&mut self, channel: Channel, _timeout: Duration) -> ReadResult {
        let i = channel.index();
        if let Some(next) = self.scripts[i].pop_front() {
            self.last[i] = Some(next);
        }
        match self.last[i].flatten() {
            Some(kg) => Ok(kg),
            None => Err(Box::new(KegmonError::Timeout(channel.to_string()))),
        }
    }

    fn is_connected(&self, channel: Channel) -> bool {
        let i = channel.index();
        !self.scripts[i].is_empty() || self.last[i].is_some()
    }
}

/// A single constant reading on every channel.
#[derive(Debug, Clone, Copy)]
pub struct ConstantSource(pub f32);

impl WeightSource for ConstantSource {
    fn read_kg(&mut self, _channel: Channel, _timeout: Duration) -> ReadResult {
        Ok(self.0)
    }
}

/// Timing and size of the simulated pours on one tap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapProfile {
    /// Weight of a full keg including the keg itself.
    pub full_kg: f32,
    /// Weight never poured below (the empty keg).
    pub empty_kg: f32,
    /// A pour starts every `interval_ms`.
    pub interval_ms: u64,
    pub pour_ms: u64,
    pub pour_kg: f32,
    /// Peak amplitude of the uniform sensor noise.
    pub noise_kg: f32,
}

impl Default for TapProfile {
    fn default() -> Self {
        Self {
            full_kg: 23.0,
            empty_kg: 4.0,
            interval_ms: 30_000,
            pour_ms: 5_000,
            pour_kg: 0.4,
            noise_kg: 0.005,
        }
    }
}

impl TapProfile {
    /// Noise-free weight `elapsed_ms` into the simulation.
    #[allow(clippy::cast_precision_loss)]
    pub fn weight_at(&self, elapsed_ms: u64) -> f32 {
        let interval = self.interval_ms.max(1);
        let done = elapsed_ms / interval;
        let into = elapsed_ms % interval;
        // Pours happen at the end of each interval so the keg settles first.
        let start = interval.saturating_sub(self.pour_ms);
        let partial = if into >= start && self.pour_ms > 0 {
            self.pour_kg * ((into - start) as f32 / self.pour_ms as f32)
        } else {
            0.0
        };
        (self.full_kg - done as f32 * self.pour_kg - partial).max(self.empty_kg)
    }
}

/// Kegs on taps being poured on a fixed schedule, timed by a clock.
pub struct SimulatedTaps<C: Clock> {
    clock: C,
    epoch: Instant,
    taps: [Option<TapProfile>; CHANNEL_COUNT],
    rng: u32,
}

impl<C: Clock> SimulatedTaps<C> {
    pub fn new(clock: C) -> Self {
        let epoch = clock.now();
        Self {
            clock,
            epoch,
            taps: [None; CHANNEL_COUNT],
            rng: 0x2545_f491,
        }
    }

    pub fn with_tap(mut self, channel: Channel, profile: TapProfile) -> Self {
        self.taps[channel.index()] = Some(profile);
        self
    }

    // xorshift32, uniform in [-1, 1)
    #[allow(clippy::cast_precision_loss)]
    fn noise(&mut self) -> f32 {
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        (x as f32 / (u32::MAX as f32 + 1.0)).mul_add(2.0, -1.0)
    }
}

impl<C: Clock> WeightSource for SimulatedTaps<C> {
    fn read_kg(&mut self, channel: Channel, _timeout: Duration) -> ReadResult {
        let Some(tap) = self.taps[channel.index()] else {
            return Err(Box::new(KegmonError::Source {
                channel: channel.to_string(),
                message: "no tap configured".into(),
            }));
        };
        let elapsed = self.clock.ms_since(self.epoch);
        Ok(tap.weight_at(elapsed) + self.noise() * tap.noise_kg)
    }

    fn is_connected(&self, channel: Channel) -> bool {
        self.taps[channel.index()].is_some()
    }
}
