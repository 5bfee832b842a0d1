//! Live two-context run: the sampler thread reads simulated taps while this
//! thread drains events through a `MonitorHandle`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use eyre::Result;
use kegmon_config::Config;
use kegmon_core::error::KegmonError;
use kegmon_core::mocks::{SimulatedTaps, TapProfile};
use kegmon_core::{ChangeDetection, Channel, FilterParams, MonitorHandle, Sampler};
use kegmon_traits::Clock;

use crate::report;

/// How often the application side polls for events (real time).
const POLL: Duration = Duration::from_millis(20);

/// Clock running `speed` times faster than wall time.
#[derive(Debug, Clone, Copy)]
pub struct ScaledClock {
    origin: Instant,
    speed: f64,
}

impl ScaledClock {
    pub fn new(speed: f64) -> Result<Self> {
        if !(speed.is_finite() && speed > 0.0) {
            eyre::bail!("--speed must be a positive number, got {speed}");
        }
        Ok(Self {
            origin: Instant::now(),
            speed,
        })
    }
}

impl Clock for ScaledClock {
    fn now(&self) -> Instant {
        self.origin + self.origin.elapsed().mul_f64(self.speed)
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d.div_f64(self.speed));
    }
}

/// Two taps: a fresh keg on U1 and a busier, half-empty one on U2.
fn taps(clock: ScaledClock) -> SimulatedTaps<ScaledClock> {
    SimulatedTaps::new(clock)
        .with_tap(Channel::U1, TapProfile::default())
        .with_tap(
            Channel::U2,
            TapProfile {
                full_kg: 14.0,
                interval_ms: 20_000,
                pour_kg: 0.5,
                ..TapProfile::default()
            },
        )
}

fn drain(handle: &MonitorHandle, json: bool) {
    while let Some(e) = handle.next_event() {
        report::print_event(&e, json);
    }
}

pub fn run(cfg: &Config, seconds: u64, speed: f64, json: bool, stop: &Arc<AtomicBool>) -> Result<()> {
    let clock = ScaledClock::new(speed)?;
    let start = clock.now();
    let manager = ChangeDetection::builder()
        .with_config(cfg)
        .with_clock(Box::new(clock))
        .try_build()?;
    let params = FilterParams::from(&cfg.filters);
    let timeout = Duration::from_millis(cfg.sampling.timeout_ms);
    let stall_ms = cfg.sampling.timeout_ms.max(kegmon_core::util::period_ms(cfg.sampling.rate_hz) * 10);

    tracing::info!(seconds, speed, rate_hz = cfg.sampling.rate_hz, "simulation started");
    let sampler = Sampler::spawn(taps(clock), &params, manager, cfg.sampling.rate_hz, timeout, clock);
    let handle = sampler.handle();

    let end_ms = seconds.saturating_mul(1000);
    let mut stalled = false;
    loop {
        drain(&handle, json);
        let now = clock.ms_since(start);
        if now >= end_ms || stop.load(Ordering::Relaxed) {
            break;
        }
        let idle = sampler.stalled_for(now);
        if idle > stall_ms && !stalled {
            tracing::warn!(idle_ms = idle, "no successful reads from the sampler");
        }
        stalled = idle > stall_ms;
        std::thread::sleep(POLL);
    }

    let Some(manager) = sampler.stop() else {
        return Err(KegmonError::State("sampler thread panicked".into()).into());
    };
    drain(&handle, json);
    tracing::info!(elapsed_ms = clock.ms_since(start), "simulation finished");
    report::print_summary(&manager, json);
    Ok(())
}
