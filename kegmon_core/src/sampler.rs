//! Background sampling context.
//!
//! Spawns a thread that owns the `WeightSource`, one `FilterBank` per
//! channel and the `ChangeDetection` manager. Each tick it reads every
//! connected channel, filters the sample and advances that channel's state
//! machine. The application context drains events through the
//! [`MonitorHandle`] and may peek at the latest filtered readings.
//!
//! Each `Sampler` spawns exactly one thread, shut down and joined on drop.

use crossbeam_channel as xch;
use kegmon_traits::clock::Clock;
use kegmon_traits::{CHANNEL_COUNT, Channel, WeightSource};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crate::bank::{FilterBank, FilteredReading};
use crate::config::FilterParams;
use crate::error::KegmonError;
use crate::manager::{ChangeDetection, MonitorHandle};

/// One channel's filtered sample, as produced by the sampling thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledReading {
    pub channel: Channel,
    pub timestamp_ms: u64,
    pub reading: FilteredReading,
}

pub struct Sampler {
    rx: xch::Receiver<SampledReading>,
    handle: MonitorHandle,
    last_ok: Arc<AtomicU64>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<ChangeDetection>>,
}

impl Sampler {
    /// Start sampling at `hz`. The manager's clock provides timestamps,
    /// `clock` paces the loop; pass clones of the same clock to keep them
    /// on one timeline.
    pub fn spawn<S: WeightSource + Send + 'static, C: Clock + Send + Sync + 'static>(
        mut source: S,
        params: &FilterParams,
        mut manager: ChangeDetection,
        hz: u32,
        timeout: Duration,
        clock: C,
    ) -> Self {
        // Room for one tick of every channel; older entries are displaced.
        let (tx, rx) = xch::bounded(CHANNEL_COUNT);
        let overflow = rx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let last_ok = Arc::new(AtomicU64::new(0));
        let last_ok_clone = last_ok.clone();
        let period = Duration::from_micros(crate::util::period_us(hz));
        let mut banks: [FilterBank; CHANNEL_COUNT] = std::array::from_fn(|_| FilterBank::new(params));
        let handle = manager.handle();

        let join_handle = std::thread::spawn(move || {
            manager.fire_startup_event(manager.now_ms());
            loop {
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("sampler thread received shutdown signal");
                    break;
                }

                for ch in Channel::ALL {
                    if !source.is_connected(ch) {
                        continue;
                    }
                    let raw = match source.read_kg(ch, timeout) {
                        Ok(v) => {
                            last_ok_clone.store(manager.now_ms(), Ordering::Relaxed);
                            v
                        }
                        Err(e) => {
                            let err = e.downcast_ref::<KegmonError>().cloned().unwrap_or_else(|| {
                                KegmonError::Source {
                                    channel: ch.to_string(),
                                    message: e.to_string(),
                                }
                            });
                            tracing::warn!(channel = %ch, error = %err, "weight read failed");
                            f32::NAN
                        }
                    };
                    let reading = banks[ch.index()].update(raw);
                    let ts = manager.now_ms();
                    manager.update(ch, &reading, ts);

                    let sample = SampledReading {
                        channel: ch,
                        timestamp_ms: ts,
                        reading,
                    };
                    if let Err(xch::TrySendError::Full(sample)) = tx.try_send(sample) {
                        let _ = overflow.try_recv();
                        let _ = tx.try_send(sample);
                    }
                }

                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(period);
            }
            tracing::trace!("sampler thread exiting cleanly");
            manager
        });

        Self {
            rx,
            handle,
            last_ok,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Handle for draining events and reading snapshots.
    pub fn handle(&self) -> MonitorHandle {
        self.handle.clone()
    }

    /// Most recent filtered reading, discarding older ones.
    pub fn latest(&self) -> Option<SampledReading> {
        self.rx.try_iter().last()
    }

    /// Milliseconds since the last successful read, on the manager's clock.
    pub fn stalled_for(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }

    /// Stop the thread and take back the manager.
    pub fn stop(mut self) -> Option<ChangeDetection> {
        self.join()
    }

    fn join(&mut self) -> Option<ChangeDetection> {
        self.shutdown.store(true, Ordering::Relaxed);
        let handle = self.join_handle.take()?;
        match handle.join() {
            Ok(manager) => {
                tracing::trace!("sampler thread joined");
                Some(manager)
            }
            Err(e) => {
                tracing::warn!(?e, "sampler thread panicked");
                None
            }
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        // Exits after at most one in-flight read (bounded by `timeout`) or sleep.
        let _ = self.join();
    }
}
