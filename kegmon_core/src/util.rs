//! Common time/period helpers for kegmon_core.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;
/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Compute the period in microseconds for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Compute the period in milliseconds for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 millisecond.
#[inline]
pub fn period_ms(hz: u32) -> u64 {
    (MILLIS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Milliseconds as fractional seconds, for kg/s slope math.
#[inline]
pub fn ms_to_secs(ms: u64) -> f32 {
    // Precision loss above ~4.6h of delta is irrelevant for slopes.
    #[allow(clippy::cast_precision_loss)]
    let s = ms as f32 / MILLIS_PER_SEC as f32;
    s
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// Every critical section in this crate copies plain values in or out, so a
/// poisoned lock never guards half-written state.
#[inline]
pub(crate) fn lock<T>(m: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
