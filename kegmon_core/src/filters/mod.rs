//! Single-input smoothing filters for raw load-cell samples.
//!
//! `Filter` is a closed sum over every algorithm the monitor ships; dispatch
//! is a `match`, so there is no boxing and adding a kind is a compile error
//! until every call site handles it.
//!
//! Contract shared by all kinds:
//! - the first `update()` after construction or `reset()` returns its input;
//! - `variance()` is never negative;
//! - history is bounded by the configured window (or a fixed small buffer).

mod recursive;
mod window;

use std::fmt;

pub use recursive::{AlphaBeta, Butterworth, Chebyshev, Complementary, Ema, Kalman};
pub use window::{Fir, Hampel, Median, MovingAverage, WeightedMovingAverage, ZScore};

use crate::config::FilterParams;

/// Every filter algorithm, in bundle order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterKind {
    Raw,
    MovingAverage,
    Ema,
    WeightedMa,
    Median,
    ZScore,
    Hampel,
    Complementary,
    AlphaBeta,
    Butterworth,
    Fir,
    Chebyshev,
    Kalman,
}

impl FilterKind {
    pub const COUNT: usize = 13;

    pub const ALL: [FilterKind; Self::COUNT] = [
        FilterKind::Raw,
        FilterKind::MovingAverage,
        FilterKind::Ema,
        FilterKind::WeightedMa,
        FilterKind::Median,
        FilterKind::ZScore,
        FilterKind::Hampel,
        FilterKind::Complementary,
        FilterKind::AlphaBeta,
        FilterKind::Butterworth,
        FilterKind::Fir,
        FilterKind::Chebyshev,
        FilterKind::Kalman,
    ];

    /// Position in [`FilterKind::ALL`] and in a filtered reading bundle.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            FilterKind::Raw => "Raw",
            FilterKind::MovingAverage => "MovingAverage",
            FilterKind::Ema => "EMA",
            FilterKind::WeightedMa => "WeightedMA",
            FilterKind::Median => "Median",
            FilterKind::ZScore => "ZScore",
            FilterKind::Hampel => "Hampel",
            FilterKind::Complementary => "Complementary",
            FilterKind::AlphaBeta => "AlphaBeta",
            FilterKind::Butterworth => "Butterworth",
            FilterKind::Fir => "FIR",
            FilterKind::Chebyshev => "Chebyshev",
            FilterKind::Kalman => "Kalman",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub enum Filter {
    Raw,
    MovingAverage(MovingAverage),
    Ema(Ema),
    WeightedMa(WeightedMovingAverage),
    Median(Median),
    ZScore(ZScore),
    Hampel(Hampel),
    Complementary(Complementary),
    AlphaBeta(AlphaBeta),
    Butterworth(Butterworth),
    Fir(Fir),
    Chebyshev(Chebyshev),
    Kalman(Kalman),
}

impl Filter {
    pub fn new(kind: FilterKind, p: &FilterParams) -> Self {
        match kind {
            FilterKind::Raw => Self::Raw,
            FilterKind::MovingAverage => Self::MovingAverage(MovingAverage::new(p.window)),
            FilterKind::Ema => Self::Ema(Ema::new(p.ema_alpha)),
            FilterKind::WeightedMa => Self::WeightedMa(WeightedMovingAverage::new(p.window)),
            FilterKind::Median => Self::Median(Median::new(p.window)),
            FilterKind::ZScore => Self::ZScore(ZScore::new(p.window, p.zscore_threshold)),
            FilterKind::Hampel => Self::Hampel(Hampel::new(p.window, p.hampel_threshold)),
            FilterKind::Complementary => {
                Self::Complementary(Complementary::new(p.complementary_alpha))
            }
            FilterKind::AlphaBeta => {
                Self::AlphaBeta(AlphaBeta::new(p.alpha_beta_alpha, p.alpha_beta_beta))
            }
            FilterKind::Butterworth => {
                Self::Butterworth(Butterworth::new(p.cutoff_hz, p.sample_rate_hz))
            }
            FilterKind::Fir => Self::Fir(Fir::new(p.fir_order)),
            FilterKind::Chebyshev => Self::Chebyshev(Chebyshev::new(
                p.cutoff_hz,
                p.sample_rate_hz,
                p.chebyshev_ripple_db,
            )),
            FilterKind::Kalman => Self::Kalman(Kalman::new(
                p.kalman_process_noise,
                p.kalman_measurement_noise,
            )),
        }
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            Self::Raw => FilterKind::Raw,
            Self::MovingAverage(_) => FilterKind::MovingAverage,
            Self::Ema(_) => FilterKind::Ema,
            Self::WeightedMa(_) => FilterKind::WeightedMa,
            Self::Median(_) => FilterKind::Median,
            Self::ZScore(_) => FilterKind::ZScore,
            Self::Hampel(_) => FilterKind::Hampel,
            Self::Complementary(_) => FilterKind::Complementary,
            Self::AlphaBeta(_) => FilterKind::AlphaBeta,
            Self::Butterworth(_) => FilterKind::Butterworth,
            Self::Fir(_) => FilterKind::Fir,
            Self::Chebyshev(_) => FilterKind::Chebyshev,
            Self::Kalman(_) => FilterKind::Kalman,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn update(&mut self, raw: f32) -> f32 {
        match self {
            Self::Raw => raw,
            Self::MovingAverage(f) => f.update(raw),
            Self::Ema(f) => f.update(raw),
            Self::WeightedMa(f) => f.update(raw),
            Self::Median(f) => f.update(raw),
            Self::ZScore(f) => f.update(raw),
            Self::Hampel(f) => f.update(raw),
            Self::Complementary(f) => f.update(raw),
            Self::AlphaBeta(f) => f.update(raw),
            Self::Butterworth(f) => f.update(raw),
            Self::Fir(f) => f.update(raw),
            Self::Chebyshev(f) => f.update(raw),
            Self::Kalman(f) => f.update(raw),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Raw => {}
            Self::MovingAverage(f) => f.reset(),
            Self::Ema(f) => f.reset(),
            Self::WeightedMa(f) => f.reset(),
            Self::Median(f) => f.reset(),
            Self::ZScore(f) => f.reset(),
            Self::Hampel(f) => f.reset(),
            Self::Complementary(f) => f.reset(),
            Self::AlphaBeta(f) => f.reset(),
            Self::Butterworth(f) => f.reset(),
            Self::Fir(f) => f.reset(),
            Self::Chebyshev(f) => f.reset(),
            Self::Kalman(f) => f.reset(),
        }
    }

    pub fn variance(&self) -> f32 {
        match self {
            Self::Raw => 0.0,
            Self::MovingAverage(f) => f.variance(),
            Self::Ema(f) => f.variance(),
            Self::WeightedMa(f) => f.variance(),
            Self::Median(f) => f.variance(),
            Self::ZScore(f) => f.variance(),
            Self::Hampel(f) => f.variance(),
            Self::Complementary(f) => f.variance(),
            Self::AlphaBeta(f) => f.variance(),
            Self::Butterworth(f) => f.variance(),
            Self::Fir(f) => f.variance(),
            Self::Chebyshev(f) => f.variance(),
            Self::Kalman(f) => f.variance(),
        }
    }

    /// Per-sample rate of change, for the kinds that track one.
    pub fn slope(&self) -> f32 {
        match self {
            Self::Complementary(f) => f.slope(),
            Self::AlphaBeta(f) => f.slope(),
            _ => 0.0,
        }
    }

    /// Whether the last sample was flagged by an outlier detector.
    pub fn is_outlier(&self) -> bool {
        match self {
            Self::ZScore(f) => f.is_outlier(),
            Self::Hampel(f) => f.is_outlier(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_index_their_own_slot() {
        for (i, k) in FilterKind::ALL.iter().enumerate() {
            assert_eq!(k.index(), i);
            assert_eq!(Filter::new(*k, &FilterParams::default()).kind(), *k);
        }
    }

    #[test]
    fn first_update_is_identity_for_every_kind() {
        let p = FilterParams::default();
        for k in FilterKind::ALL {
            let mut f = Filter::new(k, &p);
            let y = f.update(7.25);
            assert!((y - 7.25).abs() < 1e-5, "{k}: {y}");
            assert!(f.variance() >= 0.0);
            f.update(3.0);
            f.reset();
            let y = f.update(-1.5);
            assert!((y + 1.5).abs() < 1e-5, "{k} after reset: {y}");
        }
    }

    #[test]
    fn only_trackers_report_slope() {
        let p = FilterParams::default();
        let mut ab = Filter::new(FilterKind::AlphaBeta, &p);
        let mut ma = Filter::new(FilterKind::MovingAverage, &p);
        for x in [5.0, 4.9, 4.8, 4.7] {
            ab.update(x);
            ma.update(x);
        }
        assert!(ab.slope() < 0.0);
        assert_eq!(ma.slope(), 0.0);
    }
}
