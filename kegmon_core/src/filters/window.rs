//! Sliding-window filters: moving averages, median, outlier rejection, FIR.
//!
//! Each filter keeps a `VecDeque` bounded by its window and, where it needs
//! order statistics, a sort scratch buffer allocated once at construction.

use std::collections::VecDeque;

/// Bounded FIFO of recent samples.
#[derive(Debug, Clone)]
pub(crate) struct Window {
    buf: VecDeque<f32>,
    cap: usize,
}

impl Window {
    pub(crate) fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            buf: VecDeque::with_capacity(cap + 1),
            cap,
        }
    }

    pub(crate) fn push(&mut self, x: f32) {
        self.buf.push_back(x);
        while self.buf.len() > self.cap {
            self.buf.pop_front();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.buf.iter().copied()
    }

    pub(crate) fn get(&self, i: usize) -> Option<f32> {
        self.buf.get(i).copied()
    }

    pub(crate) fn clear(&mut self) {
        self.buf.clear();
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn mean(&self) -> f32 {
        if self.buf.is_empty() {
            return 0.0;
        }
        self.iter().sum::<f32>() / self.buf.len() as f32
    }

    /// Population variance about `center`.
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn variance_about(&self, center: f32) -> f32 {
        if self.buf.is_empty() {
            return 0.0;
        }
        let ss: f32 = self.iter().map(|v| (v - center) * (v - center)).sum();
        ss / self.buf.len() as f32
    }

    /// Copy the window into `scratch` and sort it.
    fn sorted_into<'a>(&self, scratch: &'a mut Vec<f32>) -> &'a mut [f32] {
        scratch.clear();
        scratch.extend(self.iter());
        scratch.sort_unstable_by(f32::total_cmp);
        scratch.as_mut_slice()
    }
}

/// Rolling population variance over the last few outputs of a recursive filter.
#[derive(Debug, Clone)]
pub(crate) struct RollingVariance {
    win: Window,
}

impl RollingVariance {
    pub(crate) const LEN: usize = 5;

    pub(crate) fn new() -> Self {
        Self {
            win: Window::new(Self::LEN),
        }
    }

    pub(crate) fn push(&mut self, y: f32) -> f32 {
        self.win.push(y);
        self.win.variance_about(self.win.mean())
    }

    pub(crate) fn clear(&mut self) {
        self.win.clear();
    }
}

/// Median of an already sorted, non-empty slice (mean of the middle pair when even).
pub(crate) fn median_sorted(sorted: &[f32]) -> f32 {
    let n = sorted.len();
    if n == 0 {
        return f32::NAN;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Median and median absolute deviation of the window.
fn median_mad(win: &Window, scratch: &mut Vec<f32>) -> (f32, f32) {
    let sorted = win.sorted_into(scratch);
    let median = median_sorted(sorted);
    for v in sorted.iter_mut() {
        *v = (*v - median).abs();
    }
    sorted.sort_unstable_by(f32::total_cmp);
    (median, median_sorted(sorted))
}

// ── Moving average ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MovingAverage {
    win: Window,
    variance: f32,
}

impl MovingAverage {
    pub fn new(window: usize) -> Self {
        Self {
            win: Window::new(window),
            variance: 0.0,
        }
    }

    pub fn update(&mut self, raw: f32) -> f32 {
        self.win.push(raw);
        let avg = self.win.mean();
        self.variance = self.win.variance_about(avg);
        avg
    }

    pub fn reset(&mut self) {
        self.win.clear();
        self.variance = 0.0;
    }

    pub fn variance(&self) -> f32 {
        self.variance
    }
}

// ── Weighted moving average ──────────────────────────────────────────────────

/// Linearly weighted mean; the newest sample carries weight `N/N`, the oldest `1/N`.
#[derive(Debug, Clone)]
pub struct WeightedMovingAverage {
    win: Window,
    variance: f32,
}

impl WeightedMovingAverage {
    pub fn new(window: usize) -> Self {
        Self {
            win: Window::new(window),
            variance: 0.0,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn update(&mut self, raw: f32) -> f32 {
        self.win.push(raw);
        let n = self.win.len() as f32;
        let mut weighted = 0.0f32;
        let mut weights = 0.0f32;
        for (i, v) in self.win.iter().enumerate() {
            let w = (i as f32 + 1.0) / n;
            weighted += v * w;
            weights += w;
        }
        let avg = weighted / weights;
        self.variance = self.win.variance_about(avg);
        avg
    }

    pub fn reset(&mut self) {
        self.win.clear();
        self.variance = 0.0;
    }

    pub fn variance(&self) -> f32 {
        self.variance
    }
}

// ── Median ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Median {
    win: Window,
    scratch: Vec<f32>,
    variance: f32,
}

impl Median {
    pub fn new(window: usize) -> Self {
        let win = Window::new(window);
        Self {
            scratch: Vec::with_capacity(win.cap),
            win,
            variance: 0.0,
        }
    }

    pub fn update(&mut self, raw: f32) -> f32 {
        self.win.push(raw);
        let med = median_sorted(self.win.sorted_into(&mut self.scratch));
        self.variance = self.win.variance_about(med);
        med
    }

    pub fn reset(&mut self) {
        self.win.clear();
        self.variance = 0.0;
    }

    pub fn variance(&self) -> f32 {
        self.variance
    }
}

// ── Modified Z-score ─────────────────────────────────────────────────────────

/// Flags samples whose modified Z-score exceeds the threshold.
///
/// The flag is diagnostic only: `update` always returns the raw sample.
#[derive(Debug, Clone)]
pub struct ZScore {
    win: Window,
    scratch: Vec<f32>,
    threshold: f32,
    variance: f32,
    outlier: bool,
}

impl ZScore {
    const SCALE: f32 = 0.6745;
    const MAD_EPS: f32 = 1e-6;

    pub fn new(window: usize, threshold: f32) -> Self {
        let win = Window::new(window);
        Self {
            scratch: Vec::with_capacity(win.cap),
            win,
            threshold,
            variance: 0.0,
            outlier: false,
        }
    }

    pub fn update(&mut self, raw: f32) -> f32 {
        self.outlier = false;
        self.win.push(raw);
        if self.win.len() < 2 {
            return raw;
        }
        let (median, mad) = median_mad(&self.win, &mut self.scratch);
        let score = Self::SCALE * (raw - median) / (mad + Self::MAD_EPS);
        if score.abs() > self.threshold {
            self.outlier = true;
        } else {
            self.variance = self.win.variance_about(median);
        }
        raw
    }

    pub fn reset(&mut self) {
        self.win.clear();
        self.variance = 0.0;
        self.outlier = false;
    }

    pub fn variance(&self) -> f32 {
        self.variance
    }

    /// Whether the last sample was flagged.
    pub fn is_outlier(&self) -> bool {
        self.outlier
    }
}

// ── Hampel ───────────────────────────────────────────────────────────────────

/// Replaces the window's center sample with the median when it deviates by
/// more than `threshold * MAD`. Output lags the input by half a window.
#[derive(Debug, Clone)]
pub struct Hampel {
    win: Window,
    scratch: Vec<f32>,
    threshold: f32,
    variance: f32,
    outlier: bool,
}

impl Hampel {
    pub fn new(window: usize, threshold: f32) -> Self {
        let win = Window::new(window);
        Self {
            scratch: Vec::with_capacity(win.cap),
            win,
            threshold,
            variance: 0.0,
            outlier: false,
        }
    }

    pub fn update(&mut self, raw: f32) -> f32 {
        self.outlier = false;
        self.win.push(raw);
        if self.win.len() < 2 {
            return raw;
        }
        let center = self.win.get(self.win.len() / 2).unwrap_or(raw);
        let (median, mad) = median_mad(&self.win, &mut self.scratch);
        if (center - median).abs() > self.threshold * mad {
            self.outlier = true;
            return median;
        }
        self.variance = self.win.variance_about(median);
        center
    }

    pub fn reset(&mut self) {
        self.win.clear();
        self.variance = 0.0;
        self.outlier = false;
    }

    pub fn variance(&self) -> f32 {
        self.variance
    }

    pub fn is_outlier(&self) -> bool {
        self.outlier
    }
}

// ── FIR ──────────────────────────────────────────────────────────────────────

const FIR_ORDER5: [f32; 5] = [0.1, 0.2, 0.4, 0.2, 0.1];
const FIR_ORDER7: [f32; 7] = [0.05, 0.1, 0.2, 0.3, 0.2, 0.1, 0.05];

#[derive(Debug, Clone)]
pub struct Fir {
    coefficients: &'static [f32],
    win: Window,
    variance: f32,
}

impl Fir {
    /// Order 5 or less selects the 5-tap kernel, anything larger the 7-tap one.
    pub fn new(order: usize) -> Self {
        let coefficients: &'static [f32] = if order <= 5 { &FIR_ORDER5 } else { &FIR_ORDER7 };
        Self {
            coefficients,
            win: Window::new(coefficients.len()),
            variance: 0.0,
        }
    }

    pub fn update(&mut self, raw: f32) -> f32 {
        self.win.push(raw);
        let used = &self.coefficients[..self.win.len()];
        let acc: f32 = self.win.iter().zip(used).map(|(x, c)| x * c).sum();
        // Partial kernel while filling; renormalize so a constant input passes through.
        let out = if self.win.len() == 1 {
            raw
        } else if self.win.len() < self.coefficients.len() {
            acc / used.iter().sum::<f32>()
        } else {
            acc
        };
        self.variance = self.win.variance_about(self.win.mean());
        out
    }

    pub fn reset(&mut self) {
        self.win.clear();
        self.variance = 0.0;
    }

    pub fn variance(&self) -> f32 {
        self.variance
    }

    pub fn taps(&self) -> usize {
        self.coefficients.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed<F: FnMut(f32) -> f32>(mut f: F, xs: &[f32]) -> f32 {
        let mut last = f32::NAN;
        for &x in xs {
            last = f(x);
        }
        last
    }

    #[test]
    fn median_of_window_with_outlier() {
        let mut m = Median::new(5);
        let out = feed(|x| m.update(x), &[1.0, 2.0, 3.0, 4.0, 100.0]);
        assert_eq!(out, 3.0);
        assert!(m.variance() > 0.0);
    }

    #[test]
    fn median_even_window_averages_middle_pair() {
        let mut m = Median::new(4);
        assert_eq!(feed(|x| m.update(x), &[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn hampel_replaces_center_outlier_with_median() {
        let mut h = Hampel::new(5, 3.0);
        // Window ends as [3, 4, 100, 5, 6]: center 100, median 5, MAD 1.
        let out = feed(|x| h.update(x), &[1.0, 2.0, 3.0, 4.0, 100.0, 5.0, 6.0]);
        assert!(h.is_outlier());
        assert_eq!(out, 5.0);
    }

    #[test]
    fn hampel_passes_center_when_not_outlier() {
        let mut h = Hampel::new(5, 3.0);
        // Window [1,2,3,4,100]: center 3 equals the median.
        let out = feed(|x| h.update(x), &[1.0, 2.0, 3.0, 4.0, 100.0]);
        assert!(!h.is_outlier());
        assert_eq!(out, 3.0);
    }

    #[test]
    fn zscore_flags_but_returns_raw() {
        let mut z = ZScore::new(5, 3.5);
        let out = feed(|x| z.update(x), &[1.0, 2.0, 3.0, 4.0, 100.0]);
        assert!(z.is_outlier());
        assert_eq!(out, 100.0);
        let out = z.update(3.5);
        assert!(!z.is_outlier());
        assert_eq!(out, 3.5);
    }

    #[test]
    fn weighted_ma_favours_recent_samples() {
        let mut w = WeightedMovingAverage::new(3);
        // weights 1/3, 2/3, 3/3 over [0, 0, 6] -> 6 / 2 = 3
        let out = feed(|x| w.update(x), &[0.0, 0.0, 6.0]);
        assert!((out - 3.0).abs() < 1e-6);
    }

    #[test]
    fn fir_is_normalized_while_filling() {
        let mut f = Fir::new(5);
        assert_eq!(f.taps(), 5);
        for _ in 0..7 {
            let y = f.update(2.0);
            assert!((y - 2.0).abs() < 1e-5, "got {y}");
        }
        assert_eq!(Fir::new(9).taps(), 7);
    }

    #[test]
    fn moving_average_window_slides() {
        let mut m = MovingAverage::new(2);
        assert_eq!(feed(|x| m.update(x), &[10.0, 2.0, 4.0]), 3.0);
        assert!((m.variance() - 1.0).abs() < 1e-6);
    }
}
