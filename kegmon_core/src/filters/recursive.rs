//! First-order recursive filters and the scalar Kalman estimator.
//!
//! All of them seed from the first sample and return it unchanged.

use std::f32::consts::{FRAC_PI_4, PI};

use super::window::RollingVariance;

/// Exponentially weighted residual variance shared by the blend filters.
#[inline]
fn blend_variance(alpha: f32, raw: f32, y: f32, prev: f32) -> f32 {
    let r = raw - y;
    alpha * r * r + (1.0 - alpha) * prev
}

// ── EMA ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Ema {
    alpha: f32,
    last: Option<f32>,
    variance: f32,
}

impl Ema {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            last: None,
            variance: 0.0,
        }
    }

    pub fn update(&mut self, raw: f32) -> f32 {
        let Some(prev) = self.last else {
            self.last = Some(raw);
            self.variance = 0.0;
            return raw;
        };
        let y = self.alpha * raw + (1.0 - self.alpha) * prev;
        self.variance = blend_variance(self.alpha, raw, y, self.variance);
        self.last = Some(y);
        y
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.variance = 0.0;
    }

    pub fn variance(&self) -> f32 {
        self.variance
    }
}

// ── Complementary ────────────────────────────────────────────────────────────

/// Same blend as the EMA with a heavier default weight, plus a per-sample slope.
#[derive(Debug, Clone)]
pub struct Complementary {
    alpha: f32,
    last: Option<f32>,
    variance: f32,
    slope: f32,
}

impl Complementary {
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha,
            last: None,
            variance: 0.0,
            slope: 0.0,
        }
    }

    pub fn update(&mut self, raw: f32) -> f32 {
        let Some(prev) = self.last else {
            self.last = Some(raw);
            self.variance = 0.0;
            self.slope = 0.0;
            return raw;
        };
        let y = self.alpha * raw + (1.0 - self.alpha) * prev;
        self.slope = y - prev;
        self.variance = blend_variance(self.alpha, raw, y, self.variance);
        self.last = Some(y);
        y
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.variance = 0.0;
        self.slope = 0.0;
    }

    pub fn variance(&self) -> f32 {
        self.variance
    }

    pub fn slope(&self) -> f32 {
        self.slope
    }
}

// ── Alpha-beta ───────────────────────────────────────────────────────────────

/// Position/velocity tracker. Velocity is in kg per sample.
#[derive(Debug, Clone)]
pub struct AlphaBeta {
    alpha: f32,
    beta: f32,
    state: Option<(f32, f32)>,
    variance: f32,
}

impl AlphaBeta {
    pub fn new(alpha: f32, beta: f32) -> Self {
        Self {
            alpha,
            beta,
            state: None,
            variance: 0.0,
        }
    }

    pub fn update(&mut self, raw: f32) -> f32 {
        let Some((x, v)) = self.state else {
            self.state = Some((raw, 0.0));
            self.variance = 0.0;
            return raw;
        };
        let predicted = x + v;
        let residual = raw - predicted;
        let x = predicted + self.alpha * residual;
        let v = v + self.beta * residual;
        self.state = Some((x, v));
        self.variance = self.alpha * residual * residual + (1.0 - self.alpha) * self.variance;
        x
    }

    pub fn reset(&mut self) {
        self.state = None;
        self.variance = 0.0;
    }

    pub fn variance(&self) -> f32 {
        self.variance
    }

    pub fn slope(&self) -> f32 {
        self.state.map_or(0.0, |(_, v)| v)
    }
}

// ── Butterworth ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Butterworth {
    alpha: f32,
    last: Option<f32>,
    variance: f32,
}

impl Butterworth {
    pub fn new(cutoff_hz: f32, sample_rate_hz: f32) -> Self {
        let omega = 2.0 * PI * cutoff_hz / sample_rate_hz;
        let alpha = omega / (omega + 1.0);
        Self {
            alpha: sanitize_alpha(alpha),
            last: None,
            variance: 0.0,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn update(&mut self, raw: f32) -> f32 {
        let Some(prev) = self.last else {
            self.last = Some(raw);
            self.variance = 0.0;
            return raw;
        };
        let y = self.alpha * raw + (1.0 - self.alpha) * prev;
        self.variance = blend_variance(self.alpha, raw, y, self.variance);
        self.last = Some(y);
        y
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.variance = 0.0;
    }

    pub fn variance(&self) -> f32 {
        self.variance
    }
}

// ── Chebyshev ────────────────────────────────────────────────────────────────

/// First-order approximation of a Chebyshev type I low-pass.
#[derive(Debug, Clone)]
pub struct Chebyshev {
    alpha: f32,
    last: Option<f32>,
    rolling: RollingVariance,
    variance: f32,
}

impl Chebyshev {
    pub fn new(cutoff_hz: f32, sample_rate_hz: f32, ripple_db: f32) -> Self {
        let wc = 2.0 * PI * cutoff_hz / sample_rate_hz;
        let eps = (10f32.powf(ripple_db / 10.0) - 1.0).sqrt();
        let inv = 1.0 / eps;
        let asinh = (inv + (inv * inv + 1.0).sqrt()).ln();
        let q = 2.0 * FRAC_PI_4.sin() * asinh.sinh().sinh();
        Self {
            alpha: sanitize_alpha(wc.sin() / (2.0 * q)),
            last: None,
            rolling: RollingVariance::new(),
            variance: 0.0,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn update(&mut self, raw: f32) -> f32 {
        let y = match self.last {
            None => raw,
            Some(prev) => (1.0 - self.alpha) * prev + self.alpha * raw,
        };
        self.last = Some(y);
        self.variance = self.rolling.push(y);
        y
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.rolling.clear();
        self.variance = 0.0;
    }

    pub fn variance(&self) -> f32 {
        self.variance
    }
}

// ── Kalman ───────────────────────────────────────────────────────────────────

/// Scalar Kalman estimator of a constant level.
#[derive(Debug, Clone)]
pub struct Kalman {
    process_noise: f32,
    measurement_noise: f32,
    estimate_error: f32,
    state: Option<f32>,
    rolling: RollingVariance,
    variance: f32,
}

impl Kalman {
    const INITIAL_ERROR: f32 = 1.0;

    pub fn new(process_noise: f32, measurement_noise: f32) -> Self {
        Self {
            process_noise,
            measurement_noise,
            estimate_error: Self::INITIAL_ERROR,
            state: None,
            rolling: RollingVariance::new(),
            variance: 0.0,
        }
    }

    pub fn update(&mut self, raw: f32) -> f32 {
        let x = self.state.unwrap_or(raw);
        let predicted = self.estimate_error + self.process_noise;
        let gain = predicted / (predicted + self.measurement_noise);
        let x = x + gain * (raw - x);
        self.estimate_error = (1.0 - gain) * predicted;
        self.state = Some(x);
        self.variance = self.rolling.push(x);
        x
    }

    pub fn reset(&mut self) {
        self.state = None;
        self.estimate_error = Self::INITIAL_ERROR;
        self.rolling.clear();
        self.variance = 0.0;
    }

    pub fn variance(&self) -> f32 {
        self.variance
    }

    /// Current error covariance `P`.
    pub fn estimate_error(&self) -> f32 {
        self.estimate_error
    }
}

/// Clamp a blend weight into `[0, 1]`; non-finite becomes passthrough.
fn sanitize_alpha(a: f32) -> f32 {
    if a.is_finite() { a.clamp(0.0, 1.0) } else { 1.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_blends_and_tracks_residual_variance() {
        let mut f = Ema::new(0.5);
        assert_eq!(f.update(10.0), 10.0);
        assert_eq!(f.variance(), 0.0);
        assert_eq!(f.update(20.0), 15.0);
        // 0.5 * (20 - 15)^2
        assert!((f.variance() - 12.5).abs() < 1e-6);
    }

    #[test]
    fn complementary_reports_output_delta_as_slope() {
        let mut f = Complementary::new(0.7);
        f.update(1.0);
        let y = f.update(2.0);
        assert!((y - 1.7).abs() < 1e-6);
        assert!((f.slope() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn alpha_beta_learns_velocity_on_a_ramp() {
        let mut f = AlphaBeta::new(0.9, 0.5);
        for i in 0..50u8 {
            f.update(10.0 - 0.1 * f32::from(i));
        }
        assert!((f.slope() + 0.1).abs() < 1e-3, "slope {}", f.slope());
    }

    #[test]
    fn butterworth_alpha_for_defaults() {
        let f = Butterworth::new(2.0, 10.0);
        let omega = 2.0 * PI * 0.2;
        assert!((f.alpha() - omega / (omega + 1.0)).abs() < 1e-6);
    }

    #[test]
    fn chebyshev_alpha_is_a_small_positive_weight() {
        let f = Chebyshev::new(2.0, 10.0, 0.5);
        assert!(f.alpha() > 0.0 && f.alpha() < 0.1, "alpha {}", f.alpha());
    }

    #[test]
    fn kalman_converges_and_shrinks_covariance() {
        let mut k = Kalman::new(0.001, 0.1);
        assert_eq!(k.update(5.0), 5.0);
        let mut y = 0.0;
        for _ in 0..200 {
            y = k.update(6.0);
        }
        assert!((y - 6.0).abs() < 0.05, "y {y}");
        assert!(k.estimate_error() < 0.05);
        k.reset();
        assert_eq!(k.update(1.0), 1.0);
    }
}
