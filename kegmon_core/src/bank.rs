//! One instance of every filter kind for a channel, fed the same raw sample.

use crate::config::FilterParams;
use crate::filters::{Filter, FilterKind};

/// Outputs of every filter for one sample, plus the raw value.
///
/// A missing entry means "no value": the raw sample was not a finite number,
/// so no filter was fed this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredReading {
    pub raw: Option<f32>,
    values: [Option<f32>; FilterKind::COUNT],
    variances: [f32; FilterKind::COUNT],
}

impl FilteredReading {
    /// A reading with no usable value for any filter.
    pub const fn missing() -> Self {
        Self {
            raw: None,
            values: [None; FilterKind::COUNT],
            variances: [0.0; FilterKind::COUNT],
        }
    }

    /// Every filter reports `kg`. Handy for driving the state machine directly.
    pub fn uniform(kg: f32) -> Self {
        if !kg.is_finite() {
            return Self::missing();
        }
        Self {
            raw: Some(kg),
            values: [Some(kg); FilterKind::COUNT],
            variances: [0.0; FilterKind::COUNT],
        }
    }

    /// Output of `kind`; `None` when unavailable or not finite.
    #[inline]
    pub fn get(&self, kind: FilterKind) -> Option<f32> {
        self.values[kind.index()].filter(|v| v.is_finite())
    }

    #[inline]
    pub fn variance(&self, kind: FilterKind) -> f32 {
        self.variances[kind.index()]
    }

    /// Override one filter's output.
    pub fn with(mut self, kind: FilterKind, value: Option<f32>) -> Self {
        self.values[kind.index()] = value;
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterKind, Option<f32>)> + '_ {
        FilterKind::ALL.iter().map(|k| (*k, self.get(*k)))
    }
}

impl Default for FilteredReading {
    fn default() -> Self {
        Self::missing()
    }
}

#[derive(Debug, Clone)]
pub struct FilterBank {
    filters: [Filter; FilterKind::COUNT],
}

impl FilterBank {
    pub fn new(params: &FilterParams) -> Self {
        Self {
            filters: FilterKind::ALL.map(|k| Filter::new(k, params)),
        }
    }

    /// Feed one raw sample to every filter.
    ///
    /// Non-finite samples leave filter history untouched and yield
    /// [`FilteredReading::missing`].
    pub fn update(&mut self, raw: f32) -> FilteredReading {
        if !raw.is_finite() {
            return FilteredReading::missing();
        }
        let mut out = FilteredReading {
            raw: Some(raw),
            ..FilteredReading::missing()
        };
        for (i, f) in self.filters.iter_mut().enumerate() {
            let y = f.update(raw);
            out.values[i] = y.is_finite().then_some(y);
            out.variances[i] = f.variance();
        }
        out
    }

    pub fn reset(&mut self) {
        for f in &mut self.filters {
            f.reset();
        }
    }

    pub fn filter(&self, kind: FilterKind) -> &Filter {
        &self.filters[kind.index()]
    }
}
