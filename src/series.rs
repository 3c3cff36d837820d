use std::ops::Range;

use ndarray::{Array1, ArrayView1};

use crate::error::{ScoringError, ScoringResult};

/// Validated, read-only view over a univariate series.
#[derive(Clone, Copy, Debug)]
pub struct TimeSeries<'a> {
    values: &'a [f64],
}

impl<'a> TimeSeries<'a> {
    /// Rejects empty input and NaN/Inf values.
    pub fn new(values: &'a [f64]) -> ScoringResult<Self> {
        if values.is_empty() {
            return Err(ScoringError::invalid_input("series is empty"));
        }
        if let Some((idx, val)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(ScoringError::invalid_input(format!(
                "series must be finite: index {idx} has {val}"
            )));
        }
        Ok(TimeSeries { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    pub fn view(&self) -> ArrayView1<'a, f64> {
        ArrayView1::from(self.values)
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }
}

/// Half-open index window `[start, end)` over a series.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Context {
    pub start: usize,
    pub end: usize,
}

impl Context {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Context { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Midpoint of the covered indices.
    pub fn center(&self) -> f64 {
        if self.is_empty() {
            return self.start as f64;
        }
        (self.start + self.end - 1) as f64 / 2.0
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index < self.end
    }
}

/// Indices and values drawn from one context by a filter.
///
/// Indices are strictly increasing and lie inside the owning context.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub indices: Vec<usize>,
    pub values: Array1<f64>,
}

impl Sample {
    pub fn from_indices(series: &TimeSeries<'_>, indices: Vec<usize>) -> Self {
        let data = series.values();
        let values = indices.iter().map(|&i| data[i]).collect::<Array1<f64>>();
        Sample { indices, values }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
