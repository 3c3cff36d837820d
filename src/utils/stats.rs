use std::f64::{INFINITY, NEG_INFINITY};

/// Running statistics over a stream of values, with max, min, sum, mean, sum of squares and var.
#[derive(Clone, Debug)]
pub struct RunningStats {
    num_items: usize,
    max: f64,
    min: f64,
    sum: f64,
    mean: f64,
    sum_squares: f64,
}

impl Default for RunningStats {
    fn default() -> Self {
        RunningStats {
            num_items: 0,
            max: NEG_INFINITY,
            min: INFINITY,
            sum: 0.0,
            mean: 0.0,
            sum_squares: 0.0,
        }
    }
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a f64>,
    {
        let mut stats = Self::new();
        for &x in values {
            stats.update(x);
        }
        stats
    }

    /// Update with a new data point
    pub fn update(&mut self, item: f64) {
        self.num_items += 1;

        if self.max < item {
            self.max = item;
        }
        if self.min > item {
            self.min = item;
        }
        self.sum += item;

        // Welford: accumulate using both the old and the new mean
        let old_mean = self.mean;
        self.mean = old_mean + (item - old_mean) / self.num_items as f64;
        self.sum_squares += (item - old_mean) * (item - self.mean);
    }

    pub fn count(&self) -> usize {
        self.num_items
    }

    pub fn is_empty(&self) -> bool {
        self.num_items == 0
    }

    pub fn max(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.max)
    }

    pub fn min(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.min)
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn mean(&self) -> Option<f64> {
        (!self.is_empty()).then_some(self.mean)
    }

    /// Population variance.
    pub fn variance(&self) -> Option<f64> {
        (!self.is_empty()).then(|| (self.sum_squares / self.num_items as f64).max(0.0))
    }

    pub fn std(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }
}
