use std::str::FromStr;

use crate::error::ScoringError;
use crate::series::Context;

pub(crate) const SECTION: &str = "aggregator";

/// Score for indices that no context touched.
pub const DEFAULT_SCORE: f64 = 0.0;

/// How overlapping context scores combine at one index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AggregationPolicy {
    #[default]
    Max,
    Mean,
    /// Weighted mean, weight `1 / (1 + |index - context center|)`.
    DistanceWeighted,
}

impl FromStr for AggregationPolicy {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "max" => Ok(AggregationPolicy::Max),
            "mean" => Ok(AggregationPolicy::Mean),
            "distance_weighted" => Ok(AggregationPolicy::DistanceWeighted),
            other => Err(ScoringError::configuration(
                SECTION,
                format!("unknown method '{other}' (expected max, mean or distance_weighted)"),
            )),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Cell {
    count: usize,
    max: f64,
    sum: f64,
    weighted_sum: f64,
    weight_total: f64,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            count: 0,
            max: f64::NEG_INFINITY,
            sum: 0.0,
            weighted_sum: 0.0,
            weight_total: 0.0,
        }
    }
}

/// Per-index accumulation of context scores.
#[derive(Clone, Debug)]
pub struct Aggregator {
    policy: AggregationPolicy,
    cells: Vec<Cell>,
}

impl Aggregator {
    pub fn new(policy: AggregationPolicy, len: usize) -> Self {
        Aggregator {
            policy,
            cells: vec![Cell::default(); len],
        }
    }

    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Records `score` at every index the context's evaluation sample touched.
    pub fn record(&mut self, ctx: Context, indices: &[usize], score: f64) {
        let center = ctx.center();
        for &i in indices {
            debug_assert!(i < self.cells.len(), "index {i} outside series");
            let Some(cell) = self.cells.get_mut(i) else {
                continue;
            };
            let weight = 1.0 / (1.0 + (i as f64 - center).abs());
            cell.count += 1;
            cell.max = cell.max.max(score);
            cell.sum += score;
            cell.weighted_sum += weight * score;
            cell.weight_total += weight;
        }
    }

    /// One score per index; untouched indices get [`DEFAULT_SCORE`].
    pub fn finalize(&self) -> Vec<f64> {
        self.cells
            .iter()
            .map(|cell| {
                if cell.count == 0 {
                    return DEFAULT_SCORE;
                }
                match self.policy {
                    AggregationPolicy::Max => cell.max,
                    AggregationPolicy::Mean => cell.sum / cell.count as f64,
                    AggregationPolicy::DistanceWeighted => cell.weighted_sum / cell.weight_total,
                }
            })
            .collect()
    }
}
