use std::ops::Deref;

use ndarray::{s, Array1};

use crate::error::{ScoringError, ScoringResult};
use crate::series::Sample;
use crate::utils::stats::RunningStats;

pub(crate) const SECTION: &str = "representation";
pub(crate) const DEFAULT_PAA_SEGMENTS: usize = 4;

/// Feature form derived from a sample, in sample index order.
#[derive(Clone, Debug, PartialEq)]
pub struct Features(Array1<f64>);

impl Features {
    pub fn new(values: Array1<f64>) -> Self {
        Features(values)
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.0
    }

    pub fn into_inner(self) -> Array1<f64> {
        self.0
    }
}

impl Deref for Features {
    type Target = Array1<f64>;

    fn deref(&self) -> &Array1<f64> {
        &self.0
    }
}

impl From<Vec<f64>> for Features {
    fn from(values: Vec<f64>) -> Self {
        Features(Array1::from_vec(values))
    }
}

/// Mapping from sample values to features.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Representation {
    /// Raw values.
    #[default]
    Identity,
    /// First differences `x[i+1] - x[i]`.
    Differences,
    /// `[mean, population variance]`.
    Summary,
    /// Piecewise aggregate approximation: the mean of each of `segments` chunks.
    Paa { segments: usize },
}

impl Representation {
    pub const METHODS: [&'static str; 4] = ["identity", "differences", "summary", "paa"];

    pub fn name(&self) -> &'static str {
        match self {
            Representation::Identity => "identity",
            Representation::Differences => "differences",
            Representation::Summary => "summary",
            Representation::Paa { .. } => "paa",
        }
    }

    /// Smallest sample this representation can encode.
    pub fn min_sample_len(&self) -> usize {
        match self {
            Representation::Differences => 2,
            _ => 1,
        }
    }

    pub fn encode(&self, sample: &Sample) -> ScoringResult<Features> {
        let m = sample.len();
        if m < self.min_sample_len() {
            return Err(ScoringError::insufficient_data(format!(
                "{} representation needs at least {} value(s), sample has {m}",
                self.name(),
                self.min_sample_len()
            )));
        }

        let values = &sample.values;
        let encoded = match *self {
            Representation::Identity => values.clone(),
            Representation::Differences => {
                &values.slice(s![1..]) - &values.slice(s![..-1])
            }
            Representation::Summary => {
                let stats = RunningStats::from_values(values.iter());
                Array1::from_vec(vec![
                    stats.mean().unwrap_or(0.0),
                    stats.variance().unwrap_or(0.0),
                ])
            }
            Representation::Paa { segments } => {
                let chunks = segments.clamp(1, m);
                (0..chunks)
                    .map(|j| {
                        let lo = j * m / chunks;
                        let hi = (j + 1) * m / chunks;
                        RunningStats::from_values(values.slice(s![lo..hi]).iter())
                            .mean()
                            .unwrap_or(0.0)
                    })
                    .collect()
            }
        };
        Ok(Features(encoded))
    }
}
