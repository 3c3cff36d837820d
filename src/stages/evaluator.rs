use std::str::FromStr;

use crate::error::{ScoringError, ScoringResult};
use crate::stages::discretizer::{DiscretizationModel, Symbols};

pub(crate) const SECTION: &str = "evaluator";
pub(crate) const DEFAULT_SMOOTHING: f64 = 0.01;

// Avoid zeros for log calculation
const PROBABILITY_FLOOR: f64 = 1e-12;

/// Histogram divergence used as the anomaly score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Divergence {
    /// `KL(evaluation || reference)`, unbounded above.
    #[default]
    KullbackLeibler,
    /// Jensen-Shannon, in `[0, ln 2]`.
    JensenShannon,
    /// Hellinger distance, in `[0, 1]`.
    Hellinger,
    /// Total variation distance, in `[0, 1]`.
    TotalVariation,
}

impl FromStr for Divergence {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kl" => Ok(Divergence::KullbackLeibler),
            "js" => Ok(Divergence::JensenShannon),
            "hellinger" => Ok(Divergence::Hellinger),
            "total_variation" => Ok(Divergence::TotalVariation),
            other => Err(ScoringError::configuration(
                SECTION,
                format!("unknown method '{other}' (expected kl, js, hellinger or total_variation)"),
            )),
        }
    }
}

/// Scores an evaluation histogram against the reference histogram of a fitted model.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluator {
    divergence: Divergence,
    smoothing: f64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator {
            divergence: Divergence::default(),
            smoothing: DEFAULT_SMOOTHING,
        }
    }
}

impl Evaluator {
    pub fn new(divergence: Divergence, smoothing: f64) -> ScoringResult<Self> {
        if !smoothing.is_finite() || smoothing < 0.0 {
            return Err(ScoringError::configuration(
                SECTION,
                format!("smoothing must be finite and >= 0; got {smoothing}"),
            ));
        }
        Ok(Evaluator {
            divergence,
            smoothing,
        })
    }

    pub fn divergence(&self) -> Divergence {
        self.divergence
    }

    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    /// Non-negative, finite dissimilarity; 0 when both histograms have equal proportions.
    pub fn score(&self, model: &DiscretizationModel, evaluation: &Symbols) -> f64 {
        let p = self.distribution(model.reference_counts());
        let q = self.distribution(&evaluation.counts());

        let score = match self.divergence {
            Divergence::KullbackLeibler => kl(&q, &p),
            Divergence::JensenShannon => {
                let m: Vec<f64> = p.iter().zip(&q).map(|(a, b)| 0.5 * (a + b)).collect();
                0.5 * kl(&q, &m) + 0.5 * kl(&p, &m)
            }
            Divergence::Hellinger => {
                let sum: f64 = p
                    .iter()
                    .zip(&q)
                    .map(|(a, b)| (a.sqrt() - b.sqrt()).powi(2))
                    .sum();
                (0.5 * sum).sqrt()
            }
            Divergence::TotalVariation => {
                0.5 * p.iter().zip(&q).map(|(a, b)| (a - b).abs()).sum::<f64>()
            }
        };
        score.max(0.0)
    }

    /// Additively smoothed relative frequencies.
    fn distribution(&self, counts: &[usize]) -> Vec<f64> {
        let total: usize = counts.iter().sum();
        let bins = counts.len() as f64;
        let norm = 1.0 + bins * self.smoothing;
        counts
            .iter()
            .map(|&c| {
                let freq = if total > 0 { c as f64 / total as f64 } else { 0.0 };
                (freq + self.smoothing) / norm
            })
            .collect()
    }
}

fn kl(q: &[f64], p: &[f64]) -> f64 {
    q.iter()
        .zip(p)
        .filter(|(qi, _)| **qi > 0.0)
        .map(|(qi, pi)| qi * (qi / pi.max(PROBABILITY_FLOOR)).ln())
        .sum()
}
