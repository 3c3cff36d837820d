use std::str::FromStr;

use crate::error::{ScoringError, ScoringResult};
use crate::series::Context;

pub(crate) const SECTION: &str = "context";

/// Whether the contexts must cover every index of the series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Coverage {
    /// Adds a tail window `[n - w, n)` when the regular steps stop short of `n`.
    #[default]
    Full,
    /// Only regular steps; trailing indices (and gaps when `step > window`) stay uncovered.
    Partial,
}

impl FromStr for Coverage {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Coverage::Full),
            "partial" => Ok(Coverage::Partial),
            other => Err(ScoringError::configuration(
                SECTION,
                format!("unknown coverage '{other}' (expected full or partial)"),
            )),
        }
    }
}

/// Sliding-window context generator.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextGenerator {
    window: usize,
    step: usize,
    coverage: Coverage,
}

impl ContextGenerator {
    pub fn new(window: usize, step: usize, coverage: Coverage) -> ScoringResult<Self> {
        if window == 0 {
            return Err(ScoringError::configuration(SECTION, "window must be > 0"));
        }
        if step == 0 {
            return Err(ScoringError::configuration(SECTION, "step must be > 0"));
        }
        if coverage == Coverage::Full && step > window {
            return Err(ScoringError::configuration(
                SECTION,
                format!("full coverage requires step <= window; got step={step}, window={window}"),
            ));
        }
        Ok(ContextGenerator {
            window,
            step,
            coverage,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn coverage(&self) -> Coverage {
        self.coverage
    }

    /// Shortest series this generator accepts.
    pub fn min_series_len(&self) -> usize {
        self.window
    }

    /// Fresh ordered context sequence over a series of length `n`.
    pub fn contexts(&self, n: usize) -> ScoringResult<Contexts> {
        if self.window > n {
            return Err(ScoringError::invalid_input(format!(
                "series length {n} is shorter than the context window {}",
                self.window
            )));
        }
        Ok(Contexts {
            window: self.window,
            step: self.step,
            coverage: self.coverage,
            n,
            next_start: Some(0),
        })
    }

    pub fn count(&self, n: usize) -> usize {
        self.contexts(n).map(|it| it.count()).unwrap_or(0)
    }
}

/// Iterator over the contexts of one series; clone it to restart.
#[derive(Clone, Debug)]
pub struct Contexts {
    window: usize,
    step: usize,
    coverage: Coverage,
    n: usize,
    next_start: Option<usize>,
}

impl Iterator for Contexts {
    type Item = Context;

    fn next(&mut self) -> Option<Context> {
        let start = self.next_start?;
        let end = start + self.window;

        let following = start + self.step;
        self.next_start = if following + self.window <= self.n {
            Some(following)
        } else if self.coverage == Coverage::Full && end < self.n {
            // n - window > start here, so the tail is emitted exactly once
            Some(self.n - self.window)
        } else {
            None
        };

        Some(Context::new(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(generator: &ContextGenerator, n: usize) -> Vec<(usize, usize)> {
        generator
            .contexts(n)
            .unwrap()
            .map(|c| (c.start, c.end))
            .collect()
    }

    #[test]
    fn rejects_non_positive_sizes() {
        assert!(ContextGenerator::new(0, 1, Coverage::Full).is_err());
        assert!(ContextGenerator::new(4, 0, Coverage::Full).is_err());
    }

    #[test]
    fn full_coverage_rejects_step_larger_than_window() {
        assert!(ContextGenerator::new(4, 5, Coverage::Full).is_err());
        assert!(ContextGenerator::new(4, 5, Coverage::Partial).is_ok());
    }

    #[test]
    fn window_longer_than_series_is_invalid_input() {
        let generator = ContextGenerator::new(4, 2, Coverage::Full).unwrap();
        let err = generator.contexts(2).unwrap_err();
        assert!(matches!(err, ScoringError::InvalidInput(_)));
    }

    #[test]
    fn regular_steps_that_reach_the_end() {
        let generator = ContextGenerator::new(4, 2, Coverage::Full).unwrap();
        assert_eq!(ranges(&generator, 10), vec![(0, 4), (2, 6), (4, 8), (6, 10)]);
    }

    #[test]
    fn full_coverage_adds_tail_window() {
        let generator = ContextGenerator::new(4, 3, Coverage::Full).unwrap();
        assert_eq!(ranges(&generator, 11), vec![(0, 4), (3, 7), (6, 10), (7, 11)]);
    }

    #[test]
    fn partial_coverage_drops_tail() {
        let generator = ContextGenerator::new(4, 3, Coverage::Partial).unwrap();
        assert_eq!(ranges(&generator, 11), vec![(0, 4), (3, 7), (6, 10)]);
    }

    #[test]
    fn window_equal_to_series_yields_single_context() {
        let generator = ContextGenerator::new(5, 1, Coverage::Full).unwrap();
        assert_eq!(ranges(&generator, 5), vec![(0, 5)]);
        assert_eq!(generator.count(5), 1);
    }

    #[test]
    fn contexts_are_restartable_and_deterministic() {
        let generator = ContextGenerator::new(7, 3, Coverage::Full).unwrap();
        let first = generator.contexts(50).unwrap();
        let replay = first.clone();
        assert_eq!(first.collect::<Vec<_>>(), replay.collect::<Vec<_>>());
        assert_eq!(ranges(&generator, 50), ranges(&generator, 50));
    }

    #[test]
    fn full_coverage_union_is_whole_series() {
        for (window, step, n) in [(3, 1, 9), (5, 5, 23), (6, 4, 31), (1, 1, 4)] {
            let generator = ContextGenerator::new(window, step, Coverage::Full).unwrap();
            let mut covered = vec![false; n];
            let mut last_start = 0;
            for ctx in generator.contexts(n).unwrap() {
                assert!(ctx.start >= last_start);
                last_start = ctx.start;
                for i in ctx.range() {
                    covered[i] = true;
                }
            }
            assert!(covered.iter().all(|&c| c), "window={window} step={step} n={n}");
        }
    }
}
