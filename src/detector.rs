use rayon::prelude::*;
use tracing::{debug, info, trace, warn};

use crate::config::{InsufficientDataPolicy, PipelineConfig, RawConfig};
use crate::error::{ContextStage, ScoringError, ScoringResult};
use crate::series::{Context, TimeSeries};
use crate::stages::aggregator::{Aggregator, DEFAULT_SCORE};

/// Lifecycle of one `evaluate` call, traced on every transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DetectorState {
    Init,
    GeneratingContexts,
    ProcessingContext,
    Aggregating,
    Done,
    Failed,
}

/// Scores plus bookkeeping from one run.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoringReport {
    pub scores: Vec<f64>,
    pub contexts_processed: usize,
    pub contexts_skipped: usize,
}

#[derive(Debug)]
struct ContextScore {
    indices: Vec<usize>,
    score: f64,
}

fn transition(state: &mut DetectorState, next: DetectorState) {
    trace!(from = ?*state, to = ?next, "detector state");
    *state = next;
}

fn at(ctx: Context, stage: ContextStage) -> impl Fn(ScoringError) -> ScoringError {
    move |err| err.in_context(ctx, stage)
}

/// Aggregation target and progress sink shared by the sequential and parallel paths.
struct Accumulation<'p> {
    aggregator: Aggregator,
    total: usize,
    processed: usize,
    skipped: usize,
    progress: Option<&'p mut dyn FnMut(f64)>,
}

impl Accumulation<'_> {
    fn report_progress(&mut self) {
        self.processed += 1;
        let fraction = self.processed as f64 / self.total as f64;
        if let Some(report) = self.progress.as_deref_mut() {
            report(fraction);
        }
    }
}

/// Runs the scoring pipeline over a whole series.
#[derive(Clone, Debug)]
pub struct AnomalyDetector {
    config: PipelineConfig,
}

impl AnomalyDetector {
    pub fn new(config: PipelineConfig) -> ScoringResult<Self> {
        config.validate()?;
        Ok(AnomalyDetector { config })
    }

    pub fn from_sections(raw: &RawConfig) -> ScoringResult<Self> {
        Ok(AnomalyDetector {
            config: PipelineConfig::from_sections(raw)?,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of contexts a series of length `n` is split into (0 when too short).
    pub fn context_count(&self, n: usize) -> usize {
        self.config.context.count(n)
    }

    /// One anomaly score per index of `series`.
    ///
    /// `progress` is called once per context, in context order, with the
    /// fraction of contexts done; the last call passes exactly `1.0`. On error
    /// nothing is returned but the error.
    pub fn evaluate(
        &self,
        series: &[f64],
        progress: Option<&mut dyn FnMut(f64)>,
    ) -> ScoringResult<Vec<f64>> {
        self.evaluate_report(series, progress).map(|report| report.scores)
    }

    pub fn evaluate_report(
        &self,
        series: &[f64],
        progress: Option<&mut dyn FnMut(f64)>,
    ) -> ScoringResult<ScoringReport> {
        let mut state = DetectorState::Init;
        let result = self.run(series, progress, &mut state);
        if let Err(err) = &result {
            warn!(error = %err, state = ?state, "scoring failed");
            transition(&mut state, DetectorState::Failed);
        }
        result
    }

    fn run(
        &self,
        series: &[f64],
        progress: Option<&mut dyn FnMut(f64)>,
        state: &mut DetectorState,
    ) -> ScoringResult<ScoringReport> {
        let series = TimeSeries::new(series)?;

        transition(state, DetectorState::GeneratingContexts);
        let contexts: Vec<Context> = self.config.context.contexts(series.len())?.collect();
        info!(
            len = series.len(),
            contexts = contexts.len(),
            parallel = self.config.detector.parallel,
            "scoring series"
        );

        transition(state, DetectorState::ProcessingContext);
        let mut acc = Accumulation {
            aggregator: Aggregator::new(self.config.aggregation, series.len()),
            total: contexts.len(),
            processed: 0,
            skipped: 0,
            progress,
        };

        let precomputed = if self.config.detector.parallel {
            self.score_parallel(&contexts, &series)
        } else {
            None
        };
        match precomputed {
            Some(outcomes) => {
                for (ctx, outcome) in contexts.iter().copied().zip(outcomes) {
                    self.absorb(&mut acc, ctx, outcome, &series)?;
                }
            }
            None => {
                for ctx in contexts.iter().copied() {
                    let outcome = self.score_context(ctx, &series);
                    self.absorb(&mut acc, ctx, outcome, &series)?;
                }
            }
        }

        transition(state, DetectorState::Aggregating);
        let scores = acc.aggregator.finalize();

        transition(state, DetectorState::Done);
        info!(
            processed = acc.processed,
            skipped = acc.skipped,
            "scoring finished"
        );
        Ok(ScoringReport {
            scores,
            contexts_processed: acc.processed,
            contexts_skipped: acc.skipped,
        })
    }

    /// Scores every context on a dedicated pool; results keep context order.
    fn score_parallel(
        &self,
        contexts: &[Context],
        series: &TimeSeries<'_>,
    ) -> Option<Vec<ScoringResult<ContextScore>>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.detector.threads)
            .build();
        match pool {
            Ok(pool) => Some(pool.install(|| {
                contexts
                    .par_iter()
                    .map(|&ctx| self.score_context(ctx, series))
                    .collect()
            })),
            Err(err) => {
                warn!(error = %err, "thread pool unavailable, scoring sequentially");
                None
            }
        }
    }

    fn absorb(
        &self,
        acc: &mut Accumulation<'_>,
        ctx: Context,
        outcome: ScoringResult<ContextScore>,
        series: &TimeSeries<'_>,
    ) -> ScoringResult<()> {
        match outcome {
            Ok(scored) => {
                debug!(start = ctx.start, end = ctx.end, score = scored.score, "context scored");
                acc.aggregator.record(ctx, &scored.indices, scored.score);
            }
            Err(err)
                if err.is_insufficient_data()
                    && self.config.detector.on_insufficient_data == InsufficientDataPolicy::Skip =>
            {
                warn!(error = %err, "skipping context, recording default score");
                let touched = self.touched_indices(ctx, series);
                acc.aggregator.record(ctx, &touched, DEFAULT_SCORE);
                acc.skipped += 1;
            }
            Err(err) => return Err(err),
        }
        acc.report_progress();
        Ok(())
    }

    /// Indices a skipped context stands for: its evaluation sample, or the
    /// whole context when that sample is empty.
    fn touched_indices(&self, ctx: Context, series: &TimeSeries<'_>) -> Vec<usize> {
        let sample = self.config.evaluation_filter.select(ctx, series);
        if sample.is_empty() {
            ctx.range().collect()
        } else {
            sample.indices
        }
    }

    fn score_context(&self, ctx: Context, series: &TimeSeries<'_>) -> ScoringResult<ContextScore> {
        let cfg = &self.config;

        let reference = cfg.reference_filter.select(ctx, series);
        if reference.is_empty() {
            return Err(ScoringError::insufficient_data("reference sample is empty")
                .in_context(ctx, ContextStage::FilterReference));
        }
        let evaluation = cfg.evaluation_filter.select(ctx, series);
        if evaluation.is_empty() {
            return Err(ScoringError::insufficient_data("evaluation sample is empty")
                .in_context(ctx, ContextStage::FilterEvaluation));
        }

        let reference_features = cfg
            .representation
            .encode(&reference)
            .map_err(at(ctx, ContextStage::RepresentBoth))?;
        let evaluation_features = cfg
            .representation
            .encode(&evaluation)
            .map_err(at(ctx, ContextStage::RepresentBoth))?;

        let model = cfg
            .discretizer
            .fit(&reference_features)
            .map_err(at(ctx, ContextStage::FitDiscretizer))?;
        let symbols = cfg.discretizer.apply(&model, &evaluation_features);

        let score = cfg.evaluator.score(&model, &symbols);
        debug_assert!(score.is_finite());

        Ok(ContextScore {
            indices: evaluation.indices,
            score,
        })
    }
}
