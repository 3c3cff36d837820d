use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use crate::error::{ScoringError, ScoringResult};
use crate::stages::aggregator::{self, AggregationPolicy};
use crate::stages::context::{self, ContextGenerator, Coverage};
use crate::stages::discretizer::{self, Binning, Discretizer};
use crate::stages::evaluator::{self, Divergence, Evaluator};
use crate::stages::filter::SampleFilter;
use crate::stages::representation::{self, Representation};

/// Option name to raw string value, for one stage.
pub type StageOptions = BTreeMap<String, String>;

/// Stage name to its options.
pub type RawConfig = BTreeMap<String, StageOptions>;

pub const REFERENCE_FILTER: &str = "reference_filter";
pub const EVALUATION_FILTER: &str = "evaluation_filter";
pub const DETECTOR: &str = "detector";

pub const SECTIONS: [&str; 8] = [
    context::SECTION,
    REFERENCE_FILTER,
    EVALUATION_FILTER,
    representation::SECTION,
    discretizer::SECTION,
    evaluator::SECTION,
    aggregator::SECTION,
    DETECTOR,
];

/// What to do when one context cannot be scored for lack of data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InsufficientDataPolicy {
    /// Halt and surface the error.
    #[default]
    Fail,
    /// Record the default score at the context's indices and continue.
    Skip,
}

impl FromStr for InsufficientDataPolicy {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fail" => Ok(InsufficientDataPolicy::Fail),
            "skip" => Ok(InsufficientDataPolicy::Skip),
            other => Err(ScoringError::configuration(
                DETECTOR,
                format!("unknown on_insufficient_data '{other}' (expected fail or skip)"),
            )),
        }
    }
}

/// Orchestration options.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorOptions {
    pub on_insufficient_data: InsufficientDataPolicy,
    pub parallel: bool,
    pub threads: usize,
}

impl Default for DetectorOptions {
    fn default() -> Self {
        DetectorOptions {
            on_insufficient_data: InsufficientDataPolicy::default(),
            parallel: false,
            threads: num_cpus::get().max(1),
        }
    }
}

/// Fully validated pipeline configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub context: ContextGenerator,
    pub reference_filter: SampleFilter,
    pub evaluation_filter: SampleFilter,
    pub representation: Representation,
    pub discretizer: Discretizer,
    pub evaluator: Evaluator,
    pub aggregation: AggregationPolicy,
    pub detector: DetectorOptions,
}

/// Reference and evaluation lengths when none are given: the evaluation part
/// is the last `min(step, window - 1)` indices, the reference is the rest.
fn default_lengths(window: usize, step: usize) -> (usize, usize) {
    let evaluation = step.min(window.saturating_sub(1));
    (window - evaluation, evaluation)
}

impl PipelineConfig {
    /// All defaults around the given context window and step.
    pub fn with_window(window: usize, step: usize) -> ScoringResult<Self> {
        let context = ContextGenerator::new(window, step, Coverage::Full)?;
        let (reference_len, evaluation_len) = default_lengths(window, step);
        let config = PipelineConfig {
            context,
            reference_filter: SampleFilter::Leading {
                length: reference_len,
            },
            evaluation_filter: SampleFilter::Trailing {
                length: evaluation_len,
            },
            representation: Representation::default(),
            discretizer: Discretizer::default(),
            evaluator: Evaluator::default(),
            aggregation: AggregationPolicy::default(),
            detector: DetectorOptions::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parses and validates the stage mapping; absent sections use defaults.
    pub fn from_sections(raw: &RawConfig) -> ScoringResult<Self> {
        if let Some(unknown) = raw.keys().find(|k| !SECTIONS.contains(&k.as_str())) {
            return Err(ScoringError::configuration(
                unknown.as_str(),
                format!("unknown section (expected one of {})", SECTIONS.join(", ")),
            ));
        }

        let mut opts = OptionReader::new(raw, context::SECTION);
        let window = opts.required_usize("window")?;
        let step = opts.usize_or("step", (window / 2).max(1))?;
        let coverage = opts.parse_or("coverage", Coverage::default())?;
        opts.finish()?;
        let context = ContextGenerator::new(window, step, coverage)?;

        let (reference_len, evaluation_len) = default_lengths(window, step);
        let reference_filter = parse_filter(raw, REFERENCE_FILTER, "leading", reference_len)?;
        let evaluation_filter = parse_filter(raw, EVALUATION_FILTER, "trailing", evaluation_len)?;

        let mut opts = OptionReader::new(raw, representation::SECTION);
        let representation = match opts.str_or("method", "identity") {
            "identity" => Representation::Identity,
            "differences" => Representation::Differences,
            "summary" => Representation::Summary,
            "paa" => Representation::Paa {
                segments: opts.usize_or("segments", representation::DEFAULT_PAA_SEGMENTS)?,
            },
            other => return Err(opts.unknown_variant("method", other, &Representation::METHODS)),
        };
        opts.finish()?;

        let mut opts = OptionReader::new(raw, discretizer::SECTION);
        let binning = opts.parse_or("method", Binning::default())?;
        let bins = opts.usize_or("bins", discretizer::DEFAULT_BINS)?;
        let min_distinct = opts.usize_or("min_distinct", 1)?;
        let margin = match binning {
            Binning::EqualWidth => opts.f64_or("margin", discretizer::DEFAULT_MARGIN)?,
            Binning::EqualFrequency => discretizer::DEFAULT_MARGIN,
        };
        opts.finish()?;
        let discretizer = Discretizer::new(binning, bins, min_distinct, margin)?;

        let mut opts = OptionReader::new(raw, evaluator::SECTION);
        let divergence = opts.parse_or("method", Divergence::default())?;
        let smoothing = opts.f64_or("smoothing", evaluator::DEFAULT_SMOOTHING)?;
        opts.finish()?;
        let evaluator = Evaluator::new(divergence, smoothing)?;

        let mut opts = OptionReader::new(raw, aggregator::SECTION);
        let aggregation = opts.parse_or("method", AggregationPolicy::default())?;
        opts.finish()?;

        let defaults = DetectorOptions::default();
        let mut opts = OptionReader::new(raw, DETECTOR);
        let detector = DetectorOptions {
            on_insufficient_data: opts
                .parse_or("on_insufficient_data", defaults.on_insufficient_data)?,
            parallel: opts.bool_or("parallel", defaults.parallel)?,
            threads: opts.usize_or("threads", defaults.threads)?,
        };
        opts.finish()?;

        let config = PipelineConfig {
            context,
            reference_filter,
            evaluation_filter,
            representation,
            discretizer,
            evaluator,
            aggregation,
            detector,
        };
        config.validate()?;
        Ok(config)
    }

    /// Cross-stage checks that only need the configuration, not the data.
    pub fn validate(&self) -> ScoringResult<()> {
        let window = self.context.window();
        let min_len = self.representation.min_sample_len();

        for (section, filter) in [
            (REFERENCE_FILTER, &self.reference_filter),
            (EVALUATION_FILTER, &self.evaluation_filter),
        ] {
            validate_filter(section, filter, window)?;
            if let Some(guaranteed) = filter.guaranteed_len(window) {
                if guaranteed == 0 {
                    return Err(ScoringError::configuration(
                        section,
                        format!("policy {} selects no index of a {window}-wide context", filter.name()),
                    ));
                }
                if guaranteed < min_len {
                    return Err(ScoringError::configuration(
                        section,
                        format!(
                            "policy {} selects {guaranteed} value(s) per context; {} representation needs {min_len}",
                            filter.name(),
                            self.representation.name()
                        ),
                    ));
                }
            }
        }

        if let Representation::Paa { segments: 0 } = self.representation {
            return Err(ScoringError::configuration(
                representation::SECTION,
                "segments must be > 0",
            ));
        }
        if self.detector.threads == 0 {
            return Err(ScoringError::configuration(DETECTOR, "threads must be > 0"));
        }
        Ok(())
    }
}

fn validate_filter(section: &str, filter: &SampleFilter, window: usize) -> ScoringResult<()> {
    match *filter {
        SampleFilter::All => Ok(()),
        SampleFilter::Leading { length } | SampleFilter::Trailing { length } => {
            if length == 0 || length > window {
                Err(ScoringError::configuration(
                    section,
                    format!("length must be in 1..={window}; got {length}"),
                ))
            } else {
                Ok(())
            }
        }
        SampleFilter::EveryKth { k, offset } => {
            if k == 0 {
                Err(ScoringError::configuration(section, "k must be > 0"))
            } else if offset >= window {
                Err(ScoringError::configuration(
                    section,
                    format!("offset must be < window ({window}); got {offset}"),
                ))
            } else {
                Ok(())
            }
        }
        SampleFilter::ValueRange { min, max } => {
            if min.is_nan() || max.is_nan() || min > max {
                Err(ScoringError::configuration(
                    section,
                    format!("value range requires min <= max; got [{min}, {max}]"),
                ))
            } else {
                Ok(())
            }
        }
    }
}

fn parse_filter(
    raw: &RawConfig,
    section: &'static str,
    default_policy: &str,
    default_length: usize,
) -> ScoringResult<SampleFilter> {
    let mut opts = OptionReader::new(raw, section);
    let filter = match opts.str_or("policy", default_policy) {
        "all" => SampleFilter::All,
        "leading" => SampleFilter::Leading {
            length: opts.usize_or("length", default_length)?,
        },
        "trailing" => SampleFilter::Trailing {
            length: opts.usize_or("length", default_length)?,
        },
        "every_kth" => SampleFilter::EveryKth {
            k: opts.usize_or("k", 2)?,
            offset: opts.usize_or("offset", 0)?,
        },
        "value_range" => SampleFilter::ValueRange {
            min: opts.f64_or("min", f64::NEG_INFINITY)?,
            max: opts.f64_or("max", f64::INFINITY)?,
        },
        other => return Err(opts.unknown_variant("policy", other, &SampleFilter::POLICIES)),
    };
    opts.finish()?;
    Ok(filter)
}

/// Typed reads from one section; every option present must be consumed.
struct OptionReader<'a> {
    section: &'static str,
    options: Option<&'a StageOptions>,
    consumed: BTreeSet<&'static str>,
}

impl<'a> OptionReader<'a> {
    fn new(raw: &'a RawConfig, section: &'static str) -> Self {
        OptionReader {
            section,
            options: raw.get(section),
            consumed: BTreeSet::new(),
        }
    }

    fn raw(&mut self, key: &'static str) -> Option<&'a str> {
        self.consumed.insert(key);
        self.options.and_then(|o| o.get(key)).map(|v| v.trim())
    }

    fn invalid(&self, key: &str, value: &str, expected: &str) -> ScoringError {
        ScoringError::configuration(
            self.section,
            format!("option {key}='{value}': expected {expected}"),
        )
    }

    fn unknown_variant(&self, key: &str, value: &str, known: &[&str]) -> ScoringError {
        self.invalid(key, value, &format!("one of {}", known.join(", ")))
    }

    fn str_or(&mut self, key: &'static str, default: &'a str) -> &'a str {
        self.raw(key).unwrap_or(default)
    }

    fn required_usize(&mut self, key: &'static str) -> ScoringResult<usize> {
        match self.raw(key) {
            Some(value) => self.parse_usize(key, value),
            None => Err(ScoringError::configuration(
                self.section,
                format!("missing required option '{key}'"),
            )),
        }
    }

    fn usize_or(&mut self, key: &'static str, default: usize) -> ScoringResult<usize> {
        match self.raw(key) {
            Some(value) => self.parse_usize(key, value),
            None => Ok(default),
        }
    }

    fn parse_usize(&self, key: &str, value: &str) -> ScoringResult<usize> {
        value
            .parse::<usize>()
            .map_err(|_| self.invalid(key, value, "a non-negative integer"))
    }

    fn f64_or(&mut self, key: &'static str, default: f64) -> ScoringResult<f64> {
        match self.raw(key) {
            Some(value) => value
                .parse::<f64>()
                .map_err(|_| self.invalid(key, value, "a number")),
            None => Ok(default),
        }
    }

    fn bool_or(&mut self, key: &'static str, default: bool) -> ScoringResult<bool> {
        match self.raw(key) {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(self.invalid(key, value, "a boolean")),
            },
            None => Ok(default),
        }
    }

    fn parse_or<T>(&mut self, key: &'static str, default: T) -> ScoringResult<T>
    where
        T: FromStr<Err = ScoringError>,
    {
        match self.raw(key) {
            Some(value) => value.parse::<T>(),
            None => Ok(default),
        }
    }

    fn finish(self) -> ScoringResult<()> {
        let Some(options) = self.options else {
            return Ok(());
        };
        match options.keys().find(|k| !self.consumed.contains(k.as_str())) {
            Some(key) => Err(ScoringError::configuration(
                self.section,
                format!("unknown or inapplicable option '{key}'"),
            )),
            None => Ok(()),
        }
    }
}
