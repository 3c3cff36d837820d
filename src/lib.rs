//! Contextual anomaly scoring for univariate time series.
//!
//! A series is split into contexts. Each context yields a reference sample and an
//! evaluation sample. Both are encoded and discretized against bins fitted on the
//! reference only, and scored by a histogram divergence. Overlapping context
//! scores are then aggregated into one score per index.
//!
//! ```
//! use tsad_rust::{AnomalyDetector, PipelineConfig};
//!
//! let detector = AnomalyDetector::new(PipelineConfig::with_window(4, 2).unwrap()).unwrap();
//! let scores = detector
//!     .evaluate(&[0.0, 0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 0.0, 0.0], None)
//!     .unwrap();
//! assert_eq!(scores.len(), 10);
//! ```

pub mod config;
pub mod detector;
pub mod error;
pub mod series;
pub mod stages;
pub mod utils;

#[cfg(feature = "python")]
mod python;

pub use config::{DetectorOptions, InsufficientDataPolicy, PipelineConfig, RawConfig, StageOptions};
pub use detector::{AnomalyDetector, ScoringReport};
pub use error::{ContextStage, ScoringError, ScoringResult};
pub use series::{Context, Sample, TimeSeries};
pub use stages::aggregator::{AggregationPolicy, Aggregator, DEFAULT_SCORE};
pub use stages::context::{ContextGenerator, Contexts, Coverage};
pub use stages::discretizer::{Binning, DiscretizationModel, Discretizer, Symbols, MAX_BINS};
pub use stages::evaluator::{Divergence, Evaluator};
pub use stages::filter::SampleFilter;
pub use stages::representation::{Features, Representation};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// A Python module implemented in Rust.
#[cfg(feature = "python")]
#[pymodule]
fn tsad_rust(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<python::PyAnomalyDetector>()?;
    Ok(())
}
