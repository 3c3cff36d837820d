use thiserror::Error;

use crate::series::Context;

/// Per-context processing step, reported with data errors.
///
/// Only the filter, representation and fit steps can fail; the remaining
/// variants name the later steps of the chain and never tag an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextStage {
    FilterReference,
    FilterEvaluation,
    RepresentBoth,
    FitDiscretizer,
    ApplyDiscretizer,
    Evaluate,
    RecordScore,
}

impl ContextStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextStage::FilterReference => "filter_reference",
            ContextStage::FilterEvaluation => "filter_evaluation",
            ContextStage::RepresentBoth => "represent_both",
            ContextStage::FitDiscretizer => "fit_discretizer",
            ContextStage::ApplyDiscretizer => "apply_discretizer",
            ContextStage::Evaluate => "evaluate",
            ContextStage::RecordScore => "record_score",
        }
    }
}

/// Error types for the scoring pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoringError {
    #[error("invalid configuration in [{section}]: {message}")]
    Configuration { section: String, message: String },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(
        "insufficient data{}{}: {reason}",
        .context.map(|c| format!(" in context [{}, {})", c.start, c.end)).unwrap_or_default(),
        .stage.map(|s| format!(" at {}", s.as_str())).unwrap_or_default()
    )]
    InsufficientData {
        context: Option<Context>,
        stage: Option<ContextStage>,
        reason: String,
    },
}

/// Result type for scoring operations
pub type ScoringResult<T> = Result<T, ScoringError>;

impl ScoringError {
    pub fn configuration(section: impl Into<String>, message: impl Into<String>) -> Self {
        ScoringError::Configuration {
            section: section.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        ScoringError::InvalidInput(message.into())
    }

    pub fn insufficient_data(reason: impl Into<String>) -> Self {
        ScoringError::InsufficientData {
            context: None,
            stage: None,
            reason: reason.into(),
        }
    }

    /// Attaches the failing context and stage to a data error; other kinds pass through.
    pub fn in_context(self, ctx: Context, at: ContextStage) -> Self {
        match self {
            ScoringError::InsufficientData { reason, .. } => ScoringError::InsufficientData {
                context: Some(ctx),
                stage: Some(at),
                reason,
            },
            other => other,
        }
    }

    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, ScoringError::InsufficientData { .. })
    }
}
