use serde::Serialize;
use thiserror::Error;

/// Failure modes of the simulation pipeline.
///
/// `InvalidConfiguration` is raised before any integration is attempted.
/// The other two variants are produced while running, and inside a sweep
/// they only mark the affected point as failed.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RhythmError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The solver could not produce a finite state at `time`.
    #[error("integration failed at t = {time}: {reason}")]
    IntegrationFailure { time: f64, reason: String },

    /// Normalization denominator was zero for the listed state dimensions.
    #[error("degenerate signal: zero mean in dimension(s) {dimensions:?}")]
    DegenerateSignal { dimensions: Vec<usize> },
}

impl RhythmError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        RhythmError::InvalidConfiguration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, RhythmError>;
