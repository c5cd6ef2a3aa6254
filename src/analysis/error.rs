use thiserror::Error;

/// Failures surfaced by the analysis entry points.
///
/// All of them are recoverable: the caller either starts a session, fixes the
/// exercise name, or simply moves on to the next frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("no exercise is active; start one first")]
    NoActiveExercise,

    #[error("unknown exercise kind: {0}")]
    UnknownExerciseKind(String),

    #[error("no person detected in frame")]
    NoPersonDetected,
}
