//! Errors raised at the boundary between the orchestration layer and the core.
//!
//! The numerical core itself never fails: it reports a [`crate::Status`].

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CycleError {
    #[error("unknown component model: {0} (expected 'standard' or 'advanced')")]
    UnknownModel(String),

    #[error("seed index {0} out of range (expected 1..=6)")]
    UnknownSeed(i32),

    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("unknown status code: {0}")]
    UnknownStatus(i32),

    #[error("unknown degradation level: {0} (use light, moderate, severe, or custom)")]
    UnknownDegradationLevel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CycleError::UnknownSeed(9);
        assert!(err.to_string().contains('9'));
        let err = CycleError::UnknownModel("exotic".into());
        assert!(err.to_string().contains("exotic"));
    }
}
