//! Error types for Postura

use thiserror::Error;

/// Core Postura errors
///
/// None of these are produced on the per-frame path: missing or low-confidence
/// landmarks make predicates fail closed instead.
#[derive(Error, Debug)]
pub enum PosturaError {
    // Configuration errors
    #[error("Invalid phase table: {0}")]
    InvalidPhaseTable(String),

    #[error("Phase {phase} has a {trigger} trigger but no {missing}")]
    IncompletePhase {
        phase: i32,
        trigger: &'static str,
        missing: &'static str,
    },

    #[error("Threshold out of range: {name} = {value}")]
    ThresholdOutOfRange { name: &'static str, value: f32 },

    #[error("Configuration error: {0}")]
    Config(String),

    // Data errors
    #[error("Frame too long: expected at most {expected} landmarks, got {actual}")]
    FrameTooLong { expected: usize, actual: usize },

    #[error("Malformed recording at line {line}: {reason}")]
    MalformedRecording { line: usize, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Collaborator errors
    #[error("Detector error: {0}")]
    Detector(String),

    #[error("Audio playback failed for {audio_ref}: {reason}")]
    AudioPlayback { audio_ref: String, reason: String },

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Postura operations
pub type PosturaResult<T> = Result<T, PosturaError>;

impl From<serde_json::Error> for PosturaError {
    fn from(e: serde_json::Error) -> Self {
        PosturaError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_conversion() {
        let err: PosturaError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, PosturaError::Serialization(_)));
    }

    #[test]
    fn test_incomplete_phase_message() {
        let err = PosturaError::IncompletePhase {
            phase: 3,
            trigger: "time",
            missing: "delay_ms",
        };
        assert_eq!(err.to_string(), "Phase 3 has a time trigger but no delay_ms");
    }
}
