// Typed errors with thiserror. Surface meaningful messages to JS.
// Transport misuse is never an error; only malformed input is.

use thiserror::Error;

use crate::types::SurfaceId;

/// Replay engine error types.
#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Event {index} has no surface but {surfaces} surfaces are tracked")]
    UnattributedEvent { index: usize, surfaces: usize },

    #[error("Event {index} targets unknown surface {surface}")]
    UnknownSurface { index: usize, surface: SurfaceId },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ReplayError {
    fn from(err: serde_json::Error) -> Self {
        ReplayError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ReplayError::UnknownSurface {
            index: 3,
            surface: SurfaceId::new(7),
        };
        assert_eq!(err.to_string(), "Event 3 targets unknown surface 7");
    }
}
