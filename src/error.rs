use thiserror::Error;

/// Custom error type for mailuo operations.
///
/// Every stage fault surfaces as one of these kinds; nothing else crosses
/// the crate boundary. `NoEntitiesFound` is special-cased by the
/// orchestrator into a successful empty bundle.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Malformed or empty input (empty text, non-contiguous chapters).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The text is too degenerate to analyze (fewer than two characters).
    #[error("no entities found: {0}")]
    NoEntitiesFound(String),

    /// A required lexicon resource is absent.
    #[error("lexicon missing: {0}")]
    LexiconMissing(String),

    /// A pipeline stage hit an unrecoverable internal fault.
    #[error("stage '{stage}' failed: {cause}")]
    StageFailure { stage: &'static str, cause: String },

    /// The graph store rejected a read or write.
    #[error("graph store error: {0}")]
    GraphStore(String),

    /// The analysis was cancelled between stages.
    #[error("analysis cancelled")]
    Cancelled,
}

impl AnalysisError {
    /// Stable machine-readable kind tag for the user-visible error object.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InvalidInput(_) => "invalid_input",
            AnalysisError::NoEntitiesFound(_) => "no_entities_found",
            AnalysisError::LexiconMissing(_) => "lexicon_missing",
            AnalysisError::StageFailure { .. } => "stage_failure",
            AnalysisError::GraphStore(_) => "graph_store_error",
            AnalysisError::Cancelled => "cancelled",
        }
    }

    /// The failing stage, when the error is stage-scoped.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            AnalysisError::StageFailure { stage, .. } => Some(stage),
            _ => None,
        }
    }
}

impl From<surrealdb::Error> for AnalysisError {
    fn from(err: surrealdb::Error) -> Self {
        AnalysisError::GraphStore(err.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(err: serde_json::Error) -> Self {
        AnalysisError::GraphStore(format!("bundle serialization error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_are_stable() {
        assert_eq!(AnalysisError::InvalidInput("x".into()).kind(), "invalid_input");
        assert_eq!(AnalysisError::Cancelled.kind(), "cancelled");
        assert_eq!(
            AnalysisError::StageFailure {
                stage: "events",
                cause: "boom".into()
            }
            .kind(),
            "stage_failure"
        );
    }

    #[test]
    fn test_stage_accessor() {
        let err = AnalysisError::StageFailure {
            stage: "relations",
            cause: "bad".into(),
        };
        assert_eq!(err.stage(), Some("relations"));
        assert_eq!(AnalysisError::Cancelled.stage(), None);
    }

    #[test]
    fn test_display_contains_cause() {
        let err = AnalysisError::StageFailure {
            stage: "timeline",
            cause: "cycle".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("timeline"));
        assert!(msg.contains("cycle"));
    }
}
