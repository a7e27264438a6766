use thiserror::Error;

use crate::status::{LifecyclePhase, ServiceAction};

#[derive(Debug, Error)]
pub enum DeckError {
    #[error("status snapshot has no Active facet")]
    ClassificationAmbiguous,
    #[error("setting {field} is misconfigured: {reason}")]
    Configuration { field: String, reason: String },
    #[error("invalid value for {field}: {reason}")]
    Validation { field: String, reason: String },
    #[error("request failed: {reason}")]
    RequestFailure { reason: String },
    #[error("cannot {action} while the service is {phase}")]
    ActionNotAllowed {
        action: ServiceAction,
        phase: LifecyclePhase,
    },
    #[error("a request for {0} is already in flight")]
    RequestInFlight(String),
    #[error("unknown setting: {0}")]
    UnknownField(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl DeckError {
    /// Whether the operator can simply try again without changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeckError::RequestFailure { .. } | DeckError::RequestInFlight(_)
        )
    }
}
