use reqwest::StatusCode;
use thiserror::Error;

use crate::flow::FlowPhase;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("request to scoring service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("scoring service returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("scoring service response could not be decoded: {0}")]
    Decode(String),
    #[error("invalid scoring service url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

#[derive(Debug, Error)]
pub enum LoadFailure {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error("scoring service returned no questions")]
    Empty,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("failed to load questions: {0}")]
    Load(#[source] LoadFailure),
    #[error("question {} is unanswered", .unanswered + 1)]
    Validation { unanswered: usize },
    #[error("failed to submit answers: {0}")]
    Submission(#[source] ServiceError),
    #[error("answer value {0} is outside 1..=5")]
    InvalidAnswer(u8),
    #[error("operation not allowed while flow is {0}")]
    NotActive(FlowPhase),
}

impl FlowError {
    /// Whether the player can recover without reloading the flow.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Load(_))
    }
}
