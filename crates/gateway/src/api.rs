use async_trait::async_trait;
use thiserror::Error;

use vital_core::model::{Answer, Diagnosis, HistoryEntry, PatientId, Question, User};

/// Errors surfaced by gateway adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The service answered, but rejected the request with a message.
    #[error("{0}")]
    Rejected(String),

    #[error("request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("unexpected response shape: {0}")]
    Malformed(String),

    #[error("service unavailable")]
    Unavailable,

    #[error("adapter error: {0}")]
    Internal(String),
}

/// Full payload for a persisting answer submission: the signed-in patient's
/// profile plus the ordered answer vector.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerSubmission {
    pub user: User,
    pub answers: Vec<Answer>,
}

/// Remote assessment service consumed by the engine.
///
/// Every call is awaited once, with no automatic retry. Callers convert each
/// failure into a user-visible message or a local fallback; nothing here may
/// panic past the engine boundary.
#[async_trait]
pub trait HealthApi: Send + Sync {
    /// Authenticate and fetch the account profile.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Rejected` for bad credentials, or transport and
    /// decoding errors otherwise.
    async fn login(&self, username: &str, password: &str) -> Result<User, GatewayError>;

    /// Fetch the current diagnostic questionnaire.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the service fails or answers with an
    /// unexpected shape.
    async fn fetch_questions(&self) -> Result<Vec<Question>, GatewayError>;

    /// Submit a completed questionnaire for persistence and diagnosis.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the submission fails; the caller falls back
    /// to the local rule evaluator.
    async fn submit_answers(&self, submission: &AnswerSubmission)
    -> Result<Diagnosis, GatewayError>;

    /// Submit a clinician answer vector for diagnosis without persisting it.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the submission fails; the caller falls back
    /// to the local rule evaluator.
    async fn submit_answers_unsaved(&self, answers: &[Answer])
    -> Result<Diagnosis, GatewayError>;

    /// Append a free-text progress note to the patient's history.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the note cannot be recorded.
    async fn submit_progress_note(&self, id: &PatientId, note: &str)
    -> Result<(), GatewayError>;

    /// Fetch past consultations for an identification, newest last. With
    /// `only_last` the service returns at most one entry.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError` if the history cannot be retrieved.
    async fn fetch_history(
        &self,
        id: &PatientId,
        only_last: bool,
    ) -> Result<Vec<HistoryEntry>, GatewayError>;
}
