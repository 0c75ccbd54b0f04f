use thiserror::Error;

use gateway::GatewayError;

/// Failures that can escape a single transition. Everything here is caught
/// and recovered before `handle` returns; nothing unwinds past the engine
/// boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TurnError {
    #[error(transparent)]
    Transport(#[from] GatewayError),

    #[error("the service returned no questions")]
    EmptyQuestionnaire,

    #[error("session is missing data required by the active state")]
    CorruptSession,
}
