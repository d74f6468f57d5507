//! Errors reported by the agent.

use crate::config::ConfigError;
use crate::transport::TransportError;
use thiserror::Error;

/// Outcome of a failed agent operation.
///
/// Every variant is delivered through a completion; none is retried by the
/// agent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AgentError {
    /// No client id configured yet
    #[error("agent is not initialized; call initialize with a client id first")]
    NotInitialized,

    /// The user has not consented to tracking
    #[error("tracking is disabled")]
    TrackingDisabled,

    /// The endpoint answered, but not with something usable
    #[error("unexpected response (status {status}): {reason}")]
    UnexpectedResponse { status: u16, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The dispatch worker or the completion channel went away
    #[error("agent dispatch worker has stopped")]
    Stopped,
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
