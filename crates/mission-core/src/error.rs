//! Domain error types.

use thiserror::Error;

use crate::ids::CommunityId;

/// Top-level domain error type.
///
/// Configuration and lookup failures ask an operator to fix the community
/// setup; invalid arguments and a missing session are recoverable by the
/// caller; persistence and platform failures are genuine faults.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A required topology setting is not configured.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// A named category or channel could not be found.
    #[error("lookup failed: {0}")]
    LookupFailed(String),

    /// An argument was outside the accepted domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation requires a running session and the community has none.
    #[error("no active session for community {0}")]
    NoActiveSession(CommunityId),

    /// Reading from or writing to the resource store failed.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// A messaging platform call failed.
    #[error("platform failure: {0}")]
    Platform(String),
}
