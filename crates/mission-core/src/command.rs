//! Command abstractions.

use uuid::Uuid;

use crate::ids::CommunityId;

/// A request addressed to one community, traceable through logs.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// The community whose state the command reads or mutates.
    fn community(&self) -> CommunityId;
}
