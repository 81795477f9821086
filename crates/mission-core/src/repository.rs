//! Resource repository abstraction.
//!
//! A scoped key/value blob store: every community owns one scope and stores
//! opaque byte payloads under well-known keys.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::ids::CommunityId;

/// Repository trait for community-scoped resources.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Returns `true` if a resource exists under `key` in `scope`.
    async fn exists(&self, scope: CommunityId, key: &str) -> Result<bool, DomainError>;

    /// Reads the resource stored under `key` in `scope`, if any.
    async fn read(&self, scope: CommunityId, key: &str) -> Result<Option<Vec<u8>>, DomainError>;

    /// Writes (creating or replacing) the resource under `key` in `scope`.
    async fn write(&self, scope: CommunityId, key: &str, bytes: &[u8]) -> Result<(), DomainError>;
}
