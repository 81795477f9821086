//! Test repositories: `ResourceRepository` doubles for tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use mission_core::error::DomainError;
use mission_core::ids::CommunityId;
use mission_core::repository::ResourceRepository;

/// An in-memory resource repository.
///
/// Every read and write yields to the scheduler once before touching the
/// map, so concurrent callers interleave the way they would against real
/// I/O. Writes can be switched to fail with [`Self::fail_writes`].
#[derive(Debug, Default)]
pub struct InMemoryResourceRepository {
    resources: Mutex<HashMap<(CommunityId, String), Vec<u8>>>,
    writes: AtomicUsize,
    failing_writes: AtomicBool,
}

impl InMemoryResourceRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a resource without counting it as a write.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn insert(&self, scope: CommunityId, key: &str, bytes: impl Into<Vec<u8>>) {
        self.resources
            .lock()
            .unwrap()
            .insert((scope, key.to_owned()), bytes.into());
    }

    /// Returns a copy of the stored resource, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn get(&self, scope: CommunityId, key: &str) -> Option<Vec<u8>> {
        self.resources
            .lock()
            .unwrap()
            .get(&(scope, key.to_owned()))
            .cloned()
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResourceRepository for InMemoryResourceRepository {
    async fn exists(&self, scope: CommunityId, key: &str) -> Result<bool, DomainError> {
        tokio::task::yield_now().await;
        Ok(self
            .resources
            .lock()
            .unwrap()
            .contains_key(&(scope, key.to_owned())))
    }

    async fn read(&self, scope: CommunityId, key: &str) -> Result<Option<Vec<u8>>, DomainError> {
        tokio::task::yield_now().await;
        Ok(self.get(scope, key))
    }

    async fn write(&self, scope: CommunityId, key: &str, bytes: &[u8]) -> Result<(), DomainError> {
        tokio::task::yield_now().await;
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(DomainError::Persistence("disk full".into()));
        }
        self.resources
            .lock()
            .unwrap()
            .insert((scope, key.to_owned()), bytes.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A resource repository that always returns a persistence error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingResourceRepository;

#[async_trait]
impl ResourceRepository for FailingResourceRepository {
    async fn exists(&self, _scope: CommunityId, _key: &str) -> Result<bool, DomainError> {
        Err(DomainError::Persistence("connection refused".into()))
    }

    async fn read(&self, _scope: CommunityId, _key: &str) -> Result<Option<Vec<u8>>, DomainError> {
        Err(DomainError::Persistence("connection refused".into()))
    }

    async fn write(
        &self,
        _scope: CommunityId,
        _key: &str,
        _bytes: &[u8],
    ) -> Result<(), DomainError> {
        Err(DomainError::Persistence("connection refused".into()))
    }
}
