//! Filesystem implementation of the `ResourceRepository` trait.
//!
//! Layout: `<root>/<community id>/<key>.json`. Writes go to a sibling
//! temporary file that is then renamed over the target, so a crash never
//! leaves a half-written resource behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use mission_core::error::DomainError;
use mission_core::ids::CommunityId;
use mission_core::repository::ResourceRepository;

/// Directory-backed resource repository.
#[derive(Debug, Clone)]
pub struct FsResourceRepository {
    root: PathBuf,
}

impl FsResourceRepository {
    /// Creates a repository rooted at `root`. The directory is created on
    /// first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn scope_dir(&self, scope: CommunityId) -> PathBuf {
        self.root.join(scope.to_string())
    }

    fn path(&self, scope: CommunityId, key: &str) -> Result<PathBuf, DomainError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(DomainError::InvalidArgument(format!(
                "invalid resource key '{key}'"
            )));
        }
        Ok(self.scope_dir(scope).join(format!("{key}.json")))
    }
}

fn io_error(op: &str, path: &Path, e: &std::io::Error) -> DomainError {
    DomainError::Persistence(format!("{op} {} failed: {e}", path.display()))
}

#[async_trait]
impl ResourceRepository for FsResourceRepository {
    async fn exists(&self, scope: CommunityId, key: &str) -> Result<bool, DomainError> {
        let path = self.path(scope, key)?;
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| io_error("stat", &path, &e))
    }

    async fn read(&self, scope: CommunityId, key: &str) -> Result<Option<Vec<u8>>, DomainError> {
        let path = self.path(scope, key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error("read", &path, &e)),
        }
    }

    async fn write(&self, scope: CommunityId, key: &str, bytes: &[u8]) -> Result<(), DomainError> {
        let path = self.path(scope, key)?;
        let dir = self.scope_dir(scope);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_error("create", &dir, &e))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| io_error("write", &tmp, &e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error("rename", &path, &e))?;

        debug!(%scope, key, bytes = bytes.len(), "resource written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMUNITY: CommunityId = CommunityId(123_456_789_012_345_678);

    #[tokio::test]
    async fn test_missing_resource_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsResourceRepository::new(dir.path());

        assert!(!repo.exists(COMMUNITY, "sessions").await.unwrap());
        assert_eq!(repo.read(COMMUNITY, "sessions").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_then_read_and_overwrite() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let repo = FsResourceRepository::new(dir.path());

        // Act
        repo.write(COMMUNITY, "sessions", b"[1]").await.unwrap();
        repo.write(COMMUNITY, "sessions", b"[1,2]").await.unwrap();

        // Assert
        assert!(repo.exists(COMMUNITY, "sessions").await.unwrap());
        assert_eq!(
            repo.read(COMMUNITY, "sessions").await.unwrap(),
            Some(b"[1,2]".to_vec())
        );
        let file = dir
            .path()
            .join("123456789012345678")
            .join("sessions.json");
        assert!(file.is_file());
        assert!(!file.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsResourceRepository::new(dir.path());

        repo.write(COMMUNITY, "channel-groups", b"[]").await.unwrap();

        assert!(!repo.exists(CommunityId(1), "channel-groups").await.unwrap());
        assert_eq!(repo.read(CommunityId(1), "channel-groups").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_rejects_keys_that_escape_the_scope() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsResourceRepository::new(dir.path());

        let result = repo.write(COMMUNITY, "../other", b"x").await;

        assert!(matches!(result, Err(DomainError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_unwritable_root_reports_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file, not a directory").unwrap();
        let repo = FsResourceRepository::new(&blocker);

        let result = repo.write(COMMUNITY, "sessions", b"[]").await;

        assert!(matches!(result, Err(DomainError::Persistence(_))));
    }
}
