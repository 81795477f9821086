//! Per-community session store.
//!
//! The whole session history of a community is persisted as one JSON array
//! under [`SESSIONS_KEY`]. Every save rewrites the full list.

use std::cmp::Ordering;
use std::sync::Arc;

use mission_core::error::DomainError;
use mission_core::ids::CommunityId;
use mission_core::repository::ResourceRepository;
use tracing::debug;

use crate::domain::aggregates::Session;

/// Resource key holding a community's session list.
pub const SESSIONS_KEY: &str = "sessions";

/// Community-scoped handle on the persisted session list.
#[derive(Clone)]
pub struct SessionStore {
    community: CommunityId,
    repo: Arc<dyn ResourceRepository>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("community", &self.community)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Creates a store for `community` backed by `repo`.
    #[must_use]
    pub fn new(community: CommunityId, repo: Arc<dyn ResourceRepository>) -> Self {
        Self { community, repo }
    }

    /// The community this store is scoped to.
    #[must_use]
    pub fn community(&self) -> CommunityId {
        self.community
    }

    /// Loads every stored session, in stored order.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the read fails or the stored
    /// list cannot be decoded.
    pub async fn list(&self) -> Result<Vec<Session>, DomainError> {
        let Some(bytes) = self.repo.read(self.community, SESSIONS_KEY).await? else {
            return Ok(Vec::new());
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            DomainError::Persistence(format!(
                "session list of community {} is corrupt: {e}",
                self.community
            ))
        })
    }

    /// The id the next session should get: one above the highest stored id.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`Self::list`].
    pub async fn next_id(&self) -> Result<u32, DomainError> {
        let sessions = self.list().await?;
        Ok(sessions.iter().map(Session::id).max().map_or(1, |id| id + 1))
    }

    /// Appends a new session to the list.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidArgument` if a session with the same id
    /// is already stored, or a persistence error from the read or write.
    pub async fn append(&self, session: &Session) -> Result<(), DomainError> {
        let mut sessions = self.list().await?;
        if sessions.iter().any(|s| s.id() == session.id()) {
            return Err(DomainError::InvalidArgument(format!(
                "session {} already exists in community {}",
                session.id(),
                self.community
            )));
        }
        sessions.push(session.clone());
        self.write_all(&sessions).await
    }

    /// Replaces the stored record with the same id, appending it if absent.
    ///
    /// # Errors
    ///
    /// Returns a persistence error from the read or write.
    pub async fn save(&self, session: &Session) -> Result<(), DomainError> {
        let mut sessions = self.list().await?;
        match sessions.iter_mut().find(|s| s.id() == session.id()) {
            Some(stored) => *stored = session.clone(),
            None => sessions.push(session.clone()),
        }
        self.write_all(&sessions).await
    }

    /// The most recently created session that has not ended.
    ///
    /// # Errors
    ///
    /// Propagates failures from [`Self::list`].
    pub async fn latest_running(&self) -> Result<Option<Session>, DomainError> {
        let sessions = self.list().await?;
        Ok(latest_running(&sessions).cloned())
    }

    async fn write_all(&self, sessions: &[Session]) -> Result<(), DomainError> {
        let bytes = serde_json::to_vec(sessions)
            .map_err(|e| DomainError::Persistence(format!("session encoding failed: {e}")))?;
        self.repo.write(self.community, SESSIONS_KEY, &bytes).await?;
        debug!(community = %self.community, sessions = sessions.len(), "session list persisted");
        Ok(())
    }
}

/// Picks the running session with the latest creation time. Sessions created
/// at the same instant are ordered by id, highest wins.
#[must_use]
pub fn latest_running(sessions: &[Session]) -> Option<&Session> {
    sessions
        .iter()
        .filter(|s| s.is_running())
        .max_by(|a, b| compare_recency(a, b))
}

fn compare_recency(a: &Session, b: &Session) -> Ordering {
    a.date_created()
        .cmp(&b.date_created())
        .then_with(|| a.id().cmp(&b.id()))
}
