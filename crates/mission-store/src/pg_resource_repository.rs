//! `PostgreSQL` implementation of the `ResourceRepository` trait.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use mission_core::error::DomainError;
use mission_core::ids::CommunityId;
use mission_core::repository::ResourceRepository;

use crate::schema::CREATE_RESOURCES_TABLE;

/// PostgreSQL-backed resource repository. One row per (community, key).
#[derive(Debug, Clone)]
pub struct PgResourceRepository {
    pool: PgPool,
}

impl PgResourceRepository {
    /// Creates a new `PgResourceRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the resources table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Persistence` if the statement fails.
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::raw_sql(CREATE_RESOURCES_TABLE)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::Persistence(format!("schema setup failed: {e}")))?;
        Ok(())
    }
}

fn db_error(op: &str, scope: CommunityId, key: &str, e: &sqlx::Error) -> DomainError {
    DomainError::Persistence(format!("{op} of {scope}/{key} failed: {e}"))
}

#[async_trait]
impl ResourceRepository for PgResourceRepository {
    async fn exists(&self, scope: CommunityId, key: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM community_resources WHERE scope = $1 AND key = $2)",
        )
        .bind(scope.to_string())
        .bind(key)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("lookup", scope, key, &e))
    }

    async fn read(&self, scope: CommunityId, key: &str) -> Result<Option<Vec<u8>>, DomainError> {
        sqlx::query_scalar::<_, Vec<u8>>(
            "SELECT body FROM community_resources WHERE scope = $1 AND key = $2",
        )
        .bind(scope.to_string())
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("read", scope, key, &e))
    }

    async fn write(&self, scope: CommunityId, key: &str, bytes: &[u8]) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO community_resources (scope, key, body, updated_at) \
             VALUES ($1, $2, $3, NOW()) \
             ON CONFLICT (scope, key) DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()",
        )
        .bind(scope.to_string())
        .bind(key)
        .bind(bytes)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("write", scope, key, &e))?;

        debug!(%scope, key, bytes = bytes.len(), "resource written");
        Ok(())
    }
}
