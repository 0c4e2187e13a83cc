//! Postgres-backed registry adapter (schema and interface stubs).

use async_trait::async_trait;

use crate::core::error::BuildError;
use crate::core::record::BuildRecord;
use crate::core::registry::BuildRegistry;
use crate::util::ids::{BuildId, UserId};

/// Postgres registry adapter placeholder.
pub struct PostgresRegistry;

impl PostgresRegistry {
    /// Migration statements for the build table. The composite index over
    /// (execute_at_ms, status) serves the scheduler's due-query as a range
    /// scan.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r#"
CREATE TABLE IF NOT EXISTS sb_builds (
    id UUID PRIMARY KEY,
    user_id TEXT NOT NULL,
    build_type TEXT NOT NULL,
    start_time_ms NUMERIC NOT NULL,
    execute_at_ms NUMERIC NOT NULL,
    end_time_ms NUMERIC,
    duration_ms NUMERIC,
    status TEXT NOT NULL,
    is_valid BOOLEAN NOT NULL DEFAULT TRUE,
    error_message TEXT,
    resource_cost JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_sb_builds_due ON sb_builds (execute_at_ms, status);
CREATE INDEX IF NOT EXISTS idx_sb_builds_user_started ON sb_builds (user_id, start_time_ms DESC);
"#,
        ]
    }
}

#[async_trait]
impl BuildRegistry for PostgresRegistry {
    async fn create(&self, _record: BuildRecord) -> Result<(), BuildError> {
        Err(BuildError::Storage(
            "postgres registry not wired to database client".into(),
        ))
    }

    async fn find_by_id(&self, _id: BuildId) -> Result<BuildRecord, BuildError> {
        Err(BuildError::Storage(
            "postgres registry not wired to database client".into(),
        ))
    }

    async fn find_by_user(&self, _user_id: &UserId) -> Result<Vec<BuildRecord>, BuildError> {
        Err(BuildError::Storage(
            "postgres registry not wired to database client".into(),
        ))
    }

    async fn find_running(&self) -> Result<Vec<BuildRecord>, BuildError> {
        Err(BuildError::Storage(
            "postgres registry not wired to database client".into(),
        ))
    }

    async fn find_due(&self, _now_ms: u128) -> Result<Vec<BuildRecord>, BuildError> {
        Err(BuildError::Storage(
            "postgres registry not wired to database client".into(),
        ))
    }

    async fn update(&self, _record: BuildRecord) -> Result<(), BuildError> {
        Err(BuildError::Storage(
            "postgres registry not wired to database client".into(),
        ))
    }
}
