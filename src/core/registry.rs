//! Build registry abstraction.

use async_trait::async_trait;

use crate::core::error::BuildError;
use crate::core::record::BuildRecord;
use crate::util::ids::{BuildId, UserId};

/// Store of build records.
///
/// Records are inserted once, updated only by the completion engine, and
/// never deleted. Backends must serve `find_due` from an index over
/// (execute_at, status) — the scheduler and the recovery sweep both run it at
/// high frequency and a full scan is not acceptable.
#[async_trait]
pub trait BuildRegistry: Send + Sync {
    /// Insert a new record.
    ///
    /// # Errors
    /// `Storage` if a record with the same id already exists or the backend
    /// rejects the write.
    async fn create(&self, record: BuildRecord) -> Result<(), BuildError>;

    /// Point lookup by id.
    ///
    /// # Errors
    /// `NotFound` if no record has this id.
    async fn find_by_id(&self, id: BuildId) -> Result<BuildRecord, BuildError>;

    /// All builds for a user, ordered by start time descending.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<BuildRecord>, BuildError>;

    /// All Running builds, ordered by execute-at ascending.
    async fn find_running(&self) -> Result<Vec<BuildRecord>, BuildError>;

    /// Running builds with `execute_at_ms <= now_ms`, ordered by execute-at
    /// ascending. This is the due-query driven by the scheduler tick and the
    /// startup reconciler.
    async fn find_due(&self, now_ms: u128) -> Result<Vec<BuildRecord>, BuildError>;

    /// Persist an updated record.
    ///
    /// # Errors
    /// `NotFound` if the record was never created.
    async fn update(&self, record: BuildRecord) -> Result<(), BuildError>;
}
