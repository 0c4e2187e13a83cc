//! Build record data model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::util::ids::{BuildId, UserId};

/// Snapshot of resource quantities, keyed by resource name.
///
/// Costs are copied into the record at creation so later ledger changes can
/// never retroactively alter history.
pub type ResourceCost = BTreeMap<String, u64>;

/// Status of a build in its lifecycle. Transitions are monotonic and one-way:
/// Running moves to Completed or Failed exactly once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildStatus {
    /// Build is in progress; `execute_at_ms` says when it is due.
    Running,
    /// Build finished at its due time.
    Completed,
    /// Build was terminated with an error.
    Failed,
}

impl BuildStatus {
    /// Whether no further transitions can occur.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A single build, created Running and retained forever as an audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildRecord {
    /// Unique identifier, generated at creation.
    pub id: BuildId,
    /// Owning user.
    pub user_id: UserId,
    /// Opaque build type supplied by the caller (e.g. "barracks").
    pub build_type: String,
    /// Server time at creation, milliseconds since epoch.
    pub start_time_ms: u128,
    /// When the build is due: `start_time_ms + requested duration`. Computed
    /// once at creation and never recomputed; the sole authority for "done".
    pub execute_at_ms: u128,
    /// Server time at the terminal transition. None while Running.
    pub end_time_ms: Option<u128>,
    /// Wall-clock elapsed time at completion. None while Running.
    pub duration_ms: Option<u128>,
    /// Lifecycle status.
    pub status: BuildStatus,
    /// Result of the post-hoc duration sanity check.
    pub is_valid: bool,
    /// Failure detail; set only when status is Failed.
    pub error_message: Option<String>,
    /// Resources deducted at creation, snapshotted for audit.
    pub resource_cost: ResourceCost,
}

impl BuildRecord {
    /// Create a Running record due at `start_time_ms + duration_ms`.
    pub fn new_running(
        id: BuildId,
        user_id: impl Into<UserId>,
        build_type: impl Into<String>,
        start_time_ms: u128,
        duration_ms: u64,
        resource_cost: ResourceCost,
    ) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            build_type: build_type.into(),
            start_time_ms,
            execute_at_ms: start_time_ms + u128::from(duration_ms),
            end_time_ms: None,
            duration_ms: None,
            status: BuildStatus::Running,
            is_valid: true,
            error_message: None,
            resource_cost,
        }
    }

    /// Whether this record is due at `now_ms`: still Running with its
    /// execute-at time in the past or exactly now.
    pub fn is_due(&self, now_ms: u128) -> bool {
        self.status == BuildStatus::Running && self.execute_at_ms <= now_ms
    }
}
