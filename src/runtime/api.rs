//! API-facing request/response models for the routing layer.

use serde::{Deserialize, Serialize};

use crate::core::{BuildRecord, BuildService, BuildStatus, ResourceCost};
use crate::util::ids::{BuildId, UserId};

/// Build start payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartBuildRequest {
    /// Owning user.
    pub user_id: UserId,
    /// Opaque build type.
    pub build_type: String,
    /// Requested duration in milliseconds.
    pub duration_ms: u64,
    /// Resource costs; omitted resources count as zero.
    #[serde(default)]
    pub costs: ResourceCost,
}

/// Build record response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildResponse {
    /// Build identifier.
    pub id: BuildId,
    /// Owning user.
    pub user_id: UserId,
    /// Opaque build type.
    pub build_type: String,
    /// Creation time (ms since epoch).
    pub start_time_ms: u128,
    /// Due time (ms since epoch).
    pub execute_at_ms: u128,
    /// Terminal time, if terminal.
    pub end_time_ms: Option<u128>,
    /// Elapsed duration, if terminal.
    pub duration_ms: Option<u128>,
    /// Lifecycle status.
    pub status: BuildStatus,
    /// Duration sanity flag.
    pub is_valid: bool,
    /// Failure detail, if Failed.
    pub error_message: Option<String>,
    /// Costs snapshotted at creation.
    pub resource_cost: ResourceCost,
}

impl From<BuildRecord> for BuildResponse {
    fn from(rec: BuildRecord) -> Self {
        Self {
            id: rec.id,
            user_id: rec.user_id,
            build_type: rec.build_type,
            start_time_ms: rec.start_time_ms,
            execute_at_ms: rec.execute_at_ms,
            end_time_ms: rec.end_time_ms,
            duration_ms: rec.duration_ms,
            status: rec.status,
            is_valid: rec.is_valid,
            error_message: rec.error_message,
            resource_cost: rec.resource_cost,
        }
    }
}

/// Balance listing response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    /// Owning user.
    pub user_id: UserId,
    /// Resource balances.
    pub balances: ResourceCost,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Start a build on behalf of a request. Placeholder mapping; the HTTP layer
/// translates the error taxonomy to protocol responses.
pub async fn start_build(
    service: &BuildService,
    req: StartBuildRequest,
) -> Result<BuildResponse, String> {
    service
        .start_build(&req.user_id, &req.build_type, req.duration_ms, &req.costs)
        .await
        .map(BuildResponse::from)
        .map_err(|e| e.to_string())
}

/// Look up a build.
pub async fn get_build(service: &BuildService, id: BuildId) -> Result<BuildResponse, String> {
    service
        .get_build(id)
        .await
        .map(BuildResponse::from)
        .map_err(|e| e.to_string())
}

/// List a user's builds, newest first.
pub async fn list_user_builds(
    service: &BuildService,
    user_id: &UserId,
) -> Result<Vec<BuildResponse>, String> {
    service
        .get_user_builds(user_id)
        .await
        .map(|recs| recs.into_iter().map(BuildResponse::from).collect())
        .map_err(|e| e.to_string())
}

/// Read a user's balances.
pub async fn get_balances(
    service: &BuildService,
    user_id: &UserId,
) -> Result<BalanceResponse, String> {
    service
        .get_balances(user_id)
        .await
        .map(|balances| BalanceResponse {
            user_id: user_id.clone(),
            balances,
        })
        .map_err(|e| e.to_string())
}

/// Return a health payload.
pub fn health() -> Health {
    Health { ok: true }
}
