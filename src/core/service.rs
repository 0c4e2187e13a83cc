//! Facade exposing the engine's operations to the request-routing layer.

use std::sync::Arc;
use std::time::Duration;

use crate::core::audit::SharedAuditSink;
use crate::core::coordinator::TransactionCoordinator;
use crate::core::error::BuildError;
use crate::core::ledger::ResourceLedger;
use crate::core::record::{BuildRecord, ResourceCost};
use crate::core::registry::BuildRegistry;
use crate::util::ids::{BuildId, UserId};

/// The operations consumed by the (external) routing/validation layer.
///
/// Completion is deliberately absent: there is no externally reachable
/// operation that finalizes a build. Only the scheduler and the startup
/// reconciler drive the completion engine, which eliminates client-side
/// manipulation of completion times.
pub struct BuildService {
    ledger: Arc<dyn ResourceLedger>,
    registry: Arc<dyn BuildRegistry>,
    coordinator: TransactionCoordinator,
}

impl BuildService {
    /// Create a service over the given stores. `op_timeout` bounds every
    /// store call made on behalf of a request.
    pub fn new(
        ledger: Arc<dyn ResourceLedger>,
        registry: Arc<dyn BuildRegistry>,
        op_timeout: Duration,
    ) -> Self {
        let coordinator =
            TransactionCoordinator::new(Arc::clone(&ledger), Arc::clone(&registry), op_timeout);
        Self {
            ledger,
            registry,
            coordinator,
        }
    }

    /// Attach an audit sink to the start path.
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.coordinator = self.coordinator.with_audit(audit);
        self
    }

    /// Atomically deduct `costs` and create a Running build due after
    /// `duration_ms`. See [`TransactionCoordinator::start_build`].
    ///
    /// # Errors
    /// `Validation`, `InsufficientResources`, `NotFound`, or `Storage`; in
    /// every error case the ledger and registry are unchanged.
    pub async fn start_build(
        &self,
        user_id: &UserId,
        build_type: &str,
        duration_ms: u64,
        costs: &ResourceCost,
    ) -> Result<BuildRecord, BuildError> {
        self.coordinator
            .start_build(user_id, build_type, duration_ms, costs)
            .await
    }

    /// Point lookup of a build.
    ///
    /// # Errors
    /// `NotFound` for an unknown id.
    pub async fn get_build(&self, id: BuildId) -> Result<BuildRecord, BuildError> {
        self.registry.find_by_id(id).await
    }

    /// All builds for a user, newest first.
    ///
    /// # Errors
    /// `Storage` on backend failure.
    pub async fn get_user_builds(&self, user_id: &UserId) -> Result<Vec<BuildRecord>, BuildError> {
        self.registry.find_by_user(user_id).await
    }

    /// Current resource balances for a user.
    ///
    /// # Errors
    /// `NotFound` if the user has no ledger account.
    pub async fn get_balances(&self, user_id: &UserId) -> Result<ResourceCost, BuildError> {
        self.ledger.balances(user_id).await
    }

    /// All Running builds ordered by due time. Observability surface.
    ///
    /// # Errors
    /// `Storage` on backend failure.
    pub async fn get_running_builds(&self) -> Result<Vec<BuildRecord>, BuildError> {
        self.registry.find_running().await
    }

    /// Builds due at `now_ms`. Exposed for observability and testing, not
    /// for client-triggered completion.
    ///
    /// # Errors
    /// `Storage` on backend failure.
    pub async fn get_builds_to_complete(
        &self,
        now_ms: u128,
    ) -> Result<Vec<BuildRecord>, BuildError> {
        self.registry.find_due(now_ms).await
    }
}
