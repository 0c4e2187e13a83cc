//! Atomic start-build coordination across ledger and registry.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::core::audit::{build_audit_event, SharedAuditSink};
use crate::core::error::BuildError;
use crate::core::ledger::ResourceLedger;
use crate::core::record::{BuildRecord, ResourceCost};
use crate::core::registry::BuildRegistry;
use crate::util::clock::now_ms;
use crate::util::ids::{new_build_id, UserId};
use crate::util::keyed_lock::KeyedMutex;

/// Composes the resource ledger and the build registry into one atomic
/// "start build" operation.
///
/// Two concurrent `start_build` calls for the same user are fully serialized
/// at the per-user lock, so no lost update or double-spend is possible.
/// Different users never contend. The whole unit is all-or-nothing: either
/// the deduction and the new Running record become visible together, or the
/// ledger and registry are left exactly as they were.
pub struct TransactionCoordinator {
    ledger: Arc<dyn ResourceLedger>,
    registry: Arc<dyn BuildRegistry>,
    user_locks: KeyedMutex<UserId>,
    op_timeout: Duration,
    audit: Option<SharedAuditSink>,
}

impl TransactionCoordinator {
    /// Create a coordinator over the given stores. `op_timeout` bounds every
    /// individual store call; a timed-out call rolls the unit back.
    pub fn new(
        ledger: Arc<dyn ResourceLedger>,
        registry: Arc<dyn BuildRegistry>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            registry,
            user_locks: KeyedMutex::new(),
            op_timeout,
            audit: None,
        }
    }

    /// Attach an audit sink.
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Start a build: deduct `costs` from the user's balance and create a
    /// Running record due at `now + duration_ms`, atomically.
    ///
    /// # Errors
    /// - `Validation` for empty identifiers or a non-positive duration,
    ///   rejected before the user lock is taken.
    /// - `InsufficientResources` if the balance cannot cover `costs`; no
    ///   mutation occurs.
    /// - `NotFound` if the user has no ledger account.
    /// - `Storage` for backend failures or timeouts; any partial deduction is
    ///   compensated before returning.
    pub async fn start_build(
        &self,
        user_id: &UserId,
        build_type: &str,
        duration_ms: u64,
        costs: &ResourceCost,
    ) -> Result<BuildRecord, BuildError> {
        // Fail fast with zero side effects; the lock is not taken yet.
        if user_id.is_empty() {
            return Err(BuildError::Validation("user_id must not be empty".into()));
        }
        if build_type.is_empty() {
            return Err(BuildError::Validation("build_type must not be empty".into()));
        }
        if duration_ms == 0 {
            return Err(BuildError::Validation(
                "duration_ms must be greater than 0".into(),
            ));
        }

        // Serialize all spending for this user. Held until the unit commits
        // or rolls back, so a second concurrent deduction cannot interleave.
        let _guard = self.user_locks.lock(user_id).await;

        self.bounded("ledger deduct", self.ledger.try_deduct(user_id, costs))
            .await?;

        let start_time_ms = now_ms();
        let record = BuildRecord::new_running(
            new_build_id(),
            user_id.clone(),
            build_type,
            start_time_ms,
            duration_ms,
            costs.clone(),
        );

        if let Err(err) = self
            .bounded("registry create", self.registry.create(record.clone()))
            .await
        {
            tracing::error!(
                user = %user_id,
                build = %record.id,
                "record insert failed after deduction, refunding: {err}"
            );
            // Compensate inside the same user lock so the unit has zero
            // observable effect.
            if let Err(refund_err) = self
                .bounded("ledger refund", self.ledger.deposit(user_id, costs))
                .await
            {
                tracing::error!(user = %user_id, "refund failed: {refund_err}");
                return Err(BuildError::Storage(format!(
                    "insert failed ({err}) and refund failed ({refund_err})"
                )));
            }
            return Err(err);
        }

        self.record_audit(&record, "start");
        tracing::info!(
            user = %user_id,
            build = %record.id,
            build_type,
            execute_at_ms = record.execute_at_ms as u64,
            "build started"
        );
        Ok(record)
    }

    /// Bound a store call by the configured operation timeout.
    async fn bounded<T>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T, BuildError>>,
    ) -> Result<T, BuildError> {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(res) => res,
            Err(_) => Err(BuildError::Storage(format!(
                "{what} timed out after {:?}",
                self.op_timeout
            ))),
        }
    }

    fn record_audit(&self, record: &BuildRecord, action: &str) {
        if let Some(audit_sink) = &self.audit {
            let mut sink = audit_sink.lock();
            sink.record(build_audit_event(
                format!("{}-{}-{}", record.id, action, record.start_time_ms),
                record.id.to_string(),
                record.user_id.clone(),
                action,
                None,
            ));
        }
    }
}
