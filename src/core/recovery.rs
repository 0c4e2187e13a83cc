//! Startup reconciliation of builds left due across an outage.

use std::sync::Arc;

use crate::core::completion::CompletionEngine;
use crate::core::registry::BuildRegistry;
use crate::util::clock::now_ms;

/// One-shot sweep run at process startup, before or concurrently with the
/// first scheduler tick. Completes every record the outage left due, through
/// the same engine the scheduler uses, so the semantics are identical and
/// racing the scheduler is safe: whichever caller observes Running first
/// wins, the other no-ops on `AlreadyTerminal`.
pub struct RecoveryReconciler {
    registry: Arc<dyn BuildRegistry>,
    engine: Arc<CompletionEngine>,
}

impl RecoveryReconciler {
    /// Create a reconciler over the shared registry and engine.
    pub fn new(registry: Arc<dyn BuildRegistry>, engine: Arc<CompletionEngine>) -> Self {
        Self { registry, engine }
    }

    /// Sweep all currently due records and return how many this sweep
    /// transitioned to Completed. Per-record failures are isolated exactly as
    /// in a scheduler tick; no record's failure aborts the sweep.
    pub async fn reconcile(&self) -> usize {
        let now = now_ms();
        let due = match self.registry.find_due(now).await {
            Ok(due) => due,
            Err(err) => {
                tracing::error!("recovery due query failed: {err}");
                return 0;
            }
        };

        if due.is_empty() {
            tracing::info!("recovery: no builds left due");
            return 0;
        }

        tracing::info!(due = due.len(), "recovery: completing builds left due");
        let batch = self.engine.complete_batch(&due, now).await;
        tracing::info!(
            completed = batch.completed,
            failed = batch.failed,
            already_terminal = batch.already_terminal,
            "recovery finished"
        );
        batch.completed
    }
}
