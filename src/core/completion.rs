//! Terminal-state transition logic shared by the scheduler and the
//! startup reconciler.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::audit::{build_audit_event, SharedAuditSink};
use crate::core::error::BuildError;
use crate::core::record::{BuildRecord, BuildStatus};
use crate::core::registry::BuildRegistry;
use crate::util::ids::BuildId;
use crate::util::keyed_lock::KeyedMutex;

/// Configurable sanity bounds for the elapsed duration recorded at
/// completion. Out-of-bounds durations do not fail the completion; they mark
/// the record `is_valid = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionBounds {
    /// Minimum acceptable elapsed milliseconds (inclusive).
    pub min_duration_ms: u128,
    /// Maximum acceptable elapsed milliseconds (inclusive), if any.
    pub max_duration_ms: Option<u128>,
}

impl Default for CompletionBounds {
    /// The production default only requires `duration > 0`.
    fn default() -> Self {
        Self {
            min_duration_ms: 1,
            max_duration_ms: None,
        }
    }
}

impl CompletionBounds {
    /// Whether `duration_ms` falls inside the configured bounds.
    pub fn check(&self, duration_ms: u128) -> bool {
        duration_ms >= self.min_duration_ms
            && self.max_duration_ms.map_or(true, |max| duration_ms <= max)
    }
}

/// Result of a single completion attempt.
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    /// This call performed the Running -> terminal transition.
    Transitioned(BuildRecord),
    /// The record was already terminal; nothing was mutated. Benign: the
    /// scheduler and the reconciler may race on the same overdue record.
    AlreadyTerminal(BuildRecord),
}

impl CompletionOutcome {
    /// The record observed by this attempt, terminal in either case.
    pub fn record(&self) -> &BuildRecord {
        match self {
            Self::Transitioned(rec) | Self::AlreadyTerminal(rec) => rec,
        }
    }

    /// Whether this call performed the transition.
    pub fn transitioned(&self) -> bool {
        matches!(self, Self::Transitioned(_))
    }
}

/// Aggregate outcome of a batch sweep over due records.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchSummary {
    /// Records this sweep transitioned to Completed.
    pub completed: usize,
    /// Records another caller finished first (no-ops).
    pub already_terminal: usize,
    /// Records that hit a store failure and were marked Failed instead.
    pub failed: usize,
}

/// The single entry point that moves a due record to a terminal state.
///
/// Both the recurring scheduler and the startup reconciler drive completions
/// through here, guaranteeing identical semantics regardless of trigger. The
/// per-record lock plus the status check make repeated attempts on the same
/// record first-wins: later callers observe `AlreadyTerminal` and no-op.
pub struct CompletionEngine {
    registry: Arc<dyn BuildRegistry>,
    bounds: CompletionBounds,
    record_locks: KeyedMutex<BuildId>,
    op_timeout: Duration,
    audit: Option<SharedAuditSink>,
}

impl CompletionEngine {
    /// Create an engine over the registry with the given duration bounds.
    pub fn new(
        registry: Arc<dyn BuildRegistry>,
        bounds: CompletionBounds,
        op_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            bounds,
            record_locks: KeyedMutex::new(),
            op_timeout,
            audit: None,
        }
    }

    /// Attach an audit sink.
    pub fn with_audit(mut self, audit: SharedAuditSink) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Transition one record to a terminal state.
    ///
    /// Computes `duration = now - start_time` (actual elapsed time, not the
    /// originally requested duration: delay between execute-at and the tick
    /// that notices it is real elapsed time the caller should see), stamps
    /// the end time, re-checks the duration bounds, and persists. A supplied
    /// `failure_reason` yields Failed instead of Completed.
    ///
    /// # Errors
    /// - `NotFound` if no record has this id.
    /// - `Storage` on backend failure or timeout.
    pub async fn complete(
        &self,
        id: BuildId,
        now_ms: u128,
        failure_reason: Option<&str>,
    ) -> Result<CompletionOutcome, BuildError> {
        // Read-then-conditionally-write under the per-record lock; the first
        // caller in wins, everyone after sees a terminal record.
        let _guard = self.record_locks.lock(&id).await;

        let mut record = self
            .bounded("registry load", self.registry.find_by_id(id))
            .await?;

        if record.status.is_terminal() {
            tracing::debug!(build = %id, status = ?record.status, "already terminal, no-op");
            return Ok(CompletionOutcome::AlreadyTerminal(record));
        }

        let duration_ms = now_ms.saturating_sub(record.start_time_ms);
        record.end_time_ms = Some(now_ms);
        record.duration_ms = Some(duration_ms);
        record.is_valid = self.bounds.check(duration_ms);
        match failure_reason {
            Some(reason) => {
                record.status = BuildStatus::Failed;
                record.error_message = Some(reason.to_string());
            }
            None => record.status = BuildStatus::Completed,
        }

        self.bounded("registry update", self.registry.update(record.clone()))
            .await?;

        let action = match record.status {
            BuildStatus::Failed => "fail",
            _ => "complete",
        };
        self.record_audit(&record, action, failure_reason);
        tracing::info!(
            build = %id,
            status = ?record.status,
            duration_ms = duration_ms as u64,
            is_valid = record.is_valid,
            "build finished"
        );
        Ok(CompletionOutcome::Transitioned(record))
    }

    /// Complete every record in `due`, isolating per-record failures: a store
    /// error completing one record marks that record Failed with the captured
    /// message and the batch continues. One bad record never blocks the rest.
    pub async fn complete_batch(&self, due: &[BuildRecord], now_ms: u128) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for rec in due {
            match self.complete(rec.id, now_ms, None).await {
                Ok(outcome) if outcome.transitioned() => summary.completed += 1,
                Ok(_) => summary.already_terminal += 1,
                Err(err) => {
                    summary.failed += 1;
                    tracing::error!(build = %rec.id, "completion failed: {err}");
                    let reason = err.to_string();
                    if let Err(mark_err) = self.complete(rec.id, now_ms, Some(&reason)).await {
                        tracing::error!(build = %rec.id, "could not mark failed: {mark_err}");
                    }
                }
            }
        }
        summary
    }

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

    fn record_audit(&self, record: &BuildRecord, action: &str, detail: Option<&str>) {
        if let Some(audit_sink) = &self.audit {
            let mut sink = audit_sink.lock();
            sink.record(build_audit_event(
                format!("{}-{}-{}", record.id, action, record.end_time_ms.unwrap_or(0)),
                record.id.to_string(),
                record.user_id.clone(),
                action,
                detail.map(str::to_string),
            ));
        }
    }
}
