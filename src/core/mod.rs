//! Core build engine: data model, stores, start transaction, and the
//! completion/recovery machinery.

pub mod audit;
pub mod completion;
pub mod coordinator;
pub mod error;
pub mod ledger;
pub mod record;
pub mod recovery;
pub mod registry;
pub mod scheduler;
pub mod service;

pub use audit::{
    build_audit_event, AuditEvent, AuditSink, InMemoryAuditSink, PostgresAuditSink,
    SharedAuditSink,
};
pub use completion::{BatchSummary, CompletionBounds, CompletionEngine, CompletionOutcome};
pub use coordinator::TransactionCoordinator;
pub use error::{AppResult, BuildError};
pub use ledger::ResourceLedger;
pub use record::{BuildRecord, BuildStatus, ResourceCost};
pub use recovery::RecoveryReconciler;
pub use registry::BuildRegistry;
pub use scheduler::{CompletionScheduler, RecurringTimer, TickSummary};
pub use service::BuildService;
