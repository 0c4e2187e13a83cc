//! Audit sink implementations.
//!
//! Provides in-memory logging and Postgres schema definitions for audit
//! persistence. The coordinator records `start` and the completion engine
//! records `complete`/`fail`; recovery sweeps go through the engine and
//! show up as ordinary completions.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::util::clock::now_ms;

/// Audit event structure.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related build identifier.
    pub build_id: String,
    /// Owning user identifier.
    pub user_id: String,
    /// Action taken (start, complete, fail).
    pub action: String,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// Shared handle to an audit sink, lockable from any component.
pub type SharedAuditSink = Arc<parking_lot::Mutex<Box<dyn AuditSink>>>;

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Postgres-backed audit sink (schema-only; DB I/O not wired).
pub struct PostgresAuditSink;

impl PostgresAuditSink {
    /// Returns SQL migration statements for the audit log.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r#"
CREATE TABLE IF NOT EXISTS sb_audit_events (
    event_id TEXT PRIMARY KEY,
    build_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    action TEXT NOT NULL,
    detail JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE INDEX IF NOT EXISTS idx_sb_audit_events_user_created ON sb_audit_events (user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_sb_audit_events_build ON sb_audit_events (build_id);
"#,
        ]
    }
}

impl AuditSink for PostgresAuditSink {
    fn record(&mut self, _event: AuditEvent) {
        // Stub: actual DB writes require a runtime + client; left to integration layer.
    }
}

/// Helper to build an audit event from context.
pub fn build_audit_event(
    event_id: impl Into<String>,
    build_id: impl Into<String>,
    user_id: impl Into<String>,
    action: impl Into<String>,
    detail: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: event_id.into(),
        build_id: build_id.into(),
        user_id: user_id.into(),
        action: action.into(),
        created_at_ms: now_ms(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_buffer_drops_oldest() {
        let mut sink = InMemoryAuditSink::new(2);
        for i in 0..3 {
            sink.record(build_audit_event(
                format!("e{i}"),
                "b1",
                "alice",
                "start",
                None,
            ));
        }
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_id, "e1");
        assert_eq!(events[1].event_id, "e2");
    }
}
