//! Postgres-backed ledger adapter (schema and interface stubs).
//!
//! The documented contract for a real implementation: `try_deduct` runs
//! inside a transaction that takes `SELECT ... FOR UPDATE` on the user's
//! balance rows, so a second concurrent deduction for the same user blocks
//! until the first commits or rolls back.

use async_trait::async_trait;

use crate::core::error::BuildError;
use crate::core::ledger::ResourceLedger;
use crate::core::record::ResourceCost;
use crate::util::ids::UserId;

/// Postgres ledger adapter placeholder.
pub struct PostgresLedger;

impl PostgresLedger {
    /// Migration statements for the balance table.
    pub fn migrations() -> &'static [&'static str] {
        &[
            r#"
CREATE TABLE IF NOT EXISTS sb_resource_balances (
    user_id TEXT NOT NULL,
    resource TEXT NOT NULL,
    quantity BIGINT NOT NULL CHECK (quantity >= 0),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (user_id, resource)
);
"#,
        ]
    }
}

#[async_trait]
impl ResourceLedger for PostgresLedger {
    async fn balances(&self, _user_id: &UserId) -> Result<ResourceCost, BuildError> {
        Err(BuildError::Storage(
            "postgres ledger not wired to database client".into(),
        ))
    }

    async fn deposit(&self, _user_id: &UserId, _amounts: &ResourceCost) -> Result<(), BuildError> {
        Err(BuildError::Storage(
            "postgres ledger not wired to database client".into(),
        ))
    }

    async fn try_deduct(&self, _user_id: &UserId, _costs: &ResourceCost) -> Result<(), BuildError> {
        Err(BuildError::Storage(
            "postgres ledger not wired to database client".into(),
        ))
    }
}
