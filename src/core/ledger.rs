//! Resource ledger abstraction.

use async_trait::async_trait;

use crate::core::error::BuildError;
use crate::core::record::ResourceCost;
use crate::util::ids::UserId;

/// Store of per-user resource balances.
///
/// Every quantity is a non-negative integer; no mutation may drive a balance
/// below zero. `try_deduct` is the only spending path and must be
/// check-and-deduct atomic per call: either every named quantity is
/// subtracted or none is. Callers that need cross-call serialization (the
/// transaction coordinator) hold the per-user lock around the call; the
/// backend itself only guarantees single-call atomicity.
#[async_trait]
pub trait ResourceLedger: Send + Sync {
    /// Current balances for a user.
    ///
    /// # Errors
    /// `NotFound` if the user has no ledger account.
    async fn balances(&self, user_id: &UserId) -> Result<ResourceCost, BuildError>;

    /// Add quantities to a user's balance, creating the account if absent.
    /// Used for seeding and for refund compensation on rollback.
    async fn deposit(&self, user_id: &UserId, amounts: &ResourceCost) -> Result<(), BuildError>;

    /// Check every quantity in `costs` against the balance and subtract all
    /// of them, or subtract nothing.
    ///
    /// # Errors
    /// - `NotFound` if the user has no ledger account.
    /// - `InsufficientResources` if any quantity cannot be covered; the
    ///   balance is left untouched.
    async fn try_deduct(&self, user_id: &UserId, costs: &ResourceCost) -> Result<(), BuildError>;
}
