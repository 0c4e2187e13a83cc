//! In-memory ledger backend.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::error::BuildError;
use crate::core::ledger::ResourceLedger;
use crate::core::record::ResourceCost;
use crate::util::ids::UserId;

/// Simple in-memory ledger for development/testing.
///
/// Each call is atomic under the store lock: `try_deduct` checks every
/// quantity and subtracts all or none before releasing the write lock. The
/// lock never crosses an await, so the async trait methods stay cheap.
pub struct InMemoryLedger {
    balances: RwLock<HashMap<UserId, ResourceCost>>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
        }
    }

    /// Create a ledger pre-seeded with user balances.
    pub fn with_balances(seed: impl IntoIterator<Item = (UserId, ResourceCost)>) -> Self {
        Self {
            balances: RwLock::new(seed.into_iter().collect()),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceLedger for InMemoryLedger {
    async fn balances(&self, user_id: &UserId) -> Result<ResourceCost, BuildError> {
        self.balances
            .read()
            .get(user_id)
            .cloned()
            .ok_or_else(|| BuildError::NotFound(format!("no ledger account for {user_id}")))
    }

    async fn deposit(&self, user_id: &UserId, amounts: &ResourceCost) -> Result<(), BuildError> {
        let mut balances = self.balances.write();
        let account = balances.entry(user_id.clone()).or_default();
        for (resource, qty) in amounts {
            *account.entry(resource.clone()).or_insert(0) += qty;
        }
        Ok(())
    }

    async fn try_deduct(&self, user_id: &UserId, costs: &ResourceCost) -> Result<(), BuildError> {
        let mut balances = self.balances.write();
        let account = balances
            .get_mut(user_id)
            .ok_or_else(|| BuildError::NotFound(format!("no ledger account for {user_id}")))?;

        // Check everything before touching anything; a resource the account
        // has never held counts as zero.
        for (resource, qty) in costs {
            let held = account.get(resource).copied().unwrap_or(0);
            if held < *qty {
                return Err(BuildError::InsufficientResources(format!(
                    "{resource}: need {qty}, have {held}"
                )));
            }
        }
        for (resource, qty) in costs {
            if let Some(held) = account.get_mut(resource) {
                *held -= qty;
            } else if *qty > 0 {
                // Unreachable given the check above; kept as a guard.
                return Err(BuildError::InsufficientResources(format!(
                    "{resource}: need {qty}, have 0"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cost(pairs: &[(&str, u64)]) -> ResourceCost {
        pairs
            .iter()
            .map(|(name, qty)| (name.to_string(), *qty))
            .collect()
    }

    #[tokio::test]
    async fn deduct_subtracts_all_quantities() {
        let ledger =
            InMemoryLedger::with_balances([("alice".to_string(), cost(&[("wood", 100), ("stone", 50)]))]);
        ledger
            .try_deduct(&"alice".to_string(), &cost(&[("wood", 60), ("stone", 10)]))
            .await
            .unwrap();

        let balance = ledger.balances(&"alice".to_string()).await.unwrap();
        assert_eq!(balance.get("wood"), Some(&40));
        assert_eq!(balance.get("stone"), Some(&40));
    }

    #[tokio::test]
    async fn insufficient_leaves_balance_untouched() {
        let ledger = InMemoryLedger::with_balances([("alice".to_string(), cost(&[("wood", 5)]))]);
        let err = ledger
            .try_deduct(&"alice".to_string(), &cost(&[("wood", 3), ("stone", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::InsufficientResources(_)));

        // Partial coverage must not have spent the wood.
        let balance = ledger.balances(&"alice".to_string()).await.unwrap();
        assert_eq!(balance.get("wood"), Some(&5));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let ledger = InMemoryLedger::new();
        let err = ledger
            .try_deduct(&"ghost".to_string(), &cost(&[("wood", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(err, BuildError::NotFound(_)));
    }

    #[tokio::test]
    async fn deposit_creates_account() {
        let ledger = InMemoryLedger::new();
        ledger
            .deposit(&"bob".to_string(), &cost(&[("wood", 10)]))
            .await
            .unwrap();
        ledger
            .deposit(&"bob".to_string(), &cost(&[("wood", 5)]))
            .await
            .unwrap();
        let balance = ledger.balances(&"bob".to_string()).await.unwrap();
        assert_eq!(balance.get("wood"), Some(&15));
    }

    #[tokio::test]
    async fn zero_cost_deduct_succeeds() {
        let ledger = InMemoryLedger::with_balances([("alice".to_string(), cost(&[("wood", 1)]))]);
        ledger
            .try_deduct(&"alice".to_string(), &cost(&[("gold", 0)]))
            .await
            .unwrap();
        let balance = ledger.balances(&"alice".to_string()).await.unwrap();
        assert_eq!(balance.get("wood"), Some(&1));
    }
}
