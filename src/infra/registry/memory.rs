//! In-memory registry backend with a due index.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::core::error::BuildError;
use crate::core::record::{BuildRecord, BuildStatus};
use crate::core::registry::BuildRegistry;
use crate::util::ids::{BuildId, UserId};

struct Inner {
    records: HashMap<BuildId, BuildRecord>,
    /// Index over (execute_at_ms, id) holding only Running records, so the
    /// due query is an O(log n + k) range scan instead of a table scan.
    /// Entries are removed the moment a record turns terminal.
    running_by_due: BTreeMap<(u128, BuildId), ()>,
}

/// Simple in-memory registry for development/testing.
pub struct InMemoryRegistry {
    inner: RwLock<Inner>,
}

impl InMemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                records: HashMap::new(),
                running_by_due: BTreeMap::new(),
            }),
        }
    }

    /// Total number of records ever created (terminal included).
    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    /// Whether no record has been created.
    pub fn is_empty(&self) -> bool {
        self.inner.read().records.is_empty()
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BuildRegistry for InMemoryRegistry {
    async fn create(&self, record: BuildRecord) -> Result<(), BuildError> {
        let mut inner = self.inner.write();
        if inner.records.contains_key(&record.id) {
            return Err(BuildError::Storage(format!(
                "duplicate build id {}",
                record.id
            )));
        }
        if record.status == BuildStatus::Running {
            inner
                .running_by_due
                .insert((record.execute_at_ms, record.id), ());
        }
        inner.records.insert(record.id, record);
        Ok(())
    }

    async fn find_by_id(&self, id: BuildId) -> Result<BuildRecord, BuildError> {
        self.inner
            .read()
            .records
            .get(&id)
            .cloned()
            .ok_or_else(|| BuildError::NotFound(format!("no build with id {id}")))
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<BuildRecord>, BuildError> {
        let inner = self.inner.read();
        let mut builds: Vec<BuildRecord> = inner
            .records
            .values()
            .filter(|rec| &rec.user_id == user_id)
            .cloned()
            .collect();
        builds.sort_by(|a, b| b.start_time_ms.cmp(&a.start_time_ms));
        Ok(builds)
    }

    async fn find_running(&self) -> Result<Vec<BuildRecord>, BuildError> {
        let inner = self.inner.read();
        Ok(inner
            .running_by_due
            .keys()
            .filter_map(|(_, id)| inner.records.get(id).cloned())
            .collect())
    }

    async fn find_due(&self, now_ms: u128) -> Result<Vec<BuildRecord>, BuildError> {
        let inner = self.inner.read();
        Ok(inner
            .running_by_due
            .range(..=(now_ms, BuildId::max()))
            .filter_map(|((_, id), ())| inner.records.get(id).cloned())
            .collect())
    }

    async fn update(&self, record: BuildRecord) -> Result<(), BuildError> {
        let mut inner = self.inner.write();
        let existing = inner
            .records
            .get(&record.id)
            .ok_or_else(|| BuildError::NotFound(format!("no build with id {}", record.id)))?;

        // Keep the due index in step with status transitions.
        let was_running = existing.status == BuildStatus::Running;
        let key = (existing.execute_at_ms, existing.id);
        if was_running && record.status != BuildStatus::Running {
            inner.running_by_due.remove(&key);
        }
        inner.records.insert(record.id, record);
        Ok(())
    }
}
