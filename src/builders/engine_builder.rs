//! Builders to construct the build engine from configuration.

use std::sync::Arc;

use crate::config::{EngineConfig, LedgerBackendConfig, RegistryBackendConfig};
use crate::core::{
    BuildError, BuildRegistry, BuildService, CompletionEngine, CompletionScheduler,
    RecoveryReconciler, ResourceLedger, SharedAuditSink,
};
use crate::infra::{InMemoryLedger, InMemoryRegistry, PostgresLedger, PostgresRegistry};

/// A fully wired engine: facade, recurring scheduler, and startup reconciler
/// sharing one ledger, one registry, and one completion engine.
pub struct BuildEngine {
    /// Operations surface for the routing layer.
    pub service: Arc<BuildService>,
    /// Steady-state completion driver.
    pub scheduler: Arc<CompletionScheduler>,
    /// One-shot startup sweep.
    pub reconciler: Arc<RecoveryReconciler>,
}

impl std::fmt::Debug for BuildEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildEngine").finish_non_exhaustive()
    }
}

/// Build an engine from configuration using provided store factories.
pub fn build_engine<FL, FR>(
    cfg: &EngineConfig,
    mut ledger_factory: FL,
    mut registry_factory: FR,
    audit: Option<SharedAuditSink>,
) -> Result<BuildEngine, BuildError>
where
    FL: FnMut(&EngineConfig) -> Result<Arc<dyn ResourceLedger>, BuildError>,
    FR: FnMut(&EngineConfig) -> Result<Arc<dyn BuildRegistry>, BuildError>,
{
    cfg.validate()
        .map_err(|e| BuildError::Validation(format!("config invalid: {e}")))?;

    let ledger = ledger_factory(cfg)?;
    let registry = registry_factory(cfg)?;

    let mut engine = CompletionEngine::new(
        Arc::clone(&registry),
        cfg.completion_bounds(),
        cfg.op_timeout(),
    );
    let mut service = BuildService::new(
        Arc::clone(&ledger),
        Arc::clone(&registry),
        cfg.op_timeout(),
    );
    if let Some(audit) = audit {
        engine = engine.with_audit(Arc::clone(&audit));
        service = service.with_audit(audit);
    }
    let engine = Arc::new(engine);

    let scheduler = Arc::new(CompletionScheduler::new(
        Arc::clone(&registry),
        Arc::clone(&engine),
        cfg.tick_interval(),
    ));
    let reconciler = Arc::new(RecoveryReconciler::new(registry, engine));

    Ok(BuildEngine {
        service: Arc::new(service),
        scheduler,
        reconciler,
    })
}

/// Build an engine from configuration using the default backend selection.
pub fn build_default_engine(
    cfg: &EngineConfig,
    audit: Option<SharedAuditSink>,
) -> Result<BuildEngine, BuildError> {
    build_engine(
        cfg,
        |cfg| match cfg.ledger {
            LedgerBackendConfig::InMemory => Ok(Arc::new(InMemoryLedger::new()) as _),
            LedgerBackendConfig::Postgres => Ok(Arc::new(PostgresLedger) as _),
        },
        |cfg| match cfg.registry {
            RegistryBackendConfig::InMemory => Ok(Arc::new(InMemoryRegistry::new()) as _),
            RegistryBackendConfig::Postgres => Ok(Arc::new(PostgresRegistry) as _),
        },
        audit,
    )
}
