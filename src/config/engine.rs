//! Engine configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::completion::CompletionBounds;

/// Ledger backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerBackendConfig {
    /// In-memory ledger for development/testing.
    InMemory,
    /// Postgres ledger.
    Postgres,
}

/// Registry backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryBackendConfig {
    /// In-memory registry.
    InMemory,
    /// Postgres registry.
    Postgres,
}

/// Root engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Scheduler tick interval in seconds.
    pub tick_interval_secs: u64,
    /// Upper bound for any single store call in seconds.
    pub op_timeout_secs: u64,
    /// Minimum acceptable completion duration in milliseconds.
    pub min_duration_ms: u64,
    /// Maximum acceptable completion duration in milliseconds, if bounded.
    pub max_duration_ms: Option<u64>,
    /// Ledger backend selection.
    pub ledger: LedgerBackendConfig,
    /// Registry backend selection.
    pub registry: RegistryBackendConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 5,
            op_timeout_secs: 10,
            min_duration_ms: 1,
            max_duration_ms: None,
            ledger: LedgerBackendConfig::InMemory,
            registry: RegistryBackendConfig::InMemory,
        }
    }
}

impl EngineConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_interval_secs == 0 {
            return Err("tick_interval_secs must be greater than 0".into());
        }
        if self.op_timeout_secs == 0 {
            return Err("op_timeout_secs must be greater than 0".into());
        }
        if let Some(max) = self.max_duration_ms {
            if max < self.min_duration_ms {
                return Err("max_duration_ms must not be below min_duration_ms".into());
            }
        }
        Ok(())
    }

    /// Parse engine configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: EngineConfig =
            serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Scheduler tick interval.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    /// Store call timeout.
    pub fn op_timeout(&self) -> Duration {
        Duration::from_secs(self.op_timeout_secs)
    }

    /// Duration bounds for the completion engine.
    pub fn completion_bounds(&self) -> CompletionBounds {
        CompletionBounds {
            min_duration_ms: u128::from(self.min_duration_ms),
            max_duration_ms: self.max_duration_ms.map(u128::from),
        }
    }
}
