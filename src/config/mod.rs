//! Configuration models for the build engine.

pub mod engine;

pub use engine::{EngineConfig, LedgerBackendConfig, RegistryBackendConfig};
