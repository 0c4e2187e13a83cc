//! Infrastructure adapters for ledger and registry storage backends.

pub mod ledger;
pub mod registry;

pub use ledger::{InMemoryLedger, PostgresLedger};
pub use registry::{InMemoryRegistry, PostgresRegistry};
