//! Shared utilities.

pub mod clock;
pub mod ids;
pub mod keyed_lock;
pub mod telemetry;

pub use clock::*;
pub use ids::*;
pub use keyed_lock::*;
pub use telemetry::*;
