//! Identifier types shared across the engine.

use uuid::Uuid;

/// Unique identifier of a build record.
pub type BuildId = Uuid;

/// Identifier of the user owning balances and builds. Opaque to the engine;
/// issued by the upstream account system.
pub type UserId = String;

/// Generate a fresh build identifier.
pub fn new_build_id() -> BuildId {
    Uuid::new_v4()
}
