//! Identifier generation capability.

use uuid::Uuid;

/// Source of fresh user identifiers. A capability so tests can pin ids.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> Uuid;
}

/// Random version-4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn generate(&self) -> Uuid {
        Uuid::new_v4()
    }
}
