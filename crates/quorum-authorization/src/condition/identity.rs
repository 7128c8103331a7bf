//! Identity-gating condition
//!
//! Grants a call only when the caller's object identifier, as reported by an
//! [`ObjectRegistry`], equals the identifier fixed at construction.

use super::{ConditionContext, ConditionError, PermissionCondition};
use parking_lot::RwLock;
use quorum_core::calldata::Word;
use quorum_core::Address;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only lookup of object identifiers
pub trait ObjectRegistry: Send + Sync {
    /// Identifier of `object`, or `None` when it does not exist
    fn identify(&self, object: Address) -> Option<Word>;
}

/// Registry backed by an in-memory map
#[derive(Debug, Default)]
pub struct InMemoryObjectRegistry {
    objects: RwLock<BTreeMap<Address, Word>>,
}

impl InMemoryObjectRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the identifier of `object`
    pub fn register(&self, object: Address, id: Word) {
        self.objects.write().insert(object, id);
    }

    /// Forget `object`
    pub fn remove(&self, object: Address) {
        self.objects.write().remove(&object);
    }
}

impl ObjectRegistry for InMemoryObjectRegistry {
    fn identify(&self, object: Address) -> Option<Word> {
        self.objects.read().get(&object).copied()
    }
}

/// Grants only callers whose registered identifier equals `expected`
pub struct IdentityCondition {
    registry: Arc<dyn ObjectRegistry>,
    expected: Word,
}

impl IdentityCondition {
    /// Gate on `expected` as reported by `registry`
    pub fn new(registry: Arc<dyn ObjectRegistry>, expected: Word) -> Self {
        Self { registry, expected }
    }
}

impl PermissionCondition for IdentityCondition {
    fn is_granted(&self, ctx: &ConditionContext<'_>) -> Result<bool, ConditionError> {
        let actual = self
            .registry
            .identify(ctx.who)
            .ok_or(ConditionError::ObjectNotFound { object: ctx.who })?;
        if actual != self.expected {
            return Err(ConditionError::IdMismatch {
                object: ctx.who,
                expected: self.expected,
                actual,
            });
        }
        Ok(true)
    }
}
