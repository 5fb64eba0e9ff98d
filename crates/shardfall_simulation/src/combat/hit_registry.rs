//! Per-action hit bookkeeping.
//!
//! One registry scope belongs to one `AttackAction` or one beam invocation.
//! Re-sampling the same target inside a scope never damages it twice.

use std::collections::HashSet;

use bevy::prelude::*;

#[derive(Debug, Clone, Default)]
pub struct HitRegistry {
    scope: u64,
    hits: HashSet<Entity>,
}

impl HitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears previous hits and opens a new scope. Must run before the first
    /// sample of a new action.
    pub fn begin_scope(&mut self) -> u64 {
        self.hits.clear();
        self.scope += 1;
        self.scope
    }

    pub fn scope(&self) -> u64 {
        self.scope
    }

    /// `true` if `target` was not yet credited in this scope.
    pub fn try_register(&mut self, target: Entity) -> bool {
        self.hits.insert(target)
    }

    pub fn contains(&self, target: Entity) -> bool {
        self.hits.contains(&target)
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn clear(&mut self) {
        self.hits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_once_per_scope() {
        let target = Entity::from_raw(7);
        let mut registry = HitRegistry::new();
        registry.begin_scope();

        assert!(registry.try_register(target));
        assert!(!registry.try_register(target));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_new_scope_forgets_hits() {
        let target = Entity::from_raw(7);
        let mut registry = HitRegistry::new();
        let first = registry.begin_scope();
        registry.try_register(target);

        let second = registry.begin_scope();
        assert!(second > first);
        assert!(!registry.contains(target));
        assert!(registry.try_register(target));
    }
}
