use std::collections::HashMap;

use crate::engine::{derive_view, invalidation_key, DeriveInput, DerivedViewResult, ViewKind};

/// Host-owned memo of derived views, keyed by invalidation key.
///
/// A hit returns exactly what a fresh derivation would, since the key
/// covers every input a view reads.
#[derive(Debug, Default)]
pub struct ViewCache {
    entries: HashMap<String, DerivedViewResult>,
    hits: u64,
    misses: u64,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn derive(&mut self, view: ViewKind, input: DeriveInput<'_>) -> DerivedViewResult {
        let key = invalidation_key(view, &input);

        if let Some(cached) = self.entries.get(&key) {
            self.hits += 1;
            tracing::trace!(view = %view, key = %key, "view cache hit");
            return cached.clone();
        }

        self.misses += 1;
        let result = derive_view(view, input);
        self.entries.insert(key, result.clone());
        result
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CapabilitySnapshot;
    use manuscript_core::{create_initial_core_state, reduce, Command};
    use serde_json::json;

    #[test]
    fn test_hit_after_miss() {
        let state = create_initial_core_state();
        let params = json!({});
        let caps = CapabilitySnapshot::default();
        let mut cache = ViewCache::new();

        let first = cache.derive(ViewKind::Comments, DeriveInput::new(&state, &params, &caps));
        let second = cache.derive(ViewKind::Comments, DeriveInput::new(&state, &params, &caps));

        assert_eq!(first, second);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn test_state_change_misses() {
        let state = create_initial_core_state();
        let next = reduce(&state, &Command::create_project("p", "T"));
        let next = next.state().unwrap();
        let params = json!({});
        let caps = CapabilitySnapshot::default();
        let mut cache = ViewCache::new();

        cache.derive(ViewKind::History, DeriveInput::new(&state, &params, &caps));
        cache.derive(ViewKind::History, DeriveInput::new(next, &params, &caps));

        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.len(), 2);
    }
}
