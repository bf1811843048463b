// ── Spoof instance registry ──
//
// Keyed collection of interception-instance descriptors. Pure map
// operations — starting/stopping the underlying processes is the
// lifecycle manager's job, and the manager is the only owner of this
// collection.

use std::collections::HashMap;

use crate::model::{SpoofInstance, SpoofKey, SpoofSelector};

/// Keyed collection of registered spoof instances.
#[derive(Default)]
pub struct SpoofInstanceRegistry {
    instances: HashMap<SpoofKey, SpoofInstance>,
}

impl SpoofInstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &SpoofKey) -> Option<&SpoofInstance> {
        self.instances.get(key)
    }

    /// Install an instance under its key, returning the displaced one.
    pub fn insert(&mut self, instance: SpoofInstance) -> Option<SpoofInstance> {
        self.instances.insert(instance.key.clone(), instance)
    }

    /// Remove and return every instance the selector matches.
    pub fn remove_matching(&mut self, selector: &SpoofSelector) -> Vec<SpoofInstance> {
        let keys: Vec<SpoofKey> = self
            .instances
            .keys()
            .filter(|key| selector.matches(key))
            .cloned()
            .collect();

        keys.iter()
            .filter_map(|key| self.instances.remove(key))
            .collect()
    }

    pub fn mark_running(&mut self, key: &SpoofKey, running: bool) {
        if let Some(instance) = self.instances.get_mut(key) {
            instance.running = running;
        }
    }

    pub fn values(&self) -> impl Iterator<Item = &SpoofInstance> {
        self.instances.values()
    }

    pub fn snapshot(&self) -> Vec<SpoofInstance> {
        self.instances.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
