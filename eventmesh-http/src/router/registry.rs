//! In-memory view of brokers and their bound triggers.
//!
//! The registry is the data plane's read model: reconcilers (or the bootstrap
//! CLI) register brokers and bind triggers; the router only takes snapshots.

use dashmap::DashMap;
use eventmesh_core::filter::TriggerFilter;
use eventmesh_core::resources::ResourceKey;
use url::Url;

/// A trigger as the data plane sees it: a filter and a resolved subscriber.
#[derive(Debug, Clone)]
pub struct BoundTrigger {
    pub name: String,
    pub filter: TriggerFilter,
    pub subscriber: Url,
}

/// Concurrent broker-to-triggers map.
#[derive(Debug, Default)]
pub struct TriggerRegistry {
    brokers: DashMap<ResourceKey, Vec<BoundTrigger>>,
}

impl TriggerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a broker with no triggers. Idempotent.
    pub fn register_broker(&self, key: ResourceKey) {
        self.brokers.entry(key).or_default();
    }

    pub fn unregister_broker(&self, key: &ResourceKey) {
        self.brokers.remove(key);
    }

    pub fn has_broker(&self, key: &ResourceKey) -> bool {
        self.brokers.contains_key(key)
    }

    /// Binds a trigger to a broker, replacing any binding with the same name.
    ///
    /// The broker is registered implicitly if it was not known yet.
    pub fn bind(&self, broker: &ResourceKey, trigger: BoundTrigger) {
        let mut triggers = self.brokers.entry(broker.clone()).or_default();
        if let Some(existing) = triggers.iter_mut().find(|t| t.name == trigger.name) {
            *existing = trigger;
        } else {
            triggers.push(trigger);
        }
    }

    pub fn unbind(&self, broker: &ResourceKey, name: &str) {
        if let Some(mut triggers) = self.brokers.get_mut(broker) {
            triggers.retain(|t| t.name != name);
        }
    }

    /// Snapshot of the broker's triggers, or `None` for an unknown broker.
    pub fn snapshot(&self, broker: &ResourceKey) -> Option<Vec<BoundTrigger>> {
        self.brokers.get(broker).map(|t| t.clone())
    }
}
