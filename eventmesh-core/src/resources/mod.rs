//! Resource kinds reconciled by the mesh control plane, plus the dependency
//! snapshot types supplied by the external watch layer.

pub mod broker;
pub mod pipeline;
pub mod trigger;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::status::{Addressable, Condition, ConditionStatus, ConditionType};

pub use broker::{BROKER_CONDITION_SET, Broker, BrokerStatus};
pub use pipeline::{PIPELINE_CONDITION_SET, Pipeline, PipelineStatus};
pub use trigger::{TRIGGER_CONDITION_SET, Trigger, TriggerSpec, TriggerStatus};

/// Identity of a resource: namespace plus name, rendered `ns/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Status snapshot of a dependent channel.
///
/// A channel is usable once its address resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub key: ResourceKey,
    #[serde(default)]
    pub address: Option<Addressable>,
}

impl ChannelSnapshot {
    pub fn is_ready(&self) -> bool {
        self.address.as_ref().is_some_and(Addressable::is_resolved)
    }
}

/// Status snapshot of a dependent subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub key: ResourceKey,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl SubscriptionSnapshot {
    pub fn is_ready(&self) -> bool {
        self.conditions
            .iter()
            .any(|c| c.condition_type == ConditionType::Ready && c.status == ConditionStatus::True)
    }
}

/// Status snapshot of a dependent service workload (ingress or filter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub key: ResourceKey,
    pub ready: bool,
}
