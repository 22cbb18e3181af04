use serde::{Deserialize, Serialize};

use super::{ChannelSnapshot, ResourceKey, SubscriptionSnapshot};
use crate::status::{
    Addressable, Condition, ConditionSet, ConditionType, HasAddress, HasConditions,
};

/// A pipeline chains subscriber steps through channels and subscriptions; its
/// readiness is the aggregate of both dependency collections plus its own
/// address.
pub static PIPELINE_CONDITION_SET: ConditionSet = ConditionSet::new(&[
    ConditionType::Addressable,
    ConditionType::ChannelsReady,
    ConditionType::SubscriptionsReady,
]);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub key: ResourceKey,
    pub generation: i64,
    #[serde(default)]
    pub status: PipelineStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineStatus {
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub address: Addressable,
}

impl PipelineStatus {
    pub fn initialize_conditions(&mut self) {
        PIPELINE_CONDITION_SET
            .manage(&mut self.conditions)
            .initialize_conditions();
    }

    pub fn get_condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        PIPELINE_CONDITION_SET.get(&self.conditions, condition_type)
    }

    pub fn is_ready(&self) -> bool {
        PIPELINE_CONDITION_SET.is_happy(&self.conditions)
    }

    /// Aggregates the channel collection: ready iff non-empty and every
    /// channel's address resolves.
    pub fn propagate_channel_statuses(&mut self, channels: &[ChannelSnapshot]) {
        PIPELINE_CONDITION_SET
            .manage(&mut self.conditions)
            .propagate_child_statuses(ConditionType::ChannelsReady, channels, |c| c.is_ready());
    }

    /// Aggregates the subscription collection: ready iff non-empty and every
    /// subscription reports Ready.
    pub fn propagate_subscription_statuses(&mut self, subscriptions: &[SubscriptionSnapshot]) {
        PIPELINE_CONDITION_SET
            .manage(&mut self.conditions)
            .propagate_child_statuses(ConditionType::SubscriptionsReady, subscriptions, |s| {
                s.is_ready()
            });
    }

    /// Stores the address and converges the Addressable condition. A missing
    /// address is stored as an empty one, never treated as an error.
    pub fn set_address(&mut self, address: Option<Addressable>) {
        self.address = address.unwrap_or_default().normalized();
        let mut manager = PIPELINE_CONDITION_SET.manage(&mut self.conditions);
        if self.address.is_resolved() {
            manager.mark_true(ConditionType::Addressable);
        } else {
            manager.mark_false(
                ConditionType::Addressable,
                "AddressUnresolved",
                "neither url nor hostname is set",
            );
        }
    }
}

impl HasConditions for PipelineStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

impl HasAddress for PipelineStatus {
    fn address(&self) -> &Addressable {
        &self.address
    }
}
