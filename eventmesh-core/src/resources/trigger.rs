use serde::{Deserialize, Serialize};
use url::Url;

use super::{BrokerStatus, ResourceKey};
use crate::filter::TriggerFilter;
use crate::status::{Condition, ConditionSet, ConditionStatus, ConditionType, HasConditions};

/// A trigger routes through its broker only once the broker is ready and the
/// subscriber reference resolves to a concrete URL.
pub static TRIGGER_CONDITION_SET: ConditionSet = ConditionSet::new(&[
    ConditionType::BrokerReady,
    ConditionType::SubscriberResolved,
]);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub key: ResourceKey,
    pub generation: i64,
    pub spec: TriggerSpec,
    #[serde(default)]
    pub status: TriggerStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSpec {
    /// Name of the broker this trigger binds to, within the same namespace.
    pub broker: String,
    #[serde(default)]
    pub filter: TriggerFilter,
    /// Subscriber reference as written by the user; resolution happens at
    /// reconcile time.
    pub subscriber: Url,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerStatus {
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Resolved destination for deliveries, set once SubscriberResolved is
    /// true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriber_uri: Option<Url>,
}

impl TriggerStatus {
    pub fn initialize_conditions(&mut self) {
        TRIGGER_CONDITION_SET
            .manage(&mut self.conditions)
            .initialize_conditions();
    }

    pub fn get_condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        TRIGGER_CONDITION_SET.get(&self.conditions, condition_type)
    }

    pub fn is_ready(&self) -> bool {
        TRIGGER_CONDITION_SET.is_happy(&self.conditions)
    }

    /// Mirrors the broker's readiness into this trigger. A broker that is
    /// False or Unknown is not yet usable, so the trigger follows suit.
    pub fn propagate_broker_status(&mut self, broker: &BrokerStatus) {
        let mut manager = TRIGGER_CONDITION_SET.manage(&mut self.conditions);
        match broker.get_condition(ConditionType::Ready) {
            Some(c) if c.status == ConditionStatus::True => {
                manager.mark_true(ConditionType::BrokerReady)
            }
            Some(c) if c.status == ConditionStatus::False => {
                manager.mark_false(ConditionType::BrokerReady, &c.reason, &c.message)
            }
            _ => manager.mark_unknown(
                ConditionType::BrokerReady,
                "BrokerUnknown",
                "broker readiness has not converged",
            ),
        }
    }

    pub fn mark_subscriber_resolved(&mut self, uri: Url) {
        self.subscriber_uri = Some(uri);
        TRIGGER_CONDITION_SET
            .manage(&mut self.conditions)
            .mark_true(ConditionType::SubscriberResolved);
    }

    pub fn mark_subscriber_not_resolved(&mut self, reason: &str, message: &str) {
        self.subscriber_uri = None;
        TRIGGER_CONDITION_SET
            .manage(&mut self.conditions)
            .mark_false(ConditionType::SubscriberResolved, reason, message);
    }
}

impl HasConditions for TriggerStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ServiceSnapshot;
    use crate::status::Addressable;

    fn ready_broker() -> BrokerStatus {
        let mut status = BrokerStatus::default();
        status.initialize_conditions();
        status.propagate_ingress_ready(Some(&ServiceSnapshot {
            key: ResourceKey::new("testns", "ingress"),
            ready: true,
        }));
        status.propagate_filter_ready(Some(&ServiceSnapshot {
            key: ResourceKey::new("testns", "filter"),
            ready: true,
        }));
        status.propagate_trigger_channel(Some(&crate::resources::ChannelSnapshot {
            key: ResourceKey::new("testns", "chan"),
            address: Some(Addressable::from_hostname("chan.testns.svc")),
        }));
        status.set_address(Some(Addressable::from_hostname("broker.testns.svc")));
        status
    }

    #[test]
    fn test_trigger_ready_follows_broker_and_subscriber() {
        let mut status = TriggerStatus::default();
        status.initialize_conditions();
        assert!(!status.is_ready());

        status.propagate_broker_status(&ready_broker());
        assert!(!status.is_ready());

        status.mark_subscriber_resolved(Url::parse("http://subscriber.testns.svc").unwrap());
        assert!(status.is_ready());
    }

    #[test]
    fn test_unconverged_broker_keeps_trigger_unknown() {
        let mut status = TriggerStatus::default();
        status.initialize_conditions();
        status.mark_subscriber_resolved(Url::parse("http://subscriber.testns.svc").unwrap());
        status.propagate_broker_status(&BrokerStatus::default());

        let broker_ready = status.get_condition(ConditionType::BrokerReady).unwrap();
        assert_eq!(broker_ready.status, ConditionStatus::Unknown);
        assert!(!status.is_ready());
    }

    #[test]
    fn test_unresolved_subscriber_clears_uri() {
        let mut status = TriggerStatus::default();
        status.initialize_conditions();
        status.mark_subscriber_resolved(Url::parse("http://subscriber.testns.svc").unwrap());
        status.mark_subscriber_not_resolved("NotFound", "subscriber service does not exist");

        assert!(status.subscriber_uri.is_none());
        assert!(!status.is_ready());
    }
}
