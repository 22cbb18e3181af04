use serde::{Deserialize, Serialize};

use super::{ChannelSnapshot, ResourceKey, ServiceSnapshot};
use crate::status::{
    Addressable, Condition, ConditionSet, ConditionType, HasAddress, HasConditions,
};

/// A broker is ready once its ingress and filter workloads run, its trigger
/// channel is addressable, and it exposes an address of its own.
pub static BROKER_CONDITION_SET: ConditionSet = ConditionSet::new(&[
    ConditionType::Addressable,
    ConditionType::FilterReady,
    ConditionType::IngressReady,
    ConditionType::TriggerChannelReady,
]);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broker {
    pub key: ResourceKey,
    pub generation: i64,
    #[serde(default)]
    pub status: BrokerStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerStatus {
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub address: Addressable,
}

impl BrokerStatus {
    pub fn initialize_conditions(&mut self) {
        BROKER_CONDITION_SET
            .manage(&mut self.conditions)
            .initialize_conditions();
    }

    pub fn get_condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        BROKER_CONDITION_SET.get(&self.conditions, condition_type)
    }

    pub fn is_ready(&self) -> bool {
        BROKER_CONDITION_SET.is_happy(&self.conditions)
    }

    pub fn propagate_ingress_ready(&mut self, service: Option<&ServiceSnapshot>) {
        self.propagate_service(ConditionType::IngressReady, service);
    }

    pub fn propagate_filter_ready(&mut self, service: Option<&ServiceSnapshot>) {
        self.propagate_service(ConditionType::FilterReady, service);
    }

    /// Absence of the workload snapshot is lack of information, not failure.
    fn propagate_service(&mut self, condition_type: ConditionType, service: Option<&ServiceSnapshot>) {
        let mut manager = BROKER_CONDITION_SET.manage(&mut self.conditions);
        match service {
            None => manager.mark_unknown(
                condition_type,
                "ServicePending",
                "workload has not been observed yet",
            ),
            Some(s) if s.ready => manager.mark_true(condition_type),
            Some(s) => manager.mark_false(
                condition_type,
                "ServiceNotReady",
                &format!("workload {} is not ready", s.key),
            ),
        }
    }

    pub fn propagate_trigger_channel(&mut self, channel: Option<&ChannelSnapshot>) {
        let mut manager = BROKER_CONDITION_SET.manage(&mut self.conditions);
        match channel {
            None => manager.mark_unknown(
                ConditionType::TriggerChannelReady,
                "ChannelPending",
                "trigger channel has not been observed yet",
            ),
            Some(c) if c.is_ready() => manager.mark_true(ConditionType::TriggerChannelReady),
            Some(c) => manager.mark_false(
                ConditionType::TriggerChannelReady,
                "ChannelNotAddressable",
                &format!("trigger channel {} has no resolved address", c.key),
            ),
        }
    }

    pub fn set_address(&mut self, address: Option<Addressable>) {
        self.address = address.unwrap_or_default().normalized();
        let mut manager = BROKER_CONDITION_SET.manage(&mut self.conditions);
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

impl HasConditions for BrokerStatus {
    fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

impl HasAddress for BrokerStatus {
    fn address(&self) -> &Addressable {
        &self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ConditionStatus;
    use url::Url;

    fn ready_channel() -> ChannelSnapshot {
        ChannelSnapshot {
            key: ResourceKey::new("testns", "broker-chan"),
            address: Some(Addressable::from_url(
                Url::parse("http://chan.testns.svc").unwrap(),
            )),
        }
    }

    fn service(name: &str, ready: bool) -> ServiceSnapshot {
        ServiceSnapshot {
            key: ResourceKey::new("testns", name),
            ready,
        }
    }

    #[test]
    fn test_broker_becomes_ready_when_all_dependents_converge() {
        let mut status = BrokerStatus::default();
        status.initialize_conditions();
        assert!(!status.is_ready());

        status.propagate_ingress_ready(Some(&service("ingress", true)));
        status.propagate_filter_ready(Some(&service("filter", true)));
        status.propagate_trigger_channel(Some(&ready_channel()));
        status.set_address(Some(Addressable::from_hostname("broker.testns.svc")));

        assert!(status.is_ready());
    }

    #[test]
    fn test_unobserved_workload_leaves_ready_unknown() {
        let mut status = BrokerStatus::default();
        status.initialize_conditions();
        status.propagate_ingress_ready(None);
        status.propagate_filter_ready(Some(&service("filter", true)));
        status.propagate_trigger_channel(Some(&ready_channel()));
        status.set_address(Some(Addressable::from_hostname("broker.testns.svc")));

        let ready = status.get_condition(ConditionType::Ready).unwrap();
        assert_eq!(ready.status, ConditionStatus::Unknown);
    }

    #[test]
    fn test_failed_workload_marks_ready_false_with_reason() {
        let mut status = BrokerStatus::default();
        status.initialize_conditions();
        status.propagate_ingress_ready(Some(&service("ingress", false)));
        status.propagate_filter_ready(Some(&service("filter", true)));
        status.propagate_trigger_channel(Some(&ready_channel()));
        status.set_address(Some(Addressable::from_hostname("broker.testns.svc")));

        let ready = status.get_condition(ConditionType::Ready).unwrap();
        assert_eq!(ready.status, ConditionStatus::False);
        assert_eq!(ready.reason, "ServiceNotReady");
    }
}
