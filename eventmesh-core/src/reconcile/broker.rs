use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::Reconciler;
use crate::error::ReconcileResult;
use crate::resources::{Broker, BrokerStatus, ChannelSnapshot, ResourceKey, ServiceSnapshot};
use crate::status::Addressable;

/// Collaborator contract over the watch/cache layer for brokers.
#[async_trait]
pub trait BrokerAccess: Send + Sync + 'static {
    async fn get(&self, key: &ResourceKey) -> ReconcileResult<Option<Broker>>;
    async fn ingress_service(&self, key: &ResourceKey)
    -> ReconcileResult<Option<ServiceSnapshot>>;
    async fn filter_service(&self, key: &ResourceKey)
    -> ReconcileResult<Option<ServiceSnapshot>>;
    async fn trigger_channel(&self, key: &ResourceKey)
    -> ReconcileResult<Option<ChannelSnapshot>>;
    async fn update_status(&self, key: &ResourceKey, status: BrokerStatus) -> ReconcileResult<()>;
}

pub struct BrokerReconciler<A: BrokerAccess> {
    access: Arc<A>,
}

impl<A: BrokerAccess> BrokerReconciler<A> {
    pub fn new(access: Arc<A>) -> Self {
        Self { access }
    }
}

#[async_trait]
impl<A: BrokerAccess> Reconciler for BrokerReconciler<A> {
    #[instrument(skip(self), fields(key = %key))]
    async fn reconcile(&self, key: &ResourceKey) -> ReconcileResult<Option<Duration>> {
        let Some(broker) = self.access.get(key).await? else {
            debug!("broker is gone, nothing to reconcile");
            return Ok(None);
        };

        let mut status = broker.status.clone();
        status.initialize_conditions();

        let ingress = self.access.ingress_service(key).await?;
        let filter = self.access.filter_service(key).await?;
        let channel = self.access.trigger_channel(key).await?;

        status.propagate_ingress_ready(ingress.as_ref());
        status.propagate_filter_ready(filter.as_ref());
        status.propagate_trigger_channel(channel.as_ref());
        // The broker is addressed through its ingress service.
        status.set_address(ingress.as_ref().map(|s| {
            Addressable::from_hostname(format!("{}.{}.svc", s.key.name, s.key.namespace))
        }));
        status.observed_generation = broker.generation;

        self.access.update_status(key, status).await?;
        Ok(None)
    }
}
