//! # Broker router
//!
//! The data-plane pipeline: events admitted at ingress fan out to every
//! trigger bound to the addressed broker, each matching trigger gets at most
//! one delivery, and a subscriber's synchronous reply re-enters the same
//! broker's ingress with a decremented re-entry budget.
//!
//! Cancellation propagates only on the synchronous filter path: dropping a
//! `filter` call abandons its in-flight deliveries, while ingress runs the
//! fan-out detached from the inbound request, bounded by the delivery
//! timeout rather than the producer's connection.

pub mod registry;

use std::sync::Arc;

use eventmesh_core::CloudEvent;
use eventmesh_core::delivery::DeliveryClient;
use eventmesh_core::event::TRACEPARENT_EXTENSION;
use eventmesh_core::resources::ResourceKey;
use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use crate::error::AppError;
use crate::models::{FilterSummary, IngressReceipt, ReceiptStatus};

pub use registry::{BoundTrigger, TriggerRegistry};

/// A reply event headed back into a broker's ingress.
struct Resubmission {
    broker: ResourceKey,
    event: CloudEvent,
}

/// Routes events from ingress through trigger filters to subscribers.
pub struct BrokerRouter {
    registry: Arc<TriggerRegistry>,
    client: Arc<DeliveryClient>,
    max_hops: u32,
    resubmit_tx: mpsc::Sender<Resubmission>,
}

impl BrokerRouter {
    /// Creates the router and spawns its reply pump.
    ///
    /// Replies go through a channel instead of calling ingress recursively,
    /// so a reply chain never grows the stack and stops when the router is
    /// dropped.
    pub fn new(
        registry: Arc<TriggerRegistry>,
        client: Arc<DeliveryClient>,
        max_hops: u32,
    ) -> Arc<Self> {
        let (resubmit_tx, mut resubmit_rx) = mpsc::channel::<Resubmission>(1024);
        let router = Arc::new(Self {
            registry,
            client,
            max_hops,
            resubmit_tx,
        });

        let pump = Arc::downgrade(&router);
        tokio::spawn(async move {
            while let Some(resubmission) = resubmit_rx.recv().await {
                let Some(router) = pump.upgrade() else {
                    break;
                };
                if let Err(err) = router.ingress(&resubmission.broker, resubmission.event).await {
                    warn!(broker = %resubmission.broker, ?err, "reply resubmission failed");
                }
            }
        });

        router
    }

    pub fn registry(&self) -> &TriggerRegistry {
        &self.registry
    }

    /// Admits an event into a broker.
    ///
    /// Validation failures reject the submission; an exhausted re-entry
    /// budget drops the event without error. An admitted event is stamped
    /// with the default budget when it carries none, then fanned out in the
    /// background so the producer is released immediately.
    #[instrument(skip(self, event), fields(broker = %broker, event_id = %event.id))]
    pub async fn ingress(
        self: Arc<Self>,
        broker: &ResourceKey,
        mut event: CloudEvent,
    ) -> Result<IngressReceipt, AppError> {
        event.validate()?;
        if !self.registry.has_broker(broker) {
            return Err(AppError::UnknownBroker(broker.clone()));
        }

        match event.hops() {
            Some(0) => {
                warn!("re-entry budget exhausted, dropping event");
                return Ok(IngressReceipt {
                    event_id: event.id,
                    status: ReceiptStatus::Dropped,
                });
            }
            Some(_) => {}
            None => event.set_hops(self.max_hops),
        }

        let receipt = IngressReceipt {
            event_id: event.id.clone(),
            status: ReceiptStatus::Accepted,
        };

        let router = Arc::clone(&self);
        let broker = broker.clone();
        tokio::spawn(async move {
            match router.filter(&broker, &event).await {
                Ok(summary) => debug!(broker = %broker, ?summary, "fan-out complete"),
                Err(err) => warn!(broker = %broker, ?err, "fan-out failed"),
            }
        });

        Ok(receipt)
    }

    /// Evaluates every trigger of the broker against the event and delivers
    /// to the matches, concurrently.
    ///
    /// Each matching trigger gets at most one delivery attempt; one trigger's
    /// failure never affects the others. Synchronous replies are resubmitted
    /// to the broker with a decremented re-entry budget.
    #[instrument(skip(self, event), fields(broker = %broker, event_id = %event.id))]
    pub async fn filter(
        &self,
        broker: &ResourceKey,
        event: &CloudEvent,
    ) -> Result<FilterSummary, AppError> {
        let triggers = self
            .registry
            .snapshot(broker)
            .ok_or_else(|| AppError::UnknownBroker(broker.clone()))?;

        let mut summary = FilterSummary {
            triggers: triggers.len(),
            ..FilterSummary::default()
        };

        let deliveries = triggers
            .iter()
            .filter(|t| t.filter.matches(event))
            .map(|t| self.deliver_to_trigger(broker, t, event));
        for outcome in join_all(deliveries).await {
            summary.matched += 1;
            match outcome {
                DeliveryOutcome::Acknowledged => summary.delivered += 1,
                DeliveryOutcome::Replied => {
                    summary.delivered += 1;
                    summary.replies += 1;
                }
                DeliveryOutcome::Failed => summary.failed += 1,
            }
        }

        Ok(summary)
    }

    async fn deliver_to_trigger(
        &self,
        broker: &ResourceKey,
        trigger: &BoundTrigger,
        event: &CloudEvent,
    ) -> DeliveryOutcome {
        match self.client.deliver(event, &trigger.subscriber).await {
            Ok(None) => DeliveryOutcome::Acknowledged,
            Ok(Some(reply)) => {
                self.resubmit_reply(broker, event, reply).await;
                DeliveryOutcome::Replied
            }
            Err(err) => {
                warn!(trigger = %trigger.name, subscriber = %trigger.subscriber, ?err, "delivery failed");
                DeliveryOutcome::Failed
            }
        }
    }

    /// Queues a subscriber reply for re-entry into the broker.
    ///
    /// The reply inherits the delivered event's remaining budget minus one
    /// and its trace context, when it does not carry its own.
    async fn resubmit_reply(&self, broker: &ResourceKey, event: &CloudEvent, mut reply: CloudEvent) {
        let remaining = event.hops().unwrap_or(self.max_hops).saturating_sub(1);
        reply.set_hops(remaining);
        if reply.extension(TRACEPARENT_EXTENSION).is_none() {
            if let Some(traceparent) = event.extension(TRACEPARENT_EXTENSION) {
                reply
                    .extensions
                    .insert(TRACEPARENT_EXTENSION.to_string(), traceparent.to_string());
            }
        }

        let resubmission = Resubmission {
            broker: broker.clone(),
            event: reply,
        };
        if self.resubmit_tx.send(resubmission).await.is_err() {
            warn!(broker = %broker, "reply pump is gone, dropping reply");
        }
    }
}

enum DeliveryOutcome {
    Acknowledged,
    Replied,
    Failed,
}
