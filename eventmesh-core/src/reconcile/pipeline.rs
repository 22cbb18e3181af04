use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::Reconciler;
use crate::error::ReconcileResult;
use crate::resources::{
    ChannelSnapshot, Pipeline, PipelineStatus, ResourceKey, SubscriptionSnapshot,
};

/// Collaborator contract over the watch/cache layer for pipelines: fetch the
/// resource, list its dependency snapshots, persist its status.
#[async_trait]
pub trait PipelineAccess: Send + Sync + 'static {
    async fn get(&self, key: &ResourceKey) -> ReconcileResult<Option<Pipeline>>;
    async fn channels(&self, key: &ResourceKey) -> ReconcileResult<Vec<ChannelSnapshot>>;
    async fn subscriptions(&self, key: &ResourceKey)
    -> ReconcileResult<Vec<SubscriptionSnapshot>>;
    async fn update_status(&self, key: &ResourceKey, status: PipelineStatus)
    -> ReconcileResult<()>;
}

pub struct PipelineReconciler<A: PipelineAccess> {
    access: Arc<A>,
}

impl<A: PipelineAccess> PipelineReconciler<A> {
    pub fn new(access: Arc<A>) -> Self {
        Self { access }
    }
}

#[async_trait]
impl<A: PipelineAccess> Reconciler for PipelineReconciler<A> {
    #[instrument(skip(self), fields(key = %key))]
    async fn reconcile(&self, key: &ResourceKey) -> ReconcileResult<Option<Duration>> {
        let Some(pipeline) = self.access.get(key).await? else {
            debug!("pipeline is gone, nothing to reconcile");
            return Ok(None);
        };

        // Local copy, exclusively owned until the final persist.
        let mut status = pipeline.status.clone();
        status.initialize_conditions();

        let channels = self.access.channels(key).await?;
        let subscriptions = self.access.subscriptions(key).await?;

        status.propagate_channel_statuses(&channels);
        status.propagate_subscription_statuses(&subscriptions);
        // The pipeline is addressed through its first channel.
        status.set_address(channels.first().and_then(|c| c.address.clone()));
        status.observed_generation = pipeline.generation;

        self.access.update_status(key, status).await?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{Addressable, Condition, ConditionStatus, ConditionType};
    use chrono::Utc;
    use tokio::sync::Mutex;
    use url::Url;

    struct FakeAccess {
        pipeline: Pipeline,
        channels: Vec<ChannelSnapshot>,
        subscriptions: Vec<SubscriptionSnapshot>,
        written: Mutex<Option<PipelineStatus>>,
    }

    #[async_trait]
    impl PipelineAccess for FakeAccess {
        async fn get(&self, _key: &ResourceKey) -> ReconcileResult<Option<Pipeline>> {
            Ok(Some(self.pipeline.clone()))
        }

        async fn channels(&self, _key: &ResourceKey) -> ReconcileResult<Vec<ChannelSnapshot>> {
            Ok(self.channels.clone())
        }

        async fn subscriptions(
            &self,
            _key: &ResourceKey,
        ) -> ReconcileResult<Vec<SubscriptionSnapshot>> {
            Ok(self.subscriptions.clone())
        }

        async fn update_status(
            &self,
            _key: &ResourceKey,
            status: PipelineStatus,
        ) -> ReconcileResult<()> {
            *self.written.lock().await = Some(status);
            Ok(())
        }
    }

    fn channel(name: &str, addressed: bool) -> ChannelSnapshot {
        ChannelSnapshot {
            key: ResourceKey::new("testns", name),
            address: addressed.then(|| {
                Addressable::from_url(Url::parse(&format!("http://{name}.testns.svc")).unwrap())
            }),
        }
    }

    fn subscription(name: &str, ready: bool) -> SubscriptionSnapshot {
        let status = if ready {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        };
        SubscriptionSnapshot {
            key: ResourceKey::new("testns", name),
            conditions: vec![Condition {
                condition_type: ConditionType::Ready,
                status,
                reason: String::new(),
                message: String::new(),
                last_transition_time: Utc::now(),
            }],
        }
    }

    fn fake(
        channels: Vec<ChannelSnapshot>,
        subscriptions: Vec<SubscriptionSnapshot>,
    ) -> Arc<FakeAccess> {
        Arc::new(FakeAccess {
            pipeline: Pipeline {
                key: ResourceKey::new("testns", "pipeline"),
                generation: 3,
                status: PipelineStatus::default(),
            },
            channels,
            subscriptions,
            written: Mutex::new(None),
        })
    }

    #[tokio::test]
    async fn test_reconcile_converges_to_ready() {
        let access = fake(
            vec![channel("step-0", true), channel("step-1", true)],
            vec![subscription("sub-0", true), subscription("sub-1", true)],
        );
        let reconciler = PipelineReconciler::new(access.clone());
        let key = ResourceKey::new("testns", "pipeline");

        let requeue = reconciler.reconcile(&key).await.unwrap();
        assert!(requeue.is_none());

        let written = access.written.lock().await.clone().unwrap();
        assert!(written.is_ready());
        assert_eq!(written.observed_generation, 3);
        // Addressed through the first channel.
        assert_eq!(written.address.hostname.as_deref(), Some("step-0.testns.svc"));
    }

    #[tokio::test]
    async fn test_reconcile_with_unready_subscription_is_not_ready() {
        let access = fake(
            vec![channel("step-0", true)],
            vec![subscription("sub-0", true), subscription("sub-1", false)],
        );
        let reconciler = PipelineReconciler::new(access.clone());
        let key = ResourceKey::new("testns", "pipeline");

        reconciler.reconcile(&key).await.unwrap();

        let written = access.written.lock().await.clone().unwrap();
        assert!(!written.is_ready());
        let ready = written.get_condition(ConditionType::Ready).unwrap();
        assert_eq!(ready.status, ConditionStatus::False);
    }

    #[tokio::test]
    async fn test_reconcile_without_dependents_is_not_ready() {
        let access = fake(vec![], vec![]);
        let reconciler = PipelineReconciler::new(access.clone());
        let key = ResourceKey::new("testns", "pipeline");

        reconciler.reconcile(&key).await.unwrap();

        let written = access.written.lock().await.clone().unwrap();
        assert!(!written.is_ready());
        assert!(!written.address.is_resolved());
    }
}
