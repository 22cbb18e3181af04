//! # Reconciler framework
//!
//! Level-triggered status convergence. The external watch layer enqueues
//! resource keys onto a [`WorkQueue`]; a [`WorkerPool`] dequeues and invokes
//! the kind's [`Reconciler`], which recomputes the resource's full condition
//! set from dependency snapshots and persists the result. Within one pass
//! the status is an exclusively-owned local copy until the final write.

pub mod broker;
pub mod pipeline;
pub mod queue;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ReconcileResult;
use crate::resources::ResourceKey;

pub use broker::{BrokerAccess, BrokerReconciler};
pub use pipeline::{PipelineAccess, PipelineReconciler};
pub use queue::{WorkQueue, WorkerPool};

/// Entry point invoked by the scheduler for one resource key.
///
/// Returning `Some(duration)` asks for the key to be requeued after that
/// delay; `None` means converged until the next watch notification.
#[async_trait]
pub trait Reconciler: Send + Sync + 'static {
    async fn reconcile(&self, key: &ResourceKey) -> ReconcileResult<Option<Duration>>;
}
