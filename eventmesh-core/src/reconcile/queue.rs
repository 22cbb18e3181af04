//! Work queue and worker pool driving reconciliation.
//!
//! Watch notifications enqueue resource keys; a pool of workers dequeues and
//! invokes the reconciler. The queue coalesces keys that are already pending,
//! and an in-flight guard re-enqueues keys that arrive while being
//! reconciled, so at most one reconciliation runs per distinct key while
//! different keys proceed in parallel.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Reconciler;
use crate::resources::ResourceKey;

/// Delay before a key is retried after a failed reconciliation.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Pause before re-enqueueing a key that is currently being reconciled.
const INFLIGHT_REQUEUE_DELAY: Duration = Duration::from_millis(10);

pub struct WorkQueue {
    tx: mpsc::Sender<ResourceKey>,
    rx: Mutex<mpsc::Receiver<ResourceKey>>,
    pending: DashSet<ResourceKey>,
    inflight: DashSet<ResourceKey>,
}

impl WorkQueue {
    pub fn new(capacity: usize) -> Arc<Self> {
        let (tx, rx) = mpsc::channel(capacity);
        Arc::new(Self {
            tx,
            rx: Mutex::new(rx),
            pending: DashSet::new(),
            inflight: DashSet::new(),
        })
    }

    /// Enqueues a key for reconciliation. A key already pending is coalesced
    /// into the existing entry; returns whether the key was newly queued.
    pub async fn enqueue(&self, key: ResourceKey) -> bool {
        if !self.pending.insert(key.clone()) {
            return false;
        }
        if self.tx.send(key.clone()).await.is_err() {
            self.pending.remove(&key);
            return false;
        }
        true
    }
}

pub struct WorkerPool;

impl WorkerPool {
    /// Spawns `workers` tasks draining the queue into the reconciler.
    ///
    /// The handles run until the queue is dropped; they are returned so a
    /// caller can await or abort them on shutdown.
    pub fn spawn<R: Reconciler>(
        queue: Arc<WorkQueue>,
        reconciler: Arc<R>,
        workers: usize,
    ) -> Vec<JoinHandle<()>> {
        (0..workers)
            .map(|worker| {
                let queue = queue.clone();
                let reconciler = reconciler.clone();
                tokio::spawn(async move {
                    Self::run_worker(worker, queue, reconciler).await;
                })
            })
            .collect()
    }

    async fn run_worker<R: Reconciler>(worker: usize, queue: Arc<WorkQueue>, reconciler: Arc<R>) {
        loop {
            let key = {
                let mut rx = queue.rx.lock().await;
                rx.recv().await
            };
            let Some(key) = key else {
                break;
            };
            queue.pending.remove(&key);

            // Single writer per key: if another worker holds this key, put
            // it back and move on.
            if !queue.inflight.insert(key.clone()) {
                requeue_after(queue.clone(), key, INFLIGHT_REQUEUE_DELAY);
                continue;
            }

            match reconciler.reconcile(&key).await {
                Ok(Some(after)) => {
                    debug!(worker, key = %key, after_ms = after.as_millis() as u64, "requeueing");
                    requeue_after(queue.clone(), key.clone(), after);
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(worker, key = %key, error = %err, "reconcile failed");
                    requeue_after(queue.clone(), key.clone(), RETRY_DELAY);
                }
            }
            queue.inflight.remove(&key);
        }
    }
}

fn requeue_after(queue: Arc<WorkQueue>, key: ResourceKey, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        queue.enqueue(key).await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconcileResult;
    use async_trait::async_trait;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct RecordingReconciler {
        calls: DashMap<ResourceKey, u32>,
        concurrent: AtomicU32,
        max_concurrent_per_key: DashMap<ResourceKey, u32>,
        hold: Duration,
        requeue_once_after: Option<Duration>,
    }

    impl RecordingReconciler {
        fn new(hold: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: DashMap::new(),
                concurrent: AtomicU32::new(0),
                max_concurrent_per_key: DashMap::new(),
                hold,
                requeue_once_after: None,
            })
        }

        fn calls_for(&self, key: &ResourceKey) -> u32 {
            self.calls.get(key).map(|c| *c).unwrap_or(0)
        }
    }

    #[async_trait]
    impl Reconciler for RecordingReconciler {
        async fn reconcile(
            &self,
            key: &ResourceKey,
        ) -> ReconcileResult<Option<Duration>> {
            let running = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrent_per_key
                .entry(key.clone())
                .and_modify(|max| *max = (*max).max(running))
                .or_insert(running);
            let count = {
                let mut entry = self.calls.entry(key.clone()).or_insert(0);
                *entry += 1;
                *entry
            };
            tokio::time::sleep(self.hold).await;
            self.concurrent.fetch_sub(1, Ordering::SeqCst);

            if count == 1 {
                if let Some(after) = self.requeue_once_after {
                    return Ok(Some(after));
                }
            }
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_pending_keys_coalesce() {
        let queue = WorkQueue::new(16);
        let key = ResourceKey::new("testns", "broker");

        assert!(queue.enqueue(key.clone()).await);
        assert!(!queue.enqueue(key.clone()).await);
        assert!(!queue.enqueue(key.clone()).await);

        let reconciler = RecordingReconciler::new(Duration::from_millis(5));
        let _workers = WorkerPool::spawn(queue.clone(), reconciler.clone(), 2);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(reconciler.calls_for(&key), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_reconcile_in_parallel() {
        let queue = WorkQueue::new(16);
        let reconciler = RecordingReconciler::new(Duration::from_millis(100));
        let _workers = WorkerPool::spawn(queue.clone(), reconciler.clone(), 2);

        let start = tokio::time::Instant::now();
        queue.enqueue(ResourceKey::new("testns", "a")).await;
        queue.enqueue(ResourceKey::new("testns", "b")).await;

        tokio::time::sleep(Duration::from_millis(160)).await;
        assert_eq!(reconciler.calls_for(&ResourceKey::new("testns", "a")), 1);
        assert_eq!(reconciler.calls_for(&ResourceKey::new("testns", "b")), 1);
        // Both completed well before two sequential holds would have.
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_same_key_never_reconciles_concurrently() {
        let queue = WorkQueue::new(16);
        let reconciler = RecordingReconciler::new(Duration::from_millis(50));
        let _workers = WorkerPool::spawn(queue.clone(), reconciler.clone(), 4);
        let key = ResourceKey::new("testns", "hot");

        queue.enqueue(key.clone()).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        // Arrives while the first pass is still running.
        queue.enqueue(key.clone()).await;

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(reconciler.calls_for(&key), 2);
        assert_eq!(*reconciler.max_concurrent_per_key.get(&key).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_requeue_after_redelivers_key() {
        let queue = WorkQueue::new(16);
        let reconciler = Arc::new(RecordingReconciler {
            calls: DashMap::new(),
            concurrent: AtomicU32::new(0),
            max_concurrent_per_key: DashMap::new(),
            hold: Duration::from_millis(1),
            requeue_once_after: Some(Duration::from_millis(20)),
        });
        let _workers = WorkerPool::spawn(queue.clone(), reconciler.clone(), 1);
        let key = ResourceKey::new("testns", "periodic");

        queue.enqueue(key.clone()).await;
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(reconciler.calls_for(&key), 2);
    }
}
