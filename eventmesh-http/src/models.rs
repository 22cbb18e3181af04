//! Request and response models for the data-plane API.

use serde::{Deserialize, Serialize};

/// Outcome of an ingress submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    /// The event was admitted and fan-out is underway.
    Accepted,
    /// The event arrived with an exhausted re-entry budget and was discarded.
    Dropped,
}

/// Receipt returned by the ingress endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngressReceipt {
    pub event_id: String,
    pub status: ReceiptStatus,
}

/// Per-request summary returned by the filter endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterSummary {
    /// Triggers evaluated against the event.
    pub triggers: usize,
    /// Triggers whose filter matched.
    pub matched: usize,
    /// Deliveries acknowledged by the subscriber.
    pub delivered: usize,
    /// Deliveries that failed (rejected or unreachable).
    pub failed: usize,
    /// Synchronous replies resubmitted to the broker.
    pub replies: usize,
}
