use thiserror::Error;

use crate::resources::ResourceKey;

/// Errors raised while constructing or decoding CloudEvents.
///
/// Every variant maps to a malformed event: the event is rejected at the
/// admission point, never forwarded and never retried.
#[derive(Error, Debug)]
pub enum EventError {
    #[error("missing required attribute: {attribute}")]
    MissingAttribute { attribute: &'static str },
    #[error("unsupported specversion: {found}")]
    InvalidSpecVersion { found: String },
    #[error("failed to decode event: {message}")]
    Decode { message: String },
}

pub type EventResult<T> = Result<T, EventError>;

/// Errors raised by the delivery client.
///
/// `DialTimeout` means the backoff budget was exhausted without ever
/// establishing a connection. Any other network error during dialing aborts
/// immediately and surfaces through `Connection`, so callers can tell
/// "never connected" apart from "connected then rejected".
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("timed out dialing {address} after {attempts} attempts")]
    DialTimeout { address: String, attempts: u32 },
    #[error("connection error: {0}")]
    Connection(#[from] std::io::Error),
    #[error("delivery rejected with status {status}")]
    Rejected { status: u16 },
    #[error("request failed: {message}")]
    Request { message: String },
    #[error("failed to decode reply event: {0}")]
    ReplyDecode(#[from] EventError),
}

pub type DeliveryResult<T> = Result<T, DeliveryError>;

/// Errors raised during a reconciliation pass.
///
/// Condition aggregation itself never fails; these cover the collaborator
/// boundary (snapshot listing and the status write).
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("resource not found: {0}")]
    NotFound(ResourceKey),
    #[error("failed to list dependency snapshots: {message}")]
    SnapshotUnavailable { message: String },
    #[error("failed to persist status: {message}")]
    StatusPersist { message: String },
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;
