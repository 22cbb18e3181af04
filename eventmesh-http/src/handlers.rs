use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use eventmesh_core::resources::ResourceKey;

use crate::codec;
use crate::error::AppError;
use crate::models::{FilterSummary, IngressReceipt};
use crate::server::AppState;

/// Ingress endpoint
///
/// Admits a CloudEvent (binary or structured content mode) into the
/// addressed broker and acknowledges before fan-out completes.
#[axum::debug_handler]
pub async fn ingress_event(
    State(state): State<AppState>,
    Path((namespace, broker)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<IngressReceipt>), AppError> {
    let event = codec::decode_request(&headers, body)?;
    let key = ResourceKey::new(namespace, broker);
    let receipt = state.router.ingress(&key, event).await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

/// Filter endpoint
///
/// Evaluates the broker's triggers against the event, delivers to the
/// matches and reports the fan-out summary synchronously.
#[axum::debug_handler]
pub async fn filter_event(
    State(state): State<AppState>,
    Path((namespace, broker)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<FilterSummary>, AppError> {
    let event = codec::decode_request(&headers, body)?;
    let key = ResourceKey::new(namespace, broker);
    let summary = state.router.filter(&key, &event).await?;
    Ok(Json(summary))
}
