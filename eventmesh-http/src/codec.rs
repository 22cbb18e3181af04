//! Decoding inbound HTTP requests into CloudEvents.

use axum::body::Bytes;
use axum::http::HeaderMap;
use eventmesh_core::CloudEvent;
use eventmesh_core::error::{EventError, EventResult};
use eventmesh_core::event::codec;

/// Decodes a request as a binary-mode or structured-mode CloudEvent.
///
/// Binary mode is detected by the presence of the `ce-id` header; otherwise
/// the content type must announce a structured JSON envelope.
pub fn decode_request(headers: &HeaderMap, body: Bytes) -> EventResult<CloudEvent> {
    let borrowed = || {
        headers
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
    };

    if codec::has_binary_event(borrowed()) {
        return codec::from_binary(borrowed(), Some(body.to_vec()));
    }

    let content_type = headers
        .get(codec::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    if content_type.is_some_and(|ct| ct.starts_with(codec::STRUCTURED_CONTENT_TYPE)) {
        return codec::from_structured(&body);
    }

    Err(EventError::Decode {
        message: "request carries neither binary nor structured CloudEvent content".to_string(),
    })
}
