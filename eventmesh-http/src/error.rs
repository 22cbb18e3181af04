//! Error handling for eventmesh-http
//!
//! This module maps the core error taxonomy onto HTTP responses. Delivery
//! failures never surface here: the fan-out isolates them per trigger and
//! reports them through the filter summary instead.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use eventmesh_core::EventError;
use eventmesh_core::resources::ResourceKey;
use serde_json::json;
use std::cmp::PartialEq;

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// The request did not carry a decodable, valid CloudEvent
    Event(EventError),

    /// The addressed broker is not registered
    UnknownBroker(ResourceKey),
}

impl From<EventError> for AppError {
    fn from(err: EventError) -> Self {
        Self::Event(err)
    }
}

impl PartialEq<StatusCode> for AppError {
    fn eq(&self, status_code: &StatusCode) -> bool {
        let (error_status, _) = self.status_and_message();
        &error_status == status_code
    }
}

impl AppError {
    /// Get the status code and error message for this error
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::Event(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::UnknownBroker(key) => (
                StatusCode::NOT_FOUND,
                format!("Broker not found: {}", key),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
