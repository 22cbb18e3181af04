//! Event mesh data-plane HTTP server
//!
//! Exposes the broker's ingress and filter endpoints over HTTP. The
//! control-plane side (reconcilers, condition convergence) lives in
//! eventmesh-core; this crate wires the router, trigger registry and
//! delivery client behind an axum server.

pub mod codec;
pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod routes;
pub mod server;

pub use error::AppError;
pub use router::{BoundTrigger, BrokerRouter, TriggerRegistry};
pub use server::{AppState, ServerConfig, build_state, start_server};
