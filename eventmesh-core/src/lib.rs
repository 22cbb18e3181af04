//! # eventmesh-core
//!
//! Core of a Kubernetes-native event mesh: producers publish CloudEvents to a
//! logical broker, triggers express filtered subscriptions, and the control
//! plane converges every resource's multi-dependency readiness into a single
//! observable condition.
//!
//! ## Subsystems
//!
//! - Status convergence ([`status`], [`resources`], [`reconcile`]): a
//!   [`status::ConditionSet`] per resource kind aggregates dependent
//!   conditions into `Ready`; reconcilers recompute the full set from
//!   dependency snapshots on every pass.
//! - Routing and delivery ([`event`], [`filter`], [`delivery`]): CloudEvents
//!   are admitted at ingress, matched per trigger, and delivered over HTTP
//!   with backoff-aware dialing, connection reuse and trace propagation.
//!
//! The watch/cache machinery, CRD schemas and typed clients stay external;
//! they are consumed through the collaborator traits in [`reconcile`].

pub mod config;
pub mod delivery;
pub mod error;
pub mod event;
pub mod filter;
pub mod reconcile;
pub mod resources;
pub mod status;

pub use error::{DeliveryError, EventError, ReconcileError};
pub use event::CloudEvent;
