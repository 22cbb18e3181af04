//! # Resilient delivery client
//!
//! Delivers one CloudEvent over HTTP to one destination, guarding first
//! contact with a host through the backoff dialer, reusing pooled
//! connections, and propagating trace context on egress.
//!
//! Scope boundary: only the dial phase retries. A request that fails after a
//! connection is established — mid-transfer error or non-2xx response — is
//! surfaced to the caller unmodified; request-level redelivery policy belongs
//! there, not here.

pub mod dialer;

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use crate::config::{DialConfig, MeshConfig};
use crate::error::{DeliveryError, DeliveryResult};
use crate::event::{CloudEvent, TRACEPARENT_EXTENSION, codec};

pub use dialer::{Dialer, TcpDialer, dial_with_backoff};

/// Shared HTTP delivery client.
///
/// One instance per process: the underlying transport's connection pool and
/// its idle limits are a process-wide resource.
pub struct DeliveryClient {
    http: reqwest::Client,
    dialer: Arc<dyn Dialer>,
    dial_config: DialConfig,
    /// Hosts whose first contact already went through the backoff dialer.
    warmed: DashMap<String, ()>,
}

impl DeliveryClient {
    pub fn new(config: &MeshConfig) -> DeliveryResult<Self> {
        Self::with_dialer(config, Arc::new(TcpDialer))
    }

    pub fn with_dialer(config: &MeshConfig, dialer: Arc<dyn Dialer>) -> DeliveryResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(config.delivery_timeout);
        if let Some(limit) = config.connection.idle_per_host() {
            builder = builder.pool_max_idle_per_host(limit);
        }
        let http = builder.build().map_err(|e| DeliveryError::Request {
            message: e.to_string(),
        })?;
        Ok(Self {
            http,
            dialer,
            dial_config: config.dial.clone(),
            warmed: DashMap::new(),
        })
    }

    /// Delivers the event to `target` in binary content mode.
    ///
    /// Returns the subscriber's synchronous reply event when the response
    /// carries one, `None` on a plain 2xx. A non-2xx response yields
    /// [`DeliveryError::Rejected`] and is not retried here.
    #[instrument(skip(self, event), fields(event_id = %event.id, target = %target))]
    pub async fn deliver(
        &self,
        event: &CloudEvent,
        target: &Url,
    ) -> DeliveryResult<Option<CloudEvent>> {
        self.warm(target).await?;

        let mut request = self.http.post(target.clone());
        for (name, value) in codec::binary_headers(event) {
            request = request.header(name, value);
        }
        // Egress always carries trace context; mint one when the event
        // arrived without it.
        if event.extension(TRACEPARENT_EXTENSION).is_none() {
            request = request.header(codec::TRACEPARENT, new_traceparent());
        }
        if let Some(data) = &event.data {
            request = request.body(data.clone());
        }

        let response = request.send().await.map_err(|e| DeliveryError::Request {
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
            });
        }

        let headers: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let content_type = headers
            .iter()
            .find(|(name, _)| name == codec::CONTENT_TYPE)
            .map(|(_, value)| value.clone());
        let body = response
            .bytes()
            .await
            .map_err(|e| DeliveryError::Request {
                message: e.to_string(),
            })?;

        let borrowed = headers.iter().map(|(n, v)| (n.as_str(), v.as_str()));
        if codec::has_binary_event(borrowed.clone()) {
            let reply = codec::from_binary(borrowed, Some(body.to_vec()))?;
            return Ok(Some(reply));
        }
        if content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with(codec::STRUCTURED_CONTENT_TYPE))
        {
            let reply = codec::from_structured(&body)?;
            return Ok(Some(reply));
        }
        Ok(None)
    }

    /// First contact with a destination host goes through the backoff
    /// dialer, so transient connection failures during rollout don't bubble
    /// up as hard delivery errors.
    async fn warm(&self, target: &Url) -> DeliveryResult<()> {
        let host = target.host_str().ok_or_else(|| DeliveryError::Request {
            message: format!("target {target} has no host"),
        })?;
        let address = match target.port_or_known_default() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        if self.warmed.contains_key(&address) {
            return Ok(());
        }
        let conn = dial_with_backoff(self.dialer.as_ref(), &address, &self.dial_config).await?;
        drop(conn);
        debug!(address = %address, "warmed destination");
        self.warmed.insert(address, ());
        Ok(())
    }
}

fn new_traceparent() -> String {
    let trace_id = Uuid::new_v4().simple().to_string();
    let span_id = &Uuid::new_v4().simple().to_string()[..16];
    format!("00-{trace_id}-{span_id}-01")
}
