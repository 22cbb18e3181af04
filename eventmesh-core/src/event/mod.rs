//! # CloudEvents model
//!
//! [`CloudEvent`] is the envelope routed through the mesh. An event is
//! admitted at ingress, validated once, and treated as immutable from then
//! on; a subscriber's synchronous reply is a newly constructed event, never a
//! mutation of the original.
//!
//! The HTTP mappings (binary and structured content mode) live in [`codec`].

pub mod codec;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{EventError, EventResult};

/// Extension attribute carrying the remaining re-entry budget of an event.
///
/// Stamped at ingress when absent and decremented every time a reply is
/// resubmitted, so a subscriber that always replies cannot loop forever.
pub const HOPS_EXTENSION: &str = "hops";

/// Extension attribute carrying the W3C trace context of the delivery chain.
pub const TRACEPARENT_EXTENSION: &str = "traceparent";

/// A CloudEvents envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudEvent {
    pub id: String,
    pub source: String,
    pub specversion: String,
    pub event_type: String,
    pub time: Option<DateTime<Utc>>,
    pub content_type: Option<String>,
    pub data: Option<Vec<u8>>,
    pub extensions: BTreeMap<String, String>,
}

impl CloudEvent {
    pub fn builder() -> CloudEventBuilder {
        CloudEventBuilder::default()
    }

    /// Checks presence of the required context attributes.
    ///
    /// Only presence (and a supported specversion) is enforced; payload
    /// schema validation is out of scope.
    pub fn validate(&self) -> EventResult<()> {
        if self.id.is_empty() {
            return Err(EventError::MissingAttribute { attribute: "id" });
        }
        if self.source.is_empty() {
            return Err(EventError::MissingAttribute { attribute: "source" });
        }
        if self.event_type.is_empty() {
            return Err(EventError::MissingAttribute { attribute: "type" });
        }
        if self.specversion.is_empty() {
            return Err(EventError::MissingAttribute {
                attribute: "specversion",
            });
        }
        if !self.specversion.starts_with("1.") {
            return Err(EventError::InvalidSpecVersion {
                found: self.specversion.clone(),
            });
        }
        Ok(())
    }

    pub fn extension(&self, name: &str) -> Option<&str> {
        self.extensions.get(name).map(String::as_str)
    }

    /// Remaining re-entry budget, if the event carries one.
    pub fn hops(&self) -> Option<u32> {
        self.extension(HOPS_EXTENSION).and_then(|v| v.parse().ok())
    }

    pub fn set_hops(&mut self, hops: u32) {
        self.extensions
            .insert(HOPS_EXTENSION.to_string(), hops.to_string());
    }
}

/// Fluent builder for [`CloudEvent`].
///
/// `build()` fills in an id (UUID v4), the current time and specversion
/// `1.0` when unset, then validates the result.
#[derive(Debug, Default)]
pub struct CloudEventBuilder {
    id: Option<String>,
    source: Option<String>,
    specversion: Option<String>,
    event_type: Option<String>,
    time: Option<DateTime<Utc>>,
    content_type: Option<String>,
    data: Option<Vec<u8>>,
    extensions: BTreeMap<String, String>,
}

impl CloudEventBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn specversion(mut self, specversion: impl Into<String>) -> Self {
        self.specversion = Some(specversion.into());
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn extension(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions.insert(name.into(), value.into());
        self
    }

    pub fn build(self) -> EventResult<CloudEvent> {
        let event = CloudEvent {
            id: self.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            source: self.source.unwrap_or_default(),
            specversion: self.specversion.unwrap_or_else(|| "1.0".to_string()),
            event_type: self.event_type.unwrap_or_default(),
            time: self.time.or_else(|| Some(Utc::now())),
            content_type: self.content_type,
            data: self.data,
            extensions: self.extensions,
        };
        event.validate()?;
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_fills_defaults() {
        let event = CloudEvent::builder()
            .source("/sender")
            .event_type("mesh.test")
            .build()
            .unwrap();

        assert!(!event.id.is_empty());
        assert_eq!(event.specversion, "1.0");
        assert!(event.time.is_some());
    }

    #[test]
    fn test_builder_requires_source_and_type() {
        let missing_source = CloudEvent::builder().event_type("mesh.test").build();
        assert!(matches!(
            missing_source,
            Err(EventError::MissingAttribute { attribute: "source" })
        ));

        let missing_type = CloudEvent::builder().source("/sender").build();
        assert!(matches!(
            missing_type,
            Err(EventError::MissingAttribute { attribute: "type" })
        ));
    }

    #[test]
    fn test_validate_rejects_unsupported_specversion() {
        let event = CloudEvent::builder()
            .source("/sender")
            .event_type("mesh.test")
            .specversion("0.3")
            .build();
        assert!(matches!(
            event,
            Err(EventError::InvalidSpecVersion { found }) if found == "0.3"
        ));
    }

    #[test]
    fn test_hops_roundtrip() {
        let mut event = CloudEvent::builder()
            .source("/sender")
            .event_type("mesh.test")
            .build()
            .unwrap();

        assert_eq!(event.hops(), None);
        event.set_hops(7);
        assert_eq!(event.hops(), Some(7));
        assert_eq!(event.extension(HOPS_EXTENSION), Some("7"));
    }
}
