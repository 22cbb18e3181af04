//! HTTP mappings for CloudEvents.
//!
//! Binary content mode carries context attributes as `ce-*` headers with the
//! payload as the raw body; structured content mode carries the whole event
//! as a JSON envelope with content type `application/cloudevents+json`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::{CloudEvent, TRACEPARENT_EXTENSION};
use crate::error::{EventError, EventResult};

pub const CE_PREFIX: &str = "ce-";
pub const CE_ID: &str = "ce-id";
pub const CE_SOURCE: &str = "ce-source";
pub const CE_SPECVERSION: &str = "ce-specversion";
pub const CE_TYPE: &str = "ce-type";
pub const CE_TIME: &str = "ce-time";
pub const CONTENT_TYPE: &str = "content-type";
pub const TRACEPARENT: &str = "traceparent";
pub const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";

/// Encodes an event into binary-mode headers.
///
/// The body (if any) travels separately as `event.data`. Extensions become
/// `ce-<name>` headers, except the trace context which egresses as a plain
/// `traceparent` header for propagation.
pub fn binary_headers(event: &CloudEvent) -> Vec<(String, String)> {
    let mut headers = vec![
        (CE_ID.to_string(), event.id.clone()),
        (CE_SOURCE.to_string(), event.source.clone()),
        (CE_SPECVERSION.to_string(), event.specversion.clone()),
        (CE_TYPE.to_string(), event.event_type.clone()),
    ];
    if let Some(time) = &event.time {
        headers.push((CE_TIME.to_string(), time.to_rfc3339()));
    }
    if let Some(content_type) = &event.content_type {
        headers.push((CONTENT_TYPE.to_string(), content_type.clone()));
    }
    for (name, value) in &event.extensions {
        if name == TRACEPARENT_EXTENSION {
            headers.push((TRACEPARENT.to_string(), value.clone()));
        } else {
            headers.push((format!("{CE_PREFIX}{name}"), value.clone()));
        }
    }
    headers
}

/// Decodes a binary-mode request or response into an event.
///
/// Header names are matched case-insensitively. An inbound `traceparent`
/// header is captured as an extension so the trace context survives the
/// fan-out.
pub fn from_binary<'a, I>(headers: I, body: Option<Vec<u8>>) -> EventResult<CloudEvent>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut id = None;
    let mut source = None;
    let mut specversion = None;
    let mut event_type = None;
    let mut time = None;
    let mut content_type = None;
    let mut extensions = BTreeMap::new();

    for (name, value) in headers {
        let name = name.to_ascii_lowercase();
        match name.as_str() {
            CE_ID => id = Some(value.to_string()),
            CE_SOURCE => source = Some(value.to_string()),
            CE_SPECVERSION => specversion = Some(value.to_string()),
            CE_TYPE => event_type = Some(value.to_string()),
            CE_TIME => time = Some(parse_time(value)?),
            CONTENT_TYPE => content_type = Some(value.to_string()),
            TRACEPARENT => {
                extensions.insert(TRACEPARENT_EXTENSION.to_string(), value.to_string());
            }
            _ => {
                if let Some(extension) = name.strip_prefix(CE_PREFIX) {
                    extensions.insert(extension.to_string(), value.to_string());
                }
            }
        }
    }

    let event = CloudEvent {
        id: id.ok_or(EventError::MissingAttribute { attribute: "id" })?,
        source: source.ok_or(EventError::MissingAttribute { attribute: "source" })?,
        specversion: specversion.ok_or(EventError::MissingAttribute {
            attribute: "specversion",
        })?,
        event_type: event_type.ok_or(EventError::MissingAttribute { attribute: "type" })?,
        time,
        content_type,
        data: body.filter(|b| !b.is_empty()),
        extensions,
    };
    event.validate()?;
    Ok(event)
}

/// Returns true when the response or request headers indicate a binary-mode
/// event is present.
pub fn has_binary_event<'a, I>(headers: I) -> bool
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    headers
        .into_iter()
        .any(|(name, _)| name.eq_ignore_ascii_case(CE_ID))
}

/// Decodes a structured-mode JSON envelope into an event.
pub fn from_structured(body: &[u8]) -> EventResult<CloudEvent> {
    let envelope: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| EventError::Decode {
            message: e.to_string(),
        })?;
    let envelope = envelope.as_object().ok_or_else(|| EventError::Decode {
        message: "envelope is not a JSON object".to_string(),
    })?;

    let field = |name: &'static str| -> Option<String> {
        envelope
            .get(name)
            .and_then(|v| v.as_str())
            .map(str::to_string)
    };

    let mut extensions = BTreeMap::new();
    for (name, value) in envelope {
        match name.as_str() {
            "id" | "source" | "specversion" | "type" | "time" | "datacontenttype" | "data" => {}
            _ => {
                let value = match value {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                extensions.insert(name.clone(), value);
            }
        }
    }

    let data = match envelope.get("data") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s.clone().into_bytes()),
        Some(other) => Some(other.to_string().into_bytes()),
    };

    let time = match field("time") {
        Some(raw) => Some(parse_time(&raw)?),
        None => None,
    };

    let event = CloudEvent {
        id: field("id").ok_or(EventError::MissingAttribute { attribute: "id" })?,
        source: field("source").ok_or(EventError::MissingAttribute { attribute: "source" })?,
        specversion: field("specversion").ok_or(EventError::MissingAttribute {
            attribute: "specversion",
        })?,
        event_type: field("type").ok_or(EventError::MissingAttribute { attribute: "type" })?,
        time,
        content_type: field("datacontenttype"),
        data,
        extensions,
    };
    event.validate()?;
    Ok(event)
}

fn parse_time(raw: &str) -> EventResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| EventError::Decode {
            message: format!("invalid time attribute: {e}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_event() -> CloudEvent {
        CloudEvent::builder()
            .id("abc-123")
            .source("/sender")
            .event_type("mesh.test")
            .content_type("application/json")
            .data(br#"{"hello":"world"}"#.to_vec())
            .extension("hops", "5")
            .extension(TRACEPARENT_EXTENSION, "00-aaaa-bbbb-01")
            .build()
            .unwrap()
    }

    #[test]
    fn test_binary_roundtrip() {
        let event = sample_event();
        let headers = binary_headers(&event);
        let borrowed: Vec<(&str, &str)> = headers
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_str()))
            .collect();

        assert!(has_binary_event(borrowed.iter().copied()));
        let decoded = from_binary(borrowed, event.data.clone()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_binary_traceparent_travels_as_plain_header() {
        let event = sample_event();
        let headers = binary_headers(&event);
        assert!(headers.iter().any(|(n, v)| n == "traceparent" && v == "00-aaaa-bbbb-01"));
        assert!(!headers.iter().any(|(n, _)| n == "ce-traceparent"));
    }

    #[test]
    fn test_binary_missing_id_rejected() {
        let headers = vec![
            ("ce-source", "/sender"),
            ("ce-specversion", "1.0"),
            ("ce-type", "mesh.test"),
        ];
        let result = from_binary(headers, None);
        assert!(matches!(
            result,
            Err(EventError::MissingAttribute { attribute: "id" })
        ));
    }

    #[test]
    fn test_binary_header_names_case_insensitive() {
        let headers = vec![
            ("Ce-Id", "abc"),
            ("CE-SOURCE", "/sender"),
            ("ce-specversion", "1.0"),
            ("Ce-Type", "mesh.test"),
            ("Ce-Myext", "1"),
        ];
        let event = from_binary(headers, None).unwrap();
        assert_eq!(event.id, "abc");
        assert_eq!(event.extension("myext"), Some("1"));
    }

    #[test]
    fn test_structured_envelope() {
        let body = br#"{
            "id": "abc-123",
            "source": "/sender",
            "specversion": "1.0",
            "type": "mesh.test",
            "datacontenttype": "application/json",
            "data": {"hello": "world"},
            "hops": 5
        }"#;
        let event = from_structured(body).unwrap();
        assert_eq!(event.id, "abc-123");
        assert_eq!(event.event_type, "mesh.test");
        assert_eq!(event.data, Some(br#"{"hello":"world"}"#.to_vec()));
        assert_eq!(event.hops(), Some(5));
    }

    #[test]
    fn test_structured_missing_type_rejected() {
        let body = br#"{"id": "abc", "source": "/sender", "specversion": "1.0"}"#;
        let result = from_structured(body);
        assert!(matches!(
            result,
            Err(EventError::MissingAttribute { attribute: "type" })
        ));
    }
}
