//! # Trigger filter engine
//!
//! Attribute-match predicate evaluation for triggers. A filter field is
//! either the wildcard sentinel (matches any value) or an exact literal that
//! must equal the event's attribute byte for byte. All non-wildcard fields
//! must match for an overall match. No glob or regex support, and no
//! attributes beyond type and source are evaluated.

use serde::{Deserialize, Serialize};

use crate::event::CloudEvent;

/// One filterable attribute: the wildcard sentinel or an exact literal.
///
/// `Any` is distinct from `Exact("")` — an empty string is a literal that
/// only matches an empty attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterAttribute {
    Any,
    Exact(String),
}

impl FilterAttribute {
    pub fn exact(value: impl Into<String>) -> Self {
        Self::Exact(value.into())
    }

    fn matches(&self, value: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == value,
        }
    }
}

impl Default for FilterAttribute {
    fn default() -> Self {
        Self::Any
    }
}

/// The attribute filter of a trigger subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerFilter {
    #[serde(default)]
    pub event_type: FilterAttribute,
    #[serde(default)]
    pub source: FilterAttribute,
}

impl TriggerFilter {
    pub fn new(event_type: FilterAttribute, source: FilterAttribute) -> Self {
        Self { event_type, source }
    }

    /// AND semantics over the present fields.
    pub fn matches(&self, event: &CloudEvent) -> bool {
        self.event_type.matches(&event.event_type) && self.source.matches(&event.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(event_type: &str, source: &str) -> CloudEvent {
        CloudEvent::builder()
            .source(source)
            .event_type(event_type)
            .build()
            .unwrap()
    }

    #[test]
    fn test_wildcard_filter_matches_anything() {
        let filter = TriggerFilter::default();
        assert!(filter.matches(&event("mytype", "s1")));
        assert!(filter.matches(&event("othertype", "s2")));
    }

    #[test]
    fn test_type_mismatch_never_matches_regardless_of_source() {
        let filter = TriggerFilter::new(
            FilterAttribute::exact("mytype"),
            FilterAttribute::Any,
        );
        assert!(filter.matches(&event("mytype", "s1")));
        assert!(!filter.matches(&event("othertype", "s1")));
        assert!(!filter.matches(&event("othertype", "s2")));
    }

    #[test]
    fn test_both_fields_must_match() {
        let filter = TriggerFilter::new(
            FilterAttribute::exact("mytype"),
            FilterAttribute::exact("s1"),
        );
        assert!(filter.matches(&event("mytype", "s1")));
        // Type matches, source does not.
        assert!(!filter.matches(&event("mytype", "s2")));
        // Source matches, type does not.
        assert!(!filter.matches(&event("othertype", "s1")));
    }

    #[test]
    fn test_empty_literal_is_not_the_wildcard() {
        let filter = TriggerFilter::new(FilterAttribute::exact(""), FilterAttribute::Any);
        assert!(!filter.matches(&event("mytype", "s1")));
    }
}
