use serde::{Deserialize, Serialize};
use url::Url;

use super::conditions::Condition;

/// A resolvable HTTP destination exposed by a resource.
///
/// Resolved iff the URL or the hostname is present and non-empty; an
/// unresolved address keeps the `Addressable` condition `False`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Addressable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl Addressable {
    pub fn from_url(url: Url) -> Self {
        Self {
            url: Some(url),
            hostname: None,
        }
    }

    pub fn from_hostname(hostname: impl Into<String>) -> Self {
        Self {
            url: None,
            hostname: Some(hostname.into()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.url.is_some() || self.hostname.as_deref().is_some_and(|h| !h.is_empty())
    }

    /// Normalizes the address for storage: a missing hostname is derived
    /// from the URL's host component when one is present.
    pub fn normalized(mut self) -> Self {
        if self.hostname.as_deref().is_none_or(str::is_empty) {
            self.hostname = self
                .url
                .as_ref()
                .and_then(|u| u.host_str())
                .map(str::to_string);
        }
        self
    }
}

/// A resource that exposes a condition list.
///
/// Generic aggregation code operates on resources through this contract and
/// [`HasAddress`] instead of relying on each kind's concrete status type.
pub trait HasConditions {
    fn conditions(&self) -> &[Condition];
}

/// A resource that exposes an address.
pub trait HasAddress {
    fn address(&self) -> &Addressable;
}
