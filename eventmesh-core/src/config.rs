use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration for the event mesh data plane.
///
/// Collected once at startup and passed explicitly into constructors; nothing
/// in the mesh reads configuration from global state after initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    #[serde(default)]
    pub dial: DialConfig,

    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default = "default_delivery_timeout", with = "duration_ms")]
    pub delivery_timeout: Duration,

    /// Maximum number of times a reply event may re-enter ingress.
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            dial: DialConfig::default(),
            connection: ConnectionConfig::default(),
            delivery_timeout: default_delivery_timeout(),
            max_hops: default_max_hops(),
        }
    }
}

/// Backoff template for dialing a destination.
///
/// The per-attempt timeout starts at `initial_timeout` and grows by `factor`
/// on every retry. Between attempts the dialer sleeps for `base_sleep`
/// multiplied by a random factor in [1.0, 2.0); the jitter applies to the
/// fixed pause only, never to the growing timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialConfig {
    #[serde(default = "default_initial_timeout", with = "duration_ms")]
    pub initial_timeout: Duration,

    #[serde(default = "default_factor")]
    pub factor: f64,

    #[serde(default = "default_steps")]
    pub steps: u32,

    #[serde(default = "default_base_sleep", with = "duration_ms")]
    pub base_sleep: Duration,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            initial_timeout: default_initial_timeout(),
            factor: default_factor(),
            steps: default_steps(),
            base_sleep: default_base_sleep(),
        }
    }
}

/// Idle-connection limits for the shared delivery transport.
///
/// `None` falls back to the transport's platform defaults. When only the
/// process-wide cap is set it bounds the per-host pool as well, since the
/// pooling transport tracks idle connections per host.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub max_idle_conns: Option<usize>,

    #[serde(default)]
    pub max_idle_conns_per_host: Option<usize>,
}

impl ConnectionConfig {
    /// Effective per-host idle cap: the per-host setting when present,
    /// otherwise the process-wide cap.
    pub fn idle_per_host(&self) -> Option<usize> {
        self.max_idle_conns_per_host.or(self.max_idle_conns)
    }
}

fn default_initial_timeout() -> Duration {
    Duration::from_millis(50)
}

fn default_factor() -> f64 {
    1.4
}

fn default_steps() -> u32 {
    15
}

fn default_base_sleep() -> Duration {
    Duration::from_millis(30)
}

fn default_delivery_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_hops() -> u32 {
    32
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}
