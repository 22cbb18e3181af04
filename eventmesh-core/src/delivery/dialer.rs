//! Backoff-aware dialing.
//!
//! Only the dial phase retries: a timeout-classified error grows the
//! per-attempt timeout and sleeps a jittered pause before redialing, while
//! any other network error aborts immediately and surfaces as-is. Exhausting
//! the budget yields [`DeliveryError::DialTimeout`], distinct from a
//! live-connection error, so callers can tell "never connected" apart from
//! "connected then rejected".

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tokio::net::TcpStream;

use crate::config::DialConfig;
use crate::error::{DeliveryError, DeliveryResult};

/// One connection attempt, bounded by `timeout`.
///
/// Implementations must surface a timed-out attempt as
/// `io::ErrorKind::TimedOut`; any other error kind is treated as
/// non-retryable.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, address: &str, timeout: Duration) -> io::Result<TcpStream>;
}

/// Default dialer over `tokio::net::TcpStream`.
pub struct TcpDialer;

#[async_trait]
impl Dialer for TcpDialer {
    async fn dial(&self, address: &str, timeout: Duration) -> io::Result<TcpStream> {
        match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "dial timed out")),
        }
    }
}

/// Dials `address` with exponentially growing attempt timeouts.
///
/// The sleep between attempts is `base_sleep` scaled by a random factor in
/// [1.0, 2.0); the growing timeout itself is never jittered. Cancelling the
/// caller (dropping this future or racing it against a deadline) aborts
/// mid-backoff regardless of the remaining budget.
pub async fn dial_with_backoff<D: Dialer + ?Sized>(
    dialer: &D,
    address: &str,
    config: &DialConfig,
) -> DeliveryResult<TcpStream> {
    let mut timeout = config.initial_timeout;
    for attempt in 1..=config.steps {
        match dialer.dial(address, timeout).await {
            Ok(conn) => return Ok(conn),
            Err(err) if err.kind() == io::ErrorKind::TimedOut => {
                if attempt == config.steps {
                    break;
                }
                timeout = timeout.mul_f64(config.factor);
                tokio::time::sleep(jittered(config.base_sleep)).await;
            }
            Err(err) => return Err(DeliveryError::Connection(err)),
        }
    }
    Err(DeliveryError::DialTimeout {
        address: address.to_string(),
        attempts: config.steps,
    })
}

fn jittered(base: Duration) -> Duration {
    base.mul_f64(rand::thread_rng().gen_range(1.0..2.0))
}
