//! Internet connectivity probe.
//!
//! A run checks connectivity at most once. The answer lives in a
//! [`RunConnectivity`] created for that run and dropped with it, so a later
//! run in the same process probes again.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::sync::OnceCell;

/// Anything that can tell whether the network is reachable.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Probes by opening a TCP connection to a well-known host.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    timeout: Duration,
}

impl TcpProbe {
    /// `host` is a `name:port` pair, e.g. `www.google.com:80`.
    #[must_use]
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self { host: host.into(), timeout }
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn is_online(&self) -> bool {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&self.host)).await {
            Ok(Ok(_)) => true,
            Ok(Err(err)) => {
                tracing::debug!(host = %self.host, error = %err, "connectivity probe failed");
                false
            }
            Err(_) => {
                tracing::debug!(host = %self.host, "connectivity probe timed out");
                false
            }
        }
    }
}

/// Connectivity result memoized for the lifetime of one run.
pub struct RunConnectivity<'a> {
    probe: &'a dyn ConnectivityProbe,
    online: OnceCell<bool>,
}

impl<'a> RunConnectivity<'a> {
    #[must_use]
    pub fn new(probe: &'a dyn ConnectivityProbe) -> Self { Self { probe, online: OnceCell::new() } }

    /// Probes on first use, then returns the remembered answer.
    pub async fn is_online(&self) -> bool {
        *self.online.get_or_init(|| self.probe.is_online()).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::net::TcpListener;

    use super::*;

    struct Counting(AtomicU32);

    #[async_trait]
    impl ConnectivityProbe for Counting {
        async fn is_online(&self) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[tokio::test]
    async fn test_tcp_probe_reaches_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let probe = TcpProbe::new(addr.to_string(), Duration::from_secs(2));
        assert!(probe.is_online().await);
    }

    #[tokio::test]
    async fn test_tcp_probe_fails_on_closed_port() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let probe = TcpProbe::new(addr.to_string(), Duration::from_secs(2));
        assert!(!probe.is_online().await);
    }

    #[tokio::test]
    async fn test_run_connectivity_probes_once() {
        let probe = Counting(AtomicU32::new(0));

        let run = RunConnectivity::new(&probe);
        assert!(run.is_online().await);
        assert!(run.is_online().await);
        assert_eq!(probe.0.load(Ordering::SeqCst), 1);

        let next_run = RunConnectivity::new(&probe);
        assert!(next_run.is_online().await);
        assert_eq!(probe.0.load(Ordering::SeqCst), 2);
    }
}
