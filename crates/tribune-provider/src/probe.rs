//! Periodic reachability check feeding the [`ConnectivityMonitor`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use tribune_core::config::ConnectivityConfig;
use tribune_core::connectivity::ConnectivityMonitor;

use crate::transport::{HttpRequest, HttpTransport};

pub struct ConnectivityProbe {
    transport: Arc<dyn HttpTransport>,
    monitor: Arc<ConnectivityMonitor>,
    url: String,
    timeout: Duration,
}

impl ConnectivityProbe {
    pub fn new(
        config: &ConnectivityConfig,
        transport: Arc<dyn HttpTransport>,
        monitor: Arc<ConnectivityMonitor>,
    ) -> Self {
        Self {
            transport,
            monitor,
            url: config.probe_url.clone(),
            timeout: Duration::from_secs(config.probe_timeout_secs),
        }
    }

    /// Probe once and record the result. Any HTTP response counts as
    /// online; a transport failure or timeout counts as offline.
    pub async fn check(&self) -> bool {
        let online = matches!(
            tokio::time::timeout(self.timeout, self.transport.send(HttpRequest::get(&self.url))).await,
            Ok(Ok(_))
        );
        debug!(online, url = %self.url, "Connectivity probe");
        self.monitor.set_online(online);
        online
    }

    /// Probe every `interval` until the task is aborted.
    pub fn spawn(self, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.check().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use tribune_core::error::ProviderError;

    fn config() -> ConnectivityConfig {
        ConnectivityConfig {
            probe_url: "https://probe.test/204".to_string(),
            probe_interval_secs: 1,
            probe_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_any_response_means_online() {
        let monitor = Arc::new(ConnectivityMonitor::new(false));
        let mock = Arc::new(MockTransport::new().respond("probe.test", 503, ""));
        let probe = ConnectivityProbe::new(&config(), mock, Arc::clone(&monitor));
        assert!(probe.check().await);
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn test_transport_failure_means_offline() {
        let monitor = Arc::new(ConnectivityMonitor::new(true));
        let mock = Arc::new(MockTransport::new().fail("probe.test", ProviderError::network("down")));
        let probe = ConnectivityProbe::new(&config(), mock, Arc::clone(&monitor));
        assert!(!probe.check().await);
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn test_timeout_means_offline() {
        let monitor = Arc::new(ConnectivityMonitor::new(true));
        let mock = Arc::new(
            MockTransport::new()
                .respond("probe.test", 204, "")
                .with_delay(Duration::from_millis(300)),
        );
        let mut probe = ConnectivityProbe::new(&config(), mock, Arc::clone(&monitor));
        probe.timeout = Duration::from_millis(20);
        assert!(!probe.check().await);
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn test_spawned_probe_updates_monitor() {
        let monitor = Arc::new(ConnectivityMonitor::new(false));
        let mut rx = monitor.subscribe();
        let mock = Arc::new(MockTransport::new().respond("probe.test", 204, ""));
        let handle = ConnectivityProbe::new(&config(), mock, Arc::clone(&monitor))
            .spawn(Duration::from_millis(10));
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(*rx.borrow());
        handle.abort();
    }
}
