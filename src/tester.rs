//! Liveness testing of a single proxy.

use crate::pool::ProxyPool;
use crate::proxy::{ProxyStatus, Transport};

use log::debug;
use std::time::Duration;

/// Liveness timeout used when the transport has no timeout of its own.
pub const DEFAULT_TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Half of the transport's timeout, or `DEFAULT_TEST_TIMEOUT` when it has none.
pub fn liveness_timeout(transport: &Transport) -> Duration {
    transport
        .timeout()
        .map(|timeout| timeout / 2)
        .filter(|timeout| !timeout.is_zero())
        .unwrap_or(DEFAULT_TEST_TIMEOUT)
}

impl ProxyPool {
    /// Request the configured test URL once through the transport's proxy.
    ///
    /// A transport without a bound proxy is reported `Dead`.
    pub async fn test_proxy(&self, transport: &Transport) -> ProxyStatus {
        let Some(proxy) = transport.proxy() else {
            debug!("No proxy bound to transport, nothing to test");
            return ProxyStatus::Dead;
        };

        let timeout = liveness_timeout(transport);
        match self.fetcher.get(&self.config.test_url, timeout, Some(proxy)).await {
            Ok(_) => {
                debug!("Proxy {} passed liveness test", proxy);
                ProxyStatus::Alive
            }
            Err(e) => {
                debug!("Proxy {} failed liveness test: {}", proxy, e);
                ProxyStatus::Dead
            }
        }
    }
}
