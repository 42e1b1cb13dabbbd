//! HTTP GET capability used for list downloads, liveness tests and proxied fetches.

use crate::error::{Error, Result};
use crate::proxy::ProxyAddress;

use async_trait::async_trait;
use std::time::Duration;

/// Performs a single GET request, optionally through a proxy.
///
/// Implementations must honour `timeout` and treat any non-2xx status as an error.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        proxy: Option<&ProxyAddress>,
    ) -> Result<String>;
}

/// `Fetcher` backed by reqwest. A fresh client is built per request so the
/// proxy binding never leaks between calls; requests without a proxy go direct
/// and ignore the system proxy settings.
#[derive(Debug, Clone, Default)]
pub struct ReqwestFetcher;

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn get(
        &self,
        url: &str,
        timeout: Duration,
        proxy: Option<&ProxyAddress>,
    ) -> Result<String> {
        let builder = reqwest::Client::builder().timeout(timeout);
        let builder = match proxy {
            Some(proxy) => builder.proxy(proxy.to_reqwest_proxy()?),
            None => builder.no_proxy(),
        };
        let client = builder.build()?;

        let response = client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Request(format!("{} returned {}", url, status)));
        }
        Ok(response.text().await?)
    }
}
