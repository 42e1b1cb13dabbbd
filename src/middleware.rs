//! Middleware implementation for reqwest.

use crate::config::ProxyPoolConfig;
use crate::error::{Error as PoolError, Result as PoolResult};
use crate::pool::ProxyPool;
use crate::proxy::Transport;

use anyhow::anyhow;
use async_trait::async_trait;
use log::{info, warn};
use reqwest_middleware::{Error, Middleware, Next, Result};
use std::sync::Arc;

/// Middleware that sends every request through a proxy from the pool.
///
/// Each request is one selection episode: a proxy that fails the request is
/// evicted and another is drawn, until one succeeds or the pool is exhausted.
///
/// Episodes hold the pool's store lock for their whole duration, including the
/// proxied request, so requests sharing one pool are sent one at a time. This
/// keeps a dead proxy from being tried by two requests at once and keeps one
/// request's exhaustion from deleting the pool under another. Use separate
/// pools with separate store paths when requests must run in parallel.
#[derive(Clone)]
pub struct ProxyCacheMiddleware {
    /// The proxy pool.
    pool: Arc<ProxyPool>,
}

impl ProxyCacheMiddleware {
    /// Create the pool from `config` and wrap it.
    /// This makes sure a fresh pool file exists before returning.
    pub async fn new(config: ProxyPoolConfig) -> PoolResult<Self> {
        let pool = ProxyPool::new(config).await?;
        let count = pool.proxies().await?.len();
        info!("Proxy cache middleware ready with {} proxies", count);
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: Arc<ProxyPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<ProxyPool> {
        &self.pool
    }
}

#[async_trait]
impl Middleware for ProxyCacheMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        _extensions: &mut http::Extensions,
        _next: Next<'_>,
    ) -> Result<reqwest::Response> {
        if req.try_clone().is_none() {
            return Err(Error::Middleware(anyhow!(
                "Request object is not cloneable. Are you passing a streaming body?"
            )));
        }

        let url = req.url().clone();
        let timeout = self.pool.config.fetch_timeout;
        let template = req;
        let result = self
            .pool
            .run_episode(move |addr| {
                let proxied_request = template.try_clone();
                async move {
                    let proxied_request = proxied_request.ok_or_else(|| {
                        PoolError::Request("request is not cloneable".to_string())
                    })?;
                    let mut transport = Transport::new().with_timeout(timeout);
                    transport.set_proxy(addr);
                    let response = transport.client()?.execute(proxied_request).await?;
                    Ok::<_, PoolError>(response)
                }
            })
            .await;

        match self.pool.record(result) {
            Ok((addr, response)) => {
                info!("Request to {} served through proxy {}", url, addr);
                Ok(response)
            }
            Err(e) => {
                warn!("No proxy could serve {}: {}", url, e);
                Err(Error::Middleware(anyhow!(e)))
            }
        }
    }
}
