//! Random selection with elimination over the pool file.
//!
//! One call to `acquire_proxy`, `fetch_via_proxy` or the middleware is a
//! selection episode: candidates are drawn at random, and each one that fails
//! is deleted from the pool file before the next draw. A pool that runs dry is
//! removed so the next call starts from a full rebuild.

use crate::error::{Error, Result};
use crate::pool::{candidates, ProxyPool};
use crate::proxy::{ProxyAddress, ProxyStatus, Transport};
use crate::store::PoolFile;

use log::{debug, info, warn};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

impl ProxyPool {
    /// Find a working proxy and bind it to `transport`.
    ///
    /// Ensures the pool is fresh first, then tests random candidates until one
    /// is alive. Dead candidates are evicted from the pool.
    pub async fn acquire_proxy(&self, transport: &mut Transport) -> Result<ProxyAddress> {
        let pool = self;
        let base = transport.clone();
        let base = &base;
        let result = self
            .run_episode(move |addr| {
                let mut trial = base.clone();
                trial.set_proxy(addr);
                async move {
                    match pool.test_proxy(&trial).await {
                        ProxyStatus::Alive => Ok(()),
                        ProxyStatus::Dead => {
                            Err(Error::Request("liveness test failed".to_string()))
                        }
                    }
                }
            })
            .await
            .map(|(addr, ())| {
                transport.set_proxy(addr.clone());
                addr
            });
        self.record(result)
    }

    /// GET `url` through pool proxies until one succeeds, without a separate
    /// liveness test. Proxies that fail the request are evicted.
    pub async fn fetch_via_proxy(&self, url: &str, timeout: Duration) -> Result<String> {
        let pool = self;
        let result = self
            .run_episode(move |addr| async move {
                pool.fetcher.get(url, timeout, Some(&addr)).await
            })
            .await
            .map(|(_, body)| body);
        self.record(result)
    }

    /// Run one selection episode, calling `attempt` with random candidates
    /// until it succeeds or the pool is exhausted.
    ///
    /// The store lock is held across every attempt, so episodes on one pool
    /// never overlap.
    pub(crate) async fn run_episode<T, F, Fut>(&self, mut attempt: F) -> Result<(ProxyAddress, T)>
    where
        F: FnMut(ProxyAddress) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _guard = self.store_lock.lock().await;
        self.ensure_fresh_locked().await?;

        let path = &self.config.store_path;
        let mut file = PoolFile::open(path)?;
        let mut evicted = 0;
        loop {
            let remaining = candidates(&file);
            if remaining.is_empty() {
                drop(file);
                PoolFile::remove(path)?;
                warn!("All proxies in {} failed, pool removed", path.display());
                return Err(Error::AllProxiesBad(evicted));
            }

            let addr = {
                let mut rng = self.rng.lock();
                remaining[rng.random_range(0..remaining.len())].clone()
            };
            debug!("Trying proxy {} ({} candidates left)", addr, remaining.len());

            match attempt(addr.clone()).await {
                Ok(value) => {
                    file.close()?;
                    info!("Using proxy {} after {} eviction(s)", addr, evicted);
                    *self.current.write() = Some(addr.clone());
                    return Ok((addr, value));
                }
                Err(e) => {
                    debug!("Evicting proxy {}: {}", addr, e);
                    file.delete(&addr.to_string())?;
                    evicted += 1;
                }
            }
        }
    }
}
