//! Core proxy pool implementation: freshness policy and refresh.

use crate::config::ProxyPoolConfig;
use crate::error::{Error, Result};
use crate::fetch::{Fetcher, ReqwestFetcher};
use crate::parser;
use crate::proxy::ProxyAddress;
use crate::store::PoolFile;

use futures::future;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Reserved key holding the unix time (seconds) of the last completed refresh.
pub const TIMESTAMP_KEY: &str = "__pool_timestamp__";

/// Value stored for every proxy present in the pool.
pub const ALIVE: &str = "alive";

/// State of the pool file as seen by `ensure_fresh_pool`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PoolState {
    /// No pool file on disk.
    Missing,
    /// A file exists but has no usable timestamp or cannot be decoded.
    Malformed(String),
    /// The timestamp is older than the refresh interval.
    Stale(Duration),
    /// The pool can be used as is.
    Fresh,
}

/// A file-backed pool of proxies with liveness-checked selection.
pub struct ProxyPool {
    /// Configuration for the pool.
    pub config: ProxyPoolConfig,
    pub(crate) fetcher: Arc<dyn Fetcher>,
    /// Serializes every open/modify/close sequence on the pool file.
    pub(crate) store_lock: tokio::sync::Mutex<()>,
    pub(crate) rng: Mutex<StdRng>,
    pub(crate) current: RwLock<Option<ProxyAddress>>,
    last_error: RwLock<Option<String>>,
}

impl ProxyPool {
    /// Create a pool using reqwest for all HTTP traffic and make sure a fresh
    /// pool file exists.
    pub async fn new(config: ProxyPoolConfig) -> Result<Self> {
        Self::with_fetcher(config, Arc::new(ReqwestFetcher)).await
    }

    /// Create a pool with a custom `Fetcher` and make sure a fresh pool file exists.
    pub async fn with_fetcher(config: ProxyPoolConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let pool = Self {
            config,
            fetcher,
            store_lock: tokio::sync::Mutex::new(()),
            rng: Mutex::new(rng),
            current: RwLock::new(None),
            last_error: RwLock::new(None),
        };
        pool.ensure_fresh_pool().await?;
        Ok(pool)
    }

    /// Make sure the pool file is present, well formed and younger than the
    /// refresh interval, rebuilding it otherwise.
    pub async fn ensure_fresh_pool(&self) -> Result<()> {
        let result = {
            let _guard = self.store_lock.lock().await;
            self.ensure_fresh_locked().await
        };
        self.record(result)
    }

    /// Rebuild the pool from the configured sources regardless of its age.
    pub async fn refresh(&self) -> Result<()> {
        let result = {
            let _guard = self.store_lock.lock().await;
            info!("Forcing refresh of proxy pool {}", self.config.store_path.display());
            async {
                PoolFile::remove(&self.config.store_path)?;
                self.rebuild().await
            }
            .await
        };
        self.record(result)
    }

    /// Proxies currently in the pool, sorted. Rebuilds the pool first if needed.
    pub async fn proxies(&self) -> Result<Vec<ProxyAddress>> {
        let result = {
            let _guard = self.store_lock.lock().await;
            async {
                self.ensure_fresh_locked().await?;
                let mut found = candidates(&PoolFile::open(&self.config.store_path)?);
                found.sort();
                Ok::<_, Error>(found)
            }
            .await
        };
        self.record(result)
    }

    /// The proxy chosen by the last successful selection, if any.
    pub fn current_proxy(&self) -> Option<ProxyAddress> {
        self.current.read().clone()
    }

    /// Message of the error returned by the last failing call. Cleared on success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    pub(crate) fn record<T>(&self, result: Result<T>) -> Result<T> {
        *self.last_error.write() = result.as_ref().err().map(|e| e.to_string());
        result
    }

    /// Caller must hold `store_lock`.
    pub(crate) async fn ensure_fresh_locked(&self) -> Result<()> {
        let path = &self.config.store_path;
        match self.assess()? {
            PoolState::Fresh => {
                debug!("Proxy pool {} is fresh", path.display());
                Ok(())
            }
            PoolState::Missing => {
                info!("No proxy pool at {}, building one", path.display());
                self.rebuild().await
            }
            PoolState::Malformed(reason) => {
                warn!("Proxy pool {} is malformed ({}), rebuilding", path.display(), reason);
                PoolFile::remove(path)?;
                self.rebuild().await
            }
            PoolState::Stale(age) => {
                info!("Proxy pool {} is {}s old, rebuilding", path.display(), age.as_secs());
                PoolFile::remove(path)?;
                self.rebuild().await
            }
        }
    }

    pub(crate) fn assess(&self) -> Result<PoolState> {
        let path = &self.config.store_path;
        if !PoolFile::exists(path) {
            return Ok(PoolState::Missing);
        }
        let file = match PoolFile::open(path) {
            Ok(file) => file,
            Err(Error::Malformed(reason)) => return Ok(PoolState::Malformed(reason)),
            Err(e) => return Err(e),
        };
        let stamp = match file.get(TIMESTAMP_KEY) {
            Some(stamp) => stamp,
            None => return Ok(PoolState::Malformed("missing timestamp".to_string())),
        };
        let stamp: u64 = match stamp.parse() {
            Ok(stamp) => stamp,
            Err(_) => return Ok(PoolState::Malformed(format!("bad timestamp {:?}", stamp))),
        };
        let age = Duration::from_secs(unix_now().saturating_sub(stamp));
        if age > self.config.refresh_interval {
            Ok(PoolState::Stale(age))
        } else {
            Ok(PoolState::Fresh)
        }
    }

    /// Build a new pool file from all sources. Leaves no file behind on failure.
    async fn rebuild(&self) -> Result<()> {
        let path = &self.config.store_path;
        let mut file = PoolFile::create(path)?;
        let result = self.fetch_candidates().await;
        let found = match result {
            Ok(found) => found,
            Err(e) => {
                drop(file);
                if let Err(cleanup) = PoolFile::remove(path) {
                    warn!("Failed to remove partial pool {}: {}", path.display(), cleanup);
                }
                return Err(e);
            }
        };

        file.put(TIMESTAMP_KEY, unix_now().to_string());
        for addr in &found {
            file.put(addr.to_string(), ALIVE);
        }
        file.close()?;
        info!("Proxy pool {} rebuilt with {} proxies", path.display(), found.len());
        Ok(())
    }

    async fn fetch_candidates(&self) -> Result<Vec<ProxyAddress>> {
        let sources = &self.config.sources;
        info!("Fetching proxy lists from {} sources", sources.len());

        let timeout = self.config.fetch_timeout;
        let results = future::join_all(
            sources
                .iter()
                .map(|source| self.fetcher.get(source, timeout, None)),
        )
        .await;

        let mut text = String::new();
        let mut succeeded = 0;
        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(body) => {
                    debug!("Fetched {} bytes from {}", body.len(), source);
                    text.push_str(&body);
                    text.push('\n');
                    succeeded += 1;
                }
                Err(e) => warn!("Failed to fetch proxies from {}: {}", source, e),
            }
        }
        if succeeded == 0 {
            return Err(Error::Fetch(sources.len()));
        }

        let mut found: Vec<ProxyAddress> = parser::parse_proxy_list(&text).into_iter().collect();
        if found.is_empty() {
            return Err(Error::EmptyPool(succeeded));
        }
        found.sort();
        info!("Found {} unique proxies in {} sources", found.len(), succeeded);
        Ok(found)
    }
}

/// Proxy entries of an open pool file in key order, excluding the timestamp.
///
/// Only keys in canonical `host:port` form count, so evicting `addr.to_string()`
/// always removes the entry it came from.
pub(crate) fn candidates(file: &PoolFile) -> Vec<ProxyAddress> {
    file.keys()
        .filter(|key| *key != TIMESTAMP_KEY)
        .filter_map(|key| {
            let addr: ProxyAddress = key.parse().ok()?;
            (addr.to_string() == key).then_some(addr)
        })
        .collect()
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
