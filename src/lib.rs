//! # reqwest-proxy-cache
//!
//! A file-backed HTTP proxy cache for reqwest.
//!
//! The pool is built from public proxy lists, persisted to a local file and
//! rebuilt once it is older than the refresh interval. Callers get a proxy
//! that just passed a liveness test; proxies that fail are evicted from the
//! file so they are never tried again until the next rebuild.

pub mod config;
pub mod error;
pub mod fetch;
pub mod middleware;
pub mod parser;
pub mod pool;
pub mod proxy;
mod selector;
pub mod store;
mod tester;

pub use config::{parse_interval, ProxyPoolConfig, ProxyPoolConfigBuilder};
pub use error::{Error, Result};
pub use fetch::{Fetcher, ReqwestFetcher};
pub use middleware::ProxyCacheMiddleware;
pub use parser::parse_proxy_list;
pub use pool::ProxyPool;
pub use proxy::{ProxyAddress, ProxyStatus, Transport};
pub use tester::{liveness_timeout, DEFAULT_TEST_TIMEOUT};
