//! Configuration for the proxy pool.

use crate::error::{Error, Result};

use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Proxy lists fetched when no sources are configured.
pub const DEFAULT_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt",
    "https://raw.githubusercontent.com/clarketm/proxy-list/master/proxy-list-raw.txt",
    "https://api.proxyscrape.com/v2/?request=getproxies&protocol=http",
];

/// Target requested through a proxy to decide whether it is alive.
pub const DEFAULT_TEST_URL: &str = "http://www.google.com";

/// How long a refreshed pool stays fresh.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Timeout applied to each source list download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the proxy pool.
#[derive(Debug, Clone)]
pub struct ProxyPoolConfig {
    /// Absolute location of the pool file.
    pub store_path: PathBuf,
    /// Source URLs to fetch proxy lists from.
    pub sources: Vec<String>,
    /// Maximum age of the pool before it is rebuilt.
    pub refresh_interval: Duration,
    /// URL requested through a proxy during a liveness test.
    pub test_url: String,
    /// Timeout for each source list download.
    pub fetch_timeout: Duration,
    /// Seed for the pool's random source. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl ProxyPoolConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProxyPoolConfigBuilder {
        ProxyPoolConfigBuilder::new()
    }
}

/// Builder for `ProxyPoolConfig`.
pub struct ProxyPoolConfigBuilder {
    store_path: Option<PathBuf>,
    sources: Vec<String>,
    refresh_interval: Option<Duration>,
    test_url: Option<String>,
    fetch_timeout: Option<Duration>,
    seed: Option<u64>,
}

impl ProxyPoolConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self {
            store_path: None,
            sources: Vec::new(),
            refresh_interval: None,
            test_url: None,
            fetch_timeout: None,
            seed: None,
        }
    }

    /// Set the pool file location. Required.
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Set the source URLs to fetch proxy lists from.
    pub fn sources(mut self, sources: Vec<impl Into<String>>) -> Self {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    /// Set how long a refreshed pool is considered fresh.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }

    /// Set the URL used for liveness tests.
    pub fn test_url(mut self, url: impl Into<String>) -> Self {
        self.test_url = Some(url.into());
        self
    }

    /// Set the timeout for source list downloads.
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Seed the pool's random source, making selection order reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the configuration, validating the store path and every URL.
    pub fn build(self) -> Result<ProxyPoolConfig> {
        let store_path = self
            .store_path
            .ok_or_else(|| Error::Config("store_path is required".to_string()))?;
        let store_path = validate_store_path(&store_path)?;

        let sources = if self.sources.is_empty() {
            DEFAULT_SOURCES.iter().map(|s| s.to_string()).collect()
        } else {
            self.sources
        };
        for source in &sources {
            validate_url(source)?;
        }

        let test_url = self.test_url.unwrap_or_else(|| DEFAULT_TEST_URL.to_string());
        validate_url(&test_url)?;

        let refresh_interval = self.refresh_interval.unwrap_or(DEFAULT_REFRESH_INTERVAL);
        if refresh_interval.is_zero() {
            return Err(Error::Config("refresh_interval must be positive".to_string()));
        }

        Ok(ProxyPoolConfig {
            store_path,
            sources,
            refresh_interval,
            test_url,
            fetch_timeout: self.fetch_timeout.unwrap_or(DEFAULT_FETCH_TIMEOUT),
            seed: self.seed,
        })
    }
}

impl Default for ProxyPoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_url(raw: &str) -> Result<()> {
    let url =
        Url::parse(raw).map_err(|e| Error::Config(format!("invalid url {:?}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::Config(format!("unsupported scheme {:?} in {}", other, raw))),
    }
}

/// Reject control characters and resolve the path against the working directory.
pub fn validate_store_path(path: &Path) -> Result<PathBuf> {
    let text = path
        .to_str()
        .ok_or_else(|| Error::InvalidPath(path.to_path_buf(), "not valid UTF-8"))?;
    if text.is_empty() {
        return Err(Error::InvalidPath(path.to_path_buf(), "empty path"));
    }
    if text.chars().any(char::is_control) {
        return Err(Error::InvalidPath(path.to_path_buf(), "contains control characters"));
    }
    if path.file_name().is_none() {
        return Err(Error::InvalidPath(path.to_path_buf(), "does not name a file"));
    }
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        let cwd = std::env::current_dir().map_err(|e| Error::store(path, e))?;
        Ok(cwd.join(path))
    }
}

/// Parse a duration such as `15m`, `30s`, `2h` or `1d`. A bare number is seconds.
pub fn parse_interval(spec: &str) -> Result<Duration> {
    let spec = spec.trim();
    let split = spec
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(spec.len());
    let (digits, unit) = spec.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| Error::Config(format!("invalid interval {:?}", spec)))?;
    let scale = match unit.trim() {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Err(Error::Config(format!("unknown interval unit in {:?}", spec))),
    };
    Ok(Duration::from_secs(value * scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config = ProxyPoolConfig::builder()
            .store_path("/tmp/proxies.json")
            .build()
            .unwrap();
        assert_eq!(config.sources.len(), DEFAULT_SOURCES.len());
        assert_eq!(config.refresh_interval, Duration::from_secs(900));
        assert_eq!(config.test_url, "http://www.google.com");
        assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
        assert!(config.seed.is_none());
    }

    #[test]
    fn store_path_is_required() {
        let err = ProxyPoolConfig::builder().build().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_control_characters_in_path() {
        let err = ProxyPoolConfig::builder()
            .store_path("/tmp/pro\nxies.json")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidPath(..)));
    }

    #[test]
    fn relative_path_becomes_absolute() {
        let config = ProxyPoolConfig::builder()
            .store_path("proxies.json")
            .build()
            .unwrap();
        assert!(config.store_path.is_absolute());
        assert!(config.store_path.ends_with("proxies.json"));
    }

    #[test]
    fn rejects_bad_urls() {
        let err = ProxyPoolConfig::builder()
            .store_path("/tmp/proxies.json")
            .sources(vec!["ftp://example.com/list"])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = ProxyPoolConfig::builder()
            .store_path("/tmp/proxies.json")
            .test_url("not a url")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn parses_intervals() {
        assert_eq!(parse_interval("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_interval("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_interval("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_interval("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_interval("45").unwrap(), Duration::from_secs(45));
        assert!(parse_interval("m").is_err());
        assert!(parse_interval("10w").is_err());
    }
}
