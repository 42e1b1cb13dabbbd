//! Proxy addresses, liveness status and the caller's outbound transport.

use crate::error::{Error, Result};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Result of a liveness test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyStatus {
    /// The proxy answered the test request successfully.
    Alive,
    /// The proxy failed the test request.
    Dead,
}

impl ProxyStatus {
    pub fn is_alive(self) -> bool {
        self == ProxyStatus::Alive
    }
}

/// A proxy endpoint in `host:port` form.
///
/// The host is a DNS name or IPv4 literal made of at least two dot-separated
/// labels; the port is in `1..=65535`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyAddress {
    host: String,
    port: u16,
}

impl ProxyAddress {
    /// Create an address from its parts, validating both.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        if port == 0 {
            return Err(Error::Config(format!("port 0 is not valid for {}", host)));
        }
        if !is_valid_host(&host) {
            return Err(Error::Config(format!("invalid proxy host {:?}", host)));
        }
        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The proxy as an `http://` URL, suitable for `reqwest::Proxy::all`.
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Convert the address to a reqwest::Proxy for all schemes.
    pub fn to_reqwest_proxy(&self) -> Result<reqwest::Proxy> {
        Ok(reqwest::Proxy::all(self.url())?)
    }
}

fn is_valid_host(host: &str) -> bool {
    let labels: Vec<&str> = host.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ProxyAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| Error::Config(format!("missing port in {:?}", s)))?;
        let port: u16 = port
            .parse()
            .map_err(|_| Error::Config(format!("invalid port in {:?}", s)))?;
        Self::new(host, port)
    }
}

/// The caller's outbound transport: a timeout and the proxy currently bound to it.
#[derive(Debug, Clone, Default)]
pub struct Transport {
    timeout: Option<Duration>,
    proxy: Option<ProxyAddress>,
}

impl Transport {
    /// A transport without timeout or proxy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout used by this transport.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn proxy(&self) -> Option<&ProxyAddress> {
        self.proxy.as_ref()
    }

    /// Route subsequent requests through `proxy`.
    pub fn set_proxy(&mut self, proxy: ProxyAddress) {
        self.proxy = Some(proxy);
    }

    /// Build a reqwest client that goes through the bound proxy, if any.
    pub fn client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(proxy) = &self.proxy {
            builder = builder.proxy(proxy.to_reqwest_proxy()?);
        }
        Ok(builder.build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ip_and_hostname() {
        let ip: ProxyAddress = "1.2.3.4:8080".parse().unwrap();
        assert_eq!(ip.host(), "1.2.3.4");
        assert_eq!(ip.port(), 8080);
        assert_eq!(ip.to_string(), "1.2.3.4:8080");

        let host: ProxyAddress = "proxy.example.com:3128".parse().unwrap();
        assert_eq!(host.url(), "http://proxy.example.com:3128");
    }

    #[test]
    fn rejects_bad_ports_and_hosts() {
        assert!("1.2.3.4:99999".parse::<ProxyAddress>().is_err());
        assert!("1.2.3.4:0".parse::<ProxyAddress>().is_err());
        assert!("1.2.3.4".parse::<ProxyAddress>().is_err());
        assert!("host:8080".parse::<ProxyAddress>().is_err());
        assert!("bad_host.com:8080".parse::<ProxyAddress>().is_err());
        assert!("a..b:8080".parse::<ProxyAddress>().is_err());
    }

    #[test]
    fn transport_binds_proxy() {
        let mut transport = Transport::new().with_timeout(Duration::from_secs(4));
        assert!(transport.proxy().is_none());
        transport.set_proxy("10.0.0.1:3128".parse().unwrap());
        assert_eq!(transport.proxy().unwrap().to_string(), "10.0.0.1:3128");
        assert_eq!(transport.timeout(), Some(Duration::from_secs(4)));
        assert!(transport.client().is_ok());
    }
}
