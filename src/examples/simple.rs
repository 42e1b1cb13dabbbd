//! Simple example of using reqwest-proxy-cache.

use reqwest_middleware::ClientBuilder;
use reqwest_proxy_cache::{
    parse_interval, ProxyCacheMiddleware, ProxyPool, ProxyPoolConfig, Transport,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Loading proxy pool...");

    let config = ProxyPoolConfig::builder()
        .store_path(std::env::temp_dir().join("reqwest-proxy-cache.json"))
        .refresh_interval(parse_interval("15m")?)
        .test_url("http://httpbin.org/ip")
        .build()?;

    let pool = Arc::new(ProxyPool::new(config).await?);
    println!("{} proxies in pool", pool.proxies().await?.len());

    // Pick a tested proxy and use it directly.
    let mut transport = Transport::new().with_timeout(Duration::from_secs(10));
    let proxy = pool.acquire_proxy(&mut transport).await?;
    println!("Acquired proxy {}", proxy);
    let response = transport.client()?.get("http://httpbin.org/ip").send().await?;
    println!("Direct: {}", response.text().await?);

    // Or let the middleware pick one per request.
    let client = ClientBuilder::new(reqwest::Client::new())
        .with(ProxyCacheMiddleware::from_pool(Arc::clone(&pool)))
        .build();
    let response = client.get("http://httpbin.org/ip").send().await?;
    println!("Middleware: {} {}", response.status(), response.text().await?);

    Ok(())
}
