use reqwest_middleware::ClientBuilder;
use reqwest_proxy_cache::pool::{ALIVE, TIMESTAMP_KEY};
use reqwest_proxy_cache::store::PoolFile;
use reqwest_proxy_cache::{ProxyCacheMiddleware, ProxyPool, ProxyPoolConfig};

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[tokio::test]
async fn unreachable_proxies_exhaust_the_pool() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pool.json");

    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
    let mut file = PoolFile::create(&path).unwrap();
    file.put(TIMESTAMP_KEY, now.to_string());
    // Nothing listens on port 1, so every attempt is refused right away.
    file.put("127.0.0.1:1", ALIVE);
    file.put("127.0.0.2:1", ALIVE);
    file.close().unwrap();

    let config = ProxyPoolConfig::builder()
        .store_path(&path)
        .sources(vec!["http://lists.test/a.txt"])
        .fetch_timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let pool = Arc::new(ProxyPool::new(config).await.unwrap());
    assert_eq!(pool.proxies().await.unwrap().len(), 2);

    let client = ClientBuilder::new(reqwest::Client::new())
        .with(ProxyCacheMiddleware::from_pool(Arc::clone(&pool)))
        .build();
    let err = client.get("http://target.test/ip").send().await.unwrap_err();

    assert!(matches!(err, reqwest_middleware::Error::Middleware(_)));
    assert!(!path.exists());
    assert!(pool.last_error().unwrap().contains("all proxies"));
    assert!(pool.current_proxy().is_none());
}
