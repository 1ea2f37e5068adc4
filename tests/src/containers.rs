//! Testcontainer setup for Redis.

use seniority_cache::{CacheStore, RedisCacheStore};
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage,
};

/// Container handle for Redis.
pub struct TestContainers {
    #[allow(dead_code)]
    redis: Option<ContainerAsync<GenericImage>>,
    pub redis_url: String,
}

impl TestContainers {
    /// Start Redis, or use `AUGMENT_TEST_REDIS_URL` when set.
    pub async fn start() -> Self {
        if let Some(url) = std::env::var("AUGMENT_TEST_REDIS_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            return Self {
                redis: None,
                redis_url: url,
            };
        }

        let (redis, redis_url) = start_redis().await;
        Self {
            redis: Some(redis),
            redis_url,
        }
    }
}

/// Start a Redis container, return container and connection URL.
pub async fn start_redis() -> (ContainerAsync<GenericImage>, String) {
    let image = GenericImage::new("redis", "7-alpine")
        .with_exposed_port(6379.tcp())
        .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"));

    let container = image.start().await.expect("Failed to start Redis");
    let port = container.get_host_port_ipv4(6379).await.unwrap();
    let url = format!("redis://127.0.0.1:{}/0", port);

    wait_for_redis(&url, Duration::from_secs(30)).await;
    (container, url)
}

/// Wait for Redis to answer PING.
async fn wait_for_redis(url: &str, timeout: Duration) {
    let store = RedisCacheStore::new(url).expect("Invalid redis url");
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if store.ping().await.is_ok() {
            return;
        }
        store.reset_connection().await;
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    panic!("Redis at {} not ready after {:?}", url, timeout);
}
