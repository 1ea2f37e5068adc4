//! Redis-backed cache and queue tests.
//!
//! Run with `--ignored`; needs Docker or `AUGMENT_TEST_REDIS_URL`.

use augment_core::{PairKey, Seniority};
use integration_tests::containers::TestContainers;
use intake_queue::{FileRef, MessageQueue, RedisStreamQueue};
use seniority_cache::{CacheClient, RedisCacheStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn cache(url: &str) -> CacheClient {
    CacheClient::new(
        Arc::new(RedisCacheStore::new(url).expect("Invalid redis url")),
        Duration::from_secs(3600),
    )
}

fn queue(url: &str, visibility: Duration) -> RedisStreamQueue {
    let stream = format!("augment:test:{}", uuid::Uuid::new_v4().simple());
    RedisStreamQueue::new(url, stream, "augmenter", "tests", visibility)
        .expect("Invalid redis url")
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_cache_round_trip() {
    let containers = TestContainers::start().await;
    let cache = cache(&containers.redis_url);
    cache.flush_all().await.unwrap();

    cache.set("Acme", "Engineer", Seniority::new(3)).await.unwrap();
    assert_eq!(
        cache.get("acme", "ENGINEER").await.unwrap(),
        Some(Seniority::new(3))
    );

    let mut results = HashMap::new();
    results.insert(PairKey::new("Beta", "CTO"), Seniority::new(6));
    results.insert(PairKey::new("Gamma", "Intern"), Seniority::new(1));
    assert_eq!(cache.bulk_set(&results).await, 2);

    let keys = vec![
        PairKey::new("Acme", "Engineer"),
        PairKey::new("Beta", "CTO"),
        PairKey::new("Delta", "Nobody"),
        PairKey::new("Gamma", "Intern"),
    ];
    let hits = cache.bulk_get(&keys).await;
    assert_eq!(hits.len(), 3);
    assert_eq!(hits[&PairKey::new("beta", "cto")], Seniority::new(6));
    assert!(!hits.contains_key(&PairKey::new("Delta", "Nobody")));

    assert!(cache.delete("Acme", "Engineer").await.unwrap());
    assert_eq!(cache.get("Acme", "Engineer").await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_queue_send_receive_ack() {
    let containers = TestContainers::start().await;
    let queue = queue(&containers.redis_url, Duration::from_secs(30));
    queue.ping().await.unwrap();

    let file = FileRef::new("incoming", "a.jsonl");
    let id = queue.send(&file.to_body().unwrap()).await.unwrap();

    let deliveries = queue.receive(10, Duration::from_secs(1)).await.unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].id, id);
    assert_eq!(FileRef::from_body(&deliveries[0].body).unwrap(), file);

    queue.ack(&deliveries[0].receipt).await.unwrap();
    assert!(queue
        .receive(10, Duration::from_millis(200))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_redis_queue_redelivers_unacked() {
    let containers = TestContainers::start().await;
    let queue = queue(&containers.redis_url, Duration::from_millis(500));

    let id = queue.send("payload").await.unwrap();
    let first = queue.receive(10, Duration::from_secs(1)).await.unwrap();
    assert_eq!(first.len(), 1);

    // pending but not yet idle long enough
    assert!(queue
        .receive(10, Duration::from_millis(100))
        .await
        .unwrap()
        .is_empty());

    tokio::time::sleep(Duration::from_millis(700)).await;
    let second = queue.receive(10, Duration::from_secs(1)).await.unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, id);
    assert_eq!(second[0].body, "payload");

    queue.ack(&second[0].receipt).await.unwrap();
}
