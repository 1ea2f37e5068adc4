//! Health and metrics endpoint tests.

use axum_test::TestServer;
use blob_store::BlobStore;
use intake_queue::MessageQueue;
use integration_tests::fixtures::postings;
use integration_tests::mocks::MockModel;
use integration_tests::setup::TestContext;
use std::sync::Arc;
use telemetry::health;
use worker::HealthProbes;

#[tokio::test]
async fn test_liveness() {
    let ctx = TestContext::new(MockModel::new());
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server.get("/health/live").await.assert_status_ok();
}

#[tokio::test]
async fn test_readiness_follows_probes() {
    let ctx = TestContext::new(MockModel::new());
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let probes = HealthProbes {
        cache: Some(ctx.cache.clone()),
        inference: Some(ctx.inference.clone()),
        storage: Some(Arc::new(ctx.store.clone()) as Arc<dyn BlobStore>),
        queue: Some(ctx.intake.clone() as Arc<dyn MessageQueue>),
    };
    probes.check_all().await;

    server.get("/health/ready").await.assert_status_ok();
    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["ready"], true);
    assert_eq!(body["mode"], "all");

    // classifier outage degrades the service but keeps it ready
    ctx.model.set_should_fail(true);
    probes.check_all().await;
    server.get("/health/ready").await.assert_status_ok();
    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["status"], "degraded");
    let inference = body["components"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "inference")
        .unwrap();
    assert_eq!(inference["healthy"], false);

    health().queue.set_unhealthy("queue unreachable");
    server
        .get("/health/ready")
        .await
        .assert_status(axum::http::StatusCode::SERVICE_UNAVAILABLE);

    ctx.model.set_should_fail(false);
    probes.check_all().await;
    server.get("/health/ready").await.assert_status_ok();
}

#[tokio::test]
async fn test_metrics_reflect_processing() {
    let model = MockModel::new().with("Acme", "Engineer", 2);
    let ctx = TestContext::new(model);
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let file = ctx
        .upload("unit.jsonl", &postings(&[("Acme", "Engineer"), ("Acme", "Engineer")]))
        .await;
    ctx.enqueue(&file).await;
    ctx.worker.poll_once().await.unwrap();

    let response = server.get("/metrics").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["units_processed"].as_u64().unwrap() >= 1);
    assert!(body["records_augmented"].as_u64().unwrap() >= 2);
    assert!(body["batches_written"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let ctx = TestContext::new(MockModel::new());
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/ingest").await;
    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "not_found");
}
