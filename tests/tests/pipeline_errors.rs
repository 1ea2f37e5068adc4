//! Failure handling: classifier outages, write failures, bad input.

use blob_store::WriterConfig;
use integration_tests::fixtures::{generated, postings, raw_jsonl};
use integration_tests::mocks::MockModel;
use integration_tests::setup::{TestContext, VISIBILITY};
use intake_queue::{FileRef, MessageQueue};
use std::time::Duration;
use worker::{DeliveryOutcome, ProcessorConfig, UnresolvedPolicy};

#[tokio::test]
async fn test_classifier_outage_drops_records_and_acks() {
    let model = MockModel::new().with("Acme", "Engineer", 2);
    model.set_should_fail(true);
    let ctx = TestContext::new(model);

    let file = ctx
        .upload("unit.jsonl", &postings(&[("Acme", "Engineer"), ("Beta", "CTO")]))
        .await;
    ctx.enqueue(&file).await;

    let outcomes = ctx.worker.poll_once().await.unwrap();
    assert_eq!(outcomes, vec![DeliveryOutcome::Acked]);
    assert!(ctx.intake.is_empty());
    assert_eq!(ctx.model.call_count(), 1);
    assert!(ctx.output_keys().is_empty());

    // nothing was cached from the failed call
    assert_eq!(ctx.cache.get("Acme", "Engineer").await.unwrap(), None);
}

#[tokio::test]
async fn test_partially_resolved_batch_keeps_resolved_records() {
    let model = MockModel::new().with("Acme", "Engineer", 2);
    let ctx = TestContext::new(model);

    let outcome = ctx
        .processor
        .process_unit(
            &ctx.upload("unit.jsonl", &postings(&[("Acme", "Engineer"), ("Beta", "CTO")]))
                .await,
        )
        .await
        .unwrap();

    assert_eq!(outcome.augmented, 1);
    assert_eq!(outcome.unresolved, 1);
    let records = ctx.output_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].company(), "Acme");
}

#[tokio::test(start_paused = true)]
async fn test_fail_unit_policy_leaves_unit_for_redelivery() {
    let model = MockModel::new().with("Acme", "Engineer", 2);
    let config = ProcessorConfig {
        unresolved_policy: UnresolvedPolicy::FailUnit,
        ..Default::default()
    };
    let ctx = TestContext::with_config(model, config, WriterConfig::default());

    let file = ctx
        .upload("unit.jsonl", &postings(&[("Acme", "Engineer"), ("Beta", "CTO")]))
        .await;
    let id = ctx.enqueue(&file).await;

    assert_eq!(
        ctx.worker.poll_once().await.unwrap(),
        vec![DeliveryOutcome::Failed]
    );
    assert!(ctx.output_keys().is_empty());
    assert_eq!(ctx.intake.len(), 1);

    // invisible until the visibility timeout passes
    assert!(ctx.worker.poll_once().await.unwrap().is_empty());

    tokio::time::advance(VISIBILITY + Duration::from_secs(1)).await;
    assert_eq!(
        ctx.worker.poll_once().await.unwrap(),
        vec![DeliveryOutcome::Failed]
    );
    assert_eq!(ctx.intake.delivery_count(&id), Some(2));
}

#[tokio::test(start_paused = true)]
async fn test_write_failure_is_redelivered_and_recovers() {
    let model = MockModel::new().with("Acme", "Engineer", 2);
    let ctx = TestContext::new(model);

    let file = ctx.upload("unit.jsonl", &postings(&[("Acme", "Engineer")])).await;
    let id = ctx.enqueue(&file).await;

    ctx.store.set_fail_writes(true);
    assert_eq!(
        ctx.worker.poll_once().await.unwrap(),
        vec![DeliveryOutcome::Failed]
    );
    assert!(ctx.output_keys().is_empty());

    ctx.store.set_fail_writes(false);
    tokio::time::advance(VISIBILITY + Duration::from_secs(1)).await;
    assert_eq!(ctx.intake.delivery_count(&id), Some(1));

    assert_eq!(
        ctx.worker.poll_once().await.unwrap(),
        vec![DeliveryOutcome::Acked]
    );
    assert!(ctx.intake.is_empty());
    assert_eq!(ctx.output_records().len(), 1);

    // the retry was answered from the cache
    assert_eq!(ctx.model.call_count(), 1);
}

#[tokio::test]
async fn test_failed_multipart_write_is_aborted() {
    let model = MockModel::new().with("Company 0", "Role 0", 1);
    let writer = WriterConfig {
        multipart_threshold: 1024,
        part_size: 512,
        ..Default::default()
    };
    let ctx = TestContext::with_config(model, ProcessorConfig::default(), writer);

    let file = ctx.upload("big.jsonl", &generated(50, 1)).await;
    ctx.store.set_fail_writes(true);

    assert!(ctx.processor.process_unit(&file).await.is_err());
    assert_eq!(ctx.store.inner().pending_uploads(), 0);
    assert!(ctx.output_keys().is_empty());
}

#[tokio::test]
async fn test_malformed_lines_are_skipped() {
    let model = MockModel::new().with("Acme", "Engineer", 2);
    let ctx = TestContext::new(model);

    let body = raw_jsonl(&[
        r#"{"company":"Acme","title":"Engineer","id":1}"#,
        "",
        "{not json",
        r#"{"title":"No company","id":2}"#,
        r#"{"company":"Acme","title":"Engineer","id":3}"#,
        "   ",
    ]);
    let file = ctx.upload_raw("mixed.jsonl", body).await;

    let outcome = ctx.processor.process_unit(&file).await.unwrap();
    assert_eq!(outcome.records_read, 2);
    assert_eq!(outcome.malformed, 2);

    let records = ctx.output_records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.seniority() == Some(2)));
}

#[tokio::test]
async fn test_conflicting_seniority_field_is_left_out() {
    let model = MockModel::new().with("Acme", "Engineer", 2);
    let ctx = TestContext::new(model);

    let body = raw_jsonl(&[
        r#"{"company":"Acme","title":"Engineer","id":1,"seniority":"senior"}"#,
        r#"{"company":"Acme","title":"Engineer","id":2}"#,
    ]);
    let outcome = ctx
        .processor
        .process_unit(&ctx.upload_raw("conflict.jsonl", body).await)
        .await
        .unwrap();

    assert_eq!(outcome.augmented, 1);
    assert_eq!(outcome.unchanged, 1);
    let records = ctx.output_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], 2);
}

#[tokio::test]
async fn test_poison_message_is_acknowledged() {
    let ctx = TestContext::new(MockModel::new());
    ctx.intake.send("definitely not a file reference").await.unwrap();

    let outcomes = ctx.worker.poll_once().await.unwrap();
    assert_eq!(outcomes, vec![DeliveryOutcome::Poison]);
    assert!(ctx.intake.is_empty());
}

#[tokio::test]
async fn test_missing_input_is_not_acknowledged() {
    let ctx = TestContext::new(MockModel::new());
    ctx.enqueue(&FileRef::new("incoming", "gone.jsonl")).await;

    let outcomes = ctx.worker.poll_once().await.unwrap();
    assert_eq!(outcomes, vec![DeliveryOutcome::Failed]);
    assert_eq!(ctx.intake.len(), 1);
}

#[tokio::test]
async fn test_unreadable_notification_is_dropped() {
    let ctx = TestContext::new(MockModel::new());
    ctx.notifications.send("{\"Records\": 7}").await.unwrap();

    assert_eq!(ctx.watcher.poll_once().await.unwrap(), 0);
    assert!(ctx.notifications.is_empty());
    assert!(ctx.intake.is_empty());
}
