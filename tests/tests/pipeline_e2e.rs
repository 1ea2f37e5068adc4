//! End-to-end tests for the augmentation pipeline on in-memory backends.

use augment_core::{JobPair, Seniority};
use blob_store::WriterConfig;
use integration_tests::fixtures::{generated, posting, postings, raw_jsonl};
use integration_tests::mocks::MockModel;
use integration_tests::setup::TestContext;
use intake_queue::FileRef;
use worker::{DeliveryOutcome, ProcessorConfig};

fn small_batches(batch_size: usize) -> ProcessorConfig {
    ProcessorConfig {
        batch_size,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_cached_and_inferred_pairs_are_merged() {
    let model = MockModel::new().with("B", "Mgr", 5);
    let ctx = TestContext::with_config(model, small_batches(2), WriterConfig::default());
    ctx.cache.set("A", "Eng", Seniority::new(3)).await.unwrap();

    let file = ctx
        .upload("unit.jsonl", &postings(&[("A", "Eng"), ("A", "Eng"), ("B", "Mgr")]))
        .await;
    ctx.enqueue(&file).await;

    let outcomes = ctx.worker.poll_once().await.unwrap();
    assert_eq!(outcomes, vec![DeliveryOutcome::Acked]);
    assert!(ctx.intake.is_empty());

    // one call, carrying only the pair the cache could not answer
    assert_eq!(ctx.model.calls(), vec![vec![JobPair::new("B", "Mgr")]]);

    // two batches, two objects
    assert_eq!(ctx.output_keys().len(), 2);
    let records = ctx.output_records();
    assert_eq!(records.len(), 3);

    for record in &records[..2] {
        assert_eq!(record.seniority(), Some(3));
        assert_eq!(record.seniority_level(), Some("Associate Level"));
    }
    assert_eq!(records[2].seniority(), Some(5));
    assert_eq!(records[2].seniority_level(), Some("Director Level"));

    // inferred result was cached for later units
    assert_eq!(
        ctx.cache.get("b", "mgr").await.unwrap(),
        Some(Seniority::new(5))
    );
}

#[tokio::test]
async fn test_duplicate_pairs_are_inferred_once() {
    let model = MockModel::new().with("Acme", "Engineer", 2).with("Beta", "CTO", 6);
    let ctx = TestContext::new(model);

    let records = postings(&[
        ("Acme", "Engineer"),
        ("ACME", "engineer"),
        ("Beta", "CTO"),
        ("Beta", "CTO"),
        ("acme", "Engineer"),
    ]);
    let outcome = ctx
        .processor
        .process_unit(&ctx.upload("dupes.jsonl", &records).await)
        .await
        .unwrap();

    assert_eq!(outcome.records_read, 5);
    assert_eq!(outcome.augmented, 5);
    assert_eq!(ctx.model.call_count(), 1);
    assert_eq!(
        ctx.model.calls()[0],
        vec![JobPair::new("Acme", "Engineer"), JobPair::new("Beta", "CTO")]
    );

    // spelling of each record is preserved
    let written = ctx.output_records();
    assert_eq!(written[1].company(), "ACME");
    assert_eq!(written[1].title(), "engineer");
    assert!(written.iter().take(2).all(|r| r.seniority() == Some(2)));
    assert_eq!(written[2].seniority_level(), Some("Executive Level"));
}

#[tokio::test]
async fn test_fully_cached_unit_makes_no_inference_call() {
    let model = MockModel::new().with("Acme", "Engineer", 2);
    let ctx = TestContext::new(model);
    let records = postings(&[("Acme", "Engineer"), ("Acme", "Engineer")]);

    let first = ctx.upload("first.jsonl", &records).await;
    ctx.processor.process_unit(&first).await.unwrap();
    assert_eq!(ctx.model.call_count(), 1);

    let second = ctx.upload("second.jsonl", &records).await;
    let outcome = ctx.processor.process_unit(&second).await.unwrap();
    assert_eq!(outcome.augmented, 2);
    assert_eq!(ctx.model.call_count(), 1);
    assert_eq!(ctx.output_keys().len(), 2);
}

#[tokio::test]
async fn test_unknown_level_gets_unknown_label() {
    let model = MockModel::new().with("Acme", "Wizard", 42);
    let ctx = TestContext::new(model);

    let file = ctx.upload("odd.jsonl", &postings(&[("Acme", "Wizard")])).await;
    ctx.processor.process_unit(&file).await.unwrap();

    let records = ctx.output_records();
    assert_eq!(records[0].seniority(), Some(42));
    assert_eq!(records[0].seniority_level(), Some("Unknown"));
}

#[tokio::test]
async fn test_reprocessing_augmented_output_is_stable() {
    let model = MockModel::new().with("Acme", "Engineer", 4);
    let ctx = TestContext::new(model);

    let file = ctx.upload("in.jsonl", &postings(&[("Acme", "Engineer")])).await;
    ctx.processor.process_unit(&file).await.unwrap();
    let once = ctx.output_records();

    let again = ctx.upload("again.jsonl", &once).await;
    ctx.processor.process_unit(&again).await.unwrap();

    let batches = ctx.output_batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0], batches[1]);
    assert_eq!(batches[0][0]["location"], "Remote");
}

#[tokio::test]
async fn test_large_batch_goes_through_multipart() {
    let model = (0..5).fold(MockModel::new(), |model, k| {
        model.with(&format!("Company {}", k), &format!("Role {}", k), k + 1)
    });
    let writer = WriterConfig {
        multipart_threshold: 4 * 1024,
        part_size: 1024,
        ..Default::default()
    };
    let ctx = TestContext::with_config(model, ProcessorConfig::default(), writer);

    let records = generated(200, 5);
    let outcome = ctx
        .processor
        .process_unit(&ctx.upload("big.jsonl", &records).await)
        .await
        .unwrap();

    assert_eq!(outcome.batches_written, 1);
    assert_eq!(ctx.store.inner().pending_uploads(), 0);

    let written = ctx.output_records();
    assert_eq!(written.len(), 200);
    for (input, output) in records.iter().zip(&written) {
        assert_eq!(input["id"], output["id"]);
        assert_eq!(input["description"], output["description"]);
    }
}

#[tokio::test]
async fn test_concurrent_batches_write_every_record() {
    let model = (0..5).fold(MockModel::new(), |model, k| {
        model.with(&format!("Company {}", k), &format!("Role {}", k), k + 1)
    });
    let config = ProcessorConfig {
        batch_size: 10,
        batch_concurrency: 4,
        ..Default::default()
    };
    let ctx = TestContext::with_config(model, config, WriterConfig::default());

    let outcome = ctx
        .processor
        .process_unit(&ctx.upload("many.jsonl", &generated(95, 5)).await)
        .await
        .unwrap();

    assert_eq!(outcome.batches, 10);
    assert_eq!(outcome.batches_written, 10);
    assert_eq!(ctx.output_keys().len(), 10);

    let written = ctx.output_records();
    assert_eq!(written.len(), 95);
    let ids: Vec<u64> = written
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, (0..95).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_notification_to_output_flow() {
    let model = MockModel::new().with("Acme", "Engineer", 2).with("Beta", "CTO", 6);
    let ctx = TestContext::new(model);

    let a = ctx.upload("2024/a.jsonl", &[posting(1, "Acme", "Engineer")]).await;
    let b = ctx.upload("2024/b.jsonl", &[posting(2, "Beta", "CTO")]).await;
    let ignored = FileRef::new("incoming", "2024/readme.txt");
    ctx.notify(&[a, ignored, b]).await;

    assert_eq!(ctx.watcher.poll_once().await.unwrap(), 2);
    assert!(ctx.notifications.is_empty());
    assert_eq!(ctx.intake.len(), 2);

    let outcomes = ctx.worker.poll_once().await.unwrap();
    assert_eq!(outcomes, vec![DeliveryOutcome::Acked, DeliveryOutcome::Acked]);
    assert!(ctx.intake.is_empty());

    let records = ctx.output_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].seniority_level(), Some("Junior Level"));
    assert_eq!(records[1].seniority_level(), Some("Executive Level"));
}

#[tokio::test]
async fn test_empty_unit_is_acknowledged() {
    let ctx = TestContext::new(MockModel::new());

    let file = ctx.upload_raw("empty.jsonl", bytes::Bytes::new()).await;
    ctx.enqueue(&file).await;

    let outcomes = ctx.worker.poll_once().await.unwrap();
    assert_eq!(outcomes, vec![DeliveryOutcome::Acked]);
    assert!(ctx.intake.is_empty());
    assert_eq!(ctx.model.call_count(), 0);
    assert!(ctx.output_keys().is_empty());
}

#[tokio::test]
async fn test_output_keeps_input_text_of_untouched_fields() {
    let model = MockModel::new().with("A", "Eng", 4);
    let ctx = TestContext::new(model);

    let body = raw_jsonl(&[
        r#"{"title":"Eng","ext_id":123456789012345678901234567890,"company":"A","price":0.1000000000000000055511151231257827}"#,
    ]);
    let file = ctx.upload_raw("precise.jsonl", body).await;
    ctx.processor.process_unit(&file).await.unwrap();

    let keys = ctx.output_keys();
    assert_eq!(keys.len(), 1);
    let object = ctx
        .store
        .inner()
        .object(&ctx.writer_config.output_container, &keys[0])
        .unwrap();
    let line = std::str::from_utf8(&object).unwrap().trim_end();
    assert_eq!(
        line,
        r#"{"title":"Eng","ext_id":123456789012345678901234567890,"company":"A","price":0.1000000000000000055511151231257827,"seniority":4,"seniority_level":"Manager Level"}"#
    );
}
