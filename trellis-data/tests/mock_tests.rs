use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use trellis_data::mock::{FailingDataSource, GatedDataSource};
use trellis_data::{Capability, DataError, DataSource, InMemoryDataSource};
use trellis_schema::QueryParams;

// ── FailingDataSource ──

#[tokio::test]
async fn failing_source_fails_every_call() {
    let source = FailingDataSource::new("offline");
    let params = QueryParams::new();

    let err = source.find("orders", &params).await.unwrap_err();
    assert_eq!(err, DataError::Transport("offline".into()));
    assert!(source.find_one("orders", "1", &params).await.is_err());
    assert!(source.create("orders", json!({})).await.is_err());
    assert!(source.update("orders", "1", json!({})).await.is_err());
    assert!(source.delete("orders", "1").await.is_err());
    assert_eq!(source.calls(), 5);
}

#[test]
fn failing_source_has_no_optional_capabilities() {
    let source = FailingDataSource::new("offline");
    assert_eq!(source.capabilities().iter().count(), 0);
    assert!(!source.supports(Capability::Bulk));
    assert!(source.uploads().is_none());
}

// ── GatedDataSource ──

async fn seeded() -> Arc<dyn DataSource> {
    let inner = InMemoryDataSource::new();
    inner
        .insert_collection("orders", vec![json!({ "id": "1" })])
        .await;
    Arc::new(inner)
}

#[tokio::test]
async fn gated_reads_wait_for_release() {
    let gated = Arc::new(GatedDataSource::new(seeded().await));

    let reader = {
        let gated = Arc::clone(&gated);
        tokio::spawn(async move { gated.find("orders", &QueryParams::new()).await })
    };
    gated.wait_for_started(1).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!reader.is_finished());
    assert_eq!(gated.completed(), 0);

    gated.release();
    let result = reader.await.unwrap().unwrap();
    assert_eq!(result.data.len(), 1);
    assert_eq!(gated.started(), 1);
    assert_eq!(gated.completed(), 1);
}

#[tokio::test]
async fn released_gate_passes_immediately() {
    let gated = GatedDataSource::new(seeded().await);
    gated.release();
    assert!(gated.is_released());

    let record = gated
        .find_one("orders", "1", &QueryParams::new())
        .await
        .unwrap();
    assert!(record.is_some());
}

#[tokio::test]
async fn gated_writes_are_not_held() {
    let gated = GatedDataSource::new(seeded().await);
    gated.create("orders", json!({ "id": "2" })).await.unwrap();
    assert!(gated.delete("orders", "1").await.unwrap());
    assert_eq!(gated.started(), 0);
}
