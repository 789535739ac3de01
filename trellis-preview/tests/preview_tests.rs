use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use trellis_preview::{preview, PreviewOptions};
use trellis_registry::Element;
use trellis_schema::Breakpoint;

fn write(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, value.to_string()).unwrap();
    path
}

fn page() -> Value {
    json!({
        "type": "page",
        "id": "root",
        "body": [
            { "type": "grid", "id": "layout", "columns": { "xs": 1, "lg": 3 } },
            { "type": "list", "id": "orders", "dataSource": { "resource": "orders", "params": { "$count": true } } },
            { "type": "button", "id": "admin", "label": "Purge", "visibleOn": "user.role == 'admin'" }
        ]
    })
}

fn setup() -> (TempDir, PreviewOptions) {
    let dir = tempfile::tempdir().unwrap();
    let schema = write(dir.path(), "page.json", &page());
    let mut options = PreviewOptions::new(schema);
    options.config = dir.path().join("trellis.toml");
    (dir, options)
}

fn element(value: Value) -> Element {
    serde_json::from_value(value).unwrap()
}

// ── Render ──

#[tokio::test]
async fn renders_with_fixtures_and_user() {
    let (dir, mut options) = setup();
    options.fixtures = Some(write(
        dir.path(),
        "fixtures.json",
        &json!({ "collections": { "orders": [{ "id": "1" }, { "id": "2" }] } }),
    ));
    options.user = Some(write(dir.path(), "user.json", &json!({ "role": "admin" })));
    options.breakpoint = Some(Breakpoint::Lg);

    let tree = element(preview(&options).await.unwrap());
    let layout = tree.find("layout").unwrap().as_component().unwrap();
    assert_eq!(layout.props["columns"], json!(3));
    let orders = tree.find("orders").unwrap().as_component().unwrap();
    assert_eq!(orders.data.as_ref().unwrap()["total"], json!(2));
    assert!(tree.find("admin").is_some());
}

#[tokio::test]
async fn missing_fixtures_contain_fetch_errors() {
    let (dir, mut options) = setup();
    options.user = Some(write(dir.path(), "user.json", &json!({ "role": "viewer" })));

    let tree = element(preview(&options).await.unwrap());
    assert!(tree.find("orders").unwrap().is_error());
    assert!(tree.find("layout").is_some());
    assert!(tree.find("admin").is_none());
}

#[tokio::test]
async fn conditions_fail_open_without_user() {
    let (_dir, options) = setup();

    let tree = element(preview(&options).await.unwrap());
    assert!(tree.find("admin").is_some());
}

#[tokio::test]
async fn breakpoint_defaults_from_config() {
    let (_dir, options) = setup();
    fs::write(&options.config, "[render]\ndefault_breakpoint = \"xl\"\n").unwrap();

    let tree = element(preview(&options).await.unwrap());
    let layout = tree.find("layout").unwrap().as_component().unwrap();
    assert_eq!(layout.props["columns"], json!(3));
}

// ── Props only ──

#[tokio::test]
async fn props_only_resolves_root() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write(
        dir.path(),
        "grid.json",
        &json!({ "type": "grid", "columns": { "xs": 1, "lg": 3 }, "disabledOn": "true" }),
    );
    let mut options = PreviewOptions::new(schema);
    options.config = dir.path().join("trellis.toml");
    options.breakpoint = Some(Breakpoint::Sm);
    options.props_only = true;

    let resolved = preview(&options).await.unwrap();
    assert_eq!(
        resolved,
        json!({ "props": { "columns": 1 }, "visible": true, "disabled": true })
    );
}

// ── Errors ──

#[tokio::test]
async fn missing_schema_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let options = PreviewOptions::new(dir.path().join("absent.json"));

    let err = preview(&options).await.unwrap_err();
    assert!(err.to_string().contains("absent.json"));
}

#[tokio::test]
async fn schema_without_type_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let schema = write(dir.path(), "bad.json", &json!({ "body": [] }));
    let mut options = PreviewOptions::new(schema);
    options.config = dir.path().join("trellis.toml");

    let err = preview(&options).await.unwrap_err();
    assert!(err.to_string().starts_with("Invalid schema document"));
}
