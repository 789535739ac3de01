use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use trellis_data::mock::GatedDataSource;
use trellis_data::{DataSource, InMemoryDataSource};
use trellis_registry::{
    BuiltinComponents, ComponentCategory, ComponentError, ComponentMeta, ComponentRegistry,
    Element, RenderInput,
};
use trellis_render::{NodeState, RecordingObserver, RenderContext, RenderPipeline};
use trellis_schema::{Breakpoint, SchemaNode};

struct Harness {
    pipeline: Arc<RenderPipeline>,
    gate: Arc<GatedDataSource>,
    observer: Arc<RecordingObserver>,
}

async fn harness_with(registry: ComponentRegistry) -> Harness {
    let inner = InMemoryDataSource::new();
    inner
        .insert_collection("orders", vec![json!({ "id": "1", "status": "open" })])
        .await;
    let inner: Arc<dyn DataSource> = Arc::new(inner);
    let gate = Arc::new(GatedDataSource::new(inner));
    let observer = Arc::new(RecordingObserver::new());

    let pipeline = RenderPipeline::builder(Arc::new(registry))
        .data_source(gate.clone())
        .observer(observer.clone())
        .build();
    Harness {
        pipeline: Arc::new(pipeline),
        gate,
        observer,
    }
}

fn builtins() -> ComponentRegistry {
    let registry = ComponentRegistry::new();
    registry.install(&BuiltinComponents).unwrap();
    registry
}

async fn harness() -> Harness {
    harness_with(builtins()).await
}

fn bound_page() -> SchemaNode {
    SchemaNode::from_value(json!({
        "type": "page",
        "body": [
            { "type": "list", "id": "orders", "dataSource": { "resource": "orders" } },
            { "type": "text", "id": "static", "value": "hi" }
        ]
    }))
    .unwrap()
}

fn ctx() -> RenderContext {
    RenderContext::new(Breakpoint::Md)
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    for _ in 0..200 {
        if done() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// ── Mount ──

#[tokio::test]
async fn shell_is_visible_while_fetch_is_pending() {
    let h = harness().await;
    let view = h.pipeline.mount(bound_page(), ctx());

    h.gate.wait_for_started(1).await;
    assert_eq!(view.state("orders"), Some(NodeState::ResolvingData));

    let shell = view.latest().unwrap();
    assert!(shell.find("orders").unwrap().is_loading());
    assert!(shell.find("static").unwrap().as_component().is_some());
}

#[tokio::test]
async fn mounted_view_commits_tree_after_fetch() {
    let h = harness().await;
    let mut view = h.pipeline.mount(bound_page(), ctx());

    h.gate.wait_for_started(1).await;
    h.gate.release();
    let tree = view.join().await.unwrap();
    let list = tree.find("orders").unwrap().as_component().unwrap();
    assert_eq!(list.data.as_ref().unwrap()["data"][0]["id"], json!("1"));
    assert_eq!(view.latest(), Some(tree));
    assert!(view.states().is_settled());
    assert_eq!(view.dropped_updates(), 0);
}

#[tokio::test]
async fn resolved_node_replaces_placeholder_before_siblings_finish() {
    let h = harness().await;
    let root = SchemaNode::from_value(json!({
        "type": "page",
        "body": [
            { "type": "list", "id": "broken", "dataSource": { "resource": "${nope}" } },
            { "type": "list", "id": "orders", "dataSource": { "resource": "orders" } }
        ]
    }))
    .unwrap();
    let mut view = h.pipeline.mount(root, ctx());

    h.gate.wait_for_started(1).await;
    let partial = view.latest().unwrap();
    assert!(partial.find("broken").unwrap().is_error());
    assert!(partial.find("orders").unwrap().is_loading());

    h.gate.release();
    let tree = view.join().await.unwrap();
    assert!(tree.find("orders").unwrap().as_component().is_some());
}

// ── Teardown ──

#[tokio::test]
async fn teardown_mid_fetch_produces_no_later_updates() {
    let h = harness().await;
    let mut view = h.pipeline.mount(bound_page(), ctx());

    h.gate.wait_for_started(1).await;
    let shell = view.latest();
    view.teardown();
    let states_at_teardown = view.states();
    let events_at_teardown = h.observer.event_count();

    assert_eq!(view.join().await, None);
    h.gate.release();
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The pass was aborted, so the fetch never delivered.
    assert_eq!(h.gate.completed(), 0);
    assert_eq!(h.observer.event_count(), events_at_teardown);
    assert!(h.observer.completed().is_empty());
    assert_eq!(view.states(), states_at_teardown);
    assert_eq!(view.state("orders"), Some(NodeState::ResolvingData));
    assert_eq!(view.latest(), shell);
    assert!(view.is_closed());
}

#[tokio::test]
async fn rerender_after_teardown_is_ignored() {
    let h = harness().await;
    let mut view = h.pipeline.mount(bound_page(), ctx());
    view.teardown();
    let generation = view.generation();

    view.rerender(bound_page());
    assert_eq!(view.generation(), generation);
    h.gate.release();
    assert_eq!(view.join().await, None);
}

#[tokio::test]
async fn dropping_a_view_discards_its_results() {
    let h = harness().await;
    let view = h.pipeline.mount(bound_page(), ctx());
    h.gate.wait_for_started(1).await;
    drop(view);
    let events = h.observer.event_count();

    h.gate.release();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.gate.completed(), 0);
    assert_eq!(h.observer.event_count(), events);
}

// ── Rerender ──

#[tokio::test]
async fn rerender_supersedes_pass_in_flight() {
    let h = harness().await;
    let mut view = h.pipeline.mount(bound_page(), ctx());
    let first = view.generation();
    h.gate.wait_for_started(1).await;

    let replacement = SchemaNode::from_value(json!({
        "type": "page",
        "body": [{ "type": "text", "id": "fresh", "value": "v2" }]
    }))
    .unwrap();
    view.rerender(replacement);
    assert!(view.generation() > first);

    let tree = view.join().await.unwrap();
    assert!(tree.find("fresh").is_some());
    assert!(tree.find("orders").is_none());

    h.gate.release();
    let gate = Arc::clone(&h.gate);
    wait_until(move || gate.completed() == 1).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    // The stale pass finished after the new one and changed nothing.
    assert_eq!(view.latest(), Some(tree));
    assert_eq!(view.state("orders"), None);
    assert_eq!(h.observer.completed().len(), 1);
    assert!(view.dropped_updates() >= 1);
}

#[tokio::test]
async fn superseded_pass_does_not_invoke_renderers() {
    let registry = builtins();
    let renders = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&renders);
    let counting = move |input: RenderInput| -> Result<Element, ComponentError> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Element::text(input.key, "list"))
    };
    registry
        .register("list", counting, ComponentMeta::new("List", ComponentCategory::Data))
        .unwrap();
    let h = harness_with(registry).await;

    let mut view = h.pipeline.mount(bound_page(), ctx());
    h.gate.wait_for_started(1).await;
    let shell_renders = renders.load(Ordering::SeqCst);

    view.rerender(SchemaNode::from_value(json!({ "type": "divider" })).unwrap());
    view.join().await.unwrap();

    h.gate.release();
    let gate = Arc::clone(&h.gate);
    wait_until(move || gate.completed() == 1).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(renders.load(Ordering::SeqCst), shell_renders);
}

#[tokio::test]
async fn rerender_with_new_breakpoint() {
    let h = harness().await;
    h.gate.release();
    let grid = SchemaNode::from_value(json!({ "type": "grid", "columns": { "xs": 1, "lg": 3 } })).unwrap();

    let mut view = h.pipeline.mount(grid.clone(), RenderContext::new(Breakpoint::Xs));
    let columns = |tree: Option<Element>| -> Value {
        tree.unwrap().as_component().unwrap().props["columns"].clone()
    };
    assert_eq!(columns(view.join().await), json!(1));

    view.rerender_with(grid, RenderContext::new(Breakpoint::Lg));
    assert_eq!(view.context().breakpoint(), Breakpoint::Lg);
    assert_eq!(columns(view.join().await), json!(3));
}
