use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::thread;
use trellis_registry::*;

fn props(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("props must be an object"),
    }
}

fn tagged(label: &'static str) -> impl ComponentRenderer {
    move |input: RenderInput| -> Result<Element, ComponentError> { Ok(Element::text(input.key, label)) }
}

fn render(resolution: &Resolution, input: RenderInput) -> Element {
    resolution.renderer().render(input).unwrap()
}

// ── Registration ─────────────────────────────────────────────────

#[test]
fn second_registration_is_authoritative() {
    let registry = ComponentRegistry::new();
    let first = registry
        .register("card", tagged("first"), ComponentMeta::new("Card", ComponentCategory::Layout))
        .unwrap();
    assert!(first.is_none());

    let replaced = registry
        .register("card", tagged("second"), ComponentMeta::new("Card v2", ComponentCategory::Layout))
        .unwrap();
    assert_eq!(replaced.unwrap().meta.label, "Card");

    let resolution = registry.resolve("card");
    assert!(resolution.is_found());
    assert_eq!(resolution.meta().unwrap().label, "Card v2");
    assert_eq!(
        render(&resolution, RenderInput::new("card", "root")),
        Element::text("root", "second")
    );
    assert_eq!(registry.len(), 1);
}

#[test]
fn empty_type_tag_is_rejected() {
    let registry = ComponentRegistry::new();
    let err = registry
        .register("  ", PassthroughRenderer, ComponentMeta::default())
        .unwrap_err();
    assert!(matches!(err, RegistryError::InvalidTypeTag(_)));
    assert!(registry.is_empty());
}

#[test]
fn unregister_removes_entry() {
    let registry = ComponentRegistry::new();
    registry
        .register("badge", PassthroughRenderer, ComponentMeta::default())
        .unwrap();
    let removed = registry.unregister("badge").unwrap();
    assert_eq!(removed.type_tag, "badge");
    assert!(!registry.contains("badge"));
    assert!(matches!(
        registry.unregister("badge"),
        Err(RegistryError::NotRegistered(tag)) if tag == "badge"
    ));
}

#[test]
fn concurrent_registration_from_many_threads() {
    let registry = Arc::new(ComponentRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                registry
                    .register(format!("widget-{i}"), PassthroughRenderer, ComponentMeta::default())
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(registry.len(), 8);
}

// ── Resolution ───────────────────────────────────────────────────

#[test]
fn unknown_tag_resolves_to_fallback() {
    let registry = ComponentRegistry::new();
    let resolution = registry.resolve("mystery");
    assert!(!resolution.is_found());
    assert!(resolution.meta().is_none());
    assert_eq!(
        render(&resolution, RenderInput::new("mystery", "root/1")),
        Element::Unknown {
            key: "root/1".into(),
            type_tag: "mystery".into()
        }
    );
}

#[test]
fn fallback_is_replaceable() {
    let registry = ComponentRegistry::new().with_fallback(tagged("custom fallback"));
    let resolution = registry.resolve("mystery");
    assert_eq!(
        render(&resolution, RenderInput::new("mystery", "k")),
        Element::text("k", "custom fallback")
    );
}

#[test]
fn query_surface_is_sorted() {
    let registry = ComponentRegistry::new();
    registry.install(&BuiltinComponents).unwrap();

    let tags = registry.type_tags();
    let mut sorted = tags.clone();
    sorted.sort();
    assert_eq!(tags, sorted);
    assert_eq!(tags.len(), BuiltinComponents::type_tags().len());

    assert_eq!(
        registry.by_category(ComponentCategory::Form),
        vec!["form".to_string(), "input".to_string()]
    );
    assert_eq!(registry.meta("grid").unwrap().label, "Grid");
    assert!(registry.meta("nope").is_none());
}

// ── Plugins ──────────────────────────────────────────────────────

struct Charts;

impl ComponentPlugin for Charts {
    fn id(&self) -> &str {
        "acme.charts"
    }

    fn register(&self, registry: &ComponentRegistry) -> RegistryResult<()> {
        registry.register("chart", PassthroughRenderer, ComponentMeta::new("Chart", ComponentCategory::Data))?;
        // Overrides the builtin card.
        registry.register("card", tagged("acme card"), ComponentMeta::new("Acme Card", ComponentCategory::Layout))?;
        Ok(())
    }
}

struct Broken;

impl ComponentPlugin for Broken {
    fn id(&self) -> &str {
        "broken"
    }

    fn register(&self, registry: &ComponentRegistry) -> RegistryResult<()> {
        registry.register("gauge", PassthroughRenderer, ComponentMeta::default())?;
        registry.register("card", tagged("broken card"), ComponentMeta::new("Broken Card", ComponentCategory::Layout))?;
        registry.register("", PassthroughRenderer, ComponentMeta::default())?;
        Ok(())
    }
}

#[test]
fn later_plugin_overrides_builtin() {
    let registry = ComponentRegistry::new();
    registry.install(&BuiltinComponents).unwrap();
    registry.install(&Charts).unwrap();

    assert!(registry.contains("chart"));
    assert_eq!(registry.meta("card").unwrap().label, "Acme Card");
    assert_eq!(
        registry.installed_plugins(),
        vec![BuiltinComponents::ID.to_string(), "acme.charts".to_string()]
    );
}

#[test]
fn plugin_installs_once() {
    let registry = ComponentRegistry::new();
    registry.install(&Charts).unwrap();
    assert!(matches!(
        registry.install(&Charts),
        Err(RegistryError::PluginAlreadyInstalled(id)) if id == "acme.charts"
    ));
}

#[test]
fn failing_plugin_is_not_recorded() {
    let registry = ComponentRegistry::new();
    let err = registry.install(&Broken).unwrap_err();
    assert!(matches!(err, RegistryError::PluginFailed { .. }));
    assert!(registry.installed_plugins().is_empty());
}

#[test]
fn failing_plugin_leaves_no_components_behind() {
    let registry = ComponentRegistry::new();
    registry.install(&BuiltinComponents).unwrap();
    let before = registry.type_tags();

    registry.install(&Broken).unwrap_err();
    assert!(!registry.contains("gauge"));
    assert_eq!(registry.meta("card").unwrap().label, "Card");
    assert_eq!(registry.type_tags(), before);
}

// ── Builtins ─────────────────────────────────────────────────────

#[test]
fn builtin_package_registers_every_tag() {
    let registry = ComponentRegistry::new();
    registry.install(&BuiltinComponents).unwrap();
    for tag in [
        "page", "container", "grid", "flex", "card", "text", "tpl", "form", "input", "button",
        "table", "list", "tabs", "divider", "image",
    ] {
        assert!(registry.contains(tag), "missing builtin {tag}");
    }
}

#[test]
fn builtin_renders_generic_component() {
    let registry = ComponentRegistry::new();
    registry.install(&BuiltinComponents).unwrap();

    let mut input = RenderInput::new("card", "root");
    input.props = props(json!({ "title": "Orders" }));
    input.children = vec![Element::text("root/0", "hello")];

    let element = render(&registry.resolve("card"), input);
    let component = element.as_component().unwrap();
    assert_eq!(component.type_tag, "card");
    assert_eq!(component.props["title"], json!("Orders"));
    assert_eq!(element.children().len(), 1);
    assert!(element.find("root/0").is_some());
}

#[test]
fn grid_rejects_bad_columns() {
    let registry = ComponentRegistry::new();
    registry.install(&BuiltinComponents).unwrap();
    let resolution = registry.resolve("grid");

    let mut ok = RenderInput::new("grid", "g");
    ok.props = props(json!({ "columns": 3 }));
    assert!(resolution.renderer().render(ok).is_ok());

    let mut bad = RenderInput::new("grid", "g");
    bad.props = props(json!({ "columns": 0 }));
    assert!(matches!(
        resolution.renderer().render(bad),
        Err(ComponentError::InvalidProps { .. })
    ));
}

#[test]
fn table_requires_column_array() {
    let mut input = RenderInput::new("table", "t");
    input.props = props(json!({ "columns": "name" }));
    assert!(TableRenderer.render(input).is_err());
}

// ── Metadata ─────────────────────────────────────────────────────

#[test]
fn defaults_never_override_explicit_props() {
    let meta = ComponentMeta::new("Button", ComponentCategory::Basic)
        .with_default("size", "md")
        .with_input(ComponentInput::new("level", InputType::String).with_default("default"));

    let mut resolved = props(json!({ "size": "lg" }));
    meta.apply_defaults(&mut resolved);
    assert_eq!(Value::Object(resolved), json!({ "size": "lg", "level": "default" }));
}

#[test]
fn missing_required_lists_absent_and_null_inputs() {
    let meta = ComponentMeta::new("Image", ComponentCategory::Media)
        .with_input(ComponentInput::new("src", InputType::String).required())
        .with_input(ComponentInput::new("alt", InputType::String).required())
        .with_input(ComponentInput::new("width", InputType::Number));

    let resolved = props(json!({ "alt": null, "width": 10 }));
    assert_eq!(meta.missing_required(&resolved), vec!["src", "alt"]);
    assert!(meta.missing_required(&props(json!({ "src": "a.png", "alt": "" }))).is_empty());
}

#[test]
fn meta_round_trips_through_json() {
    let meta = ComponentMeta::new("Flex", ComponentCategory::Layout)
        .container()
        .with_input(ComponentInput::new("direction", InputType::String).with_options(["row", "column"]));
    let value = serde_json::to_value(&meta).unwrap();
    assert_eq!(value["category"], json!("layout"));
    assert_eq!(value["isContainer"], json!(true));
    assert_eq!(value["inputs"][0]["type"], json!("enum"));
    let back: ComponentMeta = serde_json::from_value(value).unwrap();
    assert_eq!(back, meta);
}

#[test]
fn element_serializes_with_kind_tag() {
    let element = Element::Unknown {
        key: "root".into(),
        type_tag: "x".into(),
    };
    assert_eq!(
        serde_json::to_value(&element).unwrap(),
        json!({ "kind": "unknown", "key": "root", "typeTag": "x" })
    );
    assert_eq!(
        serde_json::to_value(Element::loading("a")).unwrap(),
        json!({ "kind": "loading", "key": "a" })
    );
}

#[test]
fn replace_swaps_nested_element_by_key() {
    let mut tree = Element::Component(ComponentElement {
        type_tag: "page".into(),
        key: "root".into(),
        props: Map::new(),
        data: None,
        disabled: false,
        diagnostics: Vec::new(),
        children: vec![Element::loading("orders"), Element::text("note", "hi")],
    });

    assert!(tree.replace("orders", Element::text("orders", "done")));
    assert_eq!(tree.find("orders"), Some(&Element::text("orders", "done")));
    assert_eq!(tree.children().len(), 2);
    assert!(!tree.replace("missing", Element::loading("missing")));
}
