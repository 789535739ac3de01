//! Trellis schema previewer.
//!
//! Renders one schema document against an in-memory data source seeded from
//! a fixtures file and returns the element tree as JSON.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use trellis_data::{DataSource, InMemoryDataSource};
use trellis_registry::{BuiltinComponents, ComponentRegistry};
use trellis_render::{RenderConfig, RenderContext, RenderPipeline, DEFAULT_CONFIG_FILE};
use trellis_schema::{Breakpoint, SchemaNode};

/// What to preview and how.
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub schema: PathBuf,
    pub fixtures: Option<PathBuf>,
    /// Overrides the config's default breakpoint.
    pub breakpoint: Option<Breakpoint>,
    pub user: Option<PathBuf>,
    pub config: PathBuf,
    /// Resolve the root's props instead of rendering the tree.
    pub props_only: bool,
}

impl PreviewOptions {
    pub fn new(schema: impl Into<PathBuf>) -> Self {
        Self {
            schema: schema.into(),
            fixtures: None,
            breakpoint: None,
            user: None,
            config: PathBuf::from(DEFAULT_CONFIG_FILE),
            props_only: false,
        }
    }
}

/// Renders the schema described by `options`.
///
/// A hidden root renders as `null`.
pub async fn preview(options: &PreviewOptions) -> Result<Value> {
    let config = RenderConfig::load_from(&options.config);
    let breakpoint = options.breakpoint.unwrap_or(config.default_breakpoint);

    let root = SchemaNode::from_value(read_json(&options.schema)?)
        .with_context(|| format!("Invalid schema document {}", options.schema.display()))?;

    let mut ctx = RenderContext::new(breakpoint);
    if let Some(path) = &options.user {
        ctx = ctx.with_user(read_json(path)?);
    }

    let registry = ComponentRegistry::new();
    registry
        .install(&BuiltinComponents)
        .context("Failed to install built-in components")?;
    let mut builder = RenderPipeline::builder(Arc::new(registry)).config(config);
    if let Some(path) = &options.fixtures {
        let source = InMemoryDataSource::load(path)
            .with_context(|| format!("Failed to load fixtures {}", path.display()))?;
        let source: Arc<dyn DataSource> = Arc::new(source);
        builder = builder.data_source(source);
    }
    let pipeline = builder.build();

    info!(%breakpoint, schema = %options.schema.display(), "Rendering preview");
    if options.props_only {
        let resolved = pipeline.resolve_props(&root, &ctx);
        return serde_json::to_value(resolved).context("Failed to serialize props");
    }

    let tree = pipeline.render(&root, &ctx).await;
    debug!(rendered = tree.is_some(), "Render pass finished");
    serde_json::to_value(tree).context("Failed to serialize element tree")
}

fn read_json(path: &Path) -> Result<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON in {}", path.display()))
}
