//! The render pipeline.
//!
//! Walks a [`SchemaNode`] tree and produces an [`Element`] tree. Per node:
//!
//! 1. resolve responsive attributes and visibility conditions;
//!    invisible nodes stop here and render nothing;
//! 2. fetch the node's data binding, the only suspension point;
//! 3. resolve the type tag through the registry (unknown tags get the
//!    fallback);
//! 4. render children concurrently with the data-augmented context, then
//!    hand everything to the component renderer.
//!
//! Failures are contained: a failing fetch, renderer or depth check turns
//! that node's subtree into an error placeholder and siblings carry on.

use crate::config::RenderConfig;
use crate::context::RenderContext;
use crate::error::{RenderError, RenderResult};
use crate::observer::RenderObserver;
use crate::props::{self, resolve_props, ResolvedProps};
use crate::session::RenderSession;
use crate::state::{NodeState, StateTable};
use futures::future::{join_all, BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};
use trellis_data::DataSource;
use trellis_expr::Evaluator;
use trellis_registry::{
    ComponentError, ComponentRegistry, Diagnostic, Element, RenderInput, Resolution,
};
use trellis_schema::{ChildContent, DataBinding, SchemaNode};

/// Key of a root node without an id.
pub const ROOT_KEY: &str = "root";

/// Builder for [`RenderPipeline`].
pub struct RenderPipelineBuilder {
    registry: Arc<ComponentRegistry>,
    data_source: Option<Arc<dyn DataSource>>,
    config: RenderConfig,
    evaluator: Option<Evaluator>,
    observer: Option<Arc<dyn RenderObserver>>,
}

impl RenderPipelineBuilder {
    pub fn data_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.data_source = Some(source);
        self
    }

    pub fn config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides the evaluator built from the config.
    pub fn evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn RenderObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> RenderPipeline {
        let evaluator = self.evaluator.unwrap_or_else(|| {
            Evaluator::new()
                .with_mode(self.config.expression_mode)
                .with_cache_capacity(self.config.expression_cache_size)
        });
        RenderPipeline {
            registry: self.registry,
            data_source: self.data_source,
            evaluator,
            config: self.config,
            observer: self.observer,
        }
    }
}

/// Interprets schema trees against a registry and an optional data source.
pub struct RenderPipeline {
    registry: Arc<ComponentRegistry>,
    data_source: Option<Arc<dyn DataSource>>,
    evaluator: Evaluator,
    config: RenderConfig,
    observer: Option<Arc<dyn RenderObserver>>,
}

/// Per-pass state shared by every node of one render.
pub(crate) struct Pass {
    pub(crate) session: RenderSession,
    pub(crate) states: Arc<Mutex<StateTable>>,
    pub(crate) committed: Arc<Mutex<Option<Element>>>,
}

impl Pass {
    pub(crate) fn detached() -> Self {
        Self {
            session: RenderSession::detached(),
            states: Arc::default(),
            committed: Arc::default(),
        }
    }

    /// Swaps a resolved node into the committed tree, replacing its loading
    /// placeholder, if the pass is still current.
    fn splice(&self, element: &Element) {
        self.session.apply(|| {
            let mut committed = self.committed.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(tree) = committed.as_mut() {
                let key = element.key().to_string();
                if tree.replace(&key, element.clone()) {
                    debug!(key = %key, "Resolved node spliced into view");
                }
            }
        });
    }
}

impl RenderPipeline {
    pub fn builder(registry: Arc<ComponentRegistry>) -> RenderPipelineBuilder {
        RenderPipelineBuilder {
            registry,
            data_source: None,
            config: RenderConfig::default(),
            evaluator: None,
            observer: None,
        }
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn data_source(&self) -> Option<&Arc<dyn DataSource>> {
        self.data_source.as_ref()
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// An empty context at the configured default breakpoint.
    pub fn context(&self) -> RenderContext {
        RenderContext::new(self.config.default_breakpoint)
    }

    /// Effective props of a single node, as the pipeline would render it.
    pub fn resolve_props(&self, node: &SchemaNode, ctx: &RenderContext) -> ResolvedProps {
        let resolution = self.registry.resolve(&node.node_type);
        resolve_props(node, ctx, &self.evaluator, resolution.meta())
    }

    /// Renders `root` to completion. Returns `None` when the root itself is
    /// hidden.
    pub async fn render(&self, root: &SchemaNode, ctx: &RenderContext) -> Option<Element> {
        self.run(root, ctx.clone(), &Pass::detached()).await
    }

    /// Like [`render`](Self::render), also returning the final state of
    /// every node.
    pub async fn render_with_states(
        &self,
        root: &SchemaNode,
        ctx: &RenderContext,
    ) -> (Option<Element>, StateTable) {
        let pass = Pass::detached();
        let tree = self.run(root, ctx.clone(), &pass).await;
        let states = pass.states.lock().unwrap_or_else(PoisonError::into_inner).clone();
        (tree, states)
    }

    /// Synchronous first paint: data-bound nodes render as loading
    /// placeholders without fetching, everything else renders fully.
    pub fn render_shell(&self, root: &SchemaNode, ctx: &RenderContext) -> Option<Element> {
        self.shell_node(root, ctx, root_key(root), 0)
    }

    /// Runs one pass and commits the result if the pass is still current.
    pub(crate) async fn run(&self, root: &SchemaNode, ctx: RenderContext, pass: &Pass) -> Option<Element> {
        let key = root_key(root);
        debug!(generation = %pass.session.generation(), nodes = root.node_count(), "Render pass started");
        let tree = self.render_node(root, Arc::new(ctx), key, 0, pass).await;

        pass.session.apply(|| {
            *pass.committed.lock().unwrap_or_else(PoisonError::into_inner) = tree.clone();
            if let (Some(observer), Some(root)) = (&self.observer, &tree) {
                observer.on_complete(root);
            }
        })?;
        debug!(generation = %pass.session.generation(), "Render pass committed");
        tree
    }

    // ========================================================================
    // Node walk
    // ========================================================================

    fn render_node<'a>(
        &'a self,
        node: &'a SchemaNode,
        ctx: Arc<RenderContext>,
        key: String,
        depth: usize,
        pass: &'a Pass,
    ) -> BoxFuture<'a, Option<Element>> {
        async move {
            self.transition(pass, &key, NodeState::Pending);
            if depth >= self.config.max_depth {
                return Some(self.fail(pass, key, RenderError::DepthExceeded(self.config.max_depth)));
            }
            if let Some(reason) = node.malformed_reason() {
                return Some(self.fail(pass, key, RenderError::MalformedNode(reason.to_string())));
            }
            if !pass.session.is_current() {
                return None;
            }

            self.transition(pass, &key, NodeState::ResolvingVisibility);
            let resolution = self.registry.resolve(&node.node_type);
            let mut resolved = resolve_props(node, &ctx, &self.evaluator, resolution.meta());
            if !resolved.visible {
                self.transition(pass, &key, NodeState::Hidden);
                return None;
            }

            let (data, ctx) = match &node.data_source {
                None => (None, ctx),
                Some(binding) => {
                    self.transition(pass, &key, NodeState::ResolvingData);
                    match self.fetch(binding, &ctx).await {
                        Ok((data, child_ctx)) => (Some(data), Arc::new(child_ctx)),
                        Err(error) => {
                            let placeholder = self.fail(pass, key, error);
                            pass.splice(&placeholder);
                            return Some(placeholder);
                        }
                    }
                }
            };

            self.transition(pass, &key, NodeState::Dispatching);
            let children = match &node.content {
                ChildContent::Nodes(nodes) => {
                    let pending = nodes.iter().zip(child_keys(nodes, &key)).map(|(child, child_key)| {
                        self.render_node(child, Arc::clone(&ctx), child_key, depth + 1, pass)
                    });
                    join_all(pending).await.into_iter().flatten().collect()
                }
                _ => self.leaf_children(node, &ctx, &key, &mut resolved.diagnostics),
            };

            if !pass.session.is_current() {
                return None;
            }
            let bound = data.is_some();
            let result = self.invoke(&resolution, node, key.clone(), resolved, data, children);
            let element = match result {
                Ok(element) => {
                    self.transition(pass, &key, NodeState::Rendered);
                    element
                }
                Err(error) => self.fail(pass, key, error.into()),
            };
            if bound {
                pass.splice(&element);
            }
            Some(element)
        }
        .boxed()
    }

    fn shell_node(&self, node: &SchemaNode, ctx: &RenderContext, key: String, depth: usize) -> Option<Element> {
        if depth >= self.config.max_depth {
            return Some(Element::error(key, RenderError::DepthExceeded(self.config.max_depth).to_string()));
        }
        if let Some(reason) = node.malformed_reason() {
            return Some(Element::error(key, RenderError::MalformedNode(reason.to_string()).to_string()));
        }
        let resolution = self.registry.resolve(&node.node_type);
        let mut resolved = resolve_props(node, ctx, &self.evaluator, resolution.meta());
        if !resolved.visible {
            return None;
        }
        if node.data_source.is_some() {
            return Some(Element::loading(key));
        }

        let children = match &node.content {
            ChildContent::Nodes(nodes) => nodes
                .iter()
                .zip(child_keys(nodes, &key))
                .filter_map(|(child, child_key)| self.shell_node(child, ctx, child_key, depth + 1))
                .collect(),
            _ => self.leaf_children(node, ctx, &key, &mut resolved.diagnostics),
        };

        match self.invoke(&resolution, node, key.clone(), resolved, None, children) {
            Ok(element) => Some(element),
            Err(error) => Some(Element::error(key, RenderError::from(error).to_string())),
        }
    }

    fn leaf_children(
        &self,
        node: &SchemaNode,
        ctx: &RenderContext,
        key: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<Element> {
        match node.content.leaf_text() {
            Some(text) => {
                let text = props::leaf_text(text, ctx, &self.evaluator, diagnostics);
                vec![Element::text(format!("{key}/0"), text)]
            }
            None => Vec::new(),
        }
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Runs a node's binding and derives the context for its children.
    async fn fetch(&self, binding: &DataBinding, ctx: &RenderContext) -> RenderResult<(Value, RenderContext)> {
        let source = self.data_source.as_ref().ok_or(RenderError::NoDataSource)?;
        let resource = self
            .evaluator
            .interpolate(&binding.resource, ctx.expr())
            .map_err(RenderError::Binding)?;

        match &binding.id {
            Some(id) => {
                let id = self
                    .evaluator
                    .interpolate(id, ctx.expr())
                    .map_err(RenderError::Binding)?;
                debug!(resource = %resource, id = %id, "Fetching record");
                let record = source
                    .find_one(&resource, &id, &binding.params)
                    .await?
                    .unwrap_or(Value::Null);
                let child = ctx.with_found_record(&record);
                Ok((record, child))
            }
            None => {
                debug!(resource = %resource, "Fetching collection");
                let result = source.find(&resource, &binding.params).await?;
                let child = ctx.with_collection(&result);
                Ok((serde_json::to_value(result)?, child))
            }
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn invoke(
        &self,
        resolution: &Resolution,
        node: &SchemaNode,
        key: String,
        resolved: ResolvedProps,
        data: Option<Value>,
        children: Vec<Element>,
    ) -> Result<Element, ComponentError> {
        if !resolution.is_found() {
            debug!(type_tag = %node.node_type, key = %key, "Unknown component type, using fallback");
        }
        if !resolved.missing_required.is_empty() {
            warn!(
                type_tag = %node.node_type,
                key = %key,
                missing = ?resolved.missing_required,
                "Component is missing required inputs"
            );
        }
        let input = RenderInput {
            type_tag: node.node_type.clone(),
            key,
            props: resolved.props,
            data,
            disabled: resolved.disabled,
            diagnostics: resolved.diagnostics,
            children,
        };
        resolution.renderer().render(input)
    }

    fn fail(&self, pass: &Pass, key: String, error: RenderError) -> Element {
        let message = error.to_string();
        warn!(key = %key, error = %message, "Node failed to render");
        self.transition(pass, &key, NodeState::Error(message.clone()));
        Element::error(key, message)
    }

    /// Records a state change if the pass is still current.
    fn transition(&self, pass: &Pass, key: &str, state: NodeState) {
        pass.session.apply(|| {
            let recorded = pass
                .states
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .transition(key, state.clone());
            match recorded {
                Ok(()) => {
                    if let Some(observer) = &self.observer {
                        observer.on_transition(key, &state);
                    }
                }
                Err(error) => warn!(error = %error, "Rejected node transition"),
            }
        });
    }
}

fn root_key(root: &SchemaNode) -> String {
    root.id.clone().unwrap_or_else(|| ROOT_KEY.to_string())
}

/// Keys of a node's children: each child's id, else its position under the
/// parent. An id already taken by an earlier sibling falls back to the
/// position so every sibling gets its own state entry.
fn child_keys(children: &[SchemaNode], parent: &str) -> Vec<String> {
    let mut seen = HashSet::with_capacity(children.len());
    children
        .iter()
        .enumerate()
        .map(|(index, child)| {
            let positional = || format!("{parent}/{index}");
            let key = match &child.id {
                Some(id) if !seen.contains(id.as_str()) => id.clone(),
                Some(id) => {
                    warn!(id = %id, parent = %parent, "Duplicate sibling id, using positional key");
                    positional()
                }
                None => positional(),
            };
            seen.insert(key.clone());
            key
        })
        .collect()
}
