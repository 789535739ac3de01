//! Mounted views: a render pass running on the runtime, owned by the host.

use crate::context::RenderContext;
use crate::pipeline::{Pass, RenderPipeline};
use crate::session::{Generation, GenerationCounter, RenderSession};
use crate::state::{NodeState, StateTable};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use trellis_registry::Element;
use trellis_schema::SchemaNode;

impl RenderPipeline {
    /// Starts rendering `root` on the tokio runtime and returns a handle to
    /// the live view. Must be called from within a runtime.
    pub fn mount(self: &Arc<Self>, root: SchemaNode, ctx: RenderContext) -> MountedView {
        let mut view = MountedView {
            pipeline: Arc::clone(self),
            ctx,
            counter: GenerationCounter::new(),
            session: RenderSession::detached(),
            states: Arc::default(),
            committed: Arc::default(),
            task: None,
            closed: false,
        };
        view.start(root);
        view
    }
}

/// A view whose render pass runs in the background.
///
/// Every [`rerender`](Self::rerender) supersedes the pass in flight and
/// [`teardown`](Self::teardown) supersedes all of them. Results of
/// superseded passes, including fetches that resolve late, never reach the
/// state table, the observer or the committed tree.
pub struct MountedView {
    pipeline: Arc<RenderPipeline>,
    ctx: RenderContext,
    counter: GenerationCounter,
    session: RenderSession,
    states: Arc<Mutex<StateTable>>,
    committed: Arc<Mutex<Option<Element>>>,
    task: Option<JoinHandle<Option<Element>>>,
    closed: bool,
}

impl MountedView {
    /// Starts a new pass. The shell is committed at once so nodes without a
    /// data binding are visible while fetches are outstanding; each bound
    /// node replaces its loading placeholder as it resolves.
    fn start(&mut self, root: SchemaNode) {
        let shell = self.pipeline.render_shell(&root, &self.ctx);
        let session = self.counter.session();
        session.apply(|| {
            self.states.lock().unwrap_or_else(PoisonError::into_inner).clear();
            *self.committed.lock().unwrap_or_else(PoisonError::into_inner) = shell;
        });

        let pass = Pass {
            session: session.clone(),
            states: Arc::clone(&self.states),
            committed: Arc::clone(&self.committed),
        };
        let pipeline = Arc::clone(&self.pipeline);
        let ctx = self.ctx.clone();
        debug!(generation = %session.generation(), "Mounting render pass");

        self.session = session;
        self.task = Some(tokio::spawn(async move {
            pipeline.run(&root, ctx, &pass).await
        }));
    }

    /// Renders a new tree version in the same context.
    pub fn rerender(&mut self, root: SchemaNode) {
        let ctx = self.ctx.clone();
        self.rerender_with(root, ctx);
    }

    /// Renders a new tree version with a new context, e.g. after a
    /// breakpoint change.
    pub fn rerender_with(&mut self, root: SchemaNode, ctx: RenderContext) {
        if self.closed {
            warn!("Ignoring rerender of a torn down view");
            return;
        }
        self.ctx = ctx;
        self.start(root);
    }

    /// Closes the view and aborts the pass in flight. Anything the pass
    /// produces after this returns is discarded.
    pub fn teardown(&mut self) {
        if self.closed {
            return;
        }
        let generation = self.counter.advance();
        self.closed = true;
        if let Some(task) = &self.task {
            task.abort();
        }
        info!(generation = %generation, "View torn down");
    }

    /// Waits for the latest pass. `None` if it was superseded or torn down
    /// before committing, or if the root is hidden.
    pub async fn join(&mut self) -> Option<Element> {
        let task = self.task.take()?;
        match task.await {
            Ok(tree) => tree,
            Err(e) if e.is_cancelled() => {
                debug!("Render task aborted");
                None
            }
            Err(e) => {
                warn!("Render task failed: {}", e);
                None
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Generation of the latest pass.
    pub fn generation(&self) -> Generation {
        self.session.generation()
    }

    pub fn context(&self) -> &RenderContext {
        &self.ctx
    }

    /// Last committed tree: the shell first, bound nodes as their fetches
    /// resolve, then the finished pass.
    pub fn latest(&self) -> Option<Element> {
        self.committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self, key: &str) -> Option<NodeState> {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Snapshot of every node's state.
    pub fn states(&self) -> StateTable {
        self.states.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Updates discarded because their pass was stale.
    pub fn dropped_updates(&self) -> usize {
        self.counter.dropped_updates()
    }
}

impl Drop for MountedView {
    fn drop(&mut self) {
        self.teardown();
    }
}
