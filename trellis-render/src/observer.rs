//! Render progress callbacks.

use crate::state::NodeState;
use std::sync::{Mutex, PoisonError};
use trellis_registry::Element;

/// Receives node state transitions of current render passes.
///
/// Callbacks run while the pass's generation is pinned, so they must not
/// block and must not tear down or re-render the view that invoked them.
pub trait RenderObserver: Send + Sync {
    fn on_transition(&self, key: &str, state: &NodeState);

    /// Called once with the finished tree of a pass that is still current.
    fn on_complete(&self, _root: &Element) {}
}

/// Observer that records everything it sees.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    transitions: Mutex<Vec<(String, NodeState)>>,
    completed: Mutex<Vec<Element>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> Vec<(String, NodeState)> {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// States reported for `key`, in order.
    pub fn states_of(&self, key: &str) -> Vec<NodeState> {
        self.transitions()
            .into_iter()
            .filter(|(k, _)| k == key)
            .map(|(_, state)| state)
            .collect()
    }

    pub fn completed(&self) -> Vec<Element> {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total callbacks received.
    pub fn event_count(&self) -> usize {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
            + self.completed.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl RenderObserver for RecordingObserver {
    fn on_transition(&self, key: &str, state: &NodeState) {
        self.transitions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.to_string(), state.clone()));
    }

    fn on_complete(&self, root: &Element) {
        self.completed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(root.clone());
    }
}
