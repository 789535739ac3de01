//! Per-node render state machine.
//!
//! ```text
//! pending → resolving-visibility → resolving-data? → dispatching → rendered
//!                  │                      │               │
//!                  └→ hidden              └→ error ←──────┘
//! ```
//!
//! `pending → error` is also allowed for nodes rejected before any work
//! (depth limit).

use crate::error::{RenderError, RenderResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "kebab-case")]
pub enum NodeState {
    Pending,
    ResolvingVisibility,
    ResolvingData,
    Dispatching,
    Rendered,
    /// Not rendered: a visibility condition excluded the node.
    Hidden,
    Error(String),
}

impl NodeState {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ResolvingVisibility => "resolving-visibility",
            Self::ResolvingData => "resolving-data",
            Self::Dispatching => "dispatching",
            Self::Rendered => "rendered",
            Self::Hidden => "hidden",
            Self::Error(_) => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rendered | Self::Hidden | Self::Error(_))
    }

    /// Returns whether `next` may follow `self`.
    pub fn can_transition_to(&self, next: &NodeState) -> bool {
        use NodeState::*;
        matches!(
            (self, next),
            (Pending, ResolvingVisibility)
                | (Pending, Error(_))
                | (ResolvingVisibility, ResolvingData)
                | (ResolvingVisibility, Dispatching)
                | (ResolvingVisibility, Hidden)
                | (ResolvingData, Dispatching)
                | (ResolvingData, Error(_))
                | (Dispatching, Rendered)
                | (Dispatching, Error(_))
        )
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Latest state of every node in a view, keyed by node key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateTable {
    states: HashMap<String, NodeState>,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `next` for `key`. Entering `Pending` always succeeds and
    /// restarts the node; any other state must follow the current one.
    pub fn transition(&mut self, key: &str, next: NodeState) -> RenderResult<()> {
        if next != NodeState::Pending {
            let current = self.states.get(key).cloned().unwrap_or(NodeState::Pending);
            if !current.can_transition_to(&next) {
                return Err(RenderError::InvalidTransition {
                    key: key.to_string(),
                    from: current,
                    to: next,
                });
            }
        }
        self.states.insert(key.to_string(), next);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&NodeState> {
        self.states.get(key)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Forgets every node, e.g. before a new pass starts.
    pub fn clear(&mut self) {
        self.states.clear();
    }

    /// Keys of nodes in the given state, sorted.
    pub fn keys_in(&self, name: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .states
            .iter()
            .filter(|(_, state)| state.name() == name)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &NodeState)> {
        self.states.iter().map(|(key, state)| (key.as_str(), state))
    }

    /// Returns whether every node reached a terminal state.
    pub fn is_settled(&self) -> bool {
        self.states.values().all(NodeState::is_terminal)
    }
}
