//! Generation tokens.
//!
//! Every render pass runs under a [`RenderSession`] holding the generation it
//! started in. Starting a new pass or tearing a view down advances the
//! counter, which makes every older session stale. Stale sessions still run
//! to completion but their state updates are dropped.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::trace;

/// A render pass identity. Later passes compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
struct CounterState {
    current: RwLock<u64>,
    dropped: AtomicUsize,
}

/// Issues monotonically increasing generations.
#[derive(Debug, Clone, Default)]
pub struct GenerationCounter {
    state: Arc<CounterState>,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Generation {
        Generation(*self.state.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Invalidates every outstanding session. Waits for updates already
    /// being applied, so none land after this returns.
    pub fn advance(&self) -> Generation {
        let mut current = self.state.current.write().unwrap_or_else(PoisonError::into_inner);
        *current += 1;
        Generation(*current)
    }

    /// Starts a new pass, superseding all earlier ones.
    pub fn session(&self) -> RenderSession {
        let generation = self.advance();
        RenderSession {
            counter: self.clone(),
            generation,
        }
    }

    /// Updates rejected because their session was stale.
    pub fn dropped_updates(&self) -> usize {
        self.state.dropped.load(Ordering::SeqCst)
    }
}

/// Handle a render pass uses to apply state updates.
#[derive(Debug, Clone)]
pub struct RenderSession {
    counter: GenerationCounter,
    generation: Generation,
}

impl RenderSession {
    /// A session on a private counter. Never goes stale.
    pub fn detached() -> Self {
        GenerationCounter::new().session()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.counter.current() == self.generation
    }

    /// Runs `update` if this session is still current. The generation cannot
    /// advance while `update` runs.
    pub fn apply<T>(&self, update: impl FnOnce() -> T) -> Option<T> {
        let current = self
            .counter
            .state
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if *current != self.generation.0 {
            self.counter.state.dropped.fetch_add(1, Ordering::SeqCst);
            trace!(
                generation = %self.generation,
                current = *current,
                "Dropping stale render update"
            );
            return None;
        }
        Some(update())
    }

    pub fn dropped_updates(&self) -> usize {
        self.counter.dropped_updates()
    }
}
