//! Type tag → renderer map.
//!
//! Owns every registered component and the fallback used for unknown tags.
//! Reads dominate (one `resolve` per rendered node) so entries sit behind a
//! `RwLock`; plugins may register concurrently at startup.

use crate::error::{RegistryError, RegistryResult};
use crate::meta::{ComponentCategory, ComponentMeta};
use crate::plugin::ComponentPlugin;
use crate::renderer::{ComponentRenderer, UnknownComponent};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

/// A registered component.
pub struct RegistryEntry {
    pub type_tag: String,
    pub renderer: Arc<dyn ComponentRenderer>,
    pub meta: ComponentMeta,
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("type_tag", &self.type_tag)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Outcome of a lookup: the registered entry, or the fallback renderer.
#[derive(Clone)]
pub enum Resolution {
    Found(Arc<RegistryEntry>),
    Unknown(Arc<dyn ComponentRenderer>),
}

impl Resolution {
    pub fn renderer(&self) -> &dyn ComponentRenderer {
        match self {
            Self::Found(entry) => entry.renderer.as_ref(),
            Self::Unknown(fallback) => fallback.as_ref(),
        }
    }

    pub fn meta(&self) -> Option<&ComponentMeta> {
        match self {
            Self::Found(entry) => Some(&entry.meta),
            Self::Unknown(_) => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found(entry) => f.debug_tuple("Found").field(&entry.type_tag).finish(),
            Self::Unknown(_) => f.write_str("Unknown"),
        }
    }
}

pub struct ComponentRegistry {
    entries: RwLock<HashMap<String, Arc<RegistryEntry>>>,
    plugins: RwLock<Vec<String>>,
    fallback: Arc<dyn ComponentRenderer>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("type_tags", &self.type_tags())
            .field("plugins", &self.installed_plugins())
            .finish_non_exhaustive()
    }
}

impl ComponentRegistry {
    /// Empty registry with the [`UnknownComponent`] fallback.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            plugins: RwLock::new(Vec::new()),
            fallback: Arc::new(UnknownComponent),
        }
    }

    /// Replaces the renderer used for unregistered type tags.
    pub fn with_fallback(mut self, fallback: impl ComponentRenderer + 'static) -> Self {
        self.fallback = Arc::new(fallback);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<RegistryEntry>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<RegistryEntry>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ================================================================
    // Registration
    // ================================================================

    /// Registers `renderer` for `type_tag`. A later registration for the same
    /// tag replaces the earlier one, which is returned.
    pub fn register(
        &self,
        type_tag: impl Into<String>,
        renderer: impl ComponentRenderer + 'static,
        meta: ComponentMeta,
    ) -> RegistryResult<Option<Arc<RegistryEntry>>> {
        self.register_arc(type_tag, Arc::new(renderer), meta)
    }

    /// Like [`register`](Self::register) for a renderer shared between tags.
    pub fn register_arc(
        &self,
        type_tag: impl Into<String>,
        renderer: Arc<dyn ComponentRenderer>,
        meta: ComponentMeta,
    ) -> RegistryResult<Option<Arc<RegistryEntry>>> {
        let type_tag = type_tag.into();
        if type_tag.trim().is_empty() {
            return Err(RegistryError::InvalidTypeTag(type_tag));
        }

        let entry = Arc::new(RegistryEntry {
            type_tag: type_tag.clone(),
            renderer,
            meta,
        });
        let previous = self.write().insert(type_tag.clone(), entry);
        if previous.is_some() {
            info!(type_tag = %type_tag, "Component re-registered, replacing previous implementation");
        } else {
            debug!(type_tag = %type_tag, "Component registered");
        }
        Ok(previous)
    }

    pub fn unregister(&self, type_tag: &str) -> RegistryResult<Arc<RegistryEntry>> {
        match self.write().remove(type_tag) {
            Some(entry) => {
                info!(type_tag = %type_tag, "Component unregistered");
                Ok(entry)
            }
            None => Err(RegistryError::NotRegistered(type_tag.to_string())),
        }
    }

    /// Installs a component package. Each plugin id installs once.
    ///
    /// Installation is atomic: the plugin registers into a staging registry
    /// and its components are merged only if every registration succeeded.
    pub fn install(&self, plugin: &dyn ComponentPlugin) -> RegistryResult<()> {
        let plugin_id = plugin.id().to_string();
        {
            let mut plugins = self.plugins.write().unwrap_or_else(PoisonError::into_inner);
            if plugins.contains(&plugin_id) {
                return Err(RegistryError::PluginAlreadyInstalled(plugin_id));
            }
            plugins.push(plugin_id.clone());
        }

        let staging = ComponentRegistry::new();
        if let Err(e) = plugin.register(&staging) {
            self.plugins
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|id| id != &plugin_id);
            return Err(RegistryError::PluginFailed {
                plugin_id,
                message: e.to_string(),
            });
        }

        let staged = staging.entries.into_inner().unwrap_or_else(PoisonError::into_inner);
        let nested = staging.plugins.into_inner().unwrap_or_else(PoisonError::into_inner);
        let added = staged.len();
        {
            let mut entries = self.write();
            for (type_tag, entry) in staged {
                if entries.insert(type_tag.clone(), entry).is_some() {
                    info!(type_tag = %type_tag, plugin_id = %plugin_id, "Component re-registered, replacing previous implementation");
                }
            }
        }
        if !nested.is_empty() {
            self.plugins
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(nested);
        }
        info!(plugin_id = %plugin_id, added, "Component plugin installed");
        Ok(())
    }

    pub fn installed_plugins(&self) -> Vec<String> {
        self.plugins
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ================================================================
    // Lookup
    // ================================================================

    /// Resolves a type tag. Unknown tags resolve to the fallback.
    pub fn resolve(&self, type_tag: &str) -> Resolution {
        match self.read().get(type_tag) {
            Some(entry) => Resolution::Found(Arc::clone(entry)),
            None => Resolution::Unknown(Arc::clone(&self.fallback)),
        }
    }

    pub fn get(&self, type_tag: &str) -> Option<Arc<RegistryEntry>> {
        self.read().get(type_tag).cloned()
    }

    pub fn contains(&self, type_tag: &str) -> bool {
        self.read().contains_key(type_tag)
    }

    pub fn meta(&self, type_tag: &str) -> Option<ComponentMeta> {
        self.read().get(type_tag).map(|entry| entry.meta.clone())
    }

    /// All registered type tags, sorted.
    pub fn type_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.read().keys().cloned().collect();
        tags.sort();
        tags
    }

    /// Type tags in `category`, sorted.
    pub fn by_category(&self, category: ComponentCategory) -> Vec<String> {
        let mut tags: Vec<String> = self
            .read()
            .values()
            .filter(|entry| entry.meta.category == category)
            .map(|entry| entry.type_tag.clone())
            .collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
