//! Component packages.

use crate::error::RegistryResult;
use crate::registry::ComponentRegistry;

/// A package of components registered together at startup.
pub trait ComponentPlugin {
    /// Stable identifier, e.g. `"trellis.builtin"`.
    fn id(&self) -> &str;

    fn register(&self, registry: &ComponentRegistry) -> RegistryResult<()>;
}
