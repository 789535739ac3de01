//! Render configuration, read from the `[render]` table of `trellis.toml`.

use crate::error::RenderResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};
use trellis_expr::ExpressionMode;
use trellis_schema::Breakpoint;

/// Conventional config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "trellis.toml";

/// Pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// How expression failures are reported. Rendering fails open either way.
    #[serde(default)]
    pub expression_mode: ExpressionMode,
    /// Nodes nested deeper than this render as error placeholders.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    /// Breakpoint used when the host does not supply one.
    #[serde(default = "default_breakpoint")]
    pub default_breakpoint: Breakpoint,
    /// Parsed expressions kept per evaluator. `0` disables caching.
    #[serde(default = "default_expression_cache_size")]
    pub expression_cache_size: usize,
}

fn default_max_depth() -> usize {
    64
}

fn default_breakpoint() -> Breakpoint {
    Breakpoint::Md
}

fn default_expression_cache_size() -> usize {
    256
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            expression_mode: ExpressionMode::default(),
            max_depth: default_max_depth(),
            default_breakpoint: default_breakpoint(),
            expression_cache_size: default_expression_cache_size(),
        }
    }
}

/// Raw TOML structure of `trellis.toml`.
#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    render: RenderConfig,
}

impl RenderConfig {
    /// Parses the `[render]` table of a TOML document. A document without
    /// the table yields defaults.
    pub fn from_toml_str(contents: &str) -> RenderResult<Self> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(file.render)
    }

    /// Loads config from `path`. Falls back to defaults when the file is
    /// missing, unreadable or malformed.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            info!("No config file found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded render config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse config file {:?}: {}. Falling back to defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}
