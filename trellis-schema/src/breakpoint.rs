//! Viewport size classes.

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A viewport size class, ordered `xs < sm < md < lg < xl < 2xl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Breakpoint {
    #[serde(rename = "xs")]
    Xs,
    #[serde(rename = "sm")]
    Sm,
    #[serde(rename = "md")]
    Md,
    #[serde(rename = "lg")]
    Lg,
    #[serde(rename = "xl")]
    Xl,
    #[serde(rename = "2xl")]
    Xxl,
}

impl Breakpoint {
    /// All breakpoints, smallest first.
    pub const ALL: [Breakpoint; 6] = [
        Self::Xs,
        Self::Sm,
        Self::Md,
        Self::Lg,
        Self::Xl,
        Self::Xxl,
    ];

    /// The key used for this breakpoint in responsive values.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Xs => "xs",
            Self::Sm => "sm",
            Self::Md => "md",
            Self::Lg => "lg",
            Self::Xl => "xl",
            Self::Xxl => "2xl",
        }
    }

    /// Minimum viewport width in CSS pixels at which this class applies.
    pub const fn min_width(&self) -> u32 {
        match self {
            Self::Xs => 0,
            Self::Sm => 640,
            Self::Md => 768,
            Self::Lg => 1024,
            Self::Xl => 1280,
            Self::Xxl => 1536,
        }
    }

    /// Maps a viewport width to its size class.
    pub fn from_width(width: u32) -> Self {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|bp| width >= bp.min_width())
            .unwrap_or(Self::Xs)
    }

    /// Looks up a breakpoint by its key, returning `None` for non-breakpoint keys.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|bp| bp.name() == name)
    }

    /// Returns whether `key` names a breakpoint.
    pub fn is_breakpoint_key(key: &str) -> bool {
        Self::from_name(key).is_some()
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Breakpoint {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| SchemaError::UnknownBreakpoint(s.to_string()))
    }
}
