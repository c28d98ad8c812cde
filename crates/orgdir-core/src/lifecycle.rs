//! # Organization Lifecycle State
//!
//! ```text
//! Draft ──submit──▶ Moderation ──approve──▶ Published
//!   ▲                   │                      │
//!   └──────reject───────┘                      │
//!   └───────────────────unpublish──────────────┘
//! ```
//!
//! The transition rules live in `orgdir-state`; this module only defines
//! the states and their wire form.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StateError;

/// Lifecycle state of an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Being edited by its owner. Initial state.
    #[default]
    Draft,
    /// Visible in the public directory.
    Published,
    /// Waiting for a moderator.
    Moderation,
}

impl LifecycleState {
    /// All states, in the order they are offered to editors.
    pub const ALL: [LifecycleState; 3] = [Self::Draft, Self::Published, Self::Moderation];

    /// Stable wire form (`draft`, `published`, `moderation`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Moderation => "moderation",
        }
    }

    /// Human-readable label shown in the owner's listing.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Published => "Published",
            Self::Moderation => "On moderation",
        }
    }

    /// Whether the organization is publicly visible.
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleState {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "moderation" => Ok(Self::Moderation),
            other => Err(StateError::UnknownState(other.to_string())),
        }
    }
}
