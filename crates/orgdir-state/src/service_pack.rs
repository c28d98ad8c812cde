//! Service packs gate optional presentation capabilities.

use serde::{Deserialize, Serialize};

/// An optional capability unlocked by a service pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Show the logotype thumbnail in listings and autocomplete.
    Logotype,
}

/// A purchased pack attached to one or more organizations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePack {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
}

impl ServicePack {
    pub fn grants(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}
