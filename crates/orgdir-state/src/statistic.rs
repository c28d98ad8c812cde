//! Usage statistics: one row per recorded event (a page view by default).
//! Rows belong to their organization and are deleted with it.

use serde::{Deserialize, Serialize};

use orgdir_core::{OrganizationId, Timestamp};

/// Kind recorded when the caller does not name one.
pub const DEFAULT_STATISTIC_KIND: &str = "show";

/// A single usage event of an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistic {
    pub organization_id: OrganizationId,
    pub kind: String,
    pub timestamp: Timestamp,
}

impl Statistic {
    /// An event stamped now. A blank `kind` records the default kind.
    pub fn new(organization_id: OrganizationId, kind: &str) -> Self {
        let kind = kind.trim();
        let kind = if kind.is_empty() { DEFAULT_STATISTIC_KIND } else { kind };
        Self {
            organization_id,
            kind: kind.to_string(),
            timestamp: Timestamp::now(),
        }
    }

    pub fn show(organization_id: OrganizationId) -> Self {
        Self::new(organization_id, DEFAULT_STATISTIC_KIND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_kind_falls_back_to_show() {
        assert_eq!(Statistic::new(OrganizationId(1), "  ").kind, "show");
        assert_eq!(Statistic::new(OrganizationId(1), " call ").kind, "call");
        assert_eq!(Statistic::show(OrganizationId(1)).kind, DEFAULT_STATISTIC_KIND);
    }
}
