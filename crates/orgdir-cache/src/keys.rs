//! Key shapes of the derived records. Other services read these keys
//! directly, so the formats are fixed.

use orgdir_core::{OrganizationId, UserId};

/// `dynamicFields:{orgId}`: JSON object of public property values.
pub fn dynamic_fields(id: OrganizationId) -> String {
    format!("dynamicFields:{id}")
}

/// `{userId}:listings`: hash of orgId → listing entry JSON.
pub fn user_listings(user: UserId) -> String {
    format!("{user}:listings")
}

/// `autocomplete:{orgId}`: hash describing a place on the map.
pub fn autocomplete(id: OrganizationId) -> String {
    format!("autocomplete:{id}")
}
