//! Shapes of the user-listing and autocomplete records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use orgdir_state::Organization;

use crate::error::CacheError;

/// Public page of an organization.
pub fn organization_url(base_url: &str, org: &Organization) -> String {
    format!("{}/organizations/{}", base_url.trim_end_matches('/'), org.slug)
}

/// One organization as shown in its owner's listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    /// Localized lifecycle label.
    pub state: String,
}

impl ListingEntry {
    pub fn for_organization(org: &Organization, base_url: &str) -> Self {
        Self {
            title: org.title.clone(),
            url: organization_url(base_url, org),
            thumbnail: org.thumbnail().map(str::to_string),
            state: org.state.label().to_string(),
        }
    }
}

/// A published place with coordinates, for map autocomplete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocompletePlace {
    pub title: String,
    pub url: String,
    pub thumbnail: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
}

impl AutocompletePlace {
    /// `None` unless the organization is published and has an address.
    pub fn for_organization(org: &Organization, base_url: &str) -> Option<Self> {
        if !org.state.is_published() {
            return None;
        }
        let address = org.address.as_ref()?;
        Some(Self {
            title: org.title.clone(),
            url: organization_url(base_url, org),
            thumbnail: org.thumbnail().map(str::to_string),
            longitude: address.longitude,
            latitude: address.latitude,
        })
    }

    /// Hash fields as stored. An absent thumbnail is an empty string.
    pub fn to_fields(&self) -> Vec<(String, String)> {
        vec![
            ("title".to_string(), self.title.clone()),
            ("url".to_string(), self.url.clone()),
            (
                "thumbnail".to_string(),
                self.thumbnail.clone().unwrap_or_default(),
            ),
            ("longitude".to_string(), self.longitude.to_string()),
            ("latitude".to_string(), self.latitude.to_string()),
        ]
    }

    /// Decode the hash read back from the store.
    pub fn from_fields(key: &str, fields: &BTreeMap<String, String>) -> Result<Self, CacheError> {
        let field = |name: &str| {
            fields.get(name).cloned().ok_or_else(|| CacheError::Corrupt {
                key: key.to_string(),
                reason: format!("missing field {name}"),
            })
        };
        let coordinate = |name: &str| -> Result<f64, CacheError> {
            field(name)?.parse().map_err(|e| CacheError::Corrupt {
                key: key.to_string(),
                reason: format!("field {name}: {e}"),
            })
        };
        let thumbnail = fields.get("thumbnail").filter(|t| !t.is_empty()).cloned();
        Ok(Self {
            title: field("title")?,
            url: field("url")?,
            thumbnail,
            longitude: coordinate("longitude")?,
            latitude: coordinate("latitude")?,
        })
    }
}
