//! # Identifier Newtypes
//!
//! Numeric row identifiers wrapped per namespace. The relational store hands
//! out `i64` keys; the wrappers keep an attribute value id from being used
//! where a property id is expected and fix how each id renders inside cache
//! keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Access the raw row key.
            pub fn get(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }
    };
}

row_id!(
    /// Identifier of an organization (the directory entity).
    OrganizationId
);

row_id!(
    /// Identifier of a category; categories own the property schema.
    CategoryId
);

row_id!(
    /// Identifier of a property definition.
    PropertyId
);

row_id!(
    /// Identifier of a single attribute value row.
    AttributeValueId
);

row_id!(
    /// Identifier of the user owning an organization.
    UserId
);

row_id!(
    /// Identifier of the city an organization is located in.
    CityId
);

row_id!(
    /// Identifier of a selectable list item (plain or hierarchical list).
    ListItemId
);
