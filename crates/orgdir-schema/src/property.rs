//! # Property Definitions and Category Schemas
//!
//! A `CategorySchema` is the ordered list of `PropertyDefinition`s a category
//! configures. Ordering is by `row_order` ascending; ties fall back to the
//! property id so iteration is deterministic.
//!
//! ## Schema Files
//!
//! `FileSchemaStore` reads category configuration from YAML or JSON:
//!
//! ```yaml
//! categories:
//!   - id: 1
//!     title: Cafes
//!     properties:
//!       - { id: 10, title: Name, row_order: 1, show_on_public: true, mandatory: true }
//!       - { id: 11, title: Color, row_order: 2, show_on_public: true }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use orgdir_core::{CategoryId, PropertyId};

use crate::error::SchemaError;

/// One dynamic property slot configured on a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub id: PropertyId,
    pub category_id: CategoryId,
    pub title: String,
    /// Display and validation order, ascending.
    pub row_order: i32,
    pub show_on_public: bool,
    pub mandatory: bool,
}

/// The ordered property definitions of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySchema {
    category_id: CategoryId,
    definitions: Vec<PropertyDefinition>,
}

impl CategorySchema {
    /// Build a schema, sorting definitions by `row_order` (then id).
    ///
    /// Definitions belonging to a different category are dropped.
    pub fn new(category_id: CategoryId, definitions: Vec<PropertyDefinition>) -> Self {
        let mut definitions: Vec<_> = definitions
            .into_iter()
            .filter(|d| d.category_id == category_id)
            .collect();
        definitions.sort_by_key(|d| (d.row_order, d.id));
        Self {
            category_id,
            definitions,
        }
    }

    /// A category with no configured properties.
    pub fn empty(category_id: CategoryId) -> Self {
        Self {
            category_id,
            definitions: Vec::new(),
        }
    }

    pub fn category_id(&self) -> CategoryId {
        self.category_id
    }

    /// All definitions in `row_order`.
    pub fn definitions(&self) -> &[PropertyDefinition] {
        &self.definitions
    }

    /// Definitions shown on the public page, in `row_order`.
    pub fn public(&self) -> impl Iterator<Item = &PropertyDefinition> {
        self.definitions.iter().filter(|d| d.show_on_public)
    }

    /// Definitions that gate persistence, in `row_order`.
    pub fn mandatory(&self) -> impl Iterator<Item = &PropertyDefinition> {
        self.definitions.iter().filter(|d| d.mandatory)
    }

    pub fn find(&self, property_id: PropertyId) -> Option<&PropertyDefinition> {
        self.definitions.iter().find(|d| d.id == property_id)
    }

    pub fn contains(&self, property_id: PropertyId) -> bool {
        self.find(property_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }
}

/// Lookup of category schemas.
///
/// A category that is unknown or has no properties yields an empty schema:
/// zero mandatory properties, nothing projected.
pub trait CategorySchemaStore: Send + Sync {
    fn definitions_for(&self, category_id: CategoryId) -> CategorySchema;
}

/// In-memory schema store.
#[derive(Debug, Clone, Default)]
pub struct MemorySchemaStore {
    categories: HashMap<CategoryId, Vec<PropertyDefinition>>,
}

impl MemorySchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under its own category.
    pub fn insert(&mut self, definition: PropertyDefinition) {
        self.categories
            .entry(definition.category_id)
            .or_default()
            .push(definition);
    }

    /// Builder-style registration of a whole category.
    pub fn with_category(
        mut self,
        category_id: CategoryId,
        definitions: impl IntoIterator<Item = PropertyDefinition>,
    ) -> Self {
        let slot = self.categories.entry(category_id).or_default();
        slot.extend(definitions.into_iter().filter(|d| d.category_id == category_id));
        self
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }
}

impl CategorySchemaStore for MemorySchemaStore {
    fn definitions_for(&self, category_id: CategoryId) -> CategorySchema {
        match self.categories.get(&category_id) {
            Some(defs) => CategorySchema::new(category_id, defs.clone()),
            None => CategorySchema::empty(category_id),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    categories: Vec<CategoryEntry>,
}

#[derive(Debug, Deserialize)]
struct CategoryEntry {
    id: CategoryId,
    #[serde(default)]
    #[allow(dead_code)]
    title: Option<String>,
    #[serde(default)]
    properties: Vec<PropertyEntry>,
}

#[derive(Debug, Deserialize)]
struct PropertyEntry {
    id: PropertyId,
    title: String,
    row_order: i32,
    #[serde(default)]
    show_on_public: bool,
    #[serde(default)]
    mandatory: bool,
}

/// Schema store loaded once from a YAML or JSON file.
#[derive(Debug, Clone)]
pub struct FileSchemaStore {
    inner: MemorySchemaStore,
}

impl FileSchemaStore {
    /// Load category definitions from `path`.
    ///
    /// `.json` files are parsed as JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Read` if the file cannot be read,
    /// `SchemaError::Parse` if it is malformed, and
    /// `SchemaError::DuplicateProperty` if a category lists a property twice.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let file: SchemaFile = if is_json {
            serde_json::from_str(&content).map_err(|e| SchemaError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|e| SchemaError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        };

        let store = Self::from_file(file)?;
        tracing::debug!(
            path = %path.display(),
            categories = store.inner.category_count(),
            "loaded category schemas"
        );
        Ok(store)
    }

    /// Parse category definitions from an in-memory YAML document.
    pub fn from_yaml_str(content: &str) -> Result<Self, SchemaError> {
        let file: SchemaFile = serde_yaml::from_str(content).map_err(|e| SchemaError::Parse {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;
        Self::from_file(file)
    }

    fn from_file(file: SchemaFile) -> Result<Self, SchemaError> {
        let mut inner = MemorySchemaStore::new();
        for category in file.categories {
            let mut seen = HashSet::new();
            for prop in category.properties {
                if !seen.insert(prop.id) {
                    return Err(SchemaError::DuplicateProperty {
                        category: category.id.get(),
                        property: prop.id.get(),
                    });
                }
                inner.insert(PropertyDefinition {
                    id: prop.id,
                    category_id: category.id,
                    title: prop.title,
                    row_order: prop.row_order,
                    show_on_public: prop.show_on_public,
                    mandatory: prop.mandatory,
                });
            }
            // Register categories without properties too, so they are "known".
            inner.categories.entry(category.id).or_default();
        }
        Ok(Self { inner })
    }
}

impl CategorySchemaStore for FileSchemaStore {
    fn definitions_for(&self, category_id: CategoryId) -> CategorySchema {
        self.inner.definitions_for(category_id)
    }
}
