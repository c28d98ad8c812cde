//! Loading command inputs from disk.
//!
//! Organization files hold one `OrganizationRecord` (the organization plus
//! its attribute values). `.json` files are parsed as JSON, everything else
//! as YAML.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use orgdir_schema::{CategorySchema, CategorySchemaStore, FileSchemaStore, MemorySchemaStore};
use orgdir_service::OrganizationRecord;

/// Input files shared by the offline commands.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Category schema file (YAML or JSON). Without it every category is empty.
    #[arg(long)]
    pub categories: Option<std::path::PathBuf>,

    /// Organization record file (YAML or JSON).
    #[arg(long)]
    pub organization: std::path::PathBuf,
}

impl InputArgs {
    pub fn load(&self) -> Result<(OrganizationRecord, CategorySchema)> {
        let record = load_record(&self.organization)?;
        let schema = match &self.categories {
            Some(path) => FileSchemaStore::load(path)?.definitions_for(record.organization.category_id),
            None => MemorySchemaStore::new().definitions_for(record.organization.category_id),
        };
        tracing::debug!(
            org = %record.id(),
            properties = schema.len(),
            "loaded organization and schema"
        );
        Ok((record, schema))
    }

    pub fn schema_store(&self) -> Result<Arc<dyn CategorySchemaStore>> {
        schema_store(self.categories.as_deref())
    }
}

/// Category schemas from `path`, or an empty store.
pub fn schema_store(path: Option<&Path>) -> Result<Arc<dyn CategorySchemaStore>> {
    Ok(match path {
        Some(path) => Arc::new(FileSchemaStore::load(path)?),
        None => Arc::new(MemorySchemaStore::new()),
    })
}

pub fn load_record(path: &Path) -> Result<OrganizationRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading organization file {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let record = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("parsing organization file {}", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("parsing organization file {}", path.display()))?
    };
    Ok(record)
}
