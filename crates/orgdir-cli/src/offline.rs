//! # Offline Subcommands
//!
//! Work on files only; no cache or database is contacted.
//!
//! - `validate`: print every failure that would reject a save.
//! - `project`: print the dynamic fields and the pretty blob.
//! - `document`: print the search document.

use anyhow::Result;
use clap::Args;
use serde_json::json;

use orgdir_cache::DenormalizedProjector;
use orgdir_search::SearchDocumentBuilder;
use orgdir_service::validate_record;

use crate::input::InputArgs;

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Args, Debug)]
pub struct DocumentArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

/// Exit code 0 when the record is valid, 1 otherwise.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let (record, schema) = args.input.load()?;
    let failures = validate_record(&schema, &record);
    if failures.is_empty() {
        println!("OK: organization {} is valid", record.id());
        return Ok(0);
    }
    println!(
        "FAIL: organization {} has {} validation failure(s)",
        record.id(),
        failures.len()
    );
    println!("{failures}");
    Ok(1)
}

pub fn run_project(args: &ProjectArgs) -> Result<u8> {
    let (record, schema) = args.input.load()?;
    let projection = DenormalizedProjector::new().project(&schema, &record.values);
    let pretty: serde_json::Value = serde_json::from_str(&projection.pretty)?;
    let out = json!({
        "dynamic_fields": projection.fields,
        "pretty": pretty,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(0)
}

pub fn run_document(args: &DocumentArgs) -> Result<u8> {
    let (record, _) = args.input.load()?;
    let document = SearchDocumentBuilder::new().to_document(&record.organization, &record.values);
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(0)
}
