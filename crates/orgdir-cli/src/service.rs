//! # Write-Path Subcommands
//!
//! Go through `OrganizationService`, so a save is validated before anything
//! is persisted. Persistence is Postgres when `DATABASE_URL` (or
//! `--database-url`) is set and process memory otherwise; derived records go
//! to Redis.
//!
//! - `save`: validate, persist, publish and index an organization file.
//! - `destroy`: delete an organization with its values and statistics.
//! - `stat`: record a usage event for an organization.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use orgdir_core::OrganizationId;
use orgdir_schema::CategorySchemaStore;
use orgdir_search::MemorySearchIndex;
use orgdir_service::{OrganizationService, ServiceConfig, ServiceError};
use orgdir_state::DEFAULT_STATISTIC_KIND;

use crate::cache::print_report;
use crate::input::{schema_store, InputArgs};

/// Backend overrides shared by the write-path commands.
#[derive(Args, Debug, Clone, Default)]
pub struct BackendArgs {
    /// Redis URL; defaults to `REDIS_URL`.
    #[arg(long)]
    pub redis_url: Option<String>,

    /// Postgres URL; defaults to `DATABASE_URL`, in-memory when neither is set.
    #[arg(long)]
    pub database_url: Option<String>,
}

impl BackendArgs {
    /// Environment settings with the command-line overrides applied.
    pub fn config(&self) -> Result<ServiceConfig> {
        let mut config = ServiceConfig::from_env()?;
        if let Some(url) = &self.redis_url {
            config.redis_url = url.clone();
        }
        if let Some(url) = &self.database_url {
            config.database_url = Some(url.clone());
        }
        Ok(config)
    }

    async fn service(&self, schemas: Arc<dyn CategorySchemaStore>) -> Result<OrganizationService> {
        let config = self.config()?;
        OrganizationService::from_config(&config, schemas, Arc::new(MemorySearchIndex::new()))
            .await
            .context("connecting the organization service")
    }
}

#[derive(Args, Debug, Clone)]
pub struct SaveArgs {
    #[command(flatten)]
    pub input: InputArgs,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DestroyArgs {
    /// Organization id.
    #[arg(long)]
    pub id: i64,

    #[command(flatten)]
    pub backend: BackendArgs,
}

#[derive(Args, Debug, Clone)]
pub struct StatArgs {
    /// Organization id.
    #[arg(long)]
    pub id: i64,

    /// Event kind.
    #[arg(long, default_value = DEFAULT_STATISTIC_KIND)]
    pub kind: String,

    #[command(flatten)]
    pub backend: BackendArgs,
}

/// Exit code 1 on validation failures, 2 when derived records are stale.
pub async fn run_save(args: &SaveArgs) -> Result<u8> {
    let record = crate::input::load_record(&args.input.organization)?;
    let service = args.backend.service(args.input.schema_store()?).await?;
    match service.save(&record).await {
        Ok(report) => Ok(print_report("save", &report)),
        Err(ServiceError::Validation(e)) => {
            println!(
                "FAIL: organization {} has {} validation failure(s)",
                record.id(),
                e.failures.len()
            );
            println!("{}", e.failures);
            Ok(1)
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn run_destroy(args: &DestroyArgs) -> Result<u8> {
    let service = args.backend.service(schema_store(None)?).await?;
    let report = service.destroy(OrganizationId(args.id)).await?;
    Ok(print_report("destroy", &report))
}

pub async fn run_stat(args: &StatArgs) -> Result<u8> {
    let id = OrganizationId(args.id);
    let service = args.backend.service(schema_store(None)?).await?;
    let statistic = service.record_statistic(id, &args.kind).await?;
    let total = service.statistics(id).await?.len();
    println!(
        "recorded {} for organization {id} at {} ({total} event(s))",
        statistic.kind, statistic.timestamp
    );
    Ok(0)
}
