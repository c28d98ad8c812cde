//! # Cache Subcommands
//!
//! Operate on the derived records in Redis. Settings come from the
//! environment (`REDIS_URL`, `ORGDIR_CACHE_TIMEOUT_MS`,
//! `ORGDIR_PUBLIC_BASE_URL`, `ORGDIR_RETRACT_AUTOCOMPLETE`); `--redis-url`
//! overrides `REDIS_URL`.
//!
//! - `publish`: publish the records of an organization file.
//! - `retract`: delete the records of an organization file.
//! - `fields`: read the dynamic fields, healing a miss from the file.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use orgdir_cache::{CacheError, CacheSynchronizer, RedisCacheStore, SyncReport};
use orgdir_service::ServiceConfig;

use crate::input::InputArgs;

#[derive(Args, Debug, Clone)]
pub struct CacheArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Redis URL; defaults to `REDIS_URL`.
    #[arg(long)]
    pub redis_url: Option<String>,
}

impl CacheArgs {
    async fn synchronizer(&self) -> Result<CacheSynchronizer> {
        let mut config = ServiceConfig::from_env()?;
        if let Some(url) = &self.redis_url {
            config.redis_url = url.clone();
        }
        let store = RedisCacheStore::connect(&config.redis_url)
            .await
            .with_context(|| format!("connecting to {}", config.redis_url))?;
        Ok(CacheSynchronizer::new(Arc::new(store), config.sync_config()))
    }
}

pub(crate) fn print_report(action: &str, report: &SyncReport) -> u8 {
    for kind in &report.written {
        println!("{action}: wrote {kind}");
    }
    for kind in &report.removed {
        println!("{action}: removed {kind}");
    }
    for (kind, error) in &report.failures {
        println!("{action}: FAILED {kind}: {error}");
    }
    if report.is_clean() {
        0
    } else {
        2
    }
}

/// Exit code 2 when any record could not be written.
pub async fn run_publish(args: &CacheArgs) -> Result<u8> {
    let (record, schema) = args.input.load()?;
    let sync = args.synchronizer().await?;
    let report = sync
        .publish(&record.organization, &schema, &record.values)
        .await;
    Ok(print_report("publish", &report))
}

pub async fn run_retract(args: &CacheArgs) -> Result<u8> {
    let (record, _) = args.input.load()?;
    let sync = args.synchronizer().await?;
    let report = sync.retract(&record.organization).await;
    Ok(print_report("retract", &report))
}

pub async fn run_fields(args: &CacheArgs) -> Result<u8> {
    let (record, schema) = args.input.load()?;
    let sync = args.synchronizer().await?;
    let recomputed = sync.projector().dynamic_fields(&schema, &record.values);
    let fields = sync
        .read_dynamic_fields(record.id(), move || async move {
            Ok::<_, CacheError>(recomputed)
        })
        .await?;
    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(0)
}
