//! # orgdir CLI entry point

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use orgdir_cli::cache::{run_fields, run_publish, run_retract, CacheArgs};
use orgdir_cli::offline::{
    run_document, run_project, run_validate, DocumentArgs, ProjectArgs, ValidateArgs,
};
use orgdir_cli::service::{run_destroy, run_save, run_stat, DestroyArgs, SaveArgs, StatArgs};
use orgdir_cli::telemetry;

/// Organization directory engine: attribute validation and derived records.
#[derive(Parser, Debug)]
#[command(name = "orgdir", version, about, long_about = None)]
struct Cli {
    /// Verbose output. Repeat for more (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print Prometheus metrics to stderr when the command finishes.
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check an organization against its category schema.
    Validate(ValidateArgs),

    /// Render the dynamic fields and pretty blob of an organization.
    Project(ProjectArgs),

    /// Render the search document of an organization.
    Document(DocumentArgs),

    /// Publish the derived records of an organization.
    Publish(CacheArgs),

    /// Delete the derived records of an organization.
    Retract(CacheArgs),

    /// Read the dynamic fields of an organization, recomputing on a miss.
    Fields(CacheArgs),

    /// Validate and persist an organization, then publish and index it.
    Save(SaveArgs),

    /// Delete a stored organization and everything derived from it.
    Destroy(DestroyArgs),

    /// Record a usage event for a stored organization.
    Stat(StatArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.verbose, cli.json_logs);

    let metrics = if cli.metrics {
        match telemetry::init_metrics() {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("{e:#}");
                return ExitCode::from(1);
            }
        }
    } else {
        None
    };

    let result = match &cli.command {
        Commands::Validate(args) => run_validate(args),
        Commands::Project(args) => run_project(args),
        Commands::Document(args) => run_document(args),
        Commands::Publish(args) => run_publish(args).await,
        Commands::Retract(args) => run_retract(args).await,
        Commands::Fields(args) => run_fields(args).await,
        Commands::Save(args) => run_save(args).await,
        Commands::Destroy(args) => run_destroy(args).await,
        Commands::Stat(args) => run_stat(args).await,
    };

    if let Some(handle) = metrics {
        eprintln!("{}", handle.render());
    }

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
