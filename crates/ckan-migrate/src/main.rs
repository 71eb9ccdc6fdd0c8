//! CKAN Migration CLI
//!
//! Copies organizations, datasets and resources between two CKAN catalogs.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use clap::Parser;
use dialoguer::Confirm;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use ckan_migrate::config::{DEFAULT_CONFIG_FILE, EXAMPLE_CONFIG};
use ckan_migrate::ui::ConsoleUi;
use ckan_migrate::{MigrationConfig, MigrationPlan, Pipeline};

#[derive(Parser)]
#[command(name = "ckan-migrate")]
#[command(version)]
#[command(about = "Migrate organizations, datasets and resources between CKAN catalogs", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(value_name = "CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Skip organization migration
    #[arg(long)]
    skip_orgs: bool,

    /// Skip dataset migration
    #[arg(long)]
    skip_datasets: bool,

    /// Skip resource migration (only migrate dataset metadata)
    #[arg(long)]
    skip_resources: bool,

    /// Specific organizations to migrate (by name or ID)
    #[arg(long, value_name = "NAME_OR_ID", num_args = 1..)]
    orgs: Vec<String>,

    /// Specific datasets to migrate (by name or ID)
    #[arg(long, value_name = "NAME_OR_ID", num_args = 1..)]
    datasets: Vec<String>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    yes: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Log file, appended to alongside console output
    #[arg(long, value_name = "FILE", default_value = "migration.log")]
    log_file: PathBuf,
}

impl Cli {
    fn plan(&self) -> MigrationPlan {
        MigrationPlan {
            migrate_organizations: !self.skip_orgs,
            migrate_datasets: !self.skip_datasets,
            migrate_resources: !self.skip_resources,
            organizations: self.orgs.clone(),
            datasets: self.datasets.clone(),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, &cli.log_file)?;

    let ui = ConsoleUi::new();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            error!("Could not load configuration from {:?}", cli.config);
            info!("Example config file format:\n{}", EXAMPLE_CONFIG);
            std::process::exit(1);
        }
    };

    let plan = cli.plan();
    ui.print_header();
    ui.print_plan(&config, &plan);
    info!("Source CKAN: {}", config.source_url);
    info!("Target CKAN: {}", config.target_url);
    info!("Components to migrate: {}", plan.components().join(", "));
    if !plan.organizations.is_empty() {
        info!("Filtering to specified organizations: {:?}", plan.organizations);
    }
    if !plan.datasets.is_empty() {
        info!("Filtering to specified datasets: {:?}", plan.datasets);
    }

    if !cli.yes && !confirm() {
        ui.print_cancelled();
        info!("Migration aborted");
        return Ok(());
    }

    let mut pipeline = Pipeline::new(&config, plan)?;
    match pipeline.run().await {
        Ok(stats) => ui.print_summary(&stats),
        Err(e) => {
            ui.print_error(&e.to_string());
            error!("Target database preparation failed. Please resolve issues before proceeding.");
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> ckan_migrate::Result<MigrationConfig> {
    info!("Loading configuration from {:?}", path);
    let config = MigrationConfig::from_file(path)?;
    config.validate()?;
    Ok(config)
}

/// No answer (including no terminal to ask on) counts as a refusal.
fn confirm() -> bool {
    Confirm::new()
        .with_prompt("Do you want to proceed?")
        .default(false)
        .interact()
        .unwrap_or(false)
}

fn init_logging(verbose: bool, log_file: &Path) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()?;

    Ok(())
}
