//! Operator commands for the EPC tracker: sample data, health score
//! maintenance and copying data between the SQLite and remote backends.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use db::{DBService, sqlite_store::SqliteStore, store::Stores};
use deployment::Deployment;
use dialoguer::{Confirm, theme::ColorfulTheme};
use indicatif::{ProgressBar, ProgressStyle};
use local_deployment::LocalDeployment;
use services::services::{
    backend_migration::{MigrationProgress, migrate},
    config::StorageConfig,
    dashboard::ProjectFilter,
    remote_store::remote_stores,
    seed::seed,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "epc-admin", version, about = "Maintenance commands for the EPC tracker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Insert the sample sites and projects. Existing records are left alone.
    Seed,
    /// Copy every site, project and production row to the other backend.
    MigrateBackend {
        #[arg(long, value_enum, default_value_t = Direction::ToRemote)]
        direction: Direction,
        #[arg(short, long, help = "Skip the confirmation prompt")]
        yes: bool,
    },
    /// Recompute and store the health score of every project.
    RecalculateHealth,
    /// Print the site and project dashboards as JSON.
    Stats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Direction {
    ToRemote,
    ToSqlite,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    utils::logging::init_tracing("info,services=debug");

    let cli = Cli::parse();
    let config = StorageConfig::from_env();

    match cli.command {
        Command::Seed => {
            let deployment = connect(config).await?;
            let report = seed(deployment.require_stores()?).await?;
            println!(
                "Sites: {} created, {} skipped",
                report.sites_created, report.sites_skipped
            );
            println!(
                "Projects: {} created, {} skipped",
                report.projects_created, report.projects_skipped
            );
        }
        Command::MigrateBackend { direction, yes } => {
            migrate_backend(&config, direction, yes).await?;
        }
        Command::RecalculateHealth => {
            let deployment = connect(config).await?;
            let changed = deployment.projects()?.recalculate_health_scores().await?;
            println!("Updated {changed} project health score(s)");
        }
        Command::Stats => {
            let deployment = connect(config).await?;
            let sites = deployment.sites()?.dashboard_stats().await?;
            let projects = deployment
                .projects()?
                .dashboard_stats(&ProjectFilter::default())
                .await?;
            let out = serde_json::json!({ "sites": sites, "projects": projects });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

async fn connect(config: StorageConfig) -> anyhow::Result<LocalDeployment> {
    let deployment = LocalDeployment::from_config(config)
        .await
        .context("failed to initialise storage backend")?;
    info!(backend = deployment.backend_name(), "Connected");
    Ok(deployment)
}

async fn migrate_backend(
    config: &StorageConfig,
    direction: Direction,
    yes: bool,
) -> anyhow::Result<()> {
    let (Some(url), Some(remote)) = (config.database_url.as_deref(), config.remote.as_ref())
    else {
        bail!("backend migration needs both DATABASE_URL and the BAAS_* variables");
    };

    let db = DBService::new(url)
        .await
        .with_context(|| format!("failed to open {url}"))?;
    let sqlite = SqliteStore::stores(&db);
    let remote = remote_stores(remote).context("failed to build remote client")?;

    let (source, target): (&Stores, &Stores) = match direction {
        Direction::ToRemote => (&sqlite, &remote),
        Direction::ToSqlite => (&remote, &sqlite),
    };

    if !yes {
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Copy all records from {} to {}?",
                source.backend.as_str(),
                target.backend.as_str()
            ))
            .default(false)
            .interact()?;
        if !proceed {
            println!("Aborted");
            return Ok(());
        }
    }

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{msg:>12} [{bar:40.cyan/blue}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    let report = migrate(source, target, |p: MigrationProgress| {
        if p.done == 0 {
            bar.set_length(p.total as u64);
            bar.set_message(p.kind);
        }
        bar.set_position(p.done as u64);
    })
    .await?;
    bar.finish_with_message("done");

    for (kind, collection) in [
        ("sites", report.sites),
        ("projects", report.projects),
        ("production", report.production),
    ] {
        println!(
            "{kind}: {} copied, {} skipped",
            collection.copied, collection.skipped
        );
    }
    Ok(())
}
