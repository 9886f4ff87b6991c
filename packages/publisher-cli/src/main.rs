//! Maintenance CLI for the publication ledger and remote duplicate cleanup.

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use publisher::{
    DedupeOptions, Ledger, LedgerState, MaintenanceService, WordPressStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wordpress_client::WpClient;

use config::Config;

#[derive(Parser)]
#[command(name = "publisher")]
#[command(about = "Ledger maintenance and duplicate cleanup for a publication target")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect duplicate remote posts and report (or delete) them
    Dedupe {
        /// Execute deletions; without this flag only a report is written
        #[arg(long)]
        apply: bool,

        /// Delete permanently instead of moving to trash
        #[arg(long)]
        force: bool,

        /// Remote status filter for the listing
        #[arg(long, default_value = "any")]
        status: String,

        #[arg(long, default_value_t = 100)]
        per_page: u32,

        #[arg(long, default_value_t = 50)]
        max_pages: u32,
    },

    /// Mark every remote post's product id in the ledger
    Backfill {
        /// Ledger state to record for backfilled rows
        #[arg(long, default_value = "published")]
        state: String,

        #[arg(long, default_value_t = 100)]
        per_page: u32,

        #[arg(long, default_value_t = 5)]
        max_pages: u32,
    },

    /// Show ledger row counts by state
    Stats,

    /// Delete all failed ledger rows, restoring retry eligibility
    ClearFailed,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,publisher=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    let ledger = Ledger::open(&config.ledger_db_path)
        .await
        .context("failed to open ledger")?;

    let wp = WpClient::new(
        &config.wp_base_url,
        &config.wp_username,
        &config.wp_app_password,
    );
    let service = MaintenanceService::new(WordPressStore::new(wp), &config.wp_base_url);

    match cli.command {
        Commands::Dedupe {
            apply,
            force,
            status,
            per_page,
            max_pages,
        } => {
            tracing::info!(base_url = %config.wp_base_url, apply, force, "starting dedupe run");
            let opts = DedupeOptions {
                apply,
                force,
                status,
                per_page,
                max_pages,
            };
            let report = service
                .run_dedupe(&opts)
                .await
                .context("dedupe run failed")?;

            let path = report
                .write_to(&config.report_dir)
                .context("failed to write report")?;

            if apply {
                tracing::info!(
                    deleted = report.deleted_count(),
                    errors = report.error_count(),
                    trash = !force,
                    "deletions executed"
                );
            } else {
                tracing::info!(planned = report.deleted.len(), "dry-run deletions");
            }
            tracing::info!(report = %path.display(), "report written");
        }

        Commands::Backfill {
            state,
            per_page,
            max_pages,
        } => {
            let state = match state.as_str() {
                "published" => LedgerState::Published,
                "drafted" => LedgerState::Drafted,
                other => bail!("unsupported backfill state: {other}"),
            };
            let marked = service
                .backfill_ledger(&ledger, state, per_page, max_pages)
                .await
                .context("backfill failed")?;
            ledger
                .set_meta("last_backfill", &chrono::Local::now().to_rfc3339())
                .await
                .context("failed to record backfill time")?;
            tracing::info!(marked, "backfill complete");
        }

        Commands::Stats => {
            let stats = ledger.stats().await.context("failed to read stats")?;
            println!("total:     {}", stats.total);
            println!("drafted:   {}", stats.drafted);
            println!("published: {}", stats.published);
            println!("failed:    {}", stats.failed);
            println!("dry_run:   {}", stats.dry_run);
        }

        Commands::ClearFailed => {
            let cleared = ledger
                .clear_failed()
                .await
                .context("failed to clear failed entries")?;
            println!("cleared {} failed entries", cleared);
        }
    }

    Ok(())
}
