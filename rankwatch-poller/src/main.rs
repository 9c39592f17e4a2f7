//! rankwatch-poller binary
//!
//! The single entry point the external trigger calls (`run`), plus the
//! operator commands for managing the tracked-product set.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use rankwatch_common::config::PollerConfig;
use rankwatch_common::db::{self, products};
use rankwatch_common::TrackedProduct;
use rankwatch_poller::services::keepa::KeepaClient;
use rankwatch_poller::services::slack::{NotificationChannel, NullChannel, SlackWebhook};
use rankwatch_poller::Pipeline;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "rankwatch-poller", about = "Best-seller rank polling service")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file (overrides config)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute one polling run
    Run,
    /// Register a product to track
    Add {
        asin: String,
        /// Operator label, replaced by the provider title after the first
        /// successful run
        #[arg(long)]
        name: Option<String>,
    },
    /// Stop tracking a product (its history is kept)
    Remove { asin: String },
    /// List tracked products in registration order
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    let config = PollerConfig::resolve(cli.config.as_deref(), cli.database.as_deref())?;
    let pool = db::init_database(&config.database_path).await?;

    match cli.command {
        Command::Run => {
            let provider = match &config.api_key {
                Some(key) => Some(KeepaClient::new(key.clone(), config.domain_id)?),
                None => None,
            };

            let report = match &config.slack_webhook_url {
                Some(url) => {
                    let channel = SlackWebhook::new(url.clone())?;
                    run_pipeline(pool, provider, channel).await?
                }
                None => run_pipeline(pool, provider, NullChannel).await?,
            };

            println!(
                "run {}: {} observation(s), {} failed identifier(s)",
                report.run_id,
                report.succeeded.len(),
                report.failed_asins.len()
            );
            for asin in &report.failed_asins {
                println!("  failed: {}", asin);
            }
            if let Some(e) = &report.persistence_error {
                bail!("run finished but persisting observations failed: {}", e);
            }
        }
        Command::Add { asin, name } => {
            let asin = asin.trim().to_uppercase();
            if !is_valid_asin(&asin) {
                bail!("invalid identifier {:?}: expected 10 alphanumeric characters", asin);
            }
            products::upsert(&pool, &TrackedProduct::new(asin.clone(), name)).await?;
            info!(asin = %asin, "Tracked product registered");
            println!("added {}", asin);
        }
        Command::Remove { asin } => {
            if products::delete(&pool, asin.trim()).await? {
                println!("removed {}", asin.trim());
            } else {
                bail!("{} is not tracked", asin.trim());
            }
        }
        Command::List => {
            let tracked = products::list(&pool).await?;
            if tracked.is_empty() {
                println!("no tracked products");
            }
            for product in tracked {
                match product.display_name {
                    Some(name) => println!("{}  {}", product.asin, name),
                    None => println!("{}", product.asin),
                }
            }
        }
    }

    Ok(())
}

async fn run_pipeline<C: NotificationChannel>(
    pool: sqlx::SqlitePool,
    provider: Option<KeepaClient>,
    channel: C,
) -> Result<rankwatch_common::RunReport> {
    let pipeline = Pipeline::new(pool, provider, channel);
    Ok(pipeline.run().await?)
}

/// Basic shape check only: 10 ASCII alphanumeric characters
fn is_valid_asin(asin: &str) -> bool {
    asin.len() == 10 && asin.chars().all(|c| c.is_ascii_alphanumeric())
}
