use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pulse_airtable::AirtableClient;
use pulse_core::AppConfig;
use pulse_loops::{ExportClient, LoopsClient};
use pulse_sync::jobs;
use pulse_sync::RunSummary;

#[derive(Debug, Parser)]
#[command(name = "pulse")]
#[command(about = "Participant metrics sync jobs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a one-shot sync job.
    #[command(subcommand)]
    Sync(SyncCommands),
    /// Apply pending database migrations and exit.
    Migrate,
}

#[derive(Debug, Subcommand)]
enum SyncCommands {
    /// Aggregate heartbeat metrics from the database into Airtable.
    Metrics,
    /// Push participant attributes from Airtable to Loops.
    Contacts,
    /// Import the Loops audience export into the database.
    Audience,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Sync(job) => {
            let summary = run_job(&config, job).await?;
            if !summary.succeeded() {
                tracing::error!("sync run completed with failures");
                std::process::exit(1);
            }
        }
        Commands::Migrate => {
            let pool = connect(&config).await?;
            pulse_db::run_migrations(&pool).await?;
            tracing::info!("migrations applied");
        }
    }

    Ok(())
}

async fn run_job(config: &AppConfig, job: SyncCommands) -> anyhow::Result<RunSummary> {
    let summary = match job {
        SyncCommands::Metrics => {
            let pool = connect(config).await?;
            let airtable =
                AirtableClient::new(&config.airtable_api_key, config.request_timeout_secs)?;
            jobs::run_metrics_sync(&pool, config, &airtable).await?
        }
        SyncCommands::Contacts => {
            let airtable =
                AirtableClient::new(&config.airtable_api_key, config.request_timeout_secs)?;
            let loops = LoopsClient::new(&config.loops_api_key, config.request_timeout_secs)?;
            jobs::run_contacts_sync(config, &airtable, &loops).await?
        }
        SyncCommands::Audience => {
            let Some(cookie) = config.loops_session_cookie.as_deref() else {
                anyhow::bail!("LOOPS_SESSION_COOKIE must be set for the audience sync");
            };
            let pool = connect(config).await?;
            let export = ExportClient::new(cookie, config.request_timeout_secs)?;
            jobs::run_audience_sync(&pool, config, &export).await?
        }
    };
    Ok(summary)
}

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = pulse_db::PoolConfig::from_app_config(config);
    let pool = pulse_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}
