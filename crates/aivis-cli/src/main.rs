mod poll;
mod report;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::report::ReportCommands;

#[derive(Debug, Parser)]
#[command(name = "aivis-cli")]
#[command(about = "AI visibility analysis command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Wait for a project's analysis to finish, then show its ranking
    Poll {
        /// Project id as known to the aggregation service
        #[arg(long)]
        project_id: String,

        /// Name shown on the brand row of the ranking
        #[arg(long)]
        project_name: String,

        /// Logo shown next to the brand row
        #[arg(long)]
        logo_url: Option<String>,
    },
    /// Fetch the final ranking of a finished project
    Ranking {
        #[arg(long)]
        project_id: String,

        /// Overrides the brand name carried by the snapshot
        #[arg(long)]
        project_name: Option<String>,
    },
    /// Aggregated reports read straight from the database
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

async fn connect_db() -> anyhow::Result<sqlx::PgPool> {
    let config = aivis_core::load_app_config()?;
    init_tracing(&config.log_level)?;
    let pool_config = aivis_db::PoolConfig::from_app_config(&config);
    let pool = aivis_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Poll {
            project_id,
            project_name,
            logo_url,
        }) => {
            let config = aivis_core::load_poll_config()?;
            init_tracing(&config.log_level)?;
            let brand = aivis_poller::BrandIdentity::new(project_name, logo_url);
            poll::run_poll(&config, &project_id, brand).await?;
        }
        Some(Commands::Ranking {
            project_id,
            project_name,
        }) => {
            let config = aivis_core::load_poll_config()?;
            init_tracing(&config.log_level)?;
            poll::run_ranking(&config, &project_id, project_name).await?;
        }
        Some(Commands::Report { command }) => {
            let pool = connect_db().await?;
            report::run_report(&pool, command).await?;
        }
        Some(Commands::Db { command }) => {
            let pool = connect_db().await?;
            match command {
                DbCommands::Ping => {
                    aivis_db::health_check(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = aivis_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
            }
        }
        None => {
            println!("aivis-cli: no command given; run with --help for usage");
        }
    }

    Ok(())
}

/// Parse a project id given on the command line as the public UUID.
fn parse_project_id(raw: &str) -> anyhow::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| anyhow::anyhow!("invalid project id '{raw}': {e}"))
}
