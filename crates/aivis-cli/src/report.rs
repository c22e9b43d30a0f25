//! Read-only analytics reports queried directly from Postgres.

use aivis_core::{QueryFilter, ResolvedFilter};
use chrono::{NaiveDate, Utc};
use clap::{Args, Subcommand};

use crate::parse_project_id;

/// Sub-commands available under `report`.
#[derive(Debug, Subcommand)]
pub enum ReportCommands {
    /// Share of mentions per entity
    ShareOfVoice(FilterArgs),
    /// Most cited source domains
    Citations(FilterArgs),
    /// Sentiment per entity
    Sentiment(FilterArgs),
}

#[derive(Debug, Args)]
pub struct FilterArgs {
    #[arg(long)]
    pub project_id: String,

    /// First day of the window (YYYY-MM-DD); defaults to 30 days before `--to`
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Last day of the window, inclusive (YYYY-MM-DD); defaults to now
    #[arg(long)]
    pub to: Option<NaiveDate>,

    /// Platform label, e.g. `chatgpt`, `gemini`, `perplexity`, or `all`
    #[arg(long)]
    pub platform: Option<String>,

    /// Region code, e.g. `US`
    #[arg(long)]
    pub region: Option<String>,

    #[arg(long)]
    pub topic: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> anyhow::Result<ResolvedFilter> {
        let query = QueryFilter {
            from: self.from,
            to: self.to,
            platform: self.platform.clone(),
            region: self.region.clone(),
            topic: self.topic.clone(),
        };
        Ok(query.resolve(Utc::now())?)
    }
}

async fn load_project(
    pool: &sqlx::PgPool,
    args: &FilterArgs,
) -> anyhow::Result<aivis_db::ProjectRow> {
    let public_id = parse_project_id(&args.project_id)?;
    aivis_db::get_project_by_public_id(pool, public_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("project '{public_id}' not found"))
}

fn print_window(filter: &ResolvedFilter) {
    println!(
        "window: {} .. {}",
        filter.from.format("%Y-%m-%d"),
        filter.to.format("%Y-%m-%d %H:%M")
    );
}

/// Run one report sub-command.
///
/// # Errors
///
/// Returns an error if the project id is invalid or unknown, the date range
/// is inverted, or a database query fails.
pub(crate) async fn run_report(pool: &sqlx::PgPool, command: ReportCommands) -> anyhow::Result<()> {
    match command {
        ReportCommands::ShareOfVoice(args) => run_share_of_voice(pool, &args).await,
        ReportCommands::Citations(args) => run_citations(pool, &args).await,
        ReportCommands::Sentiment(args) => run_sentiment(pool, &args).await,
    }
}

async fn run_share_of_voice(pool: &sqlx::PgPool, args: &FilterArgs) -> anyhow::Result<()> {
    let project = load_project(pool, args).await?;
    let filter = args.to_filter()?;
    print_window(&filter);

    let Some(snapshot) = aivis_db::share_of_voice(pool, &project, &filter).await? else {
        println!("no mentions recorded in this window");
        return Ok(());
    };

    println!("{:<6}{:<30}{:>9}{:>10}", "RANK", "ENTITY", "SHARE", "MENTIONS");
    for entity in snapshot.ranked() {
        let marker = if entity.id == snapshot.brand.id { "*" } else { " " };
        println!(
            "{:<6}{:<30}{:>8.1}%{:>10}",
            format!("{marker}{}", entity.rank),
            entity.name,
            entity.percentage,
            entity.mention_count
        );
    }
    println!("total mentions: {}", snapshot.total_mentions);
    Ok(())
}

async fn run_citations(pool: &sqlx::PgPool, args: &FilterArgs) -> anyhow::Result<()> {
    let project = load_project(pool, args).await?;
    let filter = args.to_filter()?;
    print_window(&filter);

    let domains = aivis_db::citation_ranking(pool, project.id, &filter).await?;
    if domains.is_empty() {
        println!("no citations recorded in this window");
        return Ok(());
    }

    println!(
        "{:<6}{:<35}{:>10}{:>9}{:>9}  ENTITY",
        "RANK", "DOMAIN", "CITATIONS", "PROMPTS", "SHARE"
    );
    for d in &domains {
        println!(
            "{:<6}{:<35}{:>10}{:>9}{:>8.1}%  {}",
            d.rank,
            d.domain,
            d.citations,
            d.prompts,
            d.percentage,
            d.entity_name.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

async fn run_sentiment(pool: &sqlx::PgPool, args: &FilterArgs) -> anyhow::Result<()> {
    let project = load_project(pool, args).await?;
    let filter = args.to_filter()?;
    print_window(&filter);

    let rollups = aivis_db::sentiment_rollup(pool, project.id, &filter).await?;
    if rollups.is_empty() {
        println!("no scored mentions in this window");
        return Ok(());
    }

    println!(
        "{:<30}{:>9}{:>9}{:>6}{:>6}{:>6}",
        "ENTITY", "MENTIONS", "AVERAGE", "POS", "NEU", "NEG"
    );
    for r in &rollups {
        println!(
            "{:<30}{:>9}{:>9.3}{:>6}{:>6}{:>6}",
            r.entity_name, r.mentions, r.average, r.positive, r.neutral, r.negative
        );
    }
    Ok(())
}
