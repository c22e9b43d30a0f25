//! Live integration tests for aivis-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/aivis-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use aivis_core::{EntityKind, QueryFilter, ResolvedFilter, SnapshotError};
use aivis_db::{
    add_competitor, add_prompt, check_project_progress, citation_ranking, create_project,
    get_project_by_public_id, get_ranking_snapshot, list_competitors, list_entity_mention_counts,
    mark_prompt_status, record_citation, record_mention, sentiment_rollup, share_of_voice,
    DbError, NewCitation, NewMention, ProjectRow, PromptStatus, RankingLookupError,
};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_project(pool: &sqlx::PgPool) -> ProjectRow {
    create_project(pool, "Launch", "Acme", Some("acme.com"), None)
        .await
        .expect("create_project failed")
}

fn mention(prompt_id: i64, competitor_id: Option<i64>) -> NewMention {
    NewMention {
        prompt_id,
        competitor_id,
        platform: "ChatGPT".to_string(),
        region: Some("us".to_string()),
        sentiment: None,
        mentioned_at: None,
    }
}

fn all_time() -> ResolvedFilter {
    QueryFilter::default()
        .resolve(Utc::now() + chrono::Duration::days(1))
        .expect("default filter resolves")
}

async fn record_n(pool: &sqlx::PgPool, project_id: i64, prompt_id: i64, who: Option<i64>, n: usize) {
    for _ in 0..n {
        record_mention(pool, project_id, &mention(prompt_id, who))
            .await
            .expect("record_mention failed");
    }
}

// ---------------------------------------------------------------------------
// Section 1: Projects
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn project_is_found_by_public_id(pool: sqlx::PgPool) {
    let project = seed_project(&pool).await;

    let fetched = get_project_by_public_id(&pool, project.public_id)
        .await
        .expect("lookup failed")
        .expect("project should exist");
    assert_eq!(fetched.id, project.id);
    assert_eq!(fetched.brand_name, "Acme");

    let missing = get_project_by_public_id(&pool, Uuid::new_v4())
        .await
        .expect("lookup failed");
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn add_competitor_is_idempotent_by_name(pool: sqlx::PgPool) {
    let project = seed_project(&pool).await;

    let first = add_competitor(&pool, project.id, "Globex", None)
        .await
        .expect("add_competitor failed");
    let second = add_competitor(&pool, project.id, "Globex", Some("globex.com"))
        .await
        .expect("add_competitor failed");
    assert_eq!(first, second);

    let competitors = list_competitors(&pool, project.id)
        .await
        .expect("list_competitors failed");
    assert_eq!(competitors.len(), 1);
    assert_eq!(competitors[0].domain.as_deref(), Some("globex.com"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn mark_prompt_status_on_missing_prompt_is_not_found(pool: sqlx::PgPool) {
    let result = mark_prompt_status(&pool, 999_999, PromptStatus::Processed).await;
    assert!(matches!(result, Err(DbError::NotFound)));
}

// ---------------------------------------------------------------------------
// Section 2: Progress
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn progress_counts_processed_and_failed_prompts(pool: sqlx::PgPool) {
    let project = seed_project(&pool).await;
    let mut prompts = Vec::new();
    for i in 0..4 {
        prompts.push(
            add_prompt(&pool, project.id, &format!("prompt {i}"), None, None)
                .await
                .expect("add_prompt failed"),
        );
    }

    mark_prompt_status(&pool, prompts[0], PromptStatus::Processed)
        .await
        .expect("mark failed");
    mark_prompt_status(&pool, prompts[1], PromptStatus::Failed)
        .await
        .expect("mark failed");
    mark_prompt_status(&pool, prompts[2], PromptStatus::Processing)
        .await
        .expect("mark failed");

    let progress = check_project_progress(&pool, project.id)
        .await
        .expect("check failed");
    assert_eq!(progress.processed_units, 2);
    assert_eq!(progress.total_units, 4);
    assert!(!progress.all_processed);

    // Pure read: asking again without writes gives the same answer.
    let again = check_project_progress(&pool, project.id)
        .await
        .expect("check failed");
    assert_eq!(again, progress);
}

#[sqlx::test(migrations = "../../migrations")]
async fn project_without_prompts_is_not_processed(pool: sqlx::PgPool) {
    let project = seed_project(&pool).await;
    let progress = check_project_progress(&pool, project.id)
        .await
        .expect("check failed");
    assert_eq!(progress.total_units, 0);
    assert!(!progress.all_processed);
}

// ---------------------------------------------------------------------------
// Section 3: Ranking snapshot
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn ranking_snapshot_requires_every_prompt_processed(pool: sqlx::PgPool) {
    let project = seed_project(&pool).await;
    add_prompt(&pool, project.id, "best anvils?", None, None)
        .await
        .expect("add_prompt failed");

    let result = get_ranking_snapshot(&pool, &project).await;
    assert!(matches!(
        result,
        Err(RankingLookupError::Snapshot(SnapshotError::NotReady(_)))
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn ranking_snapshot_without_mentions_is_a_data_error(pool: sqlx::PgPool) {
    let project = seed_project(&pool).await;
    let prompt = add_prompt(&pool, project.id, "best anvils?", None, None)
        .await
        .expect("add_prompt failed");
    mark_prompt_status(&pool, prompt, PromptStatus::Processed)
        .await
        .expect("mark failed");

    let result = get_ranking_snapshot(&pool, &project).await;
    assert!(matches!(
        result,
        Err(RankingLookupError::Snapshot(SnapshotError::Data(_)))
    ));
}

#[sqlx::test(migrations = "../../migrations")]
async fn ranking_snapshot_ranks_brand_among_competitors(pool: sqlx::PgPool) {
    let project = seed_project(&pool).await;
    let globex = add_competitor(&pool, project.id, "Globex", None)
        .await
        .expect("add_competitor failed");
    let initech = add_competitor(&pool, project.id, "Initech", None)
        .await
        .expect("add_competitor failed");
    add_competitor(&pool, project.id, "Umbrella", None)
        .await
        .expect("add_competitor failed");
    let prompt = add_prompt(&pool, project.id, "best anvils?", None, None)
        .await
        .expect("add_prompt failed");

    record_n(&pool, project.id, prompt, None, 3).await;
    record_n(&pool, project.id, prompt, Some(globex), 5).await;
    record_n(&pool, project.id, prompt, Some(initech), 2).await;
    mark_prompt_status(&pool, prompt, PromptStatus::Processed)
        .await
        .expect("mark failed");

    let snapshot = get_ranking_snapshot(&pool, &project)
        .await
        .expect("snapshot failed");

    assert_eq!(snapshot.total_mentions, 10);
    assert_eq!(snapshot.brand.name, "Acme");
    assert_eq!(snapshot.brand.id, project.public_id.to_string());
    assert_eq!(snapshot.brand.rank, 2);
    assert!((snapshot.brand.percentage - 30.0).abs() < f64::EPSILON);

    let names: Vec<&str> = snapshot.competitors.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Globex", "Initech", "Umbrella"]);
    assert_eq!(snapshot.competitors[2].mention_count, 0);
    assert_eq!(snapshot.competitors[2].rank, 4);
    assert!(snapshot.validate().is_ok());

    // Same inputs, same snapshot.
    let again = get_ranking_snapshot(&pool, &project)
        .await
        .expect("snapshot failed");
    assert_eq!(again, snapshot);
}

#[sqlx::test(migrations = "../../migrations")]
async fn mention_of_foreign_competitor_is_rejected(pool: sqlx::PgPool) {
    let project = seed_project(&pool).await;
    let other = create_project(&pool, "Other", "Other Co", None, None)
        .await
        .expect("create_project failed");
    let foreign = add_competitor(&pool, other.id, "Globex", None)
        .await
        .expect("add_competitor failed");
    let prompt = add_prompt(&pool, project.id, "best anvils?", None, None)
        .await
        .expect("add_prompt failed");

    let result = record_mention(&pool, project.id, &mention(prompt, Some(foreign))).await;
    assert!(matches!(result, Err(DbError::ForeignCompetitor { .. })));
}

// ---------------------------------------------------------------------------
// Section 4: Filtered aggregates
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn mention_counts_respect_platform_region_and_topic(pool: sqlx::PgPool) {
    let project = seed_project(&pool).await;
    let globex = add_competitor(&pool, project.id, "Globex", None)
        .await
        .expect("add_competitor failed");
    let pricing = add_prompt(&pool, project.id, "cheap anvils?", Some("pricing"), Some("us"))
        .await
        .expect("add_prompt failed");
    let quality = add_prompt(&pool, project.id, "durable anvils?", Some("quality"), Some("de"))
        .await
        .expect("add_prompt failed");

    record_n(&pool, project.id, pricing, None, 2).await;
    record_n(&pool, project.id, pricing, Some(globex), 1).await;
    let mut gemini = mention(quality, Some(globex));
    gemini.platform = "Google Gemini".to_string();
    gemini.region = Some("de".to_string());
    record_mention(&pool, project.id, &gemini)
        .await
        .expect("record_mention failed");

    let mut filter = all_time();
    filter.platform = Some("gemini".to_string());
    let counts = list_entity_mention_counts(&pool, &project, Some(&filter))
        .await
        .expect("counts failed");
    assert_eq!(counts.brand.count, 0);
    assert_eq!(counts.competitors[0].count, 1);

    let mut filter = all_time();
    filter.topic = Some("pricing".to_string());
    filter.region = Some("US".to_string());
    let counts = list_entity_mention_counts(&pool, &project, Some(&filter))
        .await
        .expect("counts failed");
    assert_eq!(counts.brand.count, 2);
    assert_eq!(counts.competitors[0].count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn share_of_voice_is_none_for_an_empty_window(pool: sqlx::PgPool) {
    let project = seed_project(&pool).await;
    let prompt = add_prompt(&pool, project.id, "best anvils?", None, None)
        .await
        .expect("add_prompt failed");
    let mut old = mention(prompt, None);
    old.mentioned_at = Some(Utc.with_ymd_and_hms(2020, 1, 15, 12, 0, 0).unwrap());
    record_mention(&pool, project.id, &old)
        .await
        .expect("record_mention failed");

    let recent = share_of_voice(&pool, &project, &all_time())
        .await
        .expect("share_of_voice failed");
    assert!(recent.is_none());

    let window = QueryFilter {
        from: chrono::NaiveDate::from_ymd_opt(2020, 1, 1),
        to: chrono::NaiveDate::from_ymd_opt(2020, 1, 31),
        ..QueryFilter::default()
    }
    .resolve(Utc::now())
    .expect("filter resolves");
    let january = share_of_voice(&pool, &project, &window)
        .await
        .expect("share_of_voice failed")
        .expect("window has data");
    assert_eq!(january.total_mentions, 1);
    assert!((january.brand.percentage - 100.0).abs() < f64::EPSILON);
}

#[sqlx::test(migrations = "../../migrations")]
async fn citation_ranking_counts_domains_and_prompts(pool: sqlx::PgPool) {
    let project = seed_project(&pool).await;
    let globex = add_competitor(&pool, project.id, "Globex", None)
        .await
        .expect("add_competitor failed");
    let p1 = add_prompt(&pool, project.id, "one", None, None)
        .await
        .expect("add_prompt failed");
    let p2 = add_prompt(&pool, project.id, "two", None, None)
        .await
        .expect("add_prompt failed");

    let citation = |prompt_id: i64, domain: &str, competitor_id: Option<i64>| NewCitation {
        prompt_id,
        competitor_id,
        is_brand: competitor_id.is_none(),
        url: format!("https://{domain}/page"),
        domain: domain.to_string(),
        platform: "perplexity".to_string(),
        region: None,
        cited_at: None,
    };

    for c in [
        citation(p1, "acme.com", None),
        citation(p2, "www.acme.com", None),
        citation(p1, "Globex.com", Some(globex)),
    ] {
        record_citation(&pool, project.id, &c)
            .await
            .expect("record_citation failed");
    }

    let ranked = citation_ranking(&pool, project.id, &all_time())
        .await
        .expect("citation_ranking failed");
    assert_eq!(ranked[0].domain, "acme.com");
    assert_eq!(ranked[0].citations, 2);
    assert_eq!(ranked[0].prompts, 2);
    assert_eq!(ranked[0].entity_name.as_deref(), Some("Acme"));
    assert_eq!(ranked[1].domain, "globex.com");
    assert_eq!(ranked[1].entity_name.as_deref(), Some("Globex"));
}

#[sqlx::test(migrations = "../../migrations")]
async fn sentiment_rollup_puts_brand_first(pool: sqlx::PgPool) {
    let project = seed_project(&pool).await;
    let globex = add_competitor(&pool, project.id, "Globex", None)
        .await
        .expect("add_competitor failed");
    let prompt = add_prompt(&pool, project.id, "best anvils?", None, None)
        .await
        .expect("add_prompt failed");

    let scored = |competitor_id: Option<i64>, score: Decimal| NewMention {
        sentiment: Some(score),
        ..mention(prompt, competitor_id)
    };
    for m in [
        scored(None, Decimal::new(800, 3)),
        scored(Some(globex), Decimal::new(-500, 3)),
        scored(Some(globex), Decimal::new(10, 3)),
        scored(Some(globex), Decimal::new(200, 3)),
    ] {
        record_mention(&pool, project.id, &m)
            .await
            .expect("record_mention failed");
    }
    // Unscored mentions are not part of the rollup.
    record_n(&pool, project.id, prompt, None, 1).await;

    let rollup = sentiment_rollup(&pool, project.id, &all_time())
        .await
        .expect("sentiment_rollup failed");
    assert_eq!(rollup.len(), 2);
    assert_eq!(rollup[0].kind, EntityKind::Brand);
    assert_eq!(rollup[0].mentions, 1);
    assert_eq!(rollup[1].entity_name, "Globex");
    assert_eq!(rollup[1].mentions, 3);
    assert_eq!(rollup[1].positive, 1);
    assert_eq!(rollup[1].neutral, 1);
    assert_eq!(rollup[1].negative, 1);
}
