//! Dashboard aggregations over rows read from the store: query filter
//! defaulting, citation-domain ranking and sentiment rollups.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ranking::share_percentage;

/// Lookback applied when a query gives no start date.
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Scores above this are positive, below its negation negative.
const SENTIMENT_NEUTRAL_BAND: f64 = 0.05;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("'from' ({from}) must be before 'to' ({to})")]
    InvertedRange { from: NaiveDate, to: NaiveDate },
}

/// Dashboard filter as supplied by a caller. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct QueryFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub platform: Option<String>,
    pub region: Option<String>,
    pub topic: Option<String>,
}

/// Filter with defaults applied: a half-open `[from, to)` window and
/// normalized dimension values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFilter {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub platform: Option<String>,
    pub region: Option<String>,
    pub topic: Option<String>,
}

impl QueryFilter {
    /// Applies date-range defaulting relative to `now`.
    ///
    /// A missing `to` means "up to now"; a given `to` date is inclusive.
    /// A missing `from` means [`DEFAULT_LOOKBACK_DAYS`] before `to`.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::InvertedRange`] if `from` falls after `to`.
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<ResolvedFilter, FilterError> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                return Err(FilterError::InvertedRange { from, to });
            }
        }

        let to = self
            .to
            .map_or(now, |d| start_of_day(d) + Duration::days(1));
        let from = self
            .from
            .map_or(to - Duration::days(DEFAULT_LOOKBACK_DAYS), start_of_day);

        Ok(ResolvedFilter {
            from,
            to,
            platform: self.platform.as_deref().and_then(normalize_platform),
            region: non_empty(self.region.as_deref()).map(str::to_uppercase),
            topic: non_empty(self.topic.as_deref()).map(ToOwned::to_owned),
        })
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Maps a user-facing platform label to the stored platform key.
///
/// Returns `None` for an empty value or `all`, meaning no platform filter.
#[must_use]
pub fn normalize_platform(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_lowercase();
    let key = match lowered.as_str() {
        "" | "all" => return None,
        "chatgpt" | "openai" | "gpt" => "chatgpt",
        "gemini" | "google gemini" => "gemini",
        "ai overviews" | "google ai overviews" | "aio" | "google_ai_overview" => {
            "google_ai_overview"
        }
        "perplexity" => "perplexity",
        "claude" | "anthropic" => "claude",
        "copilot" | "bing copilot" | "microsoft copilot" => "copilot",
        other => return Some(other.replace(' ', "_")),
    };
    Some(key.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Brand,
    Competitor,
}

/// One citation as stored: which domain an AI answer cited, for which prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationRow {
    pub domain: String,
    pub prompt_id: i64,
    /// Tracked entity that owns the domain, when known.
    pub entity_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CitationDomain {
    pub domain: String,
    pub citations: u64,
    /// Distinct prompts whose answers cited this domain.
    pub prompts: u64,
    pub entity_name: Option<String>,
    pub percentage: f64,
    pub rank: u32,
}

fn normalize_domain(domain: &str) -> String {
    let lowered = domain.trim().to_lowercase();
    lowered
        .strip_prefix("www.")
        .map_or_else(|| lowered.clone(), ToOwned::to_owned)
}

/// Groups citations by domain and ranks domains by citation count
/// (ties by domain name).
#[must_use]
pub fn rank_citation_domains(rows: &[CitationRow]) -> Vec<CitationDomain> {
    #[derive(Default)]
    struct Acc {
        citations: u64,
        prompts: HashSet<i64>,
        entity_name: Option<String>,
    }

    let mut by_domain: HashMap<String, Acc> = HashMap::new();
    for row in rows {
        let domain = normalize_domain(&row.domain);
        if domain.is_empty() {
            continue;
        }
        let acc = by_domain.entry(domain).or_default();
        acc.citations += 1;
        acc.prompts.insert(row.prompt_id);
        if acc.entity_name.is_none() {
            acc.entity_name.clone_from(&row.entity_name);
        }
    }

    let total: u64 = by_domain.values().map(|a| a.citations).sum();
    let mut domains: Vec<CitationDomain> = by_domain
        .into_iter()
        .map(|(domain, acc)| CitationDomain {
            percentage: share_percentage(acc.citations, total),
            citations: acc.citations,
            prompts: acc.prompts.len() as u64,
            entity_name: acc.entity_name,
            domain,
            rank: 0,
        })
        .collect();

    domains.sort_by(|a, b| {
        b.citations
            .cmp(&a.citations)
            .then_with(|| a.domain.cmp(&b.domain))
    });
    for (idx, domain) in domains.iter_mut().enumerate() {
        domain.rank = u32::try_from(idx + 1).unwrap_or(u32::MAX);
    }
    domains
}

/// One scored mention of a tracked entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentRow {
    pub entity_name: String,
    pub kind: EntityKind,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentRollup {
    pub entity_name: String,
    pub kind: EntityKind,
    pub mentions: u64,
    /// Mean score in `[-1, 1]`, rounded to three decimals.
    pub average: f64,
    pub positive: u64,
    pub neutral: u64,
    pub negative: u64,
}

/// Rolls scored mentions up per entity: the brand first, then competitors
/// by mention volume.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn rollup_sentiment(rows: &[SentimentRow]) -> Vec<SentimentRollup> {
    let mut by_entity: HashMap<(String, EntityKind), (f64, SentimentRollup)> = HashMap::new();

    for row in rows {
        let (sum, rollup) = by_entity
            .entry((row.entity_name.clone(), row.kind))
            .or_insert_with(|| {
                (
                    0.0,
                    SentimentRollup {
                        entity_name: row.entity_name.clone(),
                        kind: row.kind,
                        mentions: 0,
                        average: 0.0,
                        positive: 0,
                        neutral: 0,
                        negative: 0,
                    },
                )
            });
        *sum += row.score;
        rollup.mentions += 1;
        if row.score > SENTIMENT_NEUTRAL_BAND {
            rollup.positive += 1;
        } else if row.score < -SENTIMENT_NEUTRAL_BAND {
            rollup.negative += 1;
        } else {
            rollup.neutral += 1;
        }
    }

    let mut rollups: Vec<SentimentRollup> = by_entity
        .into_values()
        .map(|(sum, mut rollup)| {
            let mean = sum / rollup.mentions as f64;
            rollup.average = (mean * 1000.0).round() / 1000.0;
            rollup
        })
        .collect();

    rollups.sort_by(|a, b| {
        let a_brand = a.kind == EntityKind::Brand;
        let b_brand = b.kind == EntityKind::Brand;
        b_brand
            .cmp(&a_brand)
            .then_with(|| b.mentions.cmp(&a.mentions))
            .then_with(|| a.entity_name.cmp(&b.entity_name))
    });
    rollups
}
