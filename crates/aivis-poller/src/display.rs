//! What the results screen shows for a given session state.

use std::fmt::Write as _;

use aivis_core::RankingSnapshot;

use crate::state::{Phase, SessionState};

/// The brand as configured for the project, shown in place of the
/// snapshot's own brand name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandIdentity {
    pub name: String,
    pub logo_url: Option<String>,
}

impl BrandIdentity {
    #[must_use]
    pub fn new(name: impl Into<String>, logo_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            logo_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingRow {
    /// Position label shown on screen.
    pub display_rank: u32,
    /// Rank as computed by the snapshot.
    pub rank: u32,
    pub name: String,
    pub logo_url: Option<String>,
    pub percentage: f64,
    pub mention_count: u64,
    pub is_brand: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RankingDisplay {
    pub rows: Vec<RankingRow>,
    pub total_mentions: u64,
}

impl RankingDisplay {
    /// Brand first, styled as rank 1 whatever its numeric rank, then the
    /// competitors exactly as the snapshot orders and ranks them.
    ///
    /// When the brand does not lead, the leading competitor also shows rank 1.
    /// The brand row keeps its numeric rank in [`RankingRow::rank`].
    #[must_use]
    pub fn from_snapshot(snapshot: &RankingSnapshot, brand: &BrandIdentity) -> Self {
        let brand_row = RankingRow {
            display_rank: 1,
            rank: snapshot.brand.rank,
            name: brand.name.clone(),
            logo_url: brand.logo_url.clone(),
            percentage: snapshot.brand.percentage,
            mention_count: snapshot.brand.mention_count,
            is_brand: true,
        };

        let rows = std::iter::once(brand_row)
            .chain(snapshot.competitors.iter().map(|c| RankingRow {
                display_rank: c.rank,
                rank: c.rank,
                name: c.name.clone(),
                logo_url: None,
                percentage: c.percentage,
                mention_count: c.mention_count,
                is_brand: false,
            }))
            .collect();

        Self {
            rows,
            total_mentions: snapshot.total_mentions,
        }
    }

    /// Plain-text table for terminals.
    #[must_use]
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{:<6}{:<30}{:>9}{:>10}", "RANK", "NAME", "SHARE", "MENTIONS");
        for row in &self.rows {
            let marker = if row.is_brand { "*" } else { " " };
            let _ = writeln!(
                out,
                "{:<6}{:<30}{:>8.1}%{:>10}",
                format!("{marker}{}", row.display_rank),
                row.name,
                row.percentage,
                row.mention_count
            );
        }
        let _ = write!(out, "total mentions: {}", self.total_mentions);
        out
    }
}

/// Exactly one of these is on screen at any time.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Progress { percent: f64, message: String },
    Error { message: String },
    Ranking(RankingDisplay),
}

impl View {
    #[must_use]
    pub fn from_state(state: &SessionState, brand: &BrandIdentity) -> Self {
        match &state.phase {
            Phase::Loading { .. } => View::Progress {
                percent: state.displayed_progress,
                message: state.status_message.clone(),
            },
            Phase::Failed(reason) => View::Error {
                message: reason.to_string(),
            },
            Phase::Succeeded(snapshot) => View::Ranking(RankingDisplay::from_snapshot(snapshot, brand)),
        }
    }
}

impl std::fmt::Display for View {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            View::Progress { percent, message } => write!(f, "[{percent:>5.1}%] {message}"),
            View::Error { message } => write!(f, "error: {message}"),
            View::Ranking(display) => write!(f, "{}", display.render_table()),
        }
    }
}
