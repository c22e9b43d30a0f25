//! Ranking snapshot: the brand compared against its tracked competitors.

use serde::{Deserialize, Serialize};

use crate::contracts::SnapshotError;

/// Tolerance used when checking that percentages do not sum past 100.
const PERCENT_EPSILON: f64 = 0.01;

/// Raw per-entity count as read from the aggregation store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityCount {
    pub id: String,
    pub name: String,
    pub count: u64,
}

impl EntityCount {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, count: u64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            count,
        }
    }
}

/// One ranked row of a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub percentage: f64,
    #[serde(alias = "mentionOrCitationCount")]
    pub mention_count: u64,
    pub rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingSnapshot {
    pub brand: Entity,
    /// Competitors in rank order.
    pub competitors: Vec<Entity>,
    pub total_mentions: u64,
}

impl RankingSnapshot {
    /// Every entity, brand included, in rank order.
    #[must_use]
    pub fn ranked(&self) -> Vec<&Entity> {
        let mut all: Vec<&Entity> = std::iter::once(&self.brand)
            .chain(self.competitors.iter())
            .collect();
        all.sort_by_key(|e| e.rank);
        all
    }

    /// Checks the snapshot invariants: ranks are exactly `1..=N`, ordered by
    /// descending count, competitors are listed in rank order, and the
    /// percentages stay within `[0, 100]` with a sum no greater than 100.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Data`] describing the first violated invariant.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let ranked = self.ranked();
        for (idx, entity) in ranked.iter().enumerate() {
            let expected = u32::try_from(idx + 1).unwrap_or(u32::MAX);
            if entity.rank != expected {
                return Err(SnapshotError::Data(format!(
                    "ranks are not dense: '{}' has rank {} where {} was expected",
                    entity.name, entity.rank, expected
                )));
            }
            if !(0.0..=100.0).contains(&entity.percentage) {
                return Err(SnapshotError::Data(format!(
                    "'{}' has out-of-range percentage {}",
                    entity.name, entity.percentage
                )));
            }
        }

        if ranked
            .windows(2)
            .any(|pair| pair[0].mention_count < pair[1].mention_count)
        {
            return Err(SnapshotError::Data(
                "ranks are not ordered by descending count".to_string(),
            ));
        }

        if self
            .competitors
            .windows(2)
            .any(|pair| pair[0].rank > pair[1].rank)
        {
            return Err(SnapshotError::Data(
                "competitors are not listed in rank order".to_string(),
            ));
        }

        let sum: f64 = ranked.iter().map(|e| e.percentage).sum();
        if sum > 100.0 + PERCENT_EPSILON {
            return Err(SnapshotError::Data(format!(
                "percentages sum to {sum:.2}, above 100"
            )));
        }

        let counted: u64 = ranked.iter().map(|e| e.mention_count).sum();
        if counted != self.total_mentions {
            return Err(SnapshotError::Data(format!(
                "total_mentions is {} but entities count {}",
                self.total_mentions, counted
            )));
        }

        Ok(())
    }
}

/// Share of `total` held by `count`, truncated to one decimal place so the
/// shares of a partition never add up to more than 100.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn share_percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((count as f64 * 1000.0) / total as f64).floor() / 10.0
}

/// Ranks the brand against its competitors.
///
/// Ranks are dense `1..=N` by descending count; ties keep input order with
/// the brand first. Competitors come back sorted by rank.
///
/// # Errors
///
/// Returns [`SnapshotError::Data`] if no entity has any recorded mentions.
pub fn build_ranking_snapshot(
    brand: EntityCount,
    competitors: Vec<EntityCount>,
) -> Result<RankingSnapshot, SnapshotError> {
    let total: u64 = brand.count + competitors.iter().map(|c| c.count).sum::<u64>();
    if total == 0 {
        return Err(SnapshotError::Data(
            "no mention records exist for this project".to_string(),
        ));
    }

    let mut order: Vec<(usize, u64)> = std::iter::once(brand.count)
        .chain(competitors.iter().map(|c| c.count))
        .enumerate()
        .collect();
    // Stable sort keeps input order between equal counts.
    order.sort_by(|a, b| b.1.cmp(&a.1));

    let mut ranks = vec![0_u32; order.len()];
    for (position, (input_idx, _)) in order.iter().enumerate() {
        ranks[*input_idx] = u32::try_from(position + 1).unwrap_or(u32::MAX);
    }

    let to_entity = |count: EntityCount, rank: u32| Entity {
        percentage: share_percentage(count.count, total),
        mention_count: count.count,
        rank,
        id: count.id,
        name: count.name,
    };

    let brand = to_entity(brand, ranks[0]);
    let mut competitors: Vec<Entity> = competitors
        .into_iter()
        .enumerate()
        .map(|(idx, c)| to_entity(c, ranks[idx + 1]))
        .collect();
    competitors.sort_by_key(|e| e.rank);

    Ok(RankingSnapshot {
        brand,
        competitors,
        total_mentions: total,
    })
}
