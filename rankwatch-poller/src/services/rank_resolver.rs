//! Rank resolver
//!
//! Resolves one identifier into rank observations. Two sources feed it,
//! in strict precedence order:
//!
//! 1. `DetailedList` - the item's exact 1-based position in a candidate
//!    category's best-seller list. Exact, but the item may be out of range.
//! 2. `AggregateStat` - the provider's per-category aggregate sales rank.
//!    Coarser, but more consistently available; used only for category ids
//!    that produced no detailed observation.
//!
//! A candidate whose ranked-list lookup fails simply yields no observation;
//! the remaining candidates still run. Name lookups degrade to placeholders.
//! The resolver has no side effects.

use crate::services::category_names::CategoryNameCache;
use crate::services::provider::RankingProvider;
use chrono::{DateTime, Utc};
use rankwatch_common::{CategoryId, RankObservation, ResolvedProduct, Result, SourceMethod};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Number of most-specific category ids considered for detailed lookups
const MAX_CANDIDATES: usize = 5;

pub struct RankResolver<'a, P: RankingProvider> {
    provider: &'a P,
    names: &'a CategoryNameCache<'a, P>,
}

impl<'a, P: RankingProvider> RankResolver<'a, P> {
    pub fn new(provider: &'a P, names: &'a CategoryNameCache<'a, P>) -> Self {
        Self { provider, names }
    }

    /// Resolve one identifier into its title and ordered observations
    ///
    /// Fails only when the product metadata itself cannot be fetched
    /// (`NotFound`, `Provider`, `Timeout`); everything past that point
    /// degrades per candidate instead of aborting.
    pub async fn resolve(
        &self,
        asin: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<ResolvedProduct> {
        let metadata = self.provider.get_product(asin).await?;

        // Names the metadata already carries are authoritative for this run
        for node in &metadata.category_tree {
            self.names.seed(node.id, node.name.clone());
        }

        let candidates = candidate_categories(&metadata.categories);
        debug!(
            asin = %asin,
            candidates = ?candidates,
            "Derived candidate categories (most-specific-first)"
        );

        let mut observations = Vec::new();
        let mut detailed_hits: HashSet<CategoryId> = HashSet::new();

        // Source 1: exact position in each candidate's best-seller list
        for &category_id in &candidates {
            let ranked_list = match self.provider.get_category_ranked_list(category_id).await {
                Ok(list) => list,
                Err(e) => {
                    warn!(
                        asin = %asin,
                        category = %category_id,
                        error = %e,
                        "Ranked-list lookup failed, skipping candidate"
                    );
                    continue;
                }
            };

            let Some(index) = ranked_list.iter().position(|item| item == asin) else {
                debug!(
                    asin = %asin,
                    category = %category_id,
                    "Not present in ranked list (out of range)"
                );
                continue;
            };

            let category_name = self.names.name_of(category_id).await;
            observations.push(RankObservation {
                observed_at,
                asin: asin.to_string(),
                title: metadata.title.clone(),
                category_id,
                category_name,
                rank: Some((index + 1) as u32),
                source: SourceMethod::DetailedList,
            });
            detailed_hits.insert(category_id);
        }

        // Source 2: aggregate sales ranks for category ids the detailed
        // lookups did not cover. Never overwrites a detailed result.
        // Values outside u32 are provider garbage and are skipped.
        let mut fallbacks: Vec<(CategoryId, u32)> = metadata
            .sales_ranks
            .iter()
            .filter(|(id, &rank)| !detailed_hits.contains(id) && rank > 0)
            .filter_map(|(&id, &rank)| u32::try_from(rank).ok().map(|r| (id, r)))
            .collect();
        order_fallbacks(&mut fallbacks, &candidates);

        if !fallbacks.is_empty() {
            let ids: Vec<CategoryId> = fallbacks.iter().map(|&(id, _)| id).collect();
            let names = self.names.names_of(&ids).await;

            for (category_id, rank) in fallbacks {
                observations.push(RankObservation {
                    observed_at,
                    asin: asin.to_string(),
                    title: metadata.title.clone(),
                    category_id,
                    category_name: names
                        .get(&category_id)
                        .cloned()
                        .unwrap_or_else(|| format!("Category {}", category_id)),
                    rank: Some(rank),
                    source: SourceMethod::AggregateStat,
                });
            }
        }

        Ok(ResolvedProduct {
            title: metadata.title,
            observations,
        })
    }
}

/// Last 5 (at most) entries of the general-to-specific category list,
/// reversed so the most specific category comes first; duplicates collapse
/// to first use
fn candidate_categories(categories: &[CategoryId]) -> Vec<CategoryId> {
    let start = categories.len().saturating_sub(MAX_CANDIDATES);
    let mut seen = HashSet::new();
    categories[start..]
        .iter()
        .rev()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Deterministic fallback order: candidate order first, then remaining
/// ids ascending
fn order_fallbacks(fallbacks: &mut [(CategoryId, u32)], candidates: &[CategoryId]) {
    let rank_of = |id: CategoryId| {
        candidates
            .iter()
            .position(|&c| c == id)
            .unwrap_or(candidates.len())
    };
    fallbacks.sort_by_key(|&(id, _)| (rank_of(id), id));
}
