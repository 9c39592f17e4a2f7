//! Ranking data provider seam
//!
//! The resolver and pipeline are written against this trait; the wire
//! client lives in `keepa.rs` and tests substitute an in-memory fake.

use rankwatch_common::{CategoryId, Result};
use std::collections::HashMap;

/// One node of the provider's category tree, already normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub name: String,
}

/// Product metadata as returned by one `get_product` call
#[derive(Debug, Clone, Default)]
pub struct ProductMetadata {
    pub title: String,
    /// Category ids ordered general to specific
    pub categories: Vec<CategoryId>,
    /// Display names for (a subset of) the ids in `categories`
    pub category_tree: Vec<CategoryNode>,
    /// Per-category aggregate sales rank; coarser than the ranked list but
    /// more consistently available
    pub sales_ranks: HashMap<CategoryId, i64>,
}

/// Upstream per-product ranking data provider
///
/// All calls are keyed by credential and a fixed marketplace selector held
/// by the implementation. Errors map onto the common taxonomy: `NotFound`
/// for unknown identifiers, `Timeout` for missed deadlines, `Provider` for
/// everything else upstream.
pub trait RankingProvider: Send + Sync {
    /// Fetch title, ordered category list, name tree, and aggregate ranks
    /// for one identifier
    async fn get_product(&self, asin: &str) -> Result<ProductMetadata>;

    /// Fetch display names for up to 10 category ids in one call
    ///
    /// The returned map may omit ids the provider does not know.
    async fn get_category_names(
        &self,
        ids: &[CategoryId],
    ) -> Result<HashMap<CategoryId, String>>;

    /// Fetch a category's ordered best-seller identifier list
    async fn get_category_ranked_list(&self, id: CategoryId) -> Result<Vec<String>>;
}

/// Provider ceiling on ids per category-name request
pub const NAME_BATCH_LIMIT: usize = 10;
