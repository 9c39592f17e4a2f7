//! Keepa API client
//!
//! Wire adapter for the ranking data provider. Normalizes the provider's
//! inconsistent string-vs-integer category ids into `CategoryId` at this
//! boundary, so nothing above it ever sees the raw encoding.

use crate::services::provider::{CategoryNode, ProductMetadata, RankingProvider};
use rankwatch_common::{CategoryId, Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const KEEPA_BASE_URL: &str = "https://api.keepa.com";
const USER_AGENT: &str = "rankwatch/0.1.0 (https://github.com/rankwatch/rankwatch)";

/// Product metadata lookups carry the most payload
const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
/// Name lookups are small and get a shorter deadline
const NAME_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ProductResponse {
    #[serde(default)]
    products: Vec<WireProduct>,
}

#[derive(Debug, Deserialize)]
struct WireProduct {
    title: Option<String>,
    #[serde(default)]
    categories: Option<Vec<CategoryId>>,
    #[serde(rename = "categoryTree", default)]
    category_tree: Option<Vec<WireCategoryNode>>,
    stats: Option<WireStats>,
}

#[derive(Debug, Deserialize)]
struct WireCategoryNode {
    #[serde(rename = "catId")]
    cat_id: CategoryId,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireStats {
    #[serde(rename = "salesRank", default)]
    sales_rank: Option<HashMap<CategoryId, i64>>,
}

#[derive(Debug, Deserialize)]
struct CategoryResponse {
    #[serde(default)]
    categories: HashMap<CategoryId, WireCategory>,
}

#[derive(Debug, Deserialize)]
struct WireCategory {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BestSellersResponse {
    #[serde(rename = "bestSellersList")]
    best_sellers_list: Option<WireBestSellers>,
}

#[derive(Debug, Deserialize)]
struct WireBestSellers {
    #[serde(rename = "asinList", default)]
    asin_list: Vec<String>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Keepa API client, keyed by credential + fixed marketplace selector
pub struct KeepaClient {
    http_client: reqwest::Client,
    api_key: String,
    domain_id: u8,
    base_url: String,
}

impl KeepaClient {
    pub fn new(api_key: String, domain_id: u8) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(METADATA_TIMEOUT)
            .build()
            .map_err(|e| Error::Provider(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            domain_id,
            base_url: KEEPA_BASE_URL.to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let domain = self.domain_id.to_string();

        let response = self
            .http_client
            .get(&url)
            .query(&[("key", self.api_key.as_str()), ("domain", domain.as_str())])
            .query(query)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_transport_error(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "{} returned {}: {}",
                endpoint,
                status.as_u16(),
                body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Provider(format!("{} parse error: {}", endpoint, e)))
    }
}

fn map_transport_error(endpoint: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("{} timed out", endpoint))
    } else {
        Error::Provider(format!("{} failed: {}", endpoint, e))
    }
}

impl RankingProvider for KeepaClient {
    async fn get_product(&self, asin: &str) -> Result<ProductMetadata> {
        tracing::debug!(asin = %asin, "Querying product metadata");

        let response: ProductResponse = self
            .get_json(
                "product",
                &[
                    ("asin", asin.to_string()),
                    ("stats", "1".to_string()),
                ],
                METADATA_TIMEOUT,
            )
            .await?;

        let product = response
            .products
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("no product record for {}", asin)))?;

        let metadata = ProductMetadata {
            title: product
                .title
                .unwrap_or_else(|| "Unknown Product".to_string()),
            categories: product.categories.unwrap_or_default(),
            category_tree: product
                .category_tree
                .unwrap_or_default()
                .into_iter()
                .filter_map(|node| {
                    node.name.map(|name| CategoryNode {
                        id: node.cat_id,
                        name,
                    })
                })
                .collect(),
            sales_ranks: product
                .stats
                .and_then(|s| s.sales_rank)
                .unwrap_or_default(),
        };

        tracing::info!(
            asin = %asin,
            title = %metadata.title,
            categories = metadata.categories.len(),
            aggregate_ranks = metadata.sales_ranks.len(),
            "Retrieved product metadata"
        );

        Ok(metadata)
    }

    async fn get_category_names(
        &self,
        ids: &[CategoryId],
    ) -> Result<HashMap<CategoryId, String>> {
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        tracing::debug!(categories = %joined, "Querying category names");

        let response: CategoryResponse = self
            .get_json("category", &[("category", joined)], NAME_TIMEOUT)
            .await?;

        Ok(response
            .categories
            .into_iter()
            .filter_map(|(id, category)| category.name.map(|name| (id, name)))
            .collect())
    }

    async fn get_category_ranked_list(&self, id: CategoryId) -> Result<Vec<String>> {
        tracing::debug!(category = %id, "Querying best-seller list");

        let response: BestSellersResponse = self
            .get_json(
                "bestsellers",
                &[("category", id.to_string())],
                METADATA_TIMEOUT,
            )
            .await?;

        Ok(response
            .best_sellers_list
            .map(|list| list.asin_list)
            .unwrap_or_default())
    }
}
