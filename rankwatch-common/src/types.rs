//! Core domain types shared across the rankwatch crates
//!
//! The provider emits category identifiers inconsistently as JSON numbers
//! or strings; `CategoryId` is the single canonical form, normalized at the
//! provider-adapter boundary.

use chrono::{DateTime, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Canonical category identifier
///
/// Deserializes from either a JSON integer or a decimal string, which is
/// how the upstream provider interchangeably encodes the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CategoryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(CategoryId)
    }
}

impl From<u64> for CategoryId {
    fn from(id: u64) -> Self {
        CategoryId(id)
    }
}

impl<'de> Deserialize<'de> for CategoryId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CategoryIdVisitor;

        impl<'de> Visitor<'de> for CategoryIdVisitor {
            type Value = CategoryId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a category id as an integer or a decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CategoryId, E> {
                Ok(CategoryId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<CategoryId, E> {
                u64::try_from(v)
                    .map(CategoryId)
                    .map_err(|_| E::custom(format!("negative category id: {}", v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CategoryId, E> {
                v.parse::<CategoryId>()
                    .map_err(|_| E::custom(format!("invalid category id: {:?}", v)))
            }
        }

        deserializer.deserialize_any(CategoryIdVisitor)
    }
}

/// How a rank was obtained
///
/// `DetailedList` is the item's exact position in the category's ordered
/// best-seller list. `AggregateStat` is the provider's coarser per-category
/// sales rank, used strictly as a lower-precedence fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMethod {
    DetailedList,
    AggregateStat,
}

impl SourceMethod {
    /// Stable string encoding used by the history store
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMethod::DetailedList => "detailed_list",
            SourceMethod::AggregateStat => "aggregate_stat",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "detailed_list" => Some(SourceMethod::DetailedList),
            "aggregate_stat" => Some(SourceMethod::AggregateStat),
            _ => None,
        }
    }
}

impl fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A product the operator asked the pipeline to watch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedProduct {
    /// Stable external product code (ASIN), unique within the tracked set
    pub asin: String,
    /// Operator label, overwritten with the provider title after the first
    /// successful resolution
    pub display_name: Option<String>,
}

impl TrackedProduct {
    pub fn new(asin: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            asin: asin.into(),
            display_name,
        }
    }
}

/// One timestamped rank measurement for a (product, category) pair
///
/// Immutable once recorded; the history store is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankObservation {
    pub observed_at: DateTime<Utc>,
    pub asin: String,
    pub title: String,
    pub category_id: CategoryId,
    pub category_name: String,
    /// 1-based position in the category best-seller list; `None` means
    /// "out of range", not an error
    pub rank: Option<u32>,
    pub source: SourceMethod,
}

/// Result of resolving a single identifier
#[derive(Debug, Clone)]
pub struct ResolvedProduct {
    pub title: String,
    /// Most-specific-first detailed observations, then aggregate fallbacks
    pub observations: Vec<RankObservation>,
}

/// Outcome of one pipeline run
///
/// An explicit per-run value: the run never reports through shared mutable
/// buffers, and succeeded is never conflated with failed.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Observations resolved this run, in processing order
    pub succeeded: Vec<RankObservation>,
    /// Identifiers whose resolution failed; never aborts the run
    pub failed_asins: Vec<String>,
    /// Set when the batch append failed; in-memory results are still
    /// returned and the retry policy is the caller's concern
    pub persistence_error: Option<String>,
}

impl RunReport {
    pub fn empty() -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            started_at: now,
            finished_at: now,
            succeeded: Vec::new(),
            failed_asins: Vec::new(),
            persistence_error: None,
        }
    }

    /// Number of distinct products that produced at least one observation
    pub fn succeeded_product_count(&self) -> usize {
        let mut seen: Vec<&str> = Vec::new();
        for obs in &self.succeeded {
            if !seen.contains(&obs.asin.as_str()) {
                seen.push(&obs.asin);
            }
        }
        seen.len()
    }
}
