//! Category name cache
//!
//! Maps category ids to display names, batching provider lookups and
//! memoizing the results. This component never fails the caller: any
//! provider error degrades to a synthesized placeholder name.

use crate::services::provider::{RankingProvider, NAME_BATCH_LIMIT};
use rankwatch_common::CategoryId;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

/// Placeholder used when the provider cannot name a category
pub fn placeholder_name(id: CategoryId) -> String {
    format!("Category {}", id)
}

/// Memoizing name lookup over a `RankingProvider`
pub struct CategoryNameCache<'a, P: RankingProvider> {
    provider: &'a P,
    cache: Mutex<HashMap<CategoryId, String>>,
}

impl<'a, P: RankingProvider> CategoryNameCache<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Seed the cache with names already known from product metadata
    pub fn seed(&self, id: CategoryId, name: impl Into<String>) {
        self.cache.lock().unwrap().insert(id, name.into());
    }

    /// Resolve one category name; never fails
    pub async fn name_of(&self, id: CategoryId) -> String {
        self.names_of(&[id]).await.remove(&id).unwrap_or_else(|| placeholder_name(id))
    }

    /// Resolve many category names, batching up to 10 ids per provider
    /// call and merging the results; ids the provider omits get
    /// placeholder names. Never fails.
    pub async fn names_of(&self, ids: &[CategoryId]) -> HashMap<CategoryId, String> {
        let mut resolved = HashMap::with_capacity(ids.len());
        let mut missing = Vec::new();

        {
            let cache = self.cache.lock().unwrap();
            for &id in ids {
                match cache.get(&id) {
                    Some(name) => {
                        resolved.insert(id, name.clone());
                    }
                    None => {
                        if !missing.contains(&id) {
                            missing.push(id);
                        }
                    }
                }
            }
        }

        for chunk in missing.chunks(NAME_BATCH_LIMIT) {
            match self.provider.get_category_names(chunk).await {
                Ok(names) => {
                    let mut cache = self.cache.lock().unwrap();
                    for &id in chunk {
                        let name = names
                            .get(&id)
                            .cloned()
                            .unwrap_or_else(|| placeholder_name(id));
                        cache.insert(id, name.clone());
                        resolved.insert(id, name);
                    }
                }
                Err(e) => {
                    warn!(error = %e, batch = chunk.len(), "Category name lookup failed, using placeholders");
                    for &id in chunk {
                        resolved.insert(id, placeholder_name(id));
                    }
                }
            }
        }

        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::provider::ProductMetadata;
    use rankwatch_common::{Error, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider fake that knows some names and counts name calls
    struct NameProvider {
        known: HashMap<CategoryId, String>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl NameProvider {
        fn new(known: &[(u64, &str)], fail: bool) -> Self {
            Self {
                known: known
                    .iter()
                    .map(|&(id, name)| (CategoryId(id), name.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl RankingProvider for NameProvider {
        async fn get_product(&self, asin: &str) -> Result<ProductMetadata> {
            Err(Error::NotFound(asin.to_string()))
        }

        async fn get_category_names(
            &self,
            ids: &[CategoryId],
        ) -> Result<HashMap<CategoryId, String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(ids.len() <= NAME_BATCH_LIMIT);
            if self.fail {
                return Err(Error::Provider("category endpoint down".to_string()));
            }
            Ok(ids
                .iter()
                .filter_map(|id| self.known.get(id).map(|n| (*id, n.clone())))
                .collect())
        }

        async fn get_category_ranked_list(&self, _id: CategoryId) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn twelve_ids_issue_exactly_two_calls_and_all_resolve() {
        // 12 unresolved ids, provider omits one of them
        let known: Vec<(u64, String)> = (1..=11).map(|i| (i, format!("Name {}", i))).collect();
        let known_refs: Vec<(u64, &str)> =
            known.iter().map(|(i, n)| (*i, n.as_str())).collect();
        let provider = NameProvider::new(&known_refs, false);
        let cache = CategoryNameCache::new(&provider);

        let ids: Vec<CategoryId> = (1..=12).map(CategoryId).collect();
        let names = cache.names_of(&ids).await;

        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(names.len(), 12);
        assert_eq!(names[&CategoryId(3)], "Name 3");
        assert_eq!(names[&CategoryId(12)], placeholder_name(CategoryId(12)));
    }

    #[tokio::test]
    async fn provider_failure_degrades_to_placeholders() {
        let provider = NameProvider::new(&[], true);
        let cache = CategoryNameCache::new(&provider);

        let name = cache.name_of(CategoryId(42)).await;
        assert_eq!(name, "Category 42");
    }

    #[tokio::test]
    async fn cached_and_seeded_names_skip_the_provider() {
        let provider = NameProvider::new(&[(7, "Seven")], false);
        let cache = CategoryNameCache::new(&provider);
        cache.seed(CategoryId(9), "Seeded");

        assert_eq!(cache.name_of(CategoryId(7)).await, "Seven");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);

        // Both now memoized; no further wire calls
        assert_eq!(cache.name_of(CategoryId(7)).await, "Seven");
        assert_eq!(cache.name_of(CategoryId(9)).await, "Seeded");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
