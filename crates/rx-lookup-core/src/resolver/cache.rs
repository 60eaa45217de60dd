//! Shared handle to the lookup cache.
//!
//! Wraps the SQLite [`Database`] in `Arc<Mutex<_>>` so one explicitly
//! constructed cache can be cloned into every concurrent lookup. The lock is
//! never held across an `.await`.
//!
//! Two concurrent saves for the same brand are last-writer-wins.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use strsim::{jaro_winkler, normalized_levenshtein};

use crate::db::{CacheStats, Database, DbError, DbResult};
use crate::models::CacheEntry;

/// Minimum similarity for a "did you mean" suggestion.
const SUGGESTION_CUTOFF: f64 = 0.7;

/// Case-insensitive, write-through brand cache.
#[derive(Clone)]
pub struct LookupCache {
    db: Arc<Mutex<Database>>,
}

impl LookupCache {
    pub fn new(db: Database) -> Self {
        Self::from_shared(Arc::new(Mutex::new(db)))
    }

    pub fn from_shared(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Open (or create) the cache database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Database>> {
        self.db.lock().map_err(|e| DbError::Poisoned(e.to_string()))
    }

    /// Cached entry for any casing of `brand_name`.
    pub fn try_get(&self, brand_name: &str) -> DbResult<Option<CacheEntry>> {
        self.lock()?.get_cache_entry(brand_name)
    }

    /// Like [`try_get`](Self::try_get), but a read failure is logged and
    /// treated as a miss.
    pub fn get(&self, brand_name: &str) -> Option<CacheEntry> {
        match self.try_get(brand_name) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(brand = brand_name, error = %e, "cache: read failed, treating as miss");
                None
            }
        }
    }

    /// Persist an entry, replacing any entry under another casing.
    pub fn try_save(&self, entry: &CacheEntry) -> DbResult<()> {
        self.lock()?.upsert_cache_entry(entry)
    }

    /// Persist an entry; `false` (with the error logged) if the write failed.
    pub fn save(&self, entry: &CacheEntry) -> bool {
        match self.try_save(entry) {
            Ok(()) => {
                tracing::debug!(brand = %entry.brand_name, products = entry.products.len(), "cache: saved");
                true
            }
            Err(e) => {
                tracing::error!(brand = %entry.brand_name, error = %e, "cache: save failed");
                false
            }
        }
    }

    /// Remove every entry.
    pub fn clear(&self) -> bool {
        match self.lock().and_then(|db| db.clear_cache()) {
            Ok(removed) => {
                tracing::info!(removed, "cache: cleared");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "cache: clear failed");
                false
            }
        }
    }

    /// Every cached brand name, alphabetically.
    pub fn all_brands(&self) -> DbResult<Vec<String>> {
        self.lock()?.list_cached_brands()
    }

    pub fn stats(&self) -> DbResult<CacheStats> {
        self.lock()?.cache_stats()
    }

    /// Load a JSON mapping file written by older deployments.
    pub fn import_legacy_json<P: AsRef<Path>>(&self, path: P) -> DbResult<usize> {
        let imported = self.lock()?.import_cache_json(path)?;
        tracing::info!(imported, "cache: imported legacy mapping");
        Ok(imported)
    }

    /// Cached brand names similar to `brand_name`, most similar first.
    pub fn suggest_brands(&self, brand_name: &str, limit: usize) -> DbResult<Vec<String>> {
        let query = brand_name.trim().to_lowercase();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(f64, String)> = self
            .all_brands()?
            .into_iter()
            .map(|brand| (similarity(&query, &brand.to_lowercase()), brand))
            .filter(|(score, _)| *score >= SUGGESTION_CUTOFF)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(limit);

        Ok(scored.into_iter().map(|(_, brand)| brand).collect())
    }
}

fn similarity(a: &str, b: &str) -> f64 {
    jaro_winkler(a, b) * 0.6 + normalized_levenshtein(a, b) * 0.4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Product, TermType};

    fn entry(brand: &str) -> CacheEntry {
        CacheEntry::new(
            brand,
            None,
            vec![Product::new(format!("{} 200 MG Oral Tablet", brand), "1", TermType::BrandedDrug)],
        )
    }

    #[test]
    fn test_save_then_get_any_casing() {
        let cache = LookupCache::open_in_memory().unwrap();
        assert!(cache.save(&entry("Advil")));

        let hit = cache.get("  ADVIL ").unwrap();
        assert_eq!(hit.brand_name, "Advil");
        assert!(cache.get("Motrin").is_none());
    }

    #[test]
    fn test_clones_share_storage() {
        let cache = LookupCache::open_in_memory().unwrap();
        let other = cache.clone();
        assert!(other.save(&entry("Advil")));

        assert!(cache.get("advil").is_some());
        assert!(cache.clear());
        assert!(other.get("advil").is_none());
    }

    #[test]
    fn test_save_reports_failure() {
        let cache = LookupCache::open_in_memory().unwrap();
        assert!(!cache.save(&CacheEntry::new("   ", None, vec![])));
        assert!(matches!(
            cache.try_save(&CacheEntry::new("", None, vec![])),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_suggest_brands() {
        let cache = LookupCache::open_in_memory().unwrap();
        for brand in ["Tylenol", "Advil", "Motrin", "Benadryl"] {
            assert!(cache.save(&entry(brand)));
        }

        let suggestions = cache.suggest_brands("tylenl", 3).unwrap();
        assert_eq!(suggestions.first().map(String::as_str), Some("Tylenol"));
        assert!(!suggestions.contains(&"Advil".to_string()));
        assert!(cache.suggest_brands("  ", 3).unwrap().is_empty());
    }
}
