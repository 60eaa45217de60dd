//! Lookup cache database operations.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};

use super::{Database, DbError, DbResult};
use crate::models::{CacheEntry, Product};

/// Durable payload stored per brand.
///
/// Older caches stored a bare list of product names; those still load, with
/// no generic name and no identifiers.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredPayload {
    // Tried first: a struct variant would also accept a JSON array positionally.
    Legacy(Vec<String>),
    Entry {
        #[serde(default)]
        generic_name: Option<String>,
        #[serde(default)]
        products: Vec<Product>,
    },
}

impl StoredPayload {
    fn into_entry(self, brand_name: String) -> CacheEntry {
        match self {
            StoredPayload::Entry {
                generic_name,
                products,
            } => CacheEntry::new(brand_name, generic_name, products),
            StoredPayload::Legacy(names) => CacheEntry::new(
                brand_name,
                None,
                names
                    .into_iter()
                    .filter(|name| !name.trim().is_empty())
                    .map(Product::from_legacy_name)
                    .collect(),
            ),
        }
    }
}

/// Summary counts for the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub products: usize,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

const UPSERT_ENTRY: &str = r#"
    INSERT INTO lookup_cache (brand_key, brand_name, payload, cached_at)
    VALUES (?1, ?2, ?3, datetime('now'))
    ON CONFLICT(brand_key) DO UPDATE SET
        brand_name = excluded.brand_name,
        payload = excluded.payload,
        cached_at = datetime('now')
"#;

/// SQLite `datetime('now')` text (UTC, no zone suffix).
fn parse_sqlite_time(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|t| t.and_utc())
}

/// Case-insensitive cache key for a brand name.
pub fn cache_key(brand_name: &str) -> String {
    brand_name.trim().to_lowercase()
}

impl Database {
    /// Insert or replace the entry for a brand (case-insensitive key).
    ///
    /// The entry's casing becomes the stored canonical name.
    pub fn upsert_cache_entry(&self, entry: &CacheEntry) -> DbResult<()> {
        let key = cache_key(&entry.brand_name);
        if key.is_empty() {
            return Err(DbError::Constraint("brand name must not be blank".into()));
        }
        if entry.products.iter().any(|p| p.name.is_empty()) {
            return Err(DbError::Constraint(format!(
                "product with empty name for brand '{}'",
                entry.brand_name
            )));
        }

        let payload = serde_json::to_string(&StoredPayload::Entry {
            generic_name: entry.generic_name.clone(),
            products: entry.products.clone(),
        })?;

        self.conn.execute(
            UPSERT_ENTRY,
            params![key, entry.brand_name.trim(), payload],
        )?;
        Ok(())
    }

    /// Get the entry for a brand, matching any casing.
    pub fn get_cache_entry(&self, brand_name: &str) -> DbResult<Option<CacheEntry>> {
        let row = self
            .conn
            .query_row(
                "SELECT brand_name, payload FROM lookup_cache WHERE brand_key = ?1",
                params![cache_key(brand_name)],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match row {
            Some((stored_name, payload)) => {
                let payload: StoredPayload = serde_json::from_str(&payload)?;
                Ok(Some(payload.into_entry(stored_name)))
            }
            None => Ok(None),
        }
    }

    /// Remove every cache entry. Returns the number removed.
    pub fn clear_cache(&self) -> DbResult<usize> {
        Ok(self.conn.execute("DELETE FROM lookup_cache", [])?)
    }

    /// All cached brand names, in their stored casing.
    pub fn list_cached_brands(&self) -> DbResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT brand_name FROM lookup_cache ORDER BY brand_key")?;
        let brands = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(brands)
    }

    /// Entry and product counts.
    pub fn cache_stats(&self) -> DbResult<CacheStats> {
        let (entries, oldest_entry, newest_entry): (i64, Option<String>, Option<String>) =
            self.conn.query_row(
                "SELECT COUNT(*), MIN(cached_at), MAX(cached_at) FROM lookup_cache",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        let mut stmt = self.conn.prepare("SELECT brand_name, payload FROM lookup_cache")?;
        let mut products = 0;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (brand_name, payload) = row?;
            let payload: StoredPayload = serde_json::from_str(&payload)?;
            products += payload.into_entry(brand_name).products.len();
        }

        Ok(CacheStats {
            entries: entries as usize,
            products,
            oldest_entry: oldest_entry.as_deref().and_then(parse_sqlite_time),
            newest_entry: newest_entry.as_deref().and_then(parse_sqlite_time),
        })
    }

    /// Bulk-load a JSON mapping file (`{brand: payload}`) in a single transaction.
    ///
    /// Accepts both payload shapes; entries are re-written in the current shape.
    /// Brands without a name or without products are skipped. Returns the number of brands imported.
    pub fn import_cache_json<P: AsRef<Path>>(&mut self, path: P) -> DbResult<usize> {
        let raw = std::fs::read_to_string(path)?;
        if raw.trim().is_empty() {
            return Ok(0);
        }
        let mapping: BTreeMap<String, StoredPayload> = serde_json::from_str(&raw)?;

        let tx = self.transaction()?;
        let mut imported = 0;
        for (brand_name, payload) in mapping {
            let entry = payload.into_entry(brand_name);
            let key = cache_key(&entry.brand_name);
            if key.is_empty() || entry.products.is_empty() {
                continue;
            }
            let payload = serde_json::to_string(&StoredPayload::Entry {
                generic_name: entry.generic_name.clone(),
                products: entry.products,
            })?;
            tx.execute(
                UPSERT_ENTRY,
                params![key, entry.brand_name.trim(), payload],
            )?;
            imported += 1;
        }
        tx.commit()?;
        Ok(imported)
    }
}
