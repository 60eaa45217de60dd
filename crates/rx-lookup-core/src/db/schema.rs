//! SQLite schema definition.

/// Complete database schema for the lookup cache.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Lookup Cache
-- ============================================================================

CREATE TABLE IF NOT EXISTS lookup_cache (
    brand_key TEXT PRIMARY KEY,                   -- trimmed, lower-cased brand name
    brand_name TEXT NOT NULL,                     -- casing of the most recent write
    payload TEXT NOT NULL,                        -- JSON: {generic_name, products} or legacy ["name", ...]
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_lookup_cache_cached_at ON lookup_cache(cached_at);
"#;
