//! Brand-name lookup pipeline.
//!
//! Pipeline: Cache (case-insensitive) → Catalog (on miss, write-through) → Matcher

mod cache;
mod matcher;
mod normalizer;

pub use cache::*;
pub use matcher::*;
pub use normalizer::*;

use std::sync::Arc;

use tokio::task::JoinSet;

use crate::models::{LookupOutcome, LookupRequest, LookupSource, MatchResult, Product};
use crate::remote::ProductCatalog;

/// Brands warmed by [`LookupService::seed_common`].
pub const COMMON_BRANDS: &[&str] = &[
    // Cardiovascular
    "Lipitor", "Crestor", "Plavix", "Lisinopril", "Atorvastatin", "Metoprolol", "Amlodipine",
    "Losartan", "Warfarin",
    // Diabetes
    "Metformin", "Lantus", "Humalog", "Januvia", "Glipizide",
    // Pain and inflammation
    "Advil", "Tylenol", "Aspirin", "Ibuprofen", "Naproxen", "Celebrex", "Tramadol",
    // Respiratory
    "Ventolin", "Advair", "Singulair", "Symbicort", "Albuterol",
    // GI
    "Nexium", "Prilosec", "Zantac", "Omeprazole",
    // Mental health
    "Zoloft", "Prozac", "Lexapro", "Xanax", "Abilify",
    // Antibiotics
    "Amoxicillin", "Azithromycin", "Cipro", "Doxycycline",
];

/// Per-brand result of a cache warm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedStatus {
    /// Already cached, catalog not consulted
    AlreadyCached,
    /// Fetched and written to the cache
    Seeded { products: usize },
    /// Catalog had no products
    NotFound,
    /// Fetched but the cache write failed
    SaveFailed,
    /// Blank brand name
    Skipped,
}

/// Summary of [`LookupService::seed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// One `(brand, status)` pair per requested brand, in request order
    pub results: Vec<(String, SeedStatus)>,
}

impl SeedReport {
    pub fn seeded(&self) -> usize {
        self.count(|s| matches!(s, SeedStatus::Seeded { .. }))
    }

    pub fn already_cached(&self) -> usize {
        self.count(|s| *s == SeedStatus::AlreadyCached)
    }

    /// Brands that were neither cached nor newly seeded.
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, SeedStatus::NotFound | SeedStatus::SaveFailed))
    }

    fn count(&self, pred: impl Fn(&SeedStatus) -> bool) -> usize {
        self.results.iter().filter(|(_, s)| pred(s)).count()
    }
}

/// Resolves brand names to products, cache first.
///
/// Holds no mutable state of its own; every lookup may run concurrently and
/// shares only the cache.
pub struct LookupService {
    cache: LookupCache,
    catalog: Arc<dyn ProductCatalog>,
    matcher: ProductMatcher,
}

impl LookupService {
    pub fn new(cache: LookupCache, catalog: Arc<dyn ProductCatalog>, matcher: ProductMatcher) -> Self {
        Self {
            cache,
            catalog,
            matcher,
        }
    }

    pub fn cache(&self) -> &LookupCache {
        &self.cache
    }

    pub fn matcher(&self) -> &ProductMatcher {
        &self.matcher
    }

    /// Resolve a brand name to its products.
    ///
    /// A cached entry without products counts as a miss. Nothing is cached unless the catalog returned a complete, non-empty entry.
    pub async fn resolve(&self, brand_name: &str) -> LookupOutcome {
        let name = brand_name.trim();
        if name.is_empty() {
            tracing::warn!("lookup: rejected blank brand name");
            return LookupOutcome::empty(LookupSource::InvalidInput);
        }

        if let Some(entry) = self.cache.get(name).filter(|e| !e.products.is_empty()) {
            tracing::info!(brand = name, products = entry.products.len(), "lookup: cache hit");
            return LookupOutcome {
                products: entry.products,
                source: LookupSource::Cache(name.to_string()),
                generic_name: entry.generic_name,
            };
        }

        tracing::info!(brand = name, "lookup: cache miss, querying catalog");
        let Some(entry) = self.catalog.fetch_products(name).await.filter(|e| !e.products.is_empty()) else {
            tracing::info!(brand = name, "lookup: not found");
            return LookupOutcome::empty(LookupSource::NotFound);
        };

        if !self.cache.save(&entry) {
            tracing::warn!(brand = name, "lookup: returning uncached catalog result");
        }
        LookupOutcome {
            products: entry.products,
            source: LookupSource::Api,
            generic_name: entry.generic_name,
        }
    }

    /// Narrow products by the request's dosage, route and form.
    pub fn refine(&self, products: &[Product], request: &LookupRequest) -> Vec<Product> {
        self.matcher.refine(
            products,
            request.dosage.as_deref(),
            request.route.as_deref(),
            request.form.as_deref(),
        )
    }

    /// Refine and classify in one step.
    pub fn evaluate(&self, products: &[Product], request: &LookupRequest) -> MatchResult {
        let refined = self.refine(products, request);
        self.matcher.evaluate(products, &refined, request.user_was_specific())
    }

    /// Warm the cache for several brands concurrently.
    pub async fn seed(self: &Arc<Self>, brands: &[&str]) -> SeedReport {
        let mut tasks = JoinSet::new();
        for (index, brand) in brands.iter().enumerate() {
            let service = Arc::clone(self);
            let brand = brand.trim().to_string();
            tasks.spawn(async move {
                let status = service.seed_one(&brand).await;
                (index, brand, status)
            });
        }

        let mut results: Vec<Option<(String, SeedStatus)>> = vec![None; brands.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, brand, status)) => results[index] = Some((brand, status)),
                Err(e) => tracing::error!(error = %e, "seed: task failed"),
            }
        }

        let report = SeedReport {
            results: results.into_iter().flatten().collect(),
        };
        tracing::info!(
            seeded = report.seeded(),
            already_cached = report.already_cached(),
            failed = report.failed(),
            "seed: complete"
        );
        report
    }

    /// Warm the cache with [`COMMON_BRANDS`].
    pub async fn seed_common(self: &Arc<Self>) -> SeedReport {
        self.seed(COMMON_BRANDS).await
    }

    async fn seed_one(&self, brand: &str) -> SeedStatus {
        if brand.is_empty() {
            return SeedStatus::Skipped;
        }
        if self.cache.get(brand).is_some_and(|e| !e.products.is_empty()) {
            return SeedStatus::AlreadyCached;
        }
        match self.catalog.fetch_products(brand).await {
            Some(entry) if !entry.products.is_empty() => {
                if self.cache.save(&entry) {
                    SeedStatus::Seeded {
                        products: entry.products.len(),
                    }
                } else {
                    SeedStatus::SaveFailed
                }
            }
            _ => SeedStatus::NotFound,
        }
    }
}
