//! Rx-Lookup Core Library
//!
//! Resolves an extracted medication name to concrete catalog products and
//! decides which pediatric dosage guidance, if any, is safe to present.
//!
//! # Architecture
//!
//! ```text
//! {brand_name, dosage, route, form, weight_kg, age_years}   (from OCR/NER)
//!                          │
//!                          ▼
//!               ┌─────────────────────┐   miss   ┌──────────────────┐
//!               │  LookupCache (SQL)  │ ───────► │  RxNav catalog   │
//!               │  case-insensitive   │ ◄─────── │  + NDC fan-out   │
//!               └──────────┬──────────┘  write   └──────────────────┘
//!                          │ products + generic name
//!                          ▼
//!                  ProductMatcher: refine → Exact | Multiple | None | Vague
//!                          │
//!                          ▼
//!               ┌─────────────────────┐
//!               │    DosageArbiter    │  openFDA label  >  formula estimate  >  unavailable
//!               └──────────┬──────────┘
//!                          ▼
//!                     LookupReport
//! ```
//!
//! # Core Principle
//!
//! **An official label always outranks a formula.** Formula estimates are only
//! surfaced when no label dosing text exists, and always carry a critical warning.
//!
//! # Modules
//!
//! - [`config`]: TOML configuration
//! - [`db`]: SQLite cache storage
//! - [`dosage`]: Pediatric formulas and the label-versus-formula arbiter
//! - [`models`]: Domain types (Product, CacheEntry, MatchResult, DosageInfo, etc.)
//! - [`remote`]: RxNav and openFDA clients with retry/backoff
//! - [`resolver`]: Cache handle, lookup service, normalizer and matcher
//! - [`telemetry`]: Tracing subscriber setup

pub mod config;
pub mod db;
pub mod dosage;
pub mod models;
pub mod remote;
pub mod resolver;
pub mod telemetry;

// Re-export commonly used types
pub use config::LookupConfig;
pub use db::Database;
pub use dosage::{DosageArbiter, DosageCalculator, DosageRequest};
pub use models::{
    CacheEntry, DosageInfo, DosageSource, LookupOutcome, LookupRequest, LookupSource, MatchResult,
    MatchType, Product,
};
pub use remote::{LabelSource, OpenFdaClient, ProductCatalog, RxNormClient};
pub use resolver::{LookupCache, LookupService, ProductMatcher};

use std::sync::Arc;

use serde::Serialize;

use models::PatientContext;

// =========================================================================
// Error Type
// =========================================================================

#[derive(Debug, thiserror::Error)]
pub enum RxLookupError {
    #[error("Database error: {0}")]
    Database(#[from] db::DbError),

    #[error("Remote error: {0}")]
    Remote(#[from] remote::RemoteError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] dosage::ValidationError),
}

pub type RxLookupResult<T> = Result<T, RxLookupError>;

// =========================================================================
// Report
// =========================================================================

/// Everything the request-handling layer needs for one input record.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LookupReport {
    /// Trimmed brand name as looked up
    pub brand_name: String,
    /// `cache:<name>`, `api`, `not_found` or `invalid_input`
    pub source: String,
    pub generic_name: Option<String>,
    /// Every product for the brand
    pub products: Vec<Product>,
    pub match_result: MatchResult,
    /// Present only when products were found
    pub dosage: Option<DosageInfo>,
}

impl LookupReport {
    pub fn found(&self) -> bool {
        !self.products.is_empty()
    }
}

// =========================================================================
// Main API Object
// =========================================================================

/// Lookup service plus dosage arbiter, constructed once and shared.
pub struct RxLookup {
    service: Arc<LookupService>,
    arbiter: DosageArbiter,
}

impl RxLookup {
    pub fn new(service: Arc<LookupService>, arbiter: DosageArbiter) -> Self {
        Self { service, arbiter }
    }

    /// Assemble from explicit collaborators (fakes in tests).
    pub fn with_sources(
        cache: LookupCache,
        catalog: Arc<dyn ProductCatalog>,
        labels: Arc<dyn LabelSource>,
        matcher: ProductMatcher,
    ) -> Self {
        let service = Arc::new(LookupService::new(cache, catalog, matcher));
        Self::new(service, DosageArbiter::new(labels))
    }

    /// Open the on-disk cache and build the RxNav and openFDA clients.
    ///
    /// Does not install a tracing subscriber; see [`telemetry::init_tracing`].
    pub fn open(config: &LookupConfig) -> RxLookupResult<Self> {
        config.validate()?;

        let cache = LookupCache::open(&config.cache_path)?;
        let catalog = RxNormClient::new(&config.catalog, &config.http)?;
        let labels = OpenFdaClient::new(&config.label, &config.http)?;

        tracing::info!(cache = %config.cache_path.display(), "rx-lookup: opened");
        Ok(Self::with_sources(
            cache,
            Arc::new(catalog),
            Arc::new(labels),
            ProductMatcher::from_config(&config.matcher),
        ))
    }

    /// In-memory cache with the default remote clients.
    pub fn open_in_memory(config: &LookupConfig) -> RxLookupResult<Self> {
        config.validate()?;
        Ok(Self::with_sources(
            LookupCache::open_in_memory()?,
            Arc::new(RxNormClient::new(&config.catalog, &config.http)?),
            Arc::new(OpenFdaClient::new(&config.label, &config.http)?),
            ProductMatcher::from_config(&config.matcher),
        ))
    }

    pub fn service(&self) -> &Arc<LookupService> {
        &self.service
    }

    pub fn arbiter(&self) -> &DosageArbiter {
        &self.arbiter
    }

    /// Resolve, refine, classify and (when products were found) arbitrate dosage.
    pub async fn process(&self, request: &LookupRequest) -> LookupReport {
        let brand_name = request.brand_name.trim().to_string();
        let outcome = self.service.resolve(&brand_name).await;
        let match_result = self.service.evaluate(&outcome.products, request);

        let dosage = if outcome.products.is_empty() {
            None
        } else {
            let adult_dose_mg = request.adult_dose_mg.or_else(|| {
                request
                    .dosage
                    .as_deref()
                    .and_then(|d| self.service.matcher().normalizer().parse_dose_mg(d))
            });
            let dosage_request = DosageRequest {
                brand_name: brand_name.clone(),
                generic_name: outcome.generic_name.clone(),
                adult_dose_mg,
                patient: PatientContext {
                    weight_kg: request.weight_kg,
                    age_years: request.age_years,
                    height_cm: request.height_cm,
                },
            };
            Some(self.arbiter.arbitrate(&dosage_request).await)
        };

        tracing::info!(
            brand = %brand_name,
            source = %outcome.source,
            match_type = ?match_result.match_type,
            dosage_source = ?dosage.as_ref().map(|d| d.source()),
            "rx-lookup: processed record"
        );

        LookupReport {
            brand_name,
            source: outcome.source.to_string(),
            generic_name: outcome.generic_name,
            products: outcome.products,
            match_result,
            dosage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DrugLabel, TermType};
    use async_trait::async_trait;

    struct OneBrand;

    #[async_trait]
    impl ProductCatalog for OneBrand {
        async fn fetch_products(&self, brand_name: &str) -> Option<CacheEntry> {
            (brand_name.eq_ignore_ascii_case("motrin")).then(|| {
                CacheEntry::new(
                    brand_name,
                    Some("ibuprofen".into()),
                    vec![
                        Product::new("Motrin IB 200 MG Oral Tablet", "1", TermType::BrandedDrug),
                        Product::new("Children's Motrin 100 MG per 5 ML Oral Suspension", "2", TermType::BrandedDrug),
                    ],
                )
            })
        }
    }

    struct NoLabels;

    #[async_trait]
    impl LabelSource for NoLabels {
        async fn fetch_label(&self, _brand: &str, _generic: Option<&str>) -> Option<DrugLabel> {
            None
        }
    }

    fn setup() -> RxLookup {
        RxLookup::with_sources(
            LookupCache::open_in_memory().unwrap(),
            Arc::new(OneBrand),
            Arc::new(NoLabels),
            ProductMatcher::default(),
        )
    }

    #[tokio::test]
    async fn test_process_parses_dose_from_dosage_text() {
        let rx = setup();
        let request = LookupRequest {
            brand_name: "Motrin".into(),
            dosage: Some("200mg".into()),
            weight_kg: Some(35.0),
            age_years: Some(10),
            ..Default::default()
        };

        let report = rx.process(&request).await;

        assert_eq!(report.source, "api");
        assert_eq!(report.match_result.match_type, MatchType::Exact);
        let dosage = report.dosage.unwrap();
        assert_eq!(dosage.source(), DosageSource::CalculatedEstimate);
        assert_eq!(dosage.calculated_details().unwrap().recommended_dose_mg, 100.0);
    }

    #[tokio::test]
    async fn test_process_not_found_skips_dosage() {
        let rx = setup();
        let report = rx.process(&LookupRequest::new("Nothingol")).await;

        assert_eq!(report.source, "not_found");
        assert!(!report.found());
        assert!(report.dosage.is_none());
        assert_eq!(report.match_result.match_type, MatchType::Vague);
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let mut config = LookupConfig::default();
        config.http.max_attempts = 0;

        assert!(matches!(
            RxLookup::open_in_memory(&config),
            Err(RxLookupError::Config(_))
        ));
    }
}
