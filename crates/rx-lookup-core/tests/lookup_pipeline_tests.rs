//! Golden scenarios for the full lookup pipeline.
//!
//! Catalog and label sources are in-process fakes; the cache is real SQLite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rx_lookup_core::models::{
    CacheEntry, Confidence, DosageSource, DrugLabel, LookupRequest, LookupSource, MatchType, Product, TermType,
    WarningLevel,
};
use rx_lookup_core::remote::{LabelSource, ProductCatalog};
use rx_lookup_core::resolver::{LookupCache, LookupService, ProductMatcher};
use rx_lookup_core::RxLookup;

/// Catalog fake that counts calls.
#[derive(Default)]
struct FakeCatalog {
    entries: HashMap<String, CacheEntry>,
    calls: AtomicUsize,
}

impl FakeCatalog {
    fn with(mut self, entry: CacheEntry) -> Self {
        self.entries.insert(entry.brand_name.to_lowercase(), entry);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductCatalog for FakeCatalog {
    async fn fetch_products(&self, brand_name: &str) -> Option<CacheEntry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entries.get(&brand_name.to_lowercase()).cloned()
    }
}

#[derive(Default)]
struct FakeLabels {
    labels: HashMap<String, DrugLabel>,
}

#[async_trait]
impl LabelSource for FakeLabels {
    async fn fetch_label(&self, brand_name: &str, _generic_name: Option<&str>) -> Option<DrugLabel> {
        self.labels.get(&brand_name.to_lowercase()).cloned()
    }
}

fn tylenol() -> CacheEntry {
    CacheEntry::new(
        "Tylenol",
        Some("acetaminophen".into()),
        vec![
            Product::new("Tylenol 325 MG Oral Tablet", "209387", TermType::BrandedDrug),
            Product::new("Tylenol 500 MG Oral Tablet", "209459", TermType::BrandedDrug),
        ],
    )
}

fn benadryl() -> CacheEntry {
    CacheEntry::new(
        "Benadryl",
        Some("diphenhydramine".into()),
        vec![Product::new("Benadryl 25 MG Oral Capsule", "1049630", TermType::BrandedDrug)],
    )
}

fn benadryl_label() -> DrugLabel {
    DrugLabel {
        purpose: Some("Antihistamine".into()),
        dosage_and_administration: Some(
            "adults and children 12 years and over: 1 to 2 capsules. Not recommended for children under 2 years of age."
                .into(),
        ),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_tylenol_strength_refines_to_exact() {
    let catalog = Arc::new(FakeCatalog::default().with(tylenol()));
    let service = LookupService::new(
        LookupCache::open_in_memory().unwrap(),
        catalog.clone(),
        ProductMatcher::default(),
    );

    let outcome = service.resolve("Tylenol").await;
    assert_eq!(outcome.source, LookupSource::Api);

    let matcher = service.matcher();
    let refined = matcher.refine(&outcome.products, Some("500mg"), None, None);
    let names: Vec<&str> = refined.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Tylenol 500 MG Oral Tablet"]);

    let result = matcher.evaluate(&outcome.products, &refined, true);
    assert_eq!(result.match_type, MatchType::Exact);
    assert_eq!(result.best_match.unwrap().external_id, "209459");
}

#[tokio::test]
async fn test_second_resolve_served_from_cache() {
    let catalog = Arc::new(FakeCatalog::default().with(tylenol()));
    let service = LookupService::new(
        LookupCache::open_in_memory().unwrap(),
        catalog.clone(),
        ProductMatcher::default(),
    );

    let first = service.resolve("tylenol").await;
    assert_eq!(first.source.to_string(), "api");

    let second = service.resolve("Tylenol").await;
    assert_eq!(second.source.to_string(), "cache:Tylenol");
    assert_eq!(second.generic_name.as_deref(), Some("acetaminophen"));
    assert_eq!(second.products, first.products);
    assert_eq!(catalog.calls(), 1);
}

#[tokio::test]
async fn test_cache_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lookup_cache.db");

    {
        let catalog = Arc::new(FakeCatalog::default().with(tylenol()));
        let service = LookupService::new(LookupCache::open(&path).unwrap(), catalog, ProductMatcher::default());
        assert_eq!(service.resolve("Tylenol").await.source, LookupSource::Api);
    }

    let catalog = Arc::new(FakeCatalog::default());
    let service = LookupService::new(
        LookupCache::open(&path).unwrap(),
        catalog.clone(),
        ProductMatcher::default(),
    );
    let outcome = service.resolve("TYLENOL").await;

    assert_eq!(outcome.source, LookupSource::Cache("TYLENOL".into()));
    assert_eq!(outcome.products.len(), 2);
    assert_eq!(catalog.calls(), 0);
}

#[tokio::test]
async fn test_legacy_cache_file_is_served() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("cached_labels.json");
    std::fs::write(
        &json_path,
        r#"{"Advil": ["Advil 200 MG Oral Tablet", "Advil 200 MG Oral Capsule"]}"#,
    )
    .unwrap();

    let cache = LookupCache::open_in_memory().unwrap();
    assert_eq!(cache.import_legacy_json(&json_path).unwrap(), 1);

    let catalog = Arc::new(FakeCatalog::default());
    let service = LookupService::new(cache, catalog.clone(), ProductMatcher::default());
    let outcome = service.resolve("advil").await;

    assert_eq!(outcome.source, LookupSource::Cache("advil".into()));
    assert_eq!(outcome.generic_name, None);
    assert_eq!(outcome.products[1].name, "Advil 200 MG Oral Capsule");
    assert_eq!(catalog.calls(), 0);

    let request = LookupRequest {
        form: Some("caps".into()),
        ..LookupRequest::new("advil")
    };
    let result = service.evaluate(&outcome.products, &request);
    assert_eq!(result.match_type, MatchType::Exact);
}

#[tokio::test]
async fn test_empty_legacy_entry_falls_through_to_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let json_path = dir.path().join("cached_labels.json");
    std::fs::write(&json_path, r#"{"Advil": [], "Tylenol": [""]}"#).unwrap();

    let cache = LookupCache::open_in_memory().unwrap();
    assert_eq!(cache.import_legacy_json(&json_path).unwrap(), 0);

    let advil = CacheEntry::new(
        "Advil",
        Some("ibuprofen".into()),
        vec![Product::new("Advil 200 MG Oral Tablet", "731533", TermType::BrandedDrug)],
    );
    let catalog = Arc::new(FakeCatalog::default().with(advil));
    let service = LookupService::new(cache, catalog.clone(), ProductMatcher::default());

    let outcome = service.resolve("Advil").await;
    assert_eq!(outcome.source, LookupSource::Api);
    assert_eq!(outcome.products.len(), 1);
    assert_eq!(catalog.calls(), 1);

    assert_eq!(service.resolve("Tylenol").await.source, LookupSource::NotFound);
}

#[tokio::test]
async fn test_restricted_label_wins_over_adult_dose() {
    let mut labels = FakeLabels::default();
    labels.labels.insert("benadryl".into(), benadryl_label());
    let rx = RxLookup::with_sources(
        LookupCache::open_in_memory().unwrap(),
        Arc::new(FakeCatalog::default().with(benadryl())),
        Arc::new(labels),
        ProductMatcher::default(),
    );

    let request = LookupRequest {
        adult_dose_mg: Some(50.0),
        weight_kg: Some(20.0),
        age_years: Some(6),
        ..LookupRequest::new("Benadryl")
    };
    let report = rx.process(&request).await;

    assert_eq!(report.match_result.match_type, MatchType::Vague);
    let dosage = report.dosage.unwrap();
    assert_eq!(dosage.source(), DosageSource::OfficialLabel);
    assert_eq!(dosage.confidence(), Confidence::High);
    assert!(dosage.warnings.iter().any(|w| w.level == WarningLevel::Critical));
    assert!(dosage.calculated_details().is_none());
}

#[tokio::test]
async fn test_formula_fallback_without_label() {
    let rx = RxLookup::with_sources(
        LookupCache::open_in_memory().unwrap(),
        Arc::new(FakeCatalog::default().with(tylenol())),
        Arc::new(FakeLabels::default()),
        ProductMatcher::default(),
    );

    let request = LookupRequest {
        adult_dose_mg: Some(100.0),
        weight_kg: Some(35.0),
        ..LookupRequest::new("Tylenol")
    };
    let report = rx.process(&request).await;

    let dosage = report.dosage.unwrap();
    assert_eq!(dosage.source(), DosageSource::CalculatedEstimate);
    assert_eq!(dosage.confidence(), Confidence::Low);
    let details = dosage.calculated_details().unwrap();
    assert_eq!(details.recommended_dose_mg, 50.0);
    assert_eq!(details.clarks_rule.dose_mg, 50.0);
    assert!(details.youngs_rule.is_none());
    assert_eq!(dosage.warnings[0].level, WarningLevel::Critical);
}

#[tokio::test]
async fn test_out_of_range_weight_is_unavailable() {
    let rx = RxLookup::with_sources(
        LookupCache::open_in_memory().unwrap(),
        Arc::new(FakeCatalog::default().with(tylenol())),
        Arc::new(FakeLabels::default()),
        ProductMatcher::default(),
    );

    let request = LookupRequest {
        dosage: Some("500mg".into()),
        weight_kg: Some(250.0),
        ..LookupRequest::new("Tylenol")
    };
    let report = rx.process(&request).await;

    assert!(report.match_result.is_exact());
    let dosage = report.dosage.unwrap();
    assert_eq!(dosage.source(), DosageSource::Unavailable);
    assert_eq!(dosage.confidence(), Confidence::None);
    assert!(dosage.dosing_details().is_none());
    assert!(dosage.calculation_error.is_some());
}

#[tokio::test]
async fn test_invalid_and_unknown_brands() {
    let catalog = Arc::new(FakeCatalog::default());
    let rx = RxLookup::with_sources(
        LookupCache::open_in_memory().unwrap(),
        catalog.clone(),
        Arc::new(FakeLabels::default()),
        ProductMatcher::default(),
    );

    let blank = rx.process(&LookupRequest::new("  ")).await;
    assert_eq!(blank.source, "invalid_input");

    let unknown = rx.process(&LookupRequest::new("Zzyzx")).await;
    assert_eq!(unknown.source, "not_found");
    assert!(unknown.dosage.is_none());

    assert_eq!(catalog.calls(), 1);
}
