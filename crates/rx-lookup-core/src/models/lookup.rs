//! Lookup request and outcome models.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Product;

/// Normalized record handed over by the OCR/NER collaborator.
///
/// Units are already resolved to kilograms and years.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LookupRequest {
    /// Brand name as extracted (e.g., "Tylenol")
    pub brand_name: String,
    /// Strength as written (e.g., "500mg")
    pub dosage: Option<String>,
    /// Route of administration (e.g., "oral")
    pub route: Option<String>,
    /// Dose form (e.g., "tablet")
    pub form: Option<String>,
    /// Patient weight in kilograms
    pub weight_kg: Option<f64>,
    /// Patient age in whole years
    pub age_years: Option<u32>,
    /// Explicit adult reference dose; parsed from `dosage` when absent
    #[serde(default)]
    pub adult_dose_mg: Option<f64>,
    /// Patient height, enables the body-surface-area estimate
    #[serde(default)]
    pub height_cm: Option<f64>,
}

impl LookupRequest {
    /// Create a request for a bare brand name.
    pub fn new(brand_name: impl Into<String>) -> Self {
        Self {
            brand_name: brand_name.into(),
            ..Default::default()
        }
    }

    /// True iff at least one refinement field is non-blank.
    pub fn user_was_specific(&self) -> bool {
        [&self.dosage, &self.route, &self.form]
            .iter()
            .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

/// A cached (or freshly fetched) brand resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    /// Brand name with the casing used when it was last written
    pub brand_name: String,
    /// Ingredient-level name (e.g., "acetaminophen")
    pub generic_name: Option<String>,
    /// Products for this brand; non-empty for entries written after a network fetch
    pub products: Vec<Product>,
}

impl CacheEntry {
    /// Create a new entry.
    pub fn new(brand_name: impl Into<String>, generic_name: Option<String>, products: Vec<Product>) -> Self {
        Self {
            brand_name: brand_name.into(),
            generic_name,
            products,
        }
    }
}

/// Where a lookup result came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum LookupSource {
    /// Blank brand name, rejected before any I/O
    InvalidInput,
    /// Served from the local cache under the given (trimmed) name
    Cache(String),
    /// Fetched from the remote catalog and written through to the cache
    Api,
    /// Remote catalog had no products
    NotFound,
}

impl LookupSource {
    /// Whether this outcome carries products.
    pub fn is_found(&self) -> bool {
        matches!(self, LookupSource::Cache(_) | LookupSource::Api)
    }
}

impl fmt::Display for LookupSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupSource::InvalidInput => write!(f, "invalid_input"),
            LookupSource::Cache(name) => write!(f, "cache:{}", name),
            LookupSource::Api => write!(f, "api"),
            LookupSource::NotFound => write!(f, "not_found"),
        }
    }
}

/// Result of resolving a brand name to products.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LookupOutcome {
    pub products: Vec<Product>,
    pub source: LookupSource,
    pub generic_name: Option<String>,
}

impl LookupOutcome {
    /// Outcome with no products.
    pub fn empty(source: LookupSource) -> Self {
        Self {
            products: Vec::new(),
            source,
            generic_name: None,
        }
    }
}
