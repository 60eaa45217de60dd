//! Catalog product models.

use serde::{Deserialize, Serialize};

/// Catalog term types that represent dispensable products.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TermType {
    /// Branded drug with strength and form (SBD)
    BrandedDrug,
    /// Brand name only (BN)
    BrandName,
    /// Generic clinical drug with strength and form (SCD)
    ClinicalDrug,
    /// Branded or generic pack (BPCK / GPCK)
    Pack,
}

impl TermType {
    /// Map a catalog TTY code to a dispensable term type.
    ///
    /// Ingredient-level and component codes return `None` and are skipped.
    pub fn from_tty(code: &str) -> Option<Self> {
        match code {
            "SBD" => Some(TermType::BrandedDrug),
            "BN" => Some(TermType::BrandName),
            "SCD" => Some(TermType::ClinicalDrug),
            "BPCK" | "GPCK" => Some(TermType::Pack),
            _ => None,
        }
    }
}

/// A single catalog product.
///
/// Identity is `(name, external_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Display name (e.g., "Tylenol 500 MG Oral Tablet")
    pub name: String,
    /// Catalog concept identifier (RXCUI)
    #[serde(default)]
    pub external_id: String,
    /// Term type; absent for entries migrated from the legacy list-of-names shape
    #[serde(default)]
    pub term_type: Option<TermType>,
    /// Package-level identifier codes (NDCs)
    #[serde(default)]
    pub ndc_codes: Vec<String>,
}

impl Product {
    /// Create a new product with no identifier codes yet.
    pub fn new(name: impl Into<String>, external_id: impl Into<String>, term_type: TermType) -> Self {
        Self {
            name: name.into(),
            external_id: external_id.into(),
            term_type: Some(term_type),
            ndc_codes: Vec::new(),
        }
    }

    /// Build a product from a bare legacy cache name.
    pub fn from_legacy_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            external_id: String::new(),
            term_type: None,
            ndc_codes: Vec::new(),
        }
    }

    /// First identifier code, if any.
    pub fn primary_ndc(&self) -> Option<&str> {
        self.ndc_codes.first().map(String::as_str)
    }

    /// Whether two products share identity.
    pub fn same_identity(&self, other: &Product) -> bool {
        self.name == other.name && self.external_id == other.external_id
    }
}
