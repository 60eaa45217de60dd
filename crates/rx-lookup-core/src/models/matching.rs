//! Product match classification models.

use serde::{Deserialize, Serialize};

use super::Product;

/// Samples shown when the user's refinement narrowed to several products.
pub const MULTIPLE_SAMPLE_SIZE: usize = 5;

/// Samples of the full set shown when refinement was absent or matched nothing.
pub const FALLBACK_SAMPLE_SIZE: usize = 3;

/// How well the refined product set pins down a single product.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Exactly one product matched the user's criteria
    Exact,
    /// Several products matched
    Multiple,
    /// The user was specific but nothing matched
    None,
    /// The user gave no refinement criteria
    Vague,
}

/// Classification of a refinement against the full product set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchResult {
    pub match_type: MatchType,
    /// Set only for `Exact`
    pub best_match: Option<Product>,
    /// At most five products to show the user
    pub sample_products: Vec<Product>,
    pub match_count: usize,
}

impl MatchResult {
    /// A single product matched.
    pub fn exact(product: Product) -> Self {
        Self {
            match_type: MatchType::Exact,
            best_match: Some(product.clone()),
            sample_products: vec![product],
            match_count: 1,
        }
    }

    /// Several products matched.
    pub fn multiple(refined: &[Product]) -> Self {
        Self {
            match_type: MatchType::Multiple,
            best_match: None,
            sample_products: refined.iter().take(MULTIPLE_SAMPLE_SIZE).cloned().collect(),
            match_count: refined.len(),
        }
    }

    /// The user was specific and nothing matched.
    pub fn none(full: &[Product]) -> Self {
        Self {
            match_type: MatchType::None,
            best_match: None,
            sample_products: full.iter().take(FALLBACK_SAMPLE_SIZE).cloned().collect(),
            match_count: 0,
        }
    }

    /// No refinement criteria were supplied.
    pub fn vague(full: &[Product]) -> Self {
        Self {
            match_type: MatchType::Vague,
            best_match: None,
            sample_products: full.iter().take(FALLBACK_SAMPLE_SIZE).cloned().collect(),
            match_count: full.len(),
        }
    }

    /// Whether a single product was identified.
    pub fn is_exact(&self) -> bool {
        self.match_type == MatchType::Exact
    }
}
