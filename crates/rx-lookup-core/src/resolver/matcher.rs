//! Product matcher: narrows a brand's products to the user's criteria and
//! classifies how specific the result is.
//!
//! Scoring per product:
//! - Each search token is compared against the product name (lower-cased,
//!   spaces removed) using the best-aligned window of normalized Levenshtein
//!   similarity, so "500mg" scores 1.0 against "Tylenol 500 MG Oral Tablet".
//! - A token carrying a number only matches names containing that exact
//!   number as a separate figure; otherwise it scores 0.
//! - The product's score is its weakest token. Products below the threshold
//!   are dropped.

use std::sync::LazyLock;

use regex::Regex;

use super::Normalizer;
use crate::config::MatcherConfig;
use crate::models::{MatchResult, Product};

/// Default similarity cutoff.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.75;

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern is a valid literal"));

/// Fuzzy product filter and match classifier.
pub struct ProductMatcher {
    normalizer: Normalizer,
    threshold: f64,
}

impl Default for ProductMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_MATCH_THRESHOLD)
    }
}

impl ProductMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            normalizer: Normalizer::new(),
            threshold,
        }
    }

    pub fn from_config(config: &MatcherConfig) -> Self {
        Self::new(config.threshold)
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Products matching the refinement fields, best first.
    ///
    /// With no non-blank field the input is returned unchanged.
    pub fn refine(
        &self,
        products: &[Product],
        dosage: Option<&str>,
        route: Option<&str>,
        form: Option<&str>,
    ) -> Vec<Product> {
        let Some(terms) = self.normalizer.search_terms(dosage, route, form) else {
            return products.to_vec();
        };

        let mut scored: Vec<(f64, &Product)> = products
            .iter()
            .map(|product| (score_product(&product.name, &terms), product))
            .filter(|(score, _)| *score >= self.threshold)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        tracing::debug!(
            terms = %terms,
            candidates = products.len(),
            matched = scored.len(),
            "matcher: refined products"
        );
        scored.into_iter().map(|(_, product)| product.clone()).collect()
    }

    /// Classify a refinement. Depends only on `user_was_specific` and the
    /// two set sizes (plus which products to sample).
    pub fn evaluate(&self, full: &[Product], refined: &[Product], user_was_specific: bool) -> MatchResult {
        if !user_was_specific {
            return MatchResult::vague(full);
        }
        match refined {
            [] => MatchResult::none(full),
            [only] => MatchResult::exact(only.clone()),
            many => MatchResult::multiple(many),
        }
    }
}

/// Similarity of a product name to a whitespace-separated search string, in [0, 1].
pub fn score_product(name: &str, terms: &str) -> f64 {
    let lowered = name.to_lowercase();
    // Numbers come from the spaced name so "360 10" stays two numbers.
    let name_numbers: Vec<&str> = NUMBER_PATTERN.find_iter(&lowered).map(|m| m.as_str()).collect();
    let compact: String = lowered.split_whitespace().collect();

    terms
        .split_whitespace()
        .map(|token| {
            let token = token.to_lowercase();
            let numbers_present = NUMBER_PATTERN
                .find_iter(&token)
                .all(|n| name_numbers.contains(&n.as_str()));
            if numbers_present {
                partial_similarity(&token, &compact)
            } else {
                0.0
            }
        })
        .fold(1.0, f64::min)
}

/// Best normalized Levenshtein similarity of the shorter string against any
/// equally long window of the longer one.
fn partial_similarity(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() { (a, b) } else { (b, a) };
    let short_len = short.chars().count();
    if short_len == 0 {
        return 0.0;
    }

    let long_chars: Vec<char> = long.chars().collect();
    long_chars
        .windows(short_len)
        .map(|window| {
            let window: String = window.iter().collect();
            strsim::normalized_levenshtein(short, &window)
        })
        .fold(0.0, f64::max)
}
