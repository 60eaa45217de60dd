//! Refinement term normalizer.
//!
//! Handles:
//! - Route canonicalization (po, by mouth → oral; iv → intravenous)
//! - Dose-form canonicalization (tab → tablet, susp → suspension)
//! - Dose strength parsing with unit conversion (g/mcg → mg)

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

static STRENGTH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(mcg|µg|ug|micrograms?|mg|milligrams?|g|grams?)?\b")
        .expect("strength pattern is a valid literal")
});

/// Normalizer for the user's dosage/route/form refinement fields.
pub struct Normalizer {
    /// Spoken or abbreviated term → catalog vocabulary
    term_aliases: HashMap<String, String>,
    /// Mass unit → milligram multiplier
    unit_to_mg: HashMap<String, f64>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Create a new normalizer with default mappings.
    pub fn new() -> Self {
        Self {
            term_aliases: Self::default_term_aliases(),
            unit_to_mg: Self::default_unit_conversions(),
        }
    }

    /// Lower-case, trim and collapse whitespace, then map aliases.
    ///
    /// Whole phrases are tried first ("by mouth"), then single words.
    pub fn canonicalize_term(&self, term: &str) -> String {
        let collapsed = term.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        if let Some(canonical) = self.term_aliases.get(&collapsed) {
            return canonical.clone();
        }
        collapsed
            .split(' ')
            .map(|word| self.term_aliases.get(word).map(String::as_str).unwrap_or(word))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Single search string from the non-blank refinement fields, in
    /// dosage, route, form order. `None` when every field is blank.
    pub fn search_terms(&self, dosage: Option<&str>, route: Option<&str>, form: Option<&str>) -> Option<String> {
        let parts: Vec<String> = [dosage, route, form]
            .into_iter()
            .flatten()
            .filter(|field| !field.trim().is_empty())
            .map(|field| self.canonicalize_term(field))
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// First strength in a dosage string, in milligrams.
    ///
    /// A bare number is taken as milligrams. `None` for text without a
    /// positive number.
    pub fn parse_dose_mg(&self, dosage: &str) -> Option<f64> {
        let captures = STRENGTH_PATTERN.captures(dosage)?;
        let value: f64 = captures.get(1)?.as_str().parse().ok()?;
        let multiplier = match captures.get(2) {
            Some(unit) => *self.unit_to_mg.get(&unit.as_str().to_lowercase())?,
            None => 1.0,
        };
        let dose = value * multiplier;
        (dose > 0.0).then_some(dose)
    }

    /// Add a custom term mapping.
    pub fn add_alias(&mut self, alias: &str, canonical: &str) {
        self.term_aliases
            .insert(alias.trim().to_lowercase(), canonical.trim().to_lowercase());
    }

    fn default_term_aliases() -> HashMap<String, String> {
        let mut map = HashMap::new();

        // Oral
        map.insert("po".into(), "oral".into());
        map.insert("orally".into(), "oral".into());
        map.insert("by mouth".into(), "oral".into());
        map.insert("per os".into(), "oral".into());

        // Parenteral
        map.insert("iv".into(), "intravenous".into());
        map.insert("i.v.".into(), "intravenous".into());
        map.insert("intravenously".into(), "intravenous".into());
        map.insert("im".into(), "intramuscular".into());
        map.insert("i.m.".into(), "intramuscular".into());
        map.insert("intramuscularly".into(), "intramuscular".into());
        map.insert("sq".into(), "subcutaneous".into());
        map.insert("subq".into(), "subcutaneous".into());
        map.insert("sub-q".into(), "subcutaneous".into());
        map.insert("sc".into(), "subcutaneous".into());
        map.insert("subcutaneously".into(), "subcutaneous".into());

        // Other routes
        map.insert("topically".into(), "topical".into());
        map.insert("rectally".into(), "rectal".into());
        map.insert("pr".into(), "rectal".into());
        map.insert("nasal".into(), "nasal".into());
        map.insert("intranasal".into(), "nasal".into());
        map.insert("eye".into(), "ophthalmic".into());
        map.insert("ear".into(), "otic".into());

        // Dose forms
        map.insert("tab".into(), "tablet".into());
        map.insert("tabs".into(), "tablet".into());
        map.insert("tablets".into(), "tablet".into());
        map.insert("cap".into(), "capsule".into());
        map.insert("caps".into(), "capsule".into());
        map.insert("capsules".into(), "capsule".into());
        map.insert("caplet".into(), "tablet".into());
        map.insert("caplets".into(), "tablet".into());
        map.insert("susp".into(), "suspension".into());
        map.insert("liquid".into(), "solution".into());
        map.insert("syrup".into(), "solution".into());
        map.insert("chewable".into(), "chewable tablet".into());
        map.insert("inj".into(), "injection".into());
        map.insert("injectable".into(), "injection".into());

        map
    }

    fn default_unit_conversions() -> HashMap<String, f64> {
        let mut map = HashMap::new();

        map.insert("mg".into(), 1.0);
        map.insert("milligram".into(), 1.0);
        map.insert("milligrams".into(), 1.0);
        map.insert("g".into(), 1000.0);
        map.insert("gram".into(), 1000.0);
        map.insert("grams".into(), 1000.0);
        map.insert("mcg".into(), 0.001);
        map.insert("µg".into(), 0.001);
        map.insert("ug".into(), 0.001);
        map.insert("microgram".into(), 0.001);
        map.insert("micrograms".into(), 0.001);

        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_term() {
        let normalizer = Normalizer::new();

        assert_eq!(normalizer.canonicalize_term("PO"), "oral");
        assert_eq!(normalizer.canonicalize_term("  By   Mouth "), "oral");
        assert_eq!(normalizer.canonicalize_term("IV"), "intravenous");
        assert_eq!(normalizer.canonicalize_term("Tabs"), "tablet");
        assert_eq!(normalizer.canonicalize_term("oral susp"), "oral suspension");

        // Unknown terms pass through lowercase
        assert_eq!(normalizer.canonicalize_term("Extended Release"), "extended release");
    }

    #[test]
    fn test_search_terms() {
        let normalizer = Normalizer::new();

        assert_eq!(
            normalizer.search_terms(Some("500MG"), Some(" po "), Some("tab")).as_deref(),
            Some("500mg oral tablet")
        );
        assert_eq!(
            normalizer.search_terms(Some(""), None, Some("capsule")).as_deref(),
            Some("capsule")
        );
        assert_eq!(normalizer.search_terms(None, Some("  "), None), None);
    }

    #[test]
    fn test_parse_dose_mg() {
        let normalizer = Normalizer::new();

        assert_eq!(normalizer.parse_dose_mg("500mg"), Some(500.0));
        assert_eq!(normalizer.parse_dose_mg("200 MG tablet"), Some(200.0));
        assert_eq!(normalizer.parse_dose_mg("1 g"), Some(1000.0));
        assert_eq!(normalizer.parse_dose_mg("250mcg"), Some(0.25));
        assert_eq!(normalizer.parse_dose_mg("325"), Some(325.0));
        assert_eq!(normalizer.parse_dose_mg("extra strength"), None);
        assert_eq!(normalizer.parse_dose_mg("0mg"), None);
    }

    #[test]
    fn test_custom_alias() {
        let mut normalizer = Normalizer::new();
        normalizer.add_alias("ER", "extended release");

        assert_eq!(normalizer.canonicalize_term("er"), "extended release");
    }
}
