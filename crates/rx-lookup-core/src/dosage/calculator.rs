//! Pediatric dose estimation formulas.
//!
//! All functions are pure. Out-of-range input yields a [`ValidationError`]
//! naming the offending field; nothing here panics on bad input.
//!
//! - Clark's rule: `(weight_kg / 70) × adult_dose`
//! - Young's rule: `(age / (age + 12)) × adult_dose`, ages ≤ 18
//! - Fried's rule: `(age_months / 150) × adult_dose`, under 2 years
//! - Mosteller BSA: `sqrt(height_cm × weight_kg / 3600) / 1.73 × adult_dose`

use std::fmt;

use thiserror::Error;

use crate::models::{BsaEstimate, DosageWarning, MethodEstimate, PediatricDosage};

pub const STANDARD_ADULT_WEIGHT_KG: f64 = 70.0;
pub const YOUNGS_RULE_CONSTANT: f64 = 12.0;
pub const FRIEDS_RULE_DIVISOR: f64 = 150.0;
pub const ADULT_BSA_M2: f64 = 1.73;

pub const MIN_WEIGHT_KG: f64 = 2.5;
pub const MAX_WEIGHT_KG: f64 = 200.0;
pub const MAX_AGE_YEARS: u32 = 120;
pub const MIN_HEIGHT_CM: f64 = 30.0;
pub const MAX_HEIGHT_CM: f64 = 250.0;

/// Young's rule applies up to this age.
const YOUNGS_MAX_AGE: u32 = 18;
/// Fried's rule and the infant warning apply below this age.
const INFANT_AGE: u32 = 2;
const FRIEDS_MAX_MONTHS: u32 = 24;
const NEAR_ADULT_AGE: u32 = 12;
const LOW_WEIGHT_KG: f64 = 10.0;

/// Input that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseField {
    AdultDoseMg,
    WeightKg,
    AgeYears,
    AgeMonths,
    HeightCm,
    DosePerKg,
    Unit,
}

impl fmt::Display for DoseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DoseField::AdultDoseMg => "adult_dose_mg",
            DoseField::WeightKg => "weight_kg",
            DoseField::AgeYears => "age_years",
            DoseField::AgeMonths => "age_months",
            DoseField::HeightCm => "height_cm",
            DoseField::DosePerKg => "dose_per_kg",
            DoseField::Unit => "unit",
        };
        f.write_str(name)
    }
}

/// Calculator input out of the accepted range.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: DoseField,
    pub reason: String,
}

impl ValidationError {
    fn new(field: DoseField, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

pub type DoseResult<T> = Result<T, ValidationError>;

/// Units a milligram dose can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoseUnit {
    Mcg,
    Mg,
    G,
}

impl DoseUnit {
    pub fn parse(unit: &str) -> DoseResult<Self> {
        match unit.trim().to_lowercase().as_str() {
            "mcg" | "µg" | "ug" => Ok(DoseUnit::Mcg),
            "mg" => Ok(DoseUnit::Mg),
            "g" => Ok(DoseUnit::G),
            other => Err(ValidationError::new(DoseField::Unit, format!("unsupported unit '{}'", other))),
        }
    }
}

/// Clark's rule. Identity at the 70 kg reference weight.
pub fn clarks_rule(adult_dose_mg: f64, weight_kg: f64) -> DoseResult<f64> {
    validate_adult_dose(adult_dose_mg)?;
    validate_weight(weight_kg)?;
    Ok((weight_kg / STANDARD_ADULT_WEIGHT_KG) * adult_dose_mg)
}

/// Young's rule.
pub fn youngs_rule(adult_dose_mg: f64, age_years: u32) -> DoseResult<f64> {
    validate_adult_dose(adult_dose_mg)?;
    validate_age(age_years)?;
    let age = f64::from(age_years);
    Ok((age / (age + YOUNGS_RULE_CONSTANT)) * adult_dose_mg)
}

/// Fried's rule, infants up to 24 months.
pub fn frieds_rule(adult_dose_mg: f64, age_months: u32) -> DoseResult<f64> {
    validate_adult_dose(adult_dose_mg)?;
    if age_months > FRIEDS_MAX_MONTHS {
        return Err(ValidationError::new(
            DoseField::AgeMonths,
            format!("Fried's rule applies up to {} months, got {}", FRIEDS_MAX_MONTHS, age_months),
        ));
    }
    Ok((f64::from(age_months) / FRIEDS_RULE_DIVISOR) * adult_dose_mg)
}

/// Body surface area in m² (Mosteller).
pub fn body_surface_area(height_cm: f64, weight_kg: f64) -> DoseResult<f64> {
    validate_height(height_cm)?;
    validate_weight(weight_kg)?;
    Ok(((height_cm * weight_kg) / 3600.0).sqrt())
}

/// BSA-scaled dose.
pub fn bsa_dose(adult_dose_mg: f64, height_cm: f64, weight_kg: f64) -> DoseResult<BsaEstimate> {
    validate_adult_dose(adult_dose_mg)?;
    let bsa = body_surface_area(height_cm, weight_kg)?;
    let dose = (bsa / ADULT_BSA_M2) * adult_dose_mg;
    Ok(BsaEstimate {
        bsa_m2: round_to(bsa, 3),
        adult_bsa_m2: ADULT_BSA_M2,
        dose_mg: round_to(dose, 2),
        formula: format!("({:.3} m² / {} m²) × {} mg", bsa, ADULT_BSA_M2, adult_dose_mg),
    })
}

/// Dose from a per-kilogram instruction (e.g., 10 mg/kg for 20 kg = 200 mg).
pub fn dose_from_mg_per_kg(dose_per_kg: f64, weight_kg: f64) -> DoseResult<f64> {
    if !(dose_per_kg.is_finite() && dose_per_kg > 0.0) {
        return Err(ValidationError::new(DoseField::DosePerKg, "must be positive"));
    }
    validate_weight(weight_kg)?;
    Ok(dose_per_kg * weight_kg)
}

/// Convert a milligram dose to another unit.
pub fn convert_dose(dose_mg: f64, unit: DoseUnit) -> f64 {
    match unit {
        DoseUnit::Mcg => dose_mg * 1000.0,
        DoseUnit::Mg => dose_mg,
        DoseUnit::G => dose_mg / 1000.0,
    }
}

/// Runs every applicable formula and produces advisory warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DosageCalculator;

impl DosageCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Full pediatric estimate. Clark's rule is the recommended dose.
    pub fn calculate(
        &self,
        adult_dose_mg: f64,
        weight_kg: Option<f64>,
        age_years: Option<u32>,
        height_cm: Option<f64>,
    ) -> DoseResult<PediatricDosage> {
        let weight_kg = weight_kg
            .ok_or_else(|| ValidationError::new(DoseField::WeightKg, "required for an estimate"))?;
        validate_adult_dose(adult_dose_mg)?;
        validate_weight(weight_kg)?;
        if let Some(age) = age_years {
            validate_age(age)?;
        }
        if let Some(height) = height_cm {
            validate_height(height)?;
        }

        let clarks = MethodEstimate {
            dose_mg: round_to(clarks_rule(adult_dose_mg, weight_kg)?, 2),
            description: "Weight-based calculation".into(),
            formula: format!(
                "({} kg / {} kg) × {} mg",
                weight_kg, STANDARD_ADULT_WEIGHT_KG, adult_dose_mg
            ),
        };

        let youngs = match age_years {
            Some(age) if age <= YOUNGS_MAX_AGE => Some(MethodEstimate {
                dose_mg: round_to(youngs_rule(adult_dose_mg, age)?, 2),
                description: "Age-based calculation".into(),
                formula: format!("({} / ({} + {})) × {} mg", age, age, YOUNGS_RULE_CONSTANT, adult_dose_mg),
            }),
            _ => None,
        };

        let frieds = match age_years {
            Some(age) if age < INFANT_AGE => {
                let months = age * 12;
                Some(MethodEstimate {
                    dose_mg: round_to(frieds_rule(adult_dose_mg, months)?, 2),
                    description: "Infant calculation (< 2 years)".into(),
                    formula: format!("({} months / {}) × {} mg", months, FRIEDS_RULE_DIVISOR, adult_dose_mg),
                })
            }
            _ => None,
        };

        let bsa = height_cm
            .map(|height| bsa_dose(adult_dose_mg, height, weight_kg))
            .transpose()?;

        let recommended_dose_mg = clarks.dose_mg;
        let warnings = advisory_warnings(recommended_dose_mg, weight_kg, age_years);

        Ok(PediatricDosage {
            adult_dose_mg,
            patient_weight_kg: weight_kg,
            patient_age_years: age_years,
            clarks_rule: clarks,
            youngs_rule: youngs,
            frieds_rule: frieds,
            body_surface_area: bsa,
            recommended_dose_mg,
            warnings,
        })
    }
}

fn advisory_warnings(recommended_dose_mg: f64, weight_kg: f64, age_years: Option<u32>) -> Vec<DosageWarning> {
    let mut warnings = vec![DosageWarning::critical(
        "estimate_only",
        "Calculations are estimates only. Consult a healthcare provider before administering any medication.",
    )];

    if weight_kg < LOW_WEIGHT_KG {
        warnings.push(DosageWarning::info(
            "low_weight",
            "Very low weight detected. Infant dosing requires specialist input.",
        ));
    }
    match age_years {
        Some(age) if age < INFANT_AGE => warnings.push(DosageWarning::info(
            "infant",
            "Patient is an infant (< 2 years). Use Fried's rule and consult a pediatrician.",
        )),
        Some(age) if age >= NEAR_ADULT_AGE => warnings.push(DosageWarning::info(
            "near_adult",
            "Patient is approaching adult age. Consider adult dosing or confirm with a physician.",
        )),
        _ => {}
    }
    if recommended_dose_mg < 1.0 {
        warnings.push(DosageWarning::info(
            "small_dose",
            "Calculated dose is very small. Verify with a pharmacist for accuracy.",
        ));
    }

    warnings
}

fn validate_adult_dose(adult_dose_mg: f64) -> DoseResult<()> {
    if adult_dose_mg.is_finite() && adult_dose_mg > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new(DoseField::AdultDoseMg, "must be positive"))
    }
}

fn validate_weight(weight_kg: f64) -> DoseResult<()> {
    if (MIN_WEIGHT_KG..=MAX_WEIGHT_KG).contains(&weight_kg) {
        Ok(())
    } else {
        Err(ValidationError::new(
            DoseField::WeightKg,
            format!("{} kg is outside {}-{} kg", weight_kg, MIN_WEIGHT_KG, MAX_WEIGHT_KG),
        ))
    }
}

fn validate_age(age_years: u32) -> DoseResult<()> {
    if age_years <= MAX_AGE_YEARS {
        Ok(())
    } else {
        Err(ValidationError::new(
            DoseField::AgeYears,
            format!("{} years exceeds {}", age_years, MAX_AGE_YEARS),
        ))
    }
}

fn validate_height(height_cm: f64) -> DoseResult<()> {
    if (MIN_HEIGHT_CM..=MAX_HEIGHT_CM).contains(&height_cm) {
        Ok(())
    } else {
        Err(ValidationError::new(
            DoseField::HeightCm,
            format!("{} cm is outside {}-{} cm", height_cm, MIN_HEIGHT_CM, MAX_HEIGHT_CM),
        ))
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clarks_rule_identity_at_reference_weight() {
        assert_eq!(clarks_rule(325.0, 70.0).unwrap(), 325.0);
        assert_eq!(clarks_rule(100.0, 35.0).unwrap(), 50.0);
    }

    #[test]
    fn test_weight_bounds() {
        assert_eq!(clarks_rule(100.0, 1.0).unwrap_err().field, DoseField::WeightKg);
        assert_eq!(clarks_rule(100.0, 250.0).unwrap_err().field, DoseField::WeightKg);
        assert!(clarks_rule(100.0, 2.5).is_ok());
        assert!(clarks_rule(100.0, 200.0).is_ok());
        assert!(clarks_rule(100.0, f64::NAN).is_err());
    }

    #[test]
    fn test_adult_dose_must_be_positive() {
        let err = clarks_rule(0.0, 20.0).unwrap_err();
        assert_eq!(err.field, DoseField::AdultDoseMg);
        assert_eq!(err.to_string(), "invalid adult_dose_mg: must be positive");
    }

    #[test]
    fn test_youngs_and_frieds() {
        assert!((youngs_rule(120.0, 6).unwrap() - 40.0).abs() < 1e-9);
        assert!((frieds_rule(150.0, 12).unwrap() - 12.0).abs() < 1e-9);
        assert_eq!(frieds_rule(150.0, 30).unwrap_err().field, DoseField::AgeMonths);
        assert_eq!(youngs_rule(100.0, 121).unwrap_err().field, DoseField::AgeYears);
    }

    #[test]
    fn test_bsa() {
        // 120 cm, 30 kg → sqrt(1.0) = 1.0 m²
        let estimate = bsa_dose(173.0, 120.0, 30.0).unwrap();
        assert_eq!(estimate.bsa_m2, 1.0);
        assert_eq!(estimate.dose_mg, 100.0);
        assert_eq!(bsa_dose(100.0, 10.0, 30.0).unwrap_err().field, DoseField::HeightCm);
    }

    #[test]
    fn test_calculate_selects_methods_by_age() {
        let calc = DosageCalculator::new();

        let school_age = calc.calculate(100.0, Some(35.0), Some(8), None).unwrap();
        assert_eq!(school_age.recommended_dose_mg, 50.0);
        assert!(school_age.youngs_rule.is_some());
        assert!(school_age.frieds_rule.is_none());
        assert!(school_age.body_surface_area.is_none());

        let infant = calc.calculate(100.0, Some(9.0), Some(1), Some(75.0)).unwrap();
        assert_eq!(infant.frieds_rule.as_ref().unwrap().dose_mg, 8.0);
        assert!(infant.body_surface_area.is_some());

        let adult = calc.calculate(100.0, Some(70.0), Some(40), None).unwrap();
        assert!(adult.youngs_rule.is_none());
    }

    #[test]
    fn test_calculate_requires_weight() {
        let err = DosageCalculator::new().calculate(100.0, None, Some(5), None).unwrap_err();
        assert_eq!(err.field, DoseField::WeightKg);
    }

    #[test]
    fn test_warnings() {
        let calc = DosageCalculator::new();
        let categories = |d: &PediatricDosage| d.warnings.iter().map(|w| w.category.clone()).collect::<Vec<_>>();

        let infant = calc.calculate(5.0, Some(8.0), Some(1), None).unwrap();
        assert_eq!(categories(&infant), vec!["estimate_only", "low_weight", "infant", "small_dose"]);
        assert!(infant.warnings[0].is_critical());

        let teen = calc.calculate(200.0, Some(45.0), Some(14), None).unwrap();
        assert_eq!(categories(&teen), vec!["estimate_only", "near_adult"]);

        let no_age = calc.calculate(200.0, Some(20.0), None, None).unwrap();
        assert_eq!(categories(&no_age), vec!["estimate_only"]);
    }

    #[test]
    fn test_unit_helpers() {
        assert_eq!(dose_from_mg_per_kg(10.0, 20.0).unwrap(), 200.0);
        assert_eq!(dose_from_mg_per_kg(-1.0, 20.0).unwrap_err().field, DoseField::DosePerKg);
        assert_eq!(convert_dose(0.5, DoseUnit::parse("mcg").unwrap()), 500.0);
        assert_eq!(convert_dose(2500.0, DoseUnit::G), 2.5);
        assert_eq!(DoseUnit::parse("ml").unwrap_err().field, DoseField::Unit);
    }
}
