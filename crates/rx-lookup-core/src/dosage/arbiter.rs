//! Trust hierarchy between the official label and the formula fallback.
//!
//! Evaluated in order, first match wins:
//! 1. Label with non-empty dosing instructions → `OfficialLabel`
//!    (restricted if any restriction phrase appears in dosing or pediatric text)
//! 2. Adult dose supplied and calculator accepts the input → `CalculatedEstimate`
//! 3. Otherwise → `Unavailable`
//!
//! A label always outranks the formulas, even when the label is ambiguous.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::DosageCalculator;
use crate::models::{DosageInfo, DosageWarning, DrugLabel, LabelDosing, PatientContext};
use crate::remote::LabelSource;

static RESTRICTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)not recommended",
        r"(?i)do not use",
        r"(?i)contraindicated",
        r"(?i)consult a doctor",
        r"(?i)children under\s*\d+",
        r"(?i)infants under\s*\d+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("restriction pattern is a valid literal"))
    .collect()
});

static WEIGHT_BASED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(mg/kg|ml/kg|mcg/kg|per\s*kg)").expect("weight pattern is a valid literal")
});

/// First restriction phrase found in the text, if any.
pub fn find_restriction(text: &str) -> Option<&str> {
    RESTRICTION_PATTERNS
        .iter()
        .find_map(|re| re.find(text))
        .map(|m| m.as_str())
}

/// Whether dosing is expressed per kilogram.
pub fn is_weight_based(text: &str) -> bool {
    WEIGHT_BASED_PATTERN.is_match(text)
}

/// Inputs for one dosage decision.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DosageRequest {
    pub brand_name: String,
    pub generic_name: Option<String>,
    pub adult_dose_mg: Option<f64>,
    pub patient: PatientContext,
}

/// Chooses the most trustworthy available dosage guidance.
pub struct DosageArbiter {
    labels: Arc<dyn LabelSource>,
    calculator: DosageCalculator,
}

impl DosageArbiter {
    pub fn new(labels: Arc<dyn LabelSource>) -> Self {
        Self {
            labels,
            calculator: DosageCalculator::new(),
        }
    }

    /// Decide the dosage guidance for a request.
    pub async fn arbitrate(&self, request: &DosageRequest) -> DosageInfo {
        let label = self
            .labels
            .fetch_label(&request.brand_name, request.generic_name.as_deref())
            .await;

        if let Some(info) = label.as_ref().and_then(|l| from_label(l, &request.patient)) {
            tracing::info!(
                brand = %request.brand_name,
                restricted = info.label_details().map(|d| d.restricted).unwrap_or(false),
                "dosage: using official label"
            );
            return info;
        }

        let mut calculation_error = None;
        if let Some(adult_dose_mg) = request.adult_dose_mg {
            let patient = &request.patient;
            match self
                .calculator
                .calculate(adult_dose_mg, patient.weight_kg, patient.age_years, patient.height_cm)
            {
                Ok(calculated) => {
                    tracing::info!(
                        brand = %request.brand_name,
                        recommended_mg = calculated.recommended_dose_mg,
                        "dosage: no label, using formula estimate"
                    );
                    let mut warnings = vec![DosageWarning::critical(
                        "calculation_warning",
                        "Calculated using generic formulas, not official guidelines. Consult a healthcare provider.",
                    )];
                    warnings.extend(calculated.warnings.iter().cloned());
                    return DosageInfo::calculated(calculated, warnings, request.patient.clone());
                }
                Err(e) => {
                    tracing::warn!(brand = %request.brand_name, error = %e, "dosage: estimate rejected");
                    calculation_error = Some(e.to_string());
                }
            }
        }

        tracing::info!(brand = %request.brand_name, "dosage: no usable source");
        DosageInfo::unavailable(
            vec![DosageWarning::critical(
                "no_data",
                "No pediatric dosing information available. Consult a healthcare provider.",
            )],
            request.patient.clone(),
            calculation_error,
        )
    }
}

/// Step 1 of the hierarchy; `None` when the label has no dosing instructions.
fn from_label(label: &DrugLabel, patient: &PatientContext) -> Option<DosageInfo> {
    let instructions = label.dosing_instructions()?;
    let pediatric_text = label.pediatric_use.as_deref().unwrap_or_default();
    let combined = format!("{} {}", instructions, pediatric_text);

    if let Some(phrase) = find_restriction(&combined) {
        let details = LabelDosing {
            instructions: instructions.to_string(),
            pediatric_use: label.pediatric_use.clone(),
            warnings: label.warnings.clone(),
            contraindications: label.contraindications.clone(),
            weight_based: None,
            restricted: true,
        };
        let warning = DosageWarning::critical(
            "restriction_detected",
            format!(
                "Official label restricts use for some ages (\"{}\"). Consult a healthcare provider.",
                phrase
            ),
        );
        return Some(DosageInfo::official(details, vec![warning], patient.clone()));
    }

    let details = LabelDosing {
        instructions: instructions.to_string(),
        pediatric_use: label.pediatric_use.clone(),
        warnings: label.warnings.clone(),
        contraindications: label.contraindications.clone(),
        weight_based: Some(is_weight_based(instructions)),
        restricted: false,
    };
    let warning = DosageWarning::info("source_info", "Information retrieved from the official drug label.");
    Some(DosageInfo::official(details, vec![warning], patient.clone()))
}
