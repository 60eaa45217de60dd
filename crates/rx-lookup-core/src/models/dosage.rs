//! Dosage guidance models.
//!
//! The `DosageInfo` constructors keep `source`, `confidence` and
//! `dosing_details` in lock-step:
//!
//! | source               | confidence | dosing_details |
//! |----------------------|------------|----------------|
//! | `OfficialLabel`      | `High`     | label fields   |
//! | `CalculatedEstimate` | `Low`      | calculator     |
//! | `Unavailable`        | `None`     | absent         |

use serde::{Deserialize, Serialize};

/// Which tier of the trust hierarchy produced the guidance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DosageSource {
    OfficialLabel,
    CalculatedEstimate,
    Unavailable,
}

impl DosageSource {
    /// Confidence implied by the source tier.
    pub fn confidence(self) -> Confidence {
        match self {
            DosageSource::OfficialLabel => Confidence::High,
            DosageSource::CalculatedEstimate => Confidence::Low,
            DosageSource::Unavailable => Confidence::None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Low,
    None,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WarningLevel {
    Info,
    Critical,
}

/// Advisory attached to a dosage result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DosageWarning {
    pub level: WarningLevel,
    /// Machine-readable category (e.g., "restriction_detected")
    pub category: String,
    pub message: String,
}

impl DosageWarning {
    pub fn info(category: &str, message: impl Into<String>) -> Self {
        Self {
            level: WarningLevel::Info,
            category: category.into(),
            message: message.into(),
        }
    }

    pub fn critical(category: &str, message: impl Into<String>) -> Self {
        Self {
            level: WarningLevel::Critical,
            category: category.into(),
            message: message.into(),
        }
    }

    pub fn is_critical(&self) -> bool {
        self.level == WarningLevel::Critical
    }
}

/// Structured official drug label.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DrugLabel {
    pub purpose: Option<String>,
    pub dosage_and_administration: Option<String>,
    pub pediatric_use: Option<String>,
    pub warnings: Option<String>,
    pub contraindications: Option<String>,
    pub adverse_reactions: Option<String>,
}

impl DrugLabel {
    /// Dosing instructions, if present and non-blank.
    pub fn dosing_instructions(&self) -> Option<&str> {
        self.dosage_and_administration
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// Dosing fields taken from an official label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelDosing {
    pub instructions: String,
    pub pediatric_use: Option<String>,
    pub warnings: Option<String>,
    pub contraindications: Option<String>,
    /// Whether instructions are expressed per kilogram; absent for restricted labels
    pub weight_based: Option<bool>,
    /// Whether a pediatric restriction phrase was found
    pub restricted: bool,
}

/// One formula's estimate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MethodEstimate {
    /// Dose rounded to two decimals
    pub dose_mg: f64,
    pub description: String,
    pub formula: String,
}

/// Body-surface-area estimate (Mosteller).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BsaEstimate {
    /// Patient BSA in m², rounded to three decimals
    pub bsa_m2: f64,
    pub adult_bsa_m2: f64,
    pub dose_mg: f64,
    pub formula: String,
}

/// Calculator output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PediatricDosage {
    pub adult_dose_mg: f64,
    pub patient_weight_kg: f64,
    pub patient_age_years: Option<u32>,
    pub clarks_rule: MethodEstimate,
    pub youngs_rule: Option<MethodEstimate>,
    pub frieds_rule: Option<MethodEstimate>,
    pub body_surface_area: Option<BsaEstimate>,
    /// Clark's rule estimate
    pub recommended_dose_mg: f64,
    pub warnings: Vec<DosageWarning>,
}

/// Source-specific dosing payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DosingDetails {
    Label(LabelDosing),
    Calculated(PediatricDosage),
}

/// Patient facts the guidance was computed for.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientContext {
    pub weight_kg: Option<f64>,
    pub age_years: Option<u32>,
    pub height_cm: Option<f64>,
}

/// Final dosage decision.
///
/// Built only through [`DosageInfo::official`], [`DosageInfo::calculated`] and
/// [`DosageInfo::unavailable`]; the source, confidence and details are read
/// through accessors.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DosageInfo {
    source: DosageSource,
    confidence: Confidence,
    dosing_details: Option<DosingDetails>,
    pub warnings: Vec<DosageWarning>,
    pub patient: PatientContext,
    /// Calculator validation error retained when falling through to `Unavailable`
    pub calculation_error: Option<String>,
}

impl DosageInfo {
    pub fn official(details: LabelDosing, warnings: Vec<DosageWarning>, patient: PatientContext) -> Self {
        Self::build(DosageSource::OfficialLabel, Some(DosingDetails::Label(details)), warnings, patient, None)
    }

    pub fn calculated(details: PediatricDosage, warnings: Vec<DosageWarning>, patient: PatientContext) -> Self {
        Self::build(
            DosageSource::CalculatedEstimate,
            Some(DosingDetails::Calculated(details)),
            warnings,
            patient,
            None,
        )
    }

    pub fn unavailable(
        warnings: Vec<DosageWarning>,
        patient: PatientContext,
        calculation_error: Option<String>,
    ) -> Self {
        Self::build(DosageSource::Unavailable, None, warnings, patient, calculation_error)
    }

    fn build(
        source: DosageSource,
        dosing_details: Option<DosingDetails>,
        warnings: Vec<DosageWarning>,
        patient: PatientContext,
        calculation_error: Option<String>,
    ) -> Self {
        Self {
            source,
            confidence: source.confidence(),
            dosing_details,
            warnings,
            patient,
            calculation_error,
        }
    }

    pub fn source(&self) -> DosageSource {
        self.source
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn dosing_details(&self) -> Option<&DosingDetails> {
        self.dosing_details.as_ref()
    }

    /// Whether any warning is critical.
    pub fn has_critical_warning(&self) -> bool {
        self.warnings.iter().any(DosageWarning::is_critical)
    }

    /// Calculator output, when this is an estimate.
    pub fn calculated_details(&self) -> Option<&PediatricDosage> {
        match &self.dosing_details {
            Some(DosingDetails::Calculated(d)) => Some(d),
            _ => None,
        }
    }

    /// Label fields, when this came from the official label.
    pub fn label_details(&self) -> Option<&LabelDosing> {
        match &self.dosing_details {
            Some(DosingDetails::Label(d)) => Some(d),
            _ => None,
        }
    }
}
