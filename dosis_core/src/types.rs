//! Core domain types for the Dosis calculator.
//!
//! This module defines the reference data loaded once from the catalog and
//! the per-session patient context:
//! - Drugs, presentations and structured dose rules
//! - Interaction, mixing and drug-disease records
//! - Syndrome rules and symptom lists
//! - Local-anesthetic adjuvant guidance

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Patients at or above this age (in months) take the adult path.
pub const ADULT_AGE_MONTHS: f64 = 216.0;

/// Patients at or above this age (in months) take the elderly sub-path.
pub const ELDERLY_AGE_MONTHS: f64 = 780.0;

// ============================================================================
// Patient Types
// ============================================================================

/// Parenteral administration route
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Route {
    #[serde(rename = "IM")]
    Intramuscular,
    #[serde(rename = "IV")]
    Intravenous,
    #[serde(rename = "SC")]
    Subcutaneous,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Intramuscular => "IM",
            Route::Intravenous => "IV",
            Route::Subcutaneous => "SC",
        }
    }

    /// Parse a route abbreviation, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "IM" => Some(Route::Intramuscular),
            "IV" => Some(Route::Intravenous),
            "SC" | "SQ" => Some(Route::Subcutaneous),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit the patient's age is entered in
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgeUnit {
    Months,
    Years,
}

impl AgeUnit {
    pub fn to_months(&self, value: f64) -> f64 {
        match self {
            AgeUnit::Months => value,
            AgeUnit::Years => value * 12.0,
        }
    }
}

/// Patient parameters for one session
///
/// Replaced as a whole whenever any field changes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PatientContext {
    pub weight_kg: f64,
    pub age: f64,
    pub age_unit: AgeUnit,
    pub route: Route,
}

impl Default for PatientContext {
    fn default() -> Self {
        Self {
            weight_kg: 70.0,
            age: 30.0,
            age_unit: AgeUnit::Years,
            route: Route::Intramuscular,
        }
    }
}

impl PatientContext {
    pub fn age_months(&self) -> f64 {
        self.age_unit.to_months(self.age)
    }

    pub fn is_pediatric(&self) -> bool {
        self.age_months() < ADULT_AGE_MONTHS
    }

    pub fn is_elderly(&self) -> bool {
        self.age_months() >= ELDERLY_AGE_MONTHS
    }

    /// Reject weights and ages no calculation can be based on
    pub fn validate(&self) -> crate::Result<()> {
        if !self.weight_kg.is_finite() || self.weight_kg <= 0.0 {
            return Err(crate::Error::Patient(format!(
                "weight must be a positive number of kg, got {}",
                self.weight_kg
            )));
        }
        if !self.age.is_finite() || self.age < 0.0 {
            return Err(crate::Error::Patient(format!(
                "age must be zero or positive, got {}",
                self.age
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Drug and Presentation Types
// ============================================================================

/// Amount unit of a presentation's concentration
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum DoseUnit {
    #[serde(rename = "mg")]
    Mg,
    #[serde(rename = "IU")]
    Iu,
}

impl DoseUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DoseUnit::Mg => "mg",
            DoseUnit::Iu => "IU",
        }
    }
}

impl fmt::Display for DoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A commercial concentration/volume packaging of a drug
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Presentation {
    pub name: String,
    /// Amount of drug in the whole container, in `unit`
    pub concentration: f64,
    pub volume_ml: f64,
    pub unit: DoseUnit,
    #[serde(default)]
    pub principal: bool,
}

impl Presentation {
    /// Amount of drug per millilitre
    pub fn per_ml(&self) -> f64 {
        self.concentration / self.volume_ml
    }
}

/// Dose amount of a structured tier
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DoseAmount {
    /// Absolute amount (mg or IU), independent of weight
    Fixed { min: f64, max: Option<f64> },
    /// Milligrams per kilogram of body weight
    PerWeightMg { min_per_kg: f64, max_per_kg: Option<f64> },
    /// International units per kilogram of body weight
    PerWeightIu { min_per_kg: f64, max_per_kg: Option<f64> },
}

impl DoseAmount {
    /// Midpoint of the range (a missing max means a single value)
    pub fn mean(&self) -> f64 {
        let (min, max) = self.bounds();
        (min + max.unwrap_or(min)) / 2.0
    }

    pub fn is_per_weight(&self) -> bool {
        !matches!(self, DoseAmount::Fixed { .. })
    }

    /// Mean dose for a patient of the given weight
    pub fn resolve(&self, weight_kg: f64) -> f64 {
        if self.is_per_weight() {
            self.mean() * weight_kg
        } else {
            self.mean()
        }
    }

    pub fn bounds(&self) -> (f64, Option<f64>) {
        match self {
            DoseAmount::Fixed { min, max } => (*min, *max),
            DoseAmount::PerWeightMg { min_per_kg, max_per_kg }
            | DoseAmount::PerWeightIu { min_per_kg, max_per_kg } => (*min_per_kg, *max_per_kg),
        }
    }
}

/// Where a tier came from
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    #[default]
    Structured,
    /// Converted from legacy free text at catalog load
    Migrated,
}

/// Standard adult dosing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StandardDose {
    pub amount: DoseAmount,
    #[serde(default)]
    pub max_per_administration: Option<f64>,
    #[serde(default)]
    pub frequency_hours: Vec<u32>,
}

/// Elderly adjustment (age >= 65 years)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ElderlyDose {
    /// Explicit elderly range
    Range {
        amount: DoseAmount,
        #[serde(default)]
        max_per_administration: Option<f64>,
        #[serde(default)]
        frequency_hours: Vec<u32>,
    },
    /// Fraction of the standard adult dose
    Reduction {
        factor: f64,
        #[serde(default)]
        max_per_administration: Option<f64>,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct AdultDoseRule {
    #[serde(default)]
    pub standard: Option<StandardDose>,
    #[serde(default)]
    pub elderly: Option<ElderlyDose>,
}

/// One pediatric age band of a dose rule
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PediatricTier {
    pub age_min_months: f64,
    pub age_max_months: f64,
    pub amount: DoseAmount,
    #[serde(default)]
    pub max_per_administration: Option<f64>,
    #[serde(default)]
    pub routes: Vec<Route>,
    #[serde(default)]
    pub frequency_hours: Vec<u32>,
    #[serde(default)]
    pub source: RuleSource,
    /// Ages an earlier legacy text line still answers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deferred_months: Vec<MonthRange>,
}

/// Inclusive age window in months
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct MonthRange {
    pub min: f64,
    pub max: f64,
}

impl MonthRange {
    pub fn contains(&self, age_months: f64) -> bool {
        age_months >= self.min && age_months <= self.max
    }

    pub fn overlaps(&self, other: &MonthRange) -> bool {
        self.min <= other.max && other.min <= self.max
    }
}

impl PediatricTier {
    pub fn contains(&self, age_months: f64) -> bool {
        age_months >= self.age_min_months
            && age_months <= self.age_max_months
            && !self.deferred_months.iter().any(|r| r.contains(age_months))
    }
}

/// Structured dosing rule for a drug
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct DoseRule {
    #[serde(default)]
    pub adult: Option<AdultDoseRule>,
    /// Ordered; the first tier containing the patient's age wins
    #[serde(default)]
    pub pediatric: Vec<PediatricTier>,
}

/// A legacy pediatric dose line kept as text
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LegacyPediatricDose {
    pub age_min: f64,
    pub age_max: f64,
    pub unit: AgeUnit,
    pub text: String,
}

/// Free-text dosing carried by older catalog entries
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct LegacyDose {
    #[serde(default)]
    pub adult: Option<String>,
    #[serde(default)]
    pub pediatric: Vec<LegacyPediatricDose>,
}

/// Reconstitution volume for a given dose
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DiluentProportion {
    pub dose: f64,
    pub volume_ml: f64,
}

/// One diluent a drug can be reconstituted with
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DiluentOption {
    pub name: String,
    #[serde(default)]
    pub min_age_months: Option<f64>,
    #[serde(default)]
    pub max_age_months: Option<f64>,
    /// Routes this diluent is meant for
    #[serde(default)]
    pub routes: Vec<Route>,
    pub proportions: Vec<DiluentProportion>,
}

impl DiluentOption {
    pub fn is_eligible(&self, patient: &PatientContext) -> bool {
        let months = patient.age_months();
        self.min_age_months.map_or(true, |min| months >= min)
            && self.max_age_months.map_or(true, |max| months <= max)
            && self.routes.contains(&patient.route)
    }
}

/// Marks a drug whose diluent is picked automatically on selection
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DiluentRule {
    pub options: Vec<DiluentOption>,
    /// Use the first option when none is eligible
    #[serde(default)]
    pub fallback_to_first: bool,
}

/// Mapping used by the label lookup
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LabelMapping {
    pub generic_name: String,
    #[serde(default)]
    pub brand_names: Vec<String>,
    /// Set for drugs that are not approved in the label source's market
    #[serde(default)]
    pub not_approved_note: Option<String>,
}

/// An injectable drug
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Drug {
    pub id: String,
    pub name: String,
    pub class: String,
    pub routes: Vec<Route>,
    pub presentations: Vec<Presentation>,
    #[serde(default)]
    pub dose_rule: Option<DoseRule>,
    #[serde(default)]
    pub legacy_dose: Option<LegacyDose>,
    #[serde(default)]
    pub diluent: Option<DiluentRule>,
    #[serde(default)]
    pub label: Option<LabelMapping>,
}

impl Drug {
    /// Principal presentation, else the first one
    pub fn default_presentation(&self) -> Option<&Presentation> {
        self.presentations
            .iter()
            .find(|p| p.principal)
            .or_else(|| self.presentations.first())
    }
}

// ============================================================================
// Interaction Types
// ============================================================================

/// Unordered pair of drug ids
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DrugPair(pub String, pub String);

impl DrugPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self(a.into(), b.into())
    }

    pub fn matches(&self, a: &str, b: &str) -> bool {
        (self.0 == a && self.1 == b) || (self.0 == b && self.1 == a)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0 == id || self.1 == id
    }

    /// Order-independent key for deduplication
    pub fn key(&self) -> (&str, &str) {
        if self.0 <= self.1 {
            (&self.0, &self.1)
        } else {
            (&self.1, &self.0)
        }
    }
}

/// Drug-drug interaction level
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InteractionLevel {
    Caution,
    Dangerous,
    Contraindicated,
}

impl InteractionLevel {
    /// Gating rank: contraindicated and dangerous rank equally
    pub fn severity(&self) -> u8 {
        match self {
            InteractionLevel::Caution => 1,
            InteractionLevel::Dangerous | InteractionLevel::Contraindicated => 2,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity() >= 2
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionLevel::Caution => "caution",
            InteractionLevel::Dangerous => "dangerous",
            InteractionLevel::Contraindicated => "contraindicated",
        }
    }
}

impl fmt::Display for InteractionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// General drug-drug interaction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub drugs: DrugPair,
    pub level: InteractionLevel,
    pub description: String,
    pub advice: String,
}

/// Interaction level for a pediatric age band
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PediatricBand {
    pub age_min_months: f64,
    pub age_max_months: f64,
    pub level: InteractionLevel,
}

/// Pediatric override of the general interaction table
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PediatricInteractionRecord {
    pub drugs: DrugPair,
    pub description: String,
    pub advice: String,
    pub bands: Vec<PediatricBand>,
}

/// Physical/chemical compatibility of two drugs in one syringe
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Compatibility {
    Compatible,
    Caution,
    Dangerous,
    Contraindicated,
}

impl Compatibility {
    /// Interaction level a non-compatible mixture is reported at
    pub fn as_level(&self) -> Option<InteractionLevel> {
        match self {
            Compatibility::Compatible => None,
            Compatibility::Caution => Some(InteractionLevel::Caution),
            Compatibility::Dangerous => Some(InteractionLevel::Dangerous),
            Compatibility::Contraindicated => Some(InteractionLevel::Contraindicated),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MixBand {
    pub age_min_months: f64,
    pub age_max_months: f64,
    pub compatibility: Compatibility,
}

/// Pediatric compatibility: one level, or one per age band
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PediatricMix {
    Flat(Compatibility),
    Banded(Vec<MixBand>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MixCompatibilityRecord {
    pub drugs: DrugPair,
    pub pediatric: PediatricMix,
    pub comment: String,
}

// ============================================================================
// Condition Types
// ============================================================================

/// Drug-disease severity
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ConditionSeverity {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConditionInteractionRecord {
    pub drug_id: String,
    pub condition: String,
    pub severity: ConditionSeverity,
    #[serde(default)]
    pub blocks: bool,
    pub message: String,
    pub recommendation: String,
}

/// A patient condition that can be switched on for a session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Condition {
    pub id: String,
    pub label: String,
}

// ============================================================================
// Symptom and Syndrome Types
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Symptom {
    pub id: String,
    pub label: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SymptomGroup {
    pub id: String,
    pub label: String,
    pub symptoms: Vec<Symptom>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RedFlag {
    pub symptom: String,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ForbiddenDrug {
    pub id: String,
    pub reason: String,
}

/// Epidemiological alert rule
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyndromeRule {
    pub id: String,
    pub name: String,
    pub cardinal_symptoms: Vec<String>,
    #[serde(default)]
    pub support_symptoms: Vec<String>,
    pub min_cardinal_threshold: usize,
    #[serde(default)]
    pub red_flags: Vec<RedFlag>,
    #[serde(default)]
    pub recommended_drugs: Vec<String>,
    #[serde(default)]
    pub forbidden_drugs: Vec<ForbiddenDrug>,
    #[serde(default)]
    pub differential_guide: String,
    #[serde(default)]
    pub management_guide: String,
}

/// Differential clinical picture, drives drug-panel suggestions
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClinicalPictureRule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub required_symptoms: Vec<String>,
    #[serde(default)]
    pub optional_symptoms: Vec<String>,
    pub min_required_threshold: usize,
    #[serde(default)]
    pub recommended_drugs: Vec<String>,
    #[serde(default)]
    pub forbidden_drugs: Vec<ForbiddenDrug>,
    #[serde(default)]
    pub clinical_notes: String,
    #[serde(default)]
    pub is_emergency: bool,
}

// ============================================================================
// Adjuvant (local anesthetic) Types
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceLevel {
    High,
    Moderate,
    Low,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VolumeBreakpoint {
    pub dose_threshold: f64,
    pub volume_ml: f64,
}

/// Local-anesthetic guidance for one drug
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AdjuvantGuideEntry {
    pub recommended: bool,
    #[serde(default)]
    pub evidence: Option<EvidenceLevel>,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub not_recommended_reason: Option<String>,
    #[serde(default)]
    pub weight_min_kg: Option<f64>,
    #[serde(default)]
    pub age_min_months: Option<f64>,
    #[serde(default)]
    pub restriction_note: Option<String>,
    #[serde(default)]
    pub volume_breakpoints: Vec<VolumeBreakpoint>,
}

// ============================================================================
// Reference Notes
// ============================================================================

/// A combination of drugs commonly given together
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommonCombination {
    pub name: String,
    pub drugs: Vec<String>,
    pub indication: String,
}

/// Age-group guidance shown for pediatric patients
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PediatricGuideline {
    pub title: String,
    /// Exclusive lower bound in months (none = from birth)
    #[serde(default)]
    pub after_months: Option<f64>,
    /// Inclusive upper bound in months
    pub up_to_months: f64,
    pub recommendations: Vec<String>,
}

impl PediatricGuideline {
    pub fn applies_to(&self, age_months: f64) -> bool {
        self.after_months.map_or(true, |after| age_months > after) && age_months <= self.up_to_months
    }
}

// ============================================================================
// Catalog Type
// ============================================================================

fn default_allergy_condition() -> String {
    "alergia_anestesicos".into()
}

/// The complete static rule catalog
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Catalog {
    pub drugs: BTreeMap<String, Drug>,
    #[serde(default)]
    pub interactions: Vec<InteractionRecord>,
    #[serde(default)]
    pub pediatric_interactions: Vec<PediatricInteractionRecord>,
    #[serde(default)]
    pub mix_compatibility: Vec<MixCompatibilityRecord>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub condition_interactions: Vec<ConditionInteractionRecord>,
    #[serde(default)]
    pub symptom_groups: Vec<SymptomGroup>,
    #[serde(default)]
    pub syndromes: Vec<SyndromeRule>,
    #[serde(default)]
    pub clinical_pictures: Vec<ClinicalPictureRule>,
    #[serde(default)]
    pub adjuvant_guide: BTreeMap<String, AdjuvantGuideEntry>,
    #[serde(default)]
    pub combinations: Vec<CommonCombination>,
    #[serde(default)]
    pub pediatric_guidelines: Vec<PediatricGuideline>,
    /// Condition id that rules out the local-anesthetic additive
    #[serde(default = "default_allergy_condition")]
    pub anesthetic_allergy_condition: String,
}

impl Catalog {
    pub fn drug(&self, id: &str) -> crate::Result<&Drug> {
        self.drugs
            .get(id)
            .ok_or_else(|| crate::Error::NotFound(format!("drug '{}'", id)))
    }

    pub fn drug_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.drugs.get(id).map(|d| d.name.as_str()).unwrap_or(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_conversion_and_bands() {
        let child = PatientContext {
            weight_kg: 20.0,
            age: 6.0,
            age_unit: AgeUnit::Years,
            route: Route::Intramuscular,
        };
        assert_eq!(child.age_months(), 72.0);
        assert!(child.is_pediatric());
        assert!(!child.is_elderly());

        let adult = PatientContext {
            age: 18.0,
            ..child.clone()
        };
        assert!(!adult.is_pediatric());

        let elderly = PatientContext {
            age: 65.0,
            ..child
        };
        assert!(elderly.is_elderly());
    }

    #[test]
    fn test_patient_validation() {
        let mut patient = PatientContext::default();
        assert!(patient.validate().is_ok());

        patient.weight_kg = 0.0;
        assert!(patient.validate().is_err());

        patient.weight_kg = f64::NAN;
        assert!(patient.validate().is_err());
    }

    #[test]
    fn test_dose_amount_mean() {
        let amount = DoseAmount::PerWeightMg {
            min_per_kg: 10.0,
            max_per_kg: Some(15.0),
        };
        assert_eq!(amount.mean(), 12.5);
        assert_eq!(amount.resolve(20.0), 250.0);

        let single = DoseAmount::Fixed {
            min: 30.0,
            max: None,
        };
        assert_eq!(single.resolve(80.0), 30.0);
    }

    #[test]
    fn test_pair_is_unordered() {
        let pair = DrugPair::new("tramadol", "ondansetron");
        assert!(pair.matches("ondansetron", "tramadol"));
        assert_eq!(pair.key(), DrugPair::new("ondansetron", "tramadol").key());
    }

    #[test]
    fn test_level_ordering() {
        assert_eq!(
            InteractionLevel::Dangerous.severity(),
            InteractionLevel::Contraindicated.severity()
        );
        assert!(InteractionLevel::Dangerous.severity() > InteractionLevel::Caution.severity());
        assert!(!InteractionLevel::Caution.is_blocking());
    }

    #[test]
    fn test_route_parse() {
        assert_eq!(Route::parse("im"), Some(Route::Intramuscular));
        assert_eq!(Route::parse("SQ"), Some(Route::Subcutaneous));
        assert_eq!(Route::parse("oral"), None);
    }
}
