//! Local-anesthetic (lidocaine 1%) additive for the combined IM syringe.
//!
//! Evaluated in two order-independent phases over the selection:
//! 1. Compatibility: all-or-nothing. A single drug without a favourable
//!    guide entry rules the additive out for the whole syringe.
//! 2. Volume: per-drug breakpoint volumes are summed, then limited by the
//!    4.5 mg/kg ceiling (0.45 mL/kg at 10 mg/mL) and floored to a syringe
//!    graduation.

use crate::dose::DoseResult;
use crate::snap::snap;
use crate::{AdjuvantGuideEntry, Catalog, EvidenceLevel, PatientContext, Route, VolumeBreakpoint};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// 4.5 mg/kg of lidocaine at 10 mg/mL
pub const MAX_SAFE_ML_PER_KG: f64 = 0.45;

/// Raw volumes above this also get a reduced alternative
pub const REDUCED_OFFER_THRESHOLD_ML: f64 = 2.0;

pub const REDUCED_FACTOR: f64 = 0.75;

/// Phase 1 result
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AdjuvantCompatibility {
    pub available: bool,
    pub reasons: Vec<String>,
    pub summary: String,
}

impl AdjuvantCompatibility {
    fn unavailable(reasons: Vec<String>, summary: impl Into<String>) -> Self {
        Self {
            available: false,
            reasons,
            summary: summary.into(),
        }
    }
}

/// One drug's share of the raw additive volume
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct VolumeContribution {
    pub drug_id: String,
    pub volume_ml: f64,
    /// Breakpoint threshold the volume was taken from
    pub dose_reference: Option<f64>,
    /// Set when a weight or age restriction zeroed the contribution
    pub excluded_by: Option<String>,
}

/// Phase 2 result
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AdjuvantVolume {
    pub raw_ml: f64,
    pub recommended_ml: f64,
    pub reduced_ml: Option<f64>,
    pub max_safe_ml: f64,
    /// The safety ceiling replaced the raw volume
    pub capped: bool,
    pub contributions: Vec<VolumeContribution>,
    pub advisories: Vec<String>,
}

/// Guide text for one selected drug
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ClinicalNote {
    pub drug_id: String,
    pub recommended: bool,
    pub evidence: Option<EvidenceLevel>,
    pub note: Option<String>,
    pub warning: Option<String>,
    pub not_recommended_reason: Option<String>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct AdjuvantPlan {
    pub compatibility: AdjuvantCompatibility,
    /// `None` when incompatible or when no drug contributes a volume
    pub volume: Option<AdjuvantVolume>,
    pub notes: Vec<ClinicalNote>,
}

/// The session's additive selection
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdditiveChoice {
    #[default]
    Off,
    Recommended,
    Reduced,
}

impl AdditiveChoice {
    /// Force the choice off when the plan no longer supports it
    pub fn reconcile(self, plan: &AdjuvantPlan) -> AdditiveChoice {
        match self {
            AdditiveChoice::Off => AdditiveChoice::Off,
            _ if !plan.compatibility.available || plan.volume.is_none() => AdditiveChoice::Off,
            AdditiveChoice::Reduced
                if plan.volume.as_ref().and_then(|v| v.reduced_ml).is_none() =>
            {
                AdditiveChoice::Recommended
            }
            choice => choice,
        }
    }

    /// Additive volume for this choice, if any
    pub fn volume_ml(&self, plan: &AdjuvantPlan) -> Option<f64> {
        let volume = plan.volume.as_ref()?;
        match self.reconcile(plan) {
            AdditiveChoice::Off => None,
            AdditiveChoice::Recommended => Some(volume.recommended_ml),
            AdditiveChoice::Reduced => volume.reduced_ml,
        }
    }
}

fn unique_sorted(selected: &[String]) -> BTreeSet<&str> {
    selected.iter().map(|s| s.as_str()).collect()
}

/// Phase 1: can the combined syringe carry lidocaine at all?
pub fn evaluate_compatibility(
    catalog: &Catalog,
    selected: &[String],
    patient: &PatientContext,
    conditions: &[String],
) -> AdjuvantCompatibility {
    if patient.route != Route::Intramuscular {
        return AdjuvantCompatibility::unavailable(
            vec![format!("Local anesthetic only applies to IM injections (route is {})", patient.route)],
            "Not applicable for this route",
        );
    }
    if selected.is_empty() {
        return AdjuvantCompatibility::unavailable(vec![], "No drugs selected");
    }
    if conditions.contains(&catalog.anesthetic_allergy_condition) {
        return AdjuvantCompatibility::unavailable(
            vec!["Patient is allergic to local anesthetics".into()],
            "Contraindicated by allergy",
        );
    }

    let mut blockers = Vec::new();
    let mut any_recommended = false;
    for id in unique_sorted(selected) {
        match catalog.adjuvant_guide.get(id) {
            Some(entry) if entry.recommended => any_recommended = true,
            entry => {
                let reason = entry
                    .and_then(|e| e.not_recommended_reason.as_deref())
                    .unwrap_or("No evidence of compatibility with lidocaine");
                blockers.push((id, reason));
            }
        }
    }

    if !blockers.is_empty() {
        let names: Vec<&str> = blockers.iter().map(|(id, _)| *id).collect();
        return AdjuvantCompatibility::unavailable(
            blockers
                .iter()
                .map(|(id, reason)| format!("{}: {}", id, reason))
                .collect(),
            format!("Incompatible with {}", names.join(", ")),
        );
    }
    if !any_recommended {
        return AdjuvantCompatibility::unavailable(
            vec!["No selected drug is compatible with lidocaine".into()],
            "No compatible drugs",
        );
    }

    AdjuvantCompatibility {
        available: true,
        reasons: vec![],
        summary: "Lidocaine available for this combination".into(),
    }
}

/// Greatest threshold not above `dose`, else the smallest threshold
fn pick_breakpoint(breakpoints: &[VolumeBreakpoint], dose: f64) -> Option<&VolumeBreakpoint> {
    let lower = breakpoints
        .iter()
        .filter(|b| dose > 0.0 && b.dose_threshold <= dose)
        .max_by(|a, b| a.dose_threshold.total_cmp(&b.dose_threshold));
    lower.or_else(|| {
        breakpoints
            .iter()
            .min_by(|a, b| a.dose_threshold.total_cmp(&b.dose_threshold))
    })
}

fn restriction(entry: &AdjuvantGuideEntry, patient: &PatientContext) -> Option<String> {
    let note = entry.restriction_note.as_deref().unwrap_or("");
    if let Some(min) = entry.weight_min_kg {
        if patient.weight_kg < min {
            return Some(format!("weight below {} kg ({})", min, note));
        }
    }
    if let Some(min) = entry.age_min_months {
        if patient.age_months() < min {
            return Some(format!("age below {} months ({})", min, note));
        }
    }
    None
}

/// Phase 2: combined additive volume
///
/// Callers run this only after a favourable Phase 1. Returns `None` when no
/// drug contributes any volume.
pub fn calculate_volume(
    catalog: &Catalog,
    selected: &[String],
    doses: &BTreeMap<String, DoseResult>,
    patient: &PatientContext,
) -> Option<AdjuvantVolume> {
    let mut contributions = Vec::new();
    let mut advisories = Vec::new();
    let mut raw_ml = 0.0;

    for id in unique_sorted(selected) {
        let Some(entry) = catalog.adjuvant_guide.get(id) else {
            continue;
        };
        if !entry.recommended || entry.volume_breakpoints.is_empty() {
            continue;
        }

        if let Some(why) = restriction(entry, patient) {
            advisories.push(format!("{}: no lidocaine, {}", id, why));
            contributions.push(VolumeContribution {
                drug_id: id.to_string(),
                volume_ml: 0.0,
                dose_reference: None,
                excluded_by: Some(why),
            });
            continue;
        }

        let dose = match doses.get(id).and_then(|d| d.dose()) {
            Some(dose) => dose,
            None => {
                advisories.push(format!("{}: no computed dose, smallest volume used", id));
                0.0
            }
        };

        if let Some(breakpoint) = pick_breakpoint(&entry.volume_breakpoints, dose) {
            raw_ml += breakpoint.volume_ml;
            contributions.push(VolumeContribution {
                drug_id: id.to_string(),
                volume_ml: breakpoint.volume_ml,
                dose_reference: Some(breakpoint.dose_threshold),
                excluded_by: None,
            });
        }
    }

    if raw_ml <= 0.0 {
        return None;
    }

    let max_safe_ml = snap(MAX_SAFE_ML_PER_KG * patient.weight_kg);
    let capped = raw_ml > max_safe_ml;
    let recommended_ml = snap(raw_ml.min(max_safe_ml));

    if capped {
        advisories.push(format!(
            "Volume limited from {:.1} mL to {} mL by the 4.5 mg/kg ceiling ({} mL for {} kg)",
            raw_ml, recommended_ml, max_safe_ml, patient.weight_kg
        ));
    }

    let reduced_ml = if raw_ml > REDUCED_OFFER_THRESHOLD_ML {
        Some(snap((raw_ml * REDUCED_FACTOR).min(max_safe_ml)))
    } else {
        None
    };

    tracing::debug!(
        "Lidocaine volume: raw {:.2} mL, recommended {} mL, max safe {} mL",
        raw_ml,
        recommended_ml,
        max_safe_ml
    );

    Some(AdjuvantVolume {
        raw_ml,
        recommended_ml,
        reduced_ml,
        max_safe_ml,
        capped,
        contributions,
        advisories,
    })
}

/// Guide notes for every selected drug that has an entry
pub fn clinical_notes(catalog: &Catalog, selected: &[String]) -> Vec<ClinicalNote> {
    selected
        .iter()
        .filter_map(|id| {
            catalog.adjuvant_guide.get(id).map(|entry| ClinicalNote {
                drug_id: id.clone(),
                recommended: entry.recommended,
                evidence: entry.evidence,
                note: entry.note.clone(),
                warning: entry.warning.clone(),
                not_recommended_reason: entry.not_recommended_reason.clone(),
            })
        })
        .collect()
}

/// Both phases plus the clinical notes
pub fn plan(
    catalog: &Catalog,
    selected: &[String],
    doses: &BTreeMap<String, DoseResult>,
    patient: &PatientContext,
    conditions: &[String],
) -> AdjuvantPlan {
    let compatibility = evaluate_compatibility(catalog, selected, patient, conditions);
    let volume = if compatibility.available {
        calculate_volume(catalog, selected, doses, patient)
    } else {
        None
    };

    AdjuvantPlan {
        compatibility,
        volume,
        notes: clinical_notes(catalog, selected),
    }
}
