//! Per-drug dose and volume resolution.
//!
//! Resolution order:
//! 1. Adult patients (>= 18 years): elderly rule when >= 65 years, else the
//!    standard adult rule
//! 2. Pediatric patients: first tier whose age band contains the patient
//! 3. Legacy text that was not migrated is returned verbatim as `Unstructured`
//! 4. Otherwise an explicit `NoDosingAvailable` outcome
//!
//! Volume = dose / (concentration / presentation volume).

use crate::snap::{snap_info, SnapInfo};
use crate::{
    AdultDoseRule, Catalog, DoseAmount, DoseUnit, Drug, ElderlyDose, PatientContext,
    PediatricTier, Presentation, Result, RuleSource,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Which branch of the dose rule produced a dose
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Population {
    Adult,
    Elderly,
    Pediatric,
}

/// A numeric dose resolved from a structured rule
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ComputedDose {
    pub dose: f64,
    pub unit: DoseUnit,
    pub volume_ml: f64,
    pub volume: SnapInfo,
    pub population: Population,
    /// The per-administration ceiling replaced the computed mean
    pub capped: bool,
    pub frequency_hours: Vec<u32>,
    pub presentation: Presentation,
    pub source: RuleSource,
}

/// Outcome of a dose calculation
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DoseOutcome {
    Computed(ComputedDose),
    /// Legacy free text that could not be turned into a structured tier
    Unstructured { text: String },
    NoDosingAvailable { reason: String },
    MissingPresentation,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DoseResult {
    pub drug_id: String,
    pub outcome: DoseOutcome,
    /// Non-fatal notes (route mismatch, missing elderly rule, ...)
    pub advisories: Vec<String>,
}

impl DoseResult {
    /// No number can be given for this drug
    pub fn blocked(&self) -> bool {
        matches!(
            self.outcome,
            DoseOutcome::NoDosingAvailable { .. } | DoseOutcome::MissingPresentation
        )
    }

    pub fn computed(&self) -> Option<&ComputedDose> {
        match &self.outcome {
            DoseOutcome::Computed(c) => Some(c),
            _ => None,
        }
    }

    pub fn dose(&self) -> Option<f64> {
        self.computed().map(|c| c.dose)
    }

    /// Snapped (display) volume
    pub fn volume_ml(&self) -> Option<f64> {
        self.computed().map(|c| c.volume.snapped)
    }
}

/// Intermediate result before the presentation is applied
struct ResolvedDose {
    dose: f64,
    capped: bool,
    population: Population,
    frequency_hours: Vec<u32>,
    source: RuleSource,
    unit: Option<DoseUnit>,
}

/// Calculate the dose of a catalog drug for a patient
///
/// `presentation` overrides the drug's default (principal, else first).
pub fn calculate_dose(
    catalog: &Catalog,
    drug_id: &str,
    patient: &PatientContext,
    presentation: Option<&Presentation>,
) -> Result<DoseResult> {
    let drug = catalog.drug(drug_id)?;
    Ok(dose_for_drug(drug, patient, presentation))
}

/// Calculate doses for every drug in `drug_ids`
///
/// Unknown ids are skipped with a warning; callers validate selections
/// against the catalog before they reach this point.
pub fn calculate_all(
    catalog: &Catalog,
    drug_ids: &[String],
    presentations: &BTreeMap<String, Presentation>,
    patient: &PatientContext,
) -> BTreeMap<String, DoseResult> {
    let mut doses = BTreeMap::new();
    for id in drug_ids {
        match calculate_dose(catalog, id, patient, presentations.get(id)) {
            Ok(result) => {
                doses.insert(id.clone(), result);
            }
            Err(e) => tracing::warn!("Skipping dose for '{}': {}", id, e),
        }
    }
    doses
}

/// Calculate the dose of `drug` for a patient
pub fn dose_for_drug(
    drug: &Drug,
    patient: &PatientContext,
    presentation: Option<&Presentation>,
) -> DoseResult {
    let mut advisories = Vec::new();

    let presentation = match presentation.or_else(|| drug.default_presentation()) {
        Some(p) => p.clone(),
        None => {
            tracing::warn!("Drug '{}' has no presentation", drug.id);
            return DoseResult {
                drug_id: drug.id.clone(),
                outcome: DoseOutcome::MissingPresentation,
                advisories,
            };
        }
    };

    if !drug.routes.is_empty() && !drug.routes.contains(&patient.route) {
        advisories.push(format!(
            "{} is not indicated by {} route (allowed: {})",
            drug.name,
            patient.route,
            join_routes(&drug.routes)
        ));
    }

    let resolved = if patient.is_pediatric() {
        drug.dose_rule
            .as_ref()
            .and_then(|rule| pediatric_dose(&rule.pediatric, patient, &mut advisories))
    } else {
        drug.dose_rule
            .as_ref()
            .and_then(|rule| rule.adult.as_ref())
            .and_then(|adult| adult_dose(adult, patient, &mut advisories))
    };

    let outcome = match resolved {
        Some(resolved) => apply_presentation(resolved, presentation),
        None => unresolved_outcome(drug, patient),
    };

    tracing::debug!("Dose for '{}': {:?}", drug.id, outcome);

    DoseResult {
        drug_id: drug.id.clone(),
        outcome,
        advisories,
    }
}

fn apply_presentation(resolved: ResolvedDose, presentation: Presentation) -> DoseOutcome {
    if let Some(unit) = resolved.unit {
        if unit != presentation.unit {
            return DoseOutcome::NoDosingAvailable {
                reason: format!(
                    "dose rule is in {} but presentation '{}' is in {}",
                    unit, presentation.name, presentation.unit
                ),
            };
        }
    }

    let per_ml = presentation.per_ml();
    if !per_ml.is_finite() || per_ml <= 0.0 {
        return DoseOutcome::NoDosingAvailable {
            reason: format!("presentation '{}' has no usable concentration", presentation.name),
        };
    }

    let dose = resolved.dose.max(0.0);
    let volume_ml = dose / per_ml;

    DoseOutcome::Computed(ComputedDose {
        dose,
        unit: presentation.unit,
        volume_ml,
        volume: snap_info(volume_ml),
        population: resolved.population,
        capped: resolved.capped,
        frequency_hours: resolved.frequency_hours,
        presentation,
        source: resolved.source,
    })
}

fn adult_dose(
    adult: &AdultDoseRule,
    patient: &PatientContext,
    advisories: &mut Vec<String>,
) -> Option<ResolvedDose> {
    let weight = patient.weight_kg;

    if patient.is_elderly() {
        if let Some(elderly) = &adult.elderly {
            if let Some(resolved) = elderly_dose(elderly, adult, weight) {
                return Some(resolved);
            }
        } else if adult.standard.is_some() {
            advisories.push("No elderly adjustment defined; standard adult dose shown".into());
        }
    }

    let standard = adult.standard.as_ref()?;
    let (dose, capped) = apply_cap(standard.amount.resolve(weight), standard.max_per_administration);

    Some(ResolvedDose {
        dose,
        capped,
        population: Population::Adult,
        frequency_hours: standard.frequency_hours.clone(),
        source: RuleSource::Structured,
        unit: implied_unit(&standard.amount),
    })
}

fn elderly_dose(elderly: &ElderlyDose, adult: &AdultDoseRule, weight: f64) -> Option<ResolvedDose> {
    let standard = adult.standard.as_ref();
    let standard_cap = standard.and_then(|s| s.max_per_administration);

    let (raw, cap, frequency_hours, unit) = match elderly {
        ElderlyDose::Range {
            amount,
            max_per_administration,
            frequency_hours,
        } => {
            let frequency = if frequency_hours.is_empty() {
                standard.map(|s| s.frequency_hours.clone()).unwrap_or_default()
            } else {
                frequency_hours.clone()
            };
            (
                amount.resolve(weight),
                max_per_administration.or(standard_cap),
                frequency,
                implied_unit(amount),
            )
        }
        ElderlyDose::Reduction {
            factor,
            max_per_administration,
        } => {
            let standard = standard?;
            (
                standard.amount.resolve(weight) * factor,
                max_per_administration.or(standard_cap),
                standard.frequency_hours.clone(),
                implied_unit(&standard.amount),
            )
        }
    };

    let (dose, capped) = apply_cap(raw, cap);
    Some(ResolvedDose {
        dose,
        capped,
        population: Population::Elderly,
        frequency_hours,
        source: RuleSource::Structured,
        unit,
    })
}

fn pediatric_dose(
    tiers: &[PediatricTier],
    patient: &PatientContext,
    advisories: &mut Vec<String>,
) -> Option<ResolvedDose> {
    let months = patient.age_months();
    let tier = tiers.iter().find(|t| t.contains(months))?;

    if !tier.routes.is_empty() && !tier.routes.contains(&patient.route) {
        advisories.push(format!(
            "Pediatric dosing for this age is given {} (selected route: {})",
            join_routes(&tier.routes),
            patient.route
        ));
    }

    let (dose, capped) = apply_cap(
        tier.amount.resolve(patient.weight_kg),
        tier.max_per_administration,
    );

    Some(ResolvedDose {
        dose,
        capped,
        population: Population::Pediatric,
        frequency_hours: tier.frequency_hours.clone(),
        source: tier.source,
        unit: implied_unit(&tier.amount),
    })
}

fn unresolved_outcome(drug: &Drug, patient: &PatientContext) -> DoseOutcome {
    let months = patient.age_months();
    let legacy_text = drug.legacy_dose.as_ref().and_then(|legacy| {
        if patient.is_pediatric() {
            legacy
                .pediatric
                .iter()
                .find(|line| {
                    months >= line.unit.to_months(line.age_min)
                        && months <= line.unit.to_months(line.age_max)
                })
                .map(|line| line.text.clone())
        } else {
            legacy.adult.clone()
        }
    });

    match legacy_text {
        Some(text) => {
            tracing::info!("Drug '{}' falls back to unstructured legacy text", drug.id);
            DoseOutcome::Unstructured { text }
        }
        None if patient.is_pediatric() => DoseOutcome::NoDosingAvailable {
            reason: format!("no pediatric dosing available for {:.0} months", months),
        },
        None => DoseOutcome::NoDosingAvailable {
            reason: "no adult dosing available".into(),
        },
    }
}

fn apply_cap(dose: f64, cap: Option<f64>) -> (f64, bool) {
    match cap {
        Some(max) if dose > max => (max, true),
        _ => (dose, false),
    }
}

fn implied_unit(amount: &DoseAmount) -> Option<DoseUnit> {
    match amount {
        DoseAmount::PerWeightMg { .. } => Some(DoseUnit::Mg),
        DoseAmount::PerWeightIu { .. } => Some(DoseUnit::Iu),
        DoseAmount::Fixed { .. } => None,
    }
}

fn join_routes(routes: &[crate::Route]) -> String {
    routes
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(" or ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AgeUnit, DoseRule, LegacyDose, LegacyPediatricDose, Route, StandardDose};

    fn presentation(concentration: f64, volume_ml: f64, unit: DoseUnit) -> Presentation {
        Presentation {
            name: format!("{} {} / {} mL", concentration, unit, volume_ml),
            concentration,
            volume_ml,
            unit,
            principal: true,
        }
    }

    fn drug_with_rule(rule: DoseRule, presentation: Presentation) -> Drug {
        Drug {
            id: "test_drug".into(),
            name: "Test Drug".into(),
            class: "test".into(),
            routes: vec![Route::Intramuscular, Route::Intravenous],
            presentations: vec![presentation],
            dose_rule: Some(rule),
            legacy_dose: None,
            diluent: None,
            label: None,
        }
    }

    fn patient(weight_kg: f64, age: f64, age_unit: AgeUnit) -> PatientContext {
        PatientContext {
            weight_kg,
            age,
            age_unit,
            route: Route::Intramuscular,
        }
    }

    fn standard_rule(min: f64, max: f64) -> AdultDoseRule {
        AdultDoseRule {
            standard: Some(StandardDose {
                amount: DoseAmount::Fixed {
                    min,
                    max: Some(max),
                },
                max_per_administration: None,
                frequency_hours: vec![8, 12],
            }),
            elderly: None,
        }
    }

    #[test]
    fn test_adult_fixed_range() {
        let drug = drug_with_rule(
            DoseRule {
                adult: Some(standard_rule(500.0, 1000.0)),
                pediatric: vec![],
            },
            presentation(1000.0, 2.0, DoseUnit::Mg),
        );

        let result = dose_for_drug(&drug, &patient(70.0, 30.0, AgeUnit::Years), None);
        let computed = result.computed().unwrap();
        assert_eq!(computed.dose, 750.0);
        assert_eq!(computed.volume_ml, 1.5);
        assert_eq!(computed.population, Population::Adult);
        assert!(!computed.capped);
        assert_eq!(computed.frequency_hours, vec![8, 12]);
    }

    #[test]
    fn test_pediatric_per_weight() {
        let drug = drug_with_rule(
            DoseRule {
                adult: None,
                pediatric: vec![PediatricTier {
                    age_min_months: 1.0,
                    age_max_months: 215.0,
                    amount: DoseAmount::PerWeightMg {
                        min_per_kg: 10.0,
                        max_per_kg: Some(15.0),
                    },
                    max_per_administration: None,
                    routes: vec![Route::Intramuscular],
                    frequency_hours: vec![6],
                    source: RuleSource::Structured,
                    deferred_months: Vec::new(),
                }],
            },
            presentation(500.0, 2.0, DoseUnit::Mg),
        );

        let result = dose_for_drug(&drug, &patient(20.0, 6.0, AgeUnit::Years), None);
        let computed = result.computed().unwrap();
        assert_eq!(computed.dose, 250.0);
        assert_eq!(computed.volume_ml, 1.0);
        assert_eq!(computed.population, Population::Pediatric);
        assert!(result.advisories.is_empty());
    }

    #[test]
    fn test_elderly_reduction_factor() {
        let mut adult = standard_rule(1000.0, 1000.0);
        adult.elderly = Some(ElderlyDose::Reduction {
            factor: 0.6,
            max_per_administration: None,
        });
        let drug = drug_with_rule(
            DoseRule {
                adult: Some(adult),
                pediatric: vec![],
            },
            presentation(1000.0, 2.0, DoseUnit::Mg),
        );

        let result = dose_for_drug(&drug, &patient(70.0, 70.0, AgeUnit::Years), None);
        let computed = result.computed().unwrap();
        assert_eq!(computed.dose, 600.0);
        assert_eq!(computed.population, Population::Elderly);
    }

    #[test]
    fn test_elderly_range_scaled_by_weight() {
        let mut adult = standard_rule(1000.0, 1000.0);
        adult.elderly = Some(ElderlyDose::Range {
            amount: DoseAmount::PerWeightMg {
                min_per_kg: 0.1,
                max_per_kg: Some(0.2),
            },
            max_per_administration: Some(10.0),
            frequency_hours: vec![],
        });
        let drug = drug_with_rule(
            DoseRule {
                adult: Some(adult),
                pediatric: vec![],
            },
            presentation(10.0, 2.0, DoseUnit::Mg),
        );

        let result = dose_for_drug(&drug, &patient(50.0, 80.0, AgeUnit::Years), None);
        let computed = result.computed().unwrap();
        assert!((computed.dose - 7.5).abs() < 1e-9);
        // elderly range inherits the standard frequency
        assert_eq!(computed.frequency_hours, vec![8, 12]);

        let heavy = dose_for_drug(&drug, &patient(90.0, 80.0, AgeUnit::Years), None);
        let computed = heavy.computed().unwrap();
        assert_eq!(computed.dose, 10.0);
        assert!(computed.capped);
    }

    #[test]
    fn test_elderly_without_rule_gets_standard_with_advisory() {
        let drug = drug_with_rule(
            DoseRule {
                adult: Some(standard_rule(500.0, 1000.0)),
                pediatric: vec![],
            },
            presentation(1000.0, 2.0, DoseUnit::Mg),
        );

        let result = dose_for_drug(&drug, &patient(70.0, 70.0, AgeUnit::Years), None);
        assert_eq!(result.dose(), Some(750.0));
        assert_eq!(result.advisories.len(), 1);
    }

    #[test]
    fn test_pediatric_cap_applies() {
        let drug = drug_with_rule(
            DoseRule {
                adult: None,
                pediatric: vec![PediatricTier {
                    age_min_months: 0.0,
                    age_max_months: 215.0,
                    amount: DoseAmount::PerWeightMg {
                        min_per_kg: 50.0,
                        max_per_kg: Some(100.0),
                    },
                    max_per_administration: Some(1000.0),
                    routes: vec![],
                    frequency_hours: vec![24],
                    source: RuleSource::Structured,
                    deferred_months: Vec::new(),
                }],
            },
            presentation(1000.0, 3.5, DoseUnit::Mg),
        );

        let result = dose_for_drug(&drug, &patient(40.0, 12.0, AgeUnit::Years), None);
        let computed = result.computed().unwrap();
        assert_eq!(computed.dose, 1000.0);
        assert!(computed.capped);
    }

    #[test]
    fn test_no_tier_for_age_is_blocked() {
        let drug = drug_with_rule(
            DoseRule {
                adult: Some(standard_rule(500.0, 1000.0)),
                pediatric: vec![PediatricTier {
                    age_min_months: 24.0,
                    age_max_months: 215.0,
                    amount: DoseAmount::Fixed {
                        min: 250.0,
                        max: None,
                    },
                    max_per_administration: None,
                    routes: vec![],
                    frequency_hours: vec![],
                    source: RuleSource::Structured,
                    deferred_months: Vec::new(),
                }],
            },
            presentation(1000.0, 2.0, DoseUnit::Mg),
        );

        let result = dose_for_drug(&drug, &patient(8.0, 10.0, AgeUnit::Months), None);
        assert!(result.blocked());
        assert!(matches!(result.outcome, DoseOutcome::NoDosingAvailable { .. }));
        assert_eq!(result.dose(), None);
    }

    #[test]
    fn test_route_mismatch_is_advisory() {
        let mut drug = drug_with_rule(
            DoseRule {
                adult: Some(standard_rule(500.0, 1000.0)),
                pediatric: vec![],
            },
            presentation(1000.0, 2.0, DoseUnit::Mg),
        );
        drug.routes = vec![Route::Intravenous];

        let result = dose_for_drug(&drug, &patient(70.0, 30.0, AgeUnit::Years), None);
        assert!(!result.blocked());
        assert_eq!(result.dose(), Some(750.0));
        assert!(result.advisories[0].contains("IM"));
    }

    #[test]
    fn test_pediatric_tier_route_mismatch_is_advisory() {
        let drug = drug_with_rule(
            DoseRule {
                adult: None,
                pediatric: vec![PediatricTier {
                    age_min_months: 1.0,
                    age_max_months: 215.0,
                    amount: DoseAmount::PerWeightMg {
                        min_per_kg: 10.0,
                        max_per_kg: Some(15.0),
                    },
                    max_per_administration: None,
                    routes: vec![Route::Intravenous],
                    frequency_hours: vec![6],
                    source: RuleSource::Structured,
                    deferred_months: Vec::new(),
                }],
            },
            presentation(500.0, 2.0, DoseUnit::Mg),
        );

        // the drug allows IM, only the tier does not
        let result = dose_for_drug(&drug, &patient(20.0, 6.0, AgeUnit::Years), None);
        assert!(!result.blocked());
        assert_eq!(result.dose(), Some(250.0));
        assert_eq!(result.advisories.len(), 1);
        assert!(result.advisories[0].contains("given IV"));
        assert!(result.advisories[0].contains("IM"));
    }

    #[test]
    fn test_missing_presentation() {
        let mut drug = drug_with_rule(DoseRule::default(), presentation(1.0, 1.0, DoseUnit::Mg));
        drug.presentations.clear();

        let result = dose_for_drug(&drug, &patient(70.0, 30.0, AgeUnit::Years), None);
        assert_eq!(result.outcome, DoseOutcome::MissingPresentation);
        assert!(result.blocked());
    }

    #[test]
    fn test_unit_mismatch_is_blocked() {
        let drug = drug_with_rule(
            DoseRule {
                adult: None,
                pediatric: vec![PediatricTier {
                    age_min_months: 0.0,
                    age_max_months: 215.0,
                    amount: DoseAmount::PerWeightIu {
                        min_per_kg: 50_000.0,
                        max_per_kg: None,
                    },
                    max_per_administration: None,
                    routes: vec![],
                    frequency_hours: vec![],
                    source: RuleSource::Structured,
                    deferred_months: Vec::new(),
                }],
            },
            presentation(500.0, 2.0, DoseUnit::Mg),
        );

        let result = dose_for_drug(&drug, &patient(20.0, 6.0, AgeUnit::Years), None);
        assert!(result.blocked());
    }

    #[test]
    fn test_unmigrated_legacy_text_is_returned_verbatim() {
        let mut drug = drug_with_rule(DoseRule::default(), presentation(4.0, 1.0, DoseUnit::Mg));
        drug.dose_rule = None;
        drug.legacy_dose = Some(LegacyDose {
            adult: None,
            pediatric: vec![LegacyPediatricDose {
                age_min: 1.0,
                age_max: 17.0,
                unit: AgeUnit::Years,
                text: "Según indicación médica".into(),
            }],
        });

        let result = dose_for_drug(&drug, &patient(20.0, 6.0, AgeUnit::Years), None);
        assert_eq!(
            result.outcome,
            DoseOutcome::Unstructured {
                text: "Según indicación médica".into()
            }
        );
        assert!(!result.blocked());
        assert_eq!(result.dose(), None);
    }

    #[test]
    fn test_explicit_presentation_overrides_default() {
        let drug = drug_with_rule(
            DoseRule {
                adult: Some(standard_rule(500.0, 1000.0)),
                pediatric: vec![],
            },
            presentation(1000.0, 2.0, DoseUnit::Mg),
        );
        let other = presentation(500.0, 5.0, DoseUnit::Mg);

        let result = dose_for_drug(&drug, &patient(70.0, 30.0, AgeUnit::Years), Some(&other));
        let computed = result.computed().unwrap();
        assert_eq!(computed.volume_ml, 7.5);
        assert_eq!(computed.volume.snapped, 7.5);
    }

    #[test]
    fn test_unknown_drug_is_not_found() {
        let catalog = crate::build_default_catalog();
        let result = calculate_dose(&catalog, "no_such_drug", &PatientContext::default(), None);
        assert!(matches!(result, Err(crate::Error::NotFound(_))));
    }
}
