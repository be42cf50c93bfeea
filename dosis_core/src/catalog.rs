//! Default catalog of injectable drugs and clinical rules.
//!
//! The built-in catalog is assembled in code and migrated once (see
//! `legacy`); an external JSON catalog can replace it through
//! `Catalog::load_from`. Either way the result is validated before use.

use crate::types::*;
use crate::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Cached default catalog, built and migrated once
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

/// Builds the default catalog with legacy doses already migrated
///
/// **Note**: prefer `get_default_catalog()` outside of tests.
pub fn build_default_catalog() -> Catalog {
    let (catalog, _) = build_unmigrated_catalog().migrate_legacy();
    catalog
}

/// Resolve the catalog for a run: an explicit JSON file, else the default
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    match path {
        Some(path) => Catalog::load_from(path),
        None => Ok(get_default_catalog().clone()),
    }
}

impl Catalog {
    /// Parse a JSON catalog without migrating or validating it
    pub fn read_from(path: &Path) -> Result<Catalog> {
        let content = std::fs::read_to_string(path)?;
        let catalog: Catalog = serde_json::from_str(&content)?;
        Ok(catalog)
    }

    /// Load a JSON catalog, migrate legacy doses and validate it
    pub fn load_from(path: &Path) -> Result<Catalog> {
        let raw = Self::read_from(path)?;
        let (catalog, report) = raw.migrate_legacy();
        for entry in report.unsupported() {
            tracing::debug!("Unmigrated legacy dose for '{}': {}", entry.drug_id, entry.text);
        }

        let errors = catalog.validate();
        if !errors.is_empty() {
            return Err(Error::CatalogValidation(errors.join("; ")));
        }

        tracing::info!(
            "Loaded catalog from {:?} ({} drugs)",
            path,
            catalog.drugs.len()
        );
        Ok(catalog)
    }

    /// Write the catalog as pretty JSON
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Every symptom id declared by the symptom groups
    pub fn symptom_ids(&self) -> BTreeSet<&str> {
        self.symptom_groups
            .iter()
            .flat_map(|g| g.symptoms.iter().map(|s| s.id.as_str()))
            .collect()
    }

    pub fn has_condition(&self, id: &str) -> bool {
        self.conditions.iter().any(|c| c.id == id)
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of problems; empty means the catalog is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let symptoms = self.symptom_ids();

        for (id, drug) in &self.drugs {
            if id.is_empty() || drug.id.is_empty() {
                errors.push("Drug has empty ID".to_string());
            }
            if id != &drug.id {
                errors.push(format!("Drug key '{}' doesn't match drug.id '{}'", id, drug.id));
            }
            if drug.name.is_empty() {
                errors.push(format!("Drug '{}' has empty name", id));
            }
            if drug.presentations.iter().filter(|p| p.principal).count() > 1 {
                errors.push(format!("Drug '{}' has more than one principal presentation", id));
            }
            for p in &drug.presentations {
                if !(p.concentration > 0.0) || !(p.volume_ml > 0.0) {
                    errors.push(format!(
                        "Drug '{}': presentation '{}' needs positive concentration and volume",
                        id, p.name
                    ));
                }
            }
            if let Some(rule) = &drug.dose_rule {
                validate_dose_rule(id, rule, &mut errors);
            }
            if let Some(diluent) = &drug.diluent {
                if diluent.options.is_empty() {
                    errors.push(format!("Drug '{}' has a diluent rule with no options", id));
                }
                for option in &diluent.options {
                    if option.proportions.is_empty()
                        || option.proportions.iter().any(|p| !(p.volume_ml > 0.0))
                    {
                        errors.push(format!(
                            "Drug '{}': diluent '{}' needs positive proportions",
                            id, option.name
                        ));
                    }
                }
            }
        }

        for record in &self.interactions {
            self.check_pair(&record.drugs, "Interaction", &mut errors);
        }
        for record in &self.pediatric_interactions {
            self.check_pair(&record.drugs, "Pediatric interaction", &mut errors);
            for band in &record.bands {
                if band.age_min_months > band.age_max_months {
                    errors.push(format!(
                        "Pediatric interaction {:?} has an inverted age band",
                        record.drugs.key()
                    ));
                }
            }
        }
        for record in &self.mix_compatibility {
            self.check_pair(&record.drugs, "Mix compatibility", &mut errors);
        }

        for record in &self.condition_interactions {
            self.check_drug(&record.drug_id, "Condition interaction", &mut errors);
            if !self.has_condition(&record.condition) {
                errors.push(format!(
                    "Condition interaction for '{}' references unknown condition '{}'",
                    record.drug_id, record.condition
                ));
            }
        }
        if !self.has_condition(&self.anesthetic_allergy_condition) {
            errors.push(format!(
                "Anesthetic allergy condition '{}' is not a known condition",
                self.anesthetic_allergy_condition
            ));
        }

        for rule in &self.syndromes {
            let context = format!("Syndrome '{}'", rule.id);
            check_rule_symptoms(
                &context,
                &rule.cardinal_symptoms,
                &rule.support_symptoms,
                rule.min_cardinal_threshold,
                &symptoms,
                &mut errors,
            );
            for flag in &rule.red_flags {
                if !symptoms.contains(flag.symptom.as_str()) {
                    errors.push(format!("{} red flag uses unknown symptom '{}'", context, flag.symptom));
                }
            }
            for id in &rule.recommended_drugs {
                self.check_drug(id, &context, &mut errors);
            }
            for forbidden in &rule.forbidden_drugs {
                self.check_drug(&forbidden.id, &context, &mut errors);
            }
        }

        for rule in &self.clinical_pictures {
            let context = format!("Clinical picture '{}'", rule.id);
            check_rule_symptoms(
                &context,
                &rule.required_symptoms,
                &rule.optional_symptoms,
                rule.min_required_threshold,
                &symptoms,
                &mut errors,
            );
            for id in &rule.recommended_drugs {
                self.check_drug(id, &context, &mut errors);
            }
            for forbidden in &rule.forbidden_drugs {
                self.check_drug(&forbidden.id, &context, &mut errors);
            }
        }

        for (id, entry) in &self.adjuvant_guide {
            self.check_drug(id, "Adjuvant guide", &mut errors);
            if entry.volume_breakpoints.iter().any(|b| !(b.volume_ml > 0.0)) {
                errors.push(format!("Adjuvant guide for '{}' has a non-positive volume", id));
            }
        }

        for combo in &self.combinations {
            if combo.drugs.len() < 2 {
                errors.push(format!("Combination '{}' needs at least two drugs", combo.name));
            }
            for id in &combo.drugs {
                self.check_drug(id, &format!("Combination '{}'", combo.name), &mut errors);
            }
        }

        errors
    }

    fn check_drug(&self, id: &str, context: &str, errors: &mut Vec<String>) {
        if !self.drugs.contains_key(id) {
            errors.push(format!("{} references non-existent drug '{}'", context, id));
        }
    }

    fn check_pair(&self, pair: &DrugPair, context: &str, errors: &mut Vec<String>) {
        self.check_drug(&pair.0, context, errors);
        self.check_drug(&pair.1, context, errors);
        if pair.0 == pair.1 {
            errors.push(format!("{} pairs '{}' with itself", context, pair.0));
        }
    }
}

fn validate_dose_rule(id: &str, rule: &DoseRule, errors: &mut Vec<String>) {
    let mut amounts: Vec<&DoseAmount> = Vec::new();
    if let Some(adult) = &rule.adult {
        if let Some(standard) = &adult.standard {
            amounts.push(&standard.amount);
        }
        match &adult.elderly {
            Some(ElderlyDose::Range { amount, .. }) => amounts.push(amount),
            Some(ElderlyDose::Reduction { factor, .. }) => {
                if !(*factor > 0.0 && *factor <= 1.0) {
                    errors.push(format!("Drug '{}': elderly factor {} outside (0, 1]", id, factor));
                }
            }
            None => {}
        }
    }
    for tier in &rule.pediatric {
        if tier.age_min_months > tier.age_max_months {
            errors.push(format!(
                "Drug '{}': pediatric tier {}-{} months is inverted",
                id, tier.age_min_months, tier.age_max_months
            ));
        }
        amounts.push(&tier.amount);
    }

    for amount in amounts {
        let (min, max) = amount.bounds();
        if !(min >= 0.0) || max.map_or(false, |max| max < min) {
            errors.push(format!("Drug '{}': invalid dose range {:?}", id, amount));
        }
    }
}

fn check_rule_symptoms(
    context: &str,
    primary: &[String],
    secondary: &[String],
    threshold: usize,
    known: &BTreeSet<&str>,
    errors: &mut Vec<String>,
) {
    if primary.is_empty() {
        errors.push(format!("{} has no primary symptoms", context));
    }
    if threshold == 0 || threshold > primary.len() {
        errors.push(format!(
            "{} threshold {} must be between 1 and {}",
            context,
            threshold,
            primary.len()
        ));
    }
    for symptom in primary.iter().chain(secondary) {
        if !known.contains(symptom.as_str()) {
            errors.push(format!("{} uses unknown symptom '{}'", context, symptom));
        }
    }
}

// ============================================================================
// Builders
// ============================================================================

fn presentation(name: &str, concentration: f64, volume_ml: f64, unit: DoseUnit, principal: bool) -> Presentation {
    Presentation {
        name: name.into(),
        concentration,
        volume_ml,
        unit,
        principal,
    }
}

fn fixed(min: f64, max: Option<f64>) -> DoseAmount {
    DoseAmount::Fixed { min, max }
}

fn mg_per_kg(min_per_kg: f64, max_per_kg: Option<f64>) -> DoseAmount {
    DoseAmount::PerWeightMg {
        min_per_kg,
        max_per_kg,
    }
}

fn standard(amount: DoseAmount, cap: Option<f64>, frequency_hours: &[u32]) -> StandardDose {
    StandardDose {
        amount,
        max_per_administration: cap,
        frequency_hours: frequency_hours.to_vec(),
    }
}

fn tier(
    age_min_months: f64,
    age_max_months: f64,
    amount: DoseAmount,
    cap: Option<f64>,
    routes: &[Route],
    frequency_hours: &[u32],
) -> PediatricTier {
    PediatricTier {
        age_min_months,
        age_max_months,
        amount,
        max_per_administration: cap,
        routes: routes.to_vec(),
        frequency_hours: frequency_hours.to_vec(),
        source: RuleSource::Structured,
        deferred_months: Vec::new(),
    }
}

fn reduction(factor: f64) -> Option<ElderlyDose> {
    Some(ElderlyDose::Reduction {
        factor,
        max_per_administration: None,
    })
}

fn label(generic: &str, brands: &[&str]) -> Option<LabelMapping> {
    Some(LabelMapping {
        generic_name: generic.into(),
        brand_names: brands.iter().map(|b| b.to_string()).collect(),
        not_approved_note: None,
    })
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn forbid(id: &str, reason: &str) -> ForbiddenDrug {
    ForbiddenDrug {
        id: id.into(),
        reason: reason.into(),
    }
}

fn red_flag(symptom: &str, message: &str) -> RedFlag {
    RedFlag {
        symptom: symptom.into(),
        message: message.into(),
    }
}

fn interaction(a: &str, b: &str, level: InteractionLevel, description: &str, advice: &str) -> InteractionRecord {
    InteractionRecord {
        drugs: DrugPair::new(a, b),
        level,
        description: description.into(),
        advice: advice.into(),
    }
}

fn condition_rule(
    drug_id: &str,
    condition: &str,
    severity: ConditionSeverity,
    blocks: bool,
    message: &str,
    recommendation: &str,
) -> ConditionInteractionRecord {
    ConditionInteractionRecord {
        drug_id: drug_id.into(),
        condition: condition.into(),
        severity,
        blocks,
        message: message.into(),
        recommendation: recommendation.into(),
    }
}

fn breakpoints(pairs: &[(f64, f64)]) -> Vec<VolumeBreakpoint> {
    pairs
        .iter()
        .map(|&(dose_threshold, volume_ml)| VolumeBreakpoint {
            dose_threshold,
            volume_ml,
        })
        .collect()
}

fn not_recommended(reason: &str) -> AdjuvantGuideEntry {
    AdjuvantGuideEntry {
        recommended: false,
        not_recommended_reason: Some(reason.into()),
        ..Default::default()
    }
}

/// The built-in catalog as authored, before legacy migration
///
/// Used by `catalog migrate` to report what the migration converts.
pub fn build_unmigrated_catalog() -> Catalog {
    use ConditionSeverity::{High, Low, Medium};
    use DoseUnit::{Iu, Mg};
    use InteractionLevel::{Caution, Contraindicated, Dangerous};
    use Route::{Intramuscular as IM, Intravenous as IV, Subcutaneous as SC};

    let mut drugs = BTreeMap::new();
    let mut add = |drug: Drug| {
        drugs.insert(drug.id.clone(), drug);
    };

    // ========================================================================
    // Antibiotics
    // ========================================================================

    add(Drug {
        id: "ceftriaxona".into(),
        name: "Ceftriaxona".into(),
        class: "Cefalosporina de 3ª generación".into(),
        routes: vec![IM, IV],
        presentations: vec![
            presentation("Ceftriaxona 1 g", 1000.0, 3.5, Mg, true),
            presentation("Ceftriaxona 500 mg", 500.0, 2.0, Mg, false),
        ],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(1000.0, Some(2000.0)), Some(2000.0), &[24, 12])),
                elderly: None,
            }),
            pediatric: vec![
                tier(0.0, 1.0, mg_per_kg(20.0, Some(50.0)), None, &[IV, IM], &[24]),
                tier(1.0, 216.0, mg_per_kg(50.0, Some(75.0)), Some(2000.0), &[IM, IV], &[24]),
            ],
        }),
        legacy_dose: None,
        diluent: Some(DiluentRule {
            options: vec![
                DiluentOption {
                    name: "Lidocaína 1% sin epinefrina".into(),
                    min_age_months: Some(12.0),
                    max_age_months: None,
                    routes: vec![IM],
                    proportions: vec![
                        DiluentProportion { dose: 500.0, volume_ml: 2.0 },
                        DiluentProportion { dose: 1000.0, volume_ml: 3.5 },
                    ],
                },
                DiluentOption {
                    name: "Agua estéril para inyectables".into(),
                    min_age_months: None,
                    max_age_months: None,
                    routes: vec![IM, IV],
                    proportions: vec![
                        DiluentProportion { dose: 500.0, volume_ml: 5.0 },
                        DiluentProportion { dose: 1000.0, volume_ml: 10.0 },
                    ],
                },
            ],
            fallback_to_first: true,
        }),
        label: label("ceftriaxone", &["Rocephin"]),
    });

    add(Drug {
        id: "penicilina".into(),
        name: "Penicilina G benzatínica".into(),
        class: "Penicilina de depósito".into(),
        routes: vec![IM],
        presentations: vec![
            presentation("Penicilina benzatínica 1.200.000 UI", 1_200_000.0, 4.0, Iu, true),
            presentation("Penicilina benzatínica 2.400.000 UI", 2_400_000.0, 5.0, Iu, false),
        ],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(2_400_000.0, None), Some(2_400_000.0), &[])),
                elderly: None,
            }),
            pediatric: vec![],
        }),
        legacy_dose: Some(LegacyDose {
            adult: None,
            pediatric: vec![LegacyPediatricDose {
                age_min: 0.0,
                age_max: 18.0,
                unit: AgeUnit::Years,
                text: "50000 UI/kg IM dosis única".into(),
            }],
        }),
        diluent: Some(DiluentRule {
            options: vec![
                DiluentOption {
                    name: "Lidocaína 1% sin epinefrina".into(),
                    min_age_months: Some(12.0),
                    max_age_months: None,
                    routes: vec![IM],
                    proportions: vec![
                        DiluentProportion { dose: 1_200_000.0, volume_ml: 4.0 },
                        DiluentProportion { dose: 2_400_000.0, volume_ml: 5.0 },
                    ],
                },
                DiluentOption {
                    name: "Agua para inyectables".into(),
                    min_age_months: None,
                    max_age_months: Some(12.0),
                    routes: vec![IM],
                    proportions: vec![
                        DiluentProportion { dose: 1_200_000.0, volume_ml: 4.0 },
                        DiluentProportion { dose: 2_400_000.0, volume_ml: 5.0 },
                    ],
                },
            ],
            fallback_to_first: false,
        }),
        label: label("penicillin g benzathine", &["Bicillin L-A", "Benzetacil"]),
    });

    // ========================================================================
    // Analgesics and anti-inflammatories
    // ========================================================================

    add(Drug {
        id: "diclofenac".into(),
        name: "Diclofenac sódico".into(),
        class: "AINE".into(),
        routes: vec![IM],
        presentations: vec![presentation("Diclofenac 75 mg / 3 mL", 75.0, 3.0, Mg, true)],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(75.0, None), Some(75.0), &[12])),
                elderly: reduction(0.75),
            }),
            pediatric: vec![],
        }),
        legacy_dose: None,
        diluent: None,
        label: label("diclofenac", &["Voltaren"]),
    });

    add(Drug {
        id: "metamizol".into(),
        name: "Metamizol sódico".into(),
        class: "Analgésico antipirético".into(),
        routes: vec![IM, IV],
        presentations: vec![
            presentation("Metamizol 1 g / 2 mL", 1000.0, 2.0, Mg, true),
            presentation("Metamizol 2,5 g / 5 mL", 2500.0, 5.0, Mg, false),
        ],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(1000.0, Some(2000.0)), Some(2000.0), &[6, 8])),
                elderly: Some(ElderlyDose::Range {
                    amount: fixed(500.0, Some(1000.0)),
                    max_per_administration: Some(1000.0),
                    frequency_hours: vec![8],
                }),
            }),
            pediatric: vec![],
        }),
        legacy_dose: Some(LegacyDose {
            adult: None,
            pediatric: vec![LegacyPediatricDose {
                age_min: 3.0,
                age_max: 216.0,
                unit: AgeUnit::Months,
                text: "10-15 mg/kg IM o IV cada 6 horas, máximo 1000 mg por dosis".into(),
            }],
        }),
        diluent: None,
        label: Some(LabelMapping {
            generic_name: "metamizole".into(),
            brand_names: vec!["Novalgina".into(), "Dipirona".into()],
            not_approved_note: Some(
                "Metamizol (dipirona) no está aprobado por la FDA; no hay ficha técnica disponible."
                    .into(),
            ),
        }),
    });

    add(Drug {
        id: "ketorolaco".into(),
        name: "Ketorolaco trometamina".into(),
        class: "AINE".into(),
        routes: vec![IM, IV],
        presentations: vec![
            presentation("Ketorolaco 30 mg / 1 mL", 30.0, 1.0, Mg, true),
            presentation("Ketorolaco 60 mg / 2 mL", 60.0, 2.0, Mg, false),
        ],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(30.0, Some(60.0)), Some(60.0), &[6, 8])),
                elderly: Some(ElderlyDose::Range {
                    amount: fixed(15.0, Some(30.0)),
                    max_per_administration: Some(30.0),
                    frequency_hours: vec![],
                }),
            }),
            pediatric: vec![tier(24.0, 216.0, mg_per_kg(0.5, None), Some(30.0), &[IM, IV], &[6, 8])],
        }),
        legacy_dose: None,
        diluent: None,
        label: label("ketorolac", &["Toradol"]),
    });

    add(Drug {
        id: "tramadol".into(),
        name: "Tramadol".into(),
        class: "Opioide débil".into(),
        routes: vec![IM, IV, SC],
        presentations: vec![presentation("Tramadol 100 mg / 2 mL", 100.0, 2.0, Mg, true)],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(50.0, Some(100.0)), Some(100.0), &[6, 8])),
                elderly: reduction(0.5),
            }),
            pediatric: vec![tier(144.0, 216.0, mg_per_kg(1.0, Some(2.0)), Some(100.0), &[IM, IV], &[6, 8])],
        }),
        legacy_dose: None,
        diluent: None,
        label: label("tramadol", &["Ultram"]),
    });

    // ========================================================================
    // Corticosteroids and antihistamines
    // ========================================================================

    add(Drug {
        id: "hidrocortisona".into(),
        name: "Hidrocortisona succinato".into(),
        class: "Corticoide".into(),
        routes: vec![IM, IV],
        presentations: vec![
            presentation("Hidrocortisona 100 mg / 2 mL", 100.0, 2.0, Mg, true),
            presentation("Hidrocortisona 500 mg / 4 mL", 500.0, 4.0, Mg, false),
        ],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(100.0, Some(500.0)), Some(500.0), &[6])),
                elderly: None,
            }),
            pediatric: vec![tier(0.0, 216.0, mg_per_kg(2.0, Some(4.0)), Some(100.0), &[IV, IM], &[6])],
        }),
        legacy_dose: None,
        diluent: None,
        label: label("hydrocortisone sodium succinate", &["Solu-Cortef"]),
    });

    add(Drug {
        id: "dexametasona".into(),
        name: "Dexametasona".into(),
        class: "Corticoide".into(),
        routes: vec![IM, IV],
        presentations: vec![
            presentation("Dexametasona 8 mg / 2 mL", 8.0, 2.0, Mg, true),
            presentation("Dexametasona 4 mg / 1 mL", 4.0, 1.0, Mg, false),
        ],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(4.0, Some(8.0)), Some(8.0), &[24])),
                elderly: None,
            }),
            pediatric: vec![],
        }),
        legacy_dose: Some(LegacyDose {
            adult: None,
            pediatric: vec![LegacyPediatricDose {
                age_min: 0.0,
                age_max: 18.0,
                unit: AgeUnit::Years,
                text: "0.15-0.6 mg/kg IM o IV cada 24 horas, máximo 10 mg".into(),
            }],
        }),
        diluent: None,
        label: label("dexamethasone sodium phosphate", &["Decadron"]),
    });

    add(Drug {
        id: "difenhidramina".into(),
        name: "Difenhidramina".into(),
        class: "Antihistamínico H1".into(),
        routes: vec![IM, IV],
        presentations: vec![presentation("Difenhidramina 20 mg / 2 mL", 20.0, 2.0, Mg, true)],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(25.0, Some(50.0)), Some(50.0), &[6, 8])),
                elderly: reduction(0.5),
            }),
            pediatric: vec![tier(24.0, 216.0, mg_per_kg(1.0, Some(1.25)), Some(50.0), &[IM, IV], &[6])],
        }),
        legacy_dose: None,
        diluent: None,
        label: label("diphenhydramine", &["Benadryl"]),
    });

    // ========================================================================
    // Emergency drugs
    // ========================================================================

    add(Drug {
        id: "adrenalina".into(),
        name: "Adrenalina".into(),
        class: "Simpaticomimético".into(),
        routes: vec![IM, SC, IV],
        presentations: vec![presentation("Adrenalina 1 mg / 1 mL (1:1000)", 1.0, 1.0, Mg, true)],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(0.3, Some(0.5)), Some(0.5), &[])),
                elderly: None,
            }),
            pediatric: vec![tier(0.0, 216.0, mg_per_kg(0.01, None), Some(0.5), &[IM], &[])],
        }),
        legacy_dose: None,
        diluent: None,
        label: label("epinephrine", &["EpiPen", "Adrenalin"]),
    });

    add(Drug {
        id: "atropina".into(),
        name: "Atropina".into(),
        class: "Anticolinérgico".into(),
        routes: vec![IV, IM, SC],
        presentations: vec![presentation("Atropina 1 mg / 1 mL", 1.0, 1.0, Mg, true)],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(0.5, Some(1.0)), Some(1.0), &[])),
                elderly: None,
            }),
            pediatric: vec![tier(0.0, 216.0, mg_per_kg(0.02, None), Some(0.5), &[IV, IM], &[])],
        }),
        legacy_dose: None,
        diluent: None,
        label: label("atropine sulfate", &[]),
    });

    add(Drug {
        id: "diazepam".into(),
        name: "Diazepam".into(),
        class: "Benzodiacepina".into(),
        routes: vec![IV, IM],
        presentations: vec![presentation("Diazepam 10 mg / 2 mL", 10.0, 2.0, Mg, true)],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(5.0, Some(10.0)), Some(10.0), &[])),
                elderly: Some(ElderlyDose::Range {
                    amount: fixed(2.0, Some(5.0)),
                    max_per_administration: Some(5.0),
                    frequency_hours: vec![],
                }),
            }),
            pediatric: vec![tier(1.0, 216.0, mg_per_kg(0.2, Some(0.3)), Some(10.0), &[IV, IM], &[])],
        }),
        legacy_dose: None,
        diluent: None,
        label: label("diazepam", &["Valium"]),
    });

    add(Drug {
        id: "lorazepam".into(),
        name: "Lorazepam".into(),
        class: "Benzodiacepina".into(),
        routes: vec![IV, IM],
        presentations: vec![presentation("Lorazepam 4 mg / 1 mL", 4.0, 1.0, Mg, true)],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(2.0, Some(4.0)), Some(4.0), &[])),
                elderly: reduction(0.5),
            }),
            pediatric: vec![tier(1.0, 216.0, mg_per_kg(0.05, Some(0.1)), Some(4.0), &[IV], &[])],
        }),
        legacy_dose: None,
        diluent: None,
        label: label("lorazepam", &["Ativan"]),
    });

    // ========================================================================
    // Antiemetics
    // ========================================================================

    add(Drug {
        id: "ondansetron".into(),
        name: "Ondansetrón".into(),
        class: "Antiemético 5-HT3".into(),
        routes: vec![IM, IV],
        presentations: vec![
            presentation("Ondansetrón 8 mg / 4 mL", 8.0, 4.0, Mg, true),
            presentation("Ondansetrón 4 mg / 2 mL", 4.0, 2.0, Mg, false),
        ],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(4.0, Some(8.0)), Some(8.0), &[8])),
                elderly: None,
            }),
            pediatric: vec![tier(6.0, 216.0, mg_per_kg(0.15, None), Some(4.0), &[IV, IM], &[8])],
        }),
        legacy_dose: None,
        diluent: None,
        label: label("ondansetron", &["Zofran"]),
    });

    add(Drug {
        id: "metoclopramida".into(),
        name: "Metoclopramida".into(),
        class: "Antiemético procinético".into(),
        routes: vec![IM, IV],
        presentations: vec![presentation("Metoclopramida 10 mg / 2 mL", 10.0, 2.0, Mg, true)],
        dose_rule: Some(DoseRule {
            adult: Some(AdultDoseRule {
                standard: Some(standard(fixed(10.0, None), Some(10.0), &[8])),
                elderly: reduction(0.5),
            }),
            pediatric: vec![],
        }),
        legacy_dose: Some(LegacyDose {
            adult: None,
            pediatric: vec![LegacyPediatricDose {
                age_min: 0.0,
                age_max: 18.0,
                unit: AgeUnit::Years,
                text: "No recomendado en menores de 1 año. Mayores: uso restringido, consultar especialista por riesgo extrapiramidal.".into(),
            }],
        }),
        diluent: None,
        label: label("metoclopramide", &["Reglan", "Primperan"]),
    });

    // ========================================================================
    // Drug-drug interactions
    // ========================================================================

    let interactions = vec![
        interaction(
            "diclofenac",
            "ketorolaco",
            Contraindicated,
            "Dos AINE simultáneos: suma de toxicidad gastrointestinal y renal sin beneficio analgésico adicional.",
            "Elegir un solo AINE.",
        ),
        interaction(
            "diazepam",
            "lorazepam",
            Dangerous,
            "Duplicidad de benzodiacepinas: depresión respiratoria aditiva.",
            "Usar una sola benzodiacepina y titular.",
        ),
        interaction(
            "tramadol",
            "diazepam",
            Dangerous,
            "Opioide con benzodiacepina: riesgo de depresión respiratoria grave.",
            "Evitar la combinación; si es imprescindible, monitorizar saturación.",
        ),
        interaction(
            "tramadol",
            "lorazepam",
            Dangerous,
            "Opioide con benzodiacepina: riesgo de depresión respiratoria grave.",
            "Evitar la combinación; si es imprescindible, monitorizar saturación.",
        ),
        interaction(
            "tramadol",
            "ondansetron",
            Caution,
            "Riesgo de síndrome serotoninérgico y posible reducción del efecto analgésico.",
            "Vigilar agitación, temblor e hipertermia.",
        ),
        interaction(
            "tramadol",
            "metoclopramida",
            Caution,
            "Ambos reducen el umbral convulsivo.",
            "Evitar en pacientes con antecedente de convulsiones.",
        ),
        interaction(
            "ondansetron",
            "metoclopramida",
            Caution,
            "Prolongación aditiva del intervalo QT.",
            "Considerar ECG en pacientes con cardiopatía.",
        ),
        interaction(
            "ketorolaco",
            "metamizol",
            Caution,
            "Mayor riesgo de efectos adversos gastrointestinales y renales.",
            "Limitar a una dosis y asegurar hidratación.",
        ),
        interaction(
            "diclofenac",
            "metamizol",
            Caution,
            "Mayor riesgo de efectos adversos gastrointestinales y renales.",
            "Limitar a una dosis y asegurar hidratación.",
        ),
        interaction(
            "hidrocortisona",
            "diclofenac",
            Caution,
            "Corticoide con AINE: aumento del riesgo de sangrado digestivo.",
            "Valorar protección gástrica.",
        ),
        interaction(
            "dexametasona",
            "ketorolaco",
            Caution,
            "Corticoide con AINE: aumento del riesgo de sangrado digestivo.",
            "Valorar protección gástrica.",
        ),
        interaction(
            "difenhidramina",
            "diazepam",
            Caution,
            "Sedación aditiva.",
            "Vigilar nivel de conciencia.",
        ),
        interaction(
            "difenhidramina",
            "metoclopramida",
            Caution,
            "Efectos anticolinérgicos y sedantes aditivos.",
            "Combinación habitual; vigilar sedación.",
        ),
        interaction(
            "adrenalina",
            "atropina",
            Caution,
            "Taquicardia aditiva.",
            "Monitorizar frecuencia cardiaca.",
        ),
    ];

    let pediatric_interactions = vec![
        PediatricInteractionRecord {
            drugs: DrugPair::new("difenhidramina", "metoclopramida"),
            description: "En lactantes, riesgo de depresión respiratoria y reacciones extrapiramidales.".into(),
            advice: "No asociar en menores de 2 años.".into(),
            bands: vec![
                PediatricBand {
                    age_min_months: 0.0,
                    age_max_months: 24.0,
                    level: Dangerous,
                },
                PediatricBand {
                    age_min_months: 24.0,
                    age_max_months: 216.0,
                    level: Caution,
                },
            ],
        },
        PediatricInteractionRecord {
            drugs: DrugPair::new("difenhidramina", "diazepam"),
            description: "Sedación profunda y depresión respiratoria en niños pequeños.".into(),
            advice: "Evitar en menores de 2 años; en mayores vigilar saturación.".into(),
            bands: vec![
                PediatricBand {
                    age_min_months: 0.0,
                    age_max_months: 24.0,
                    level: Dangerous,
                },
                PediatricBand {
                    age_min_months: 24.0,
                    age_max_months: 216.0,
                    level: Caution,
                },
            ],
        },
        PediatricInteractionRecord {
            drugs: DrugPair::new("tramadol", "ondansetron"),
            description: "Riesgo serotoninérgico mayor en adolescentes con bajo peso.".into(),
            advice: "Preferir otro antiemético.".into(),
            bands: vec![PediatricBand {
                age_min_months: 144.0,
                age_max_months: 216.0,
                level: Caution,
            }],
        },
    ];

    let mix_compatibility = vec![
        MixCompatibilityRecord {
            drugs: DrugPair::new("ceftriaxona", "hidrocortisona"),
            pediatric: PediatricMix::Banded(vec![
                MixBand {
                    age_min_months: 0.0,
                    age_max_months: 12.0,
                    compatibility: Compatibility::Dangerous,
                },
                MixBand {
                    age_min_months: 12.0,
                    age_max_months: 216.0,
                    compatibility: Compatibility::Caution,
                },
            ]),
            comment: "Precipitación descrita en la misma jeringa; administrar por separado.".into(),
        },
        MixCompatibilityRecord {
            drugs: DrugPair::new("diclofenac", "metamizol"),
            pediatric: PediatricMix::Flat(Compatibility::Caution),
            comment: "No mezclar en la misma jeringa en pediatría.".into(),
        },
        MixCompatibilityRecord {
            drugs: DrugPair::new("dexametasona", "ondansetron"),
            pediatric: PediatricMix::Flat(Compatibility::Compatible),
            comment: "Compatibles en la misma jeringa.".into(),
        },
        MixCompatibilityRecord {
            drugs: DrugPair::new("dexametasona", "difenhidramina"),
            pediatric: PediatricMix::Flat(Compatibility::Caution),
            comment: "Posible turbidez; preferir jeringas separadas.".into(),
        },
        MixCompatibilityRecord {
            drugs: DrugPair::new("ketorolaco", "difenhidramina"),
            pediatric: PediatricMix::Flat(Compatibility::Contraindicated),
            comment: "Precipitado inmediato al mezclar.".into(),
        },
    ];

    // ========================================================================
    // Conditions
    // ========================================================================

    let conditions = [
        ("embarazo", "Embarazo"),
        ("lactancia", "Lactancia"),
        ("renal", "Insuficiencia renal"),
        ("hepatica", "Insuficiencia hepática"),
        ("asma", "Asma"),
        ("ulcera_peptica", "Úlcera péptica / sangrado digestivo"),
        ("epilepsia", "Epilepsia"),
        ("glaucoma", "Glaucoma de ángulo cerrado"),
        ("cardiopatia", "Cardiopatía isquémica"),
        ("diabetes", "Diabetes"),
        ("alergia_penicilina", "Alergia a penicilina"),
        ("alergia_aines", "Alergia a AINE"),
        ("alergia_anestesicos", "Alergia a anestésicos locales"),
    ]
    .iter()
    .map(|(id, label)| Condition {
        id: id.to_string(),
        label: label.to_string(),
    })
    .collect();

    let condition_interactions = vec![
        condition_rule("diclofenac", "embarazo", High, true, "AINE contraindicado en el tercer trimestre (cierre del ductus).", "Usar metamizol o paracetamol."),
        condition_rule("ketorolaco", "embarazo", High, true, "AINE contraindicado en el embarazo.", "Usar otra alternativa analgésica."),
        condition_rule("metamizol", "embarazo", Medium, false, "Evitar en el primer y tercer trimestre.", "Usar solo si no hay alternativa."),
        condition_rule("tramadol", "lactancia", Medium, false, "Se excreta en leche materna.", "Dosis única; vigilar sedación del lactante."),
        condition_rule("ketorolaco", "renal", High, true, "Riesgo de fallo renal agudo.", "Evitar AINE; usar metamizol a dosis reducida."),
        condition_rule("diclofenac", "renal", High, false, "Puede deteriorar la función renal.", "Evitar o usar dosis única con hidratación."),
        condition_rule("metamizol", "renal", Medium, false, "Eliminación reducida.", "Espaciar dosis."),
        condition_rule("diazepam", "hepatica", High, false, "Acumulación de metabolitos activos.", "Preferir lorazepam."),
        condition_rule("lorazepam", "hepatica", Low, false, "Metabolismo por glucuronidación conservado.", "Sin ajuste habitual."),
        condition_rule("metamizol", "hepatica", Low, false, "Metabolismo hepático.", "Vigilar en uso repetido."),
        condition_rule("diclofenac", "asma", Medium, false, "Puede precipitar broncoespasmo en asma sensible a AINE.", "Preguntar por antecedentes."),
        condition_rule("ketorolaco", "asma", Medium, false, "Puede precipitar broncoespasmo en asma sensible a AINE.", "Preguntar por antecedentes."),
        condition_rule("diclofenac", "ulcera_peptica", High, true, "Riesgo de sangrado digestivo.", "Usar analgésico no AINE."),
        condition_rule("ketorolaco", "ulcera_peptica", High, true, "Riesgo de sangrado digestivo.", "Usar analgésico no AINE."),
        condition_rule("hidrocortisona", "ulcera_peptica", Medium, false, "Puede agravar la úlcera.", "Asociar protección gástrica."),
        condition_rule("tramadol", "epilepsia", High, true, "Reduce el umbral convulsivo.", "Usar otro analgésico."),
        condition_rule("metoclopramida", "epilepsia", Medium, false, "Puede aumentar la frecuencia de crisis.", "Preferir ondansetrón."),
        condition_rule("atropina", "glaucoma", High, true, "Puede precipitar crisis de glaucoma agudo.", "Evitar salvo emergencia vital."),
        condition_rule("difenhidramina", "glaucoma", Medium, false, "Efecto anticolinérgico.", "Vigilar dolor ocular."),
        condition_rule("adrenalina", "cardiopatia", Medium, false, "Aumenta el consumo miocárdico de oxígeno.", "No retrasar en anafilaxia; monitorizar."),
        condition_rule("ondansetron", "cardiopatia", Medium, false, "Prolonga el intervalo QT.", "Considerar ECG."),
        condition_rule("dexametasona", "diabetes", Medium, false, "Hiperglucemia transitoria.", "Controlar glucemia."),
        condition_rule("hidrocortisona", "diabetes", Medium, false, "Hiperglucemia transitoria.", "Controlar glucemia."),
        condition_rule("penicilina", "alergia_penicilina", High, true, "Riesgo de anafilaxia.", "Usar un antibiótico de otra familia."),
        condition_rule("ceftriaxona", "alergia_penicilina", High, false, "Reactividad cruzada baja pero posible.", "Evitar si la alergia fue anafiláctica."),
        condition_rule("diclofenac", "alergia_aines", High, true, "Hipersensibilidad a AINE.", "Usar analgésico de otra familia."),
        condition_rule("ketorolaco", "alergia_aines", High, true, "Hipersensibilidad a AINE.", "Usar analgésico de otra familia."),
        condition_rule("metamizol", "alergia_aines", High, true, "Reactividad cruzada con AINE.", "Usar tramadol si no hay contraindicación."),
    ];

    // ========================================================================
    // Symptoms, syndromes and clinical pictures
    // ========================================================================

    let group = |id: &str, label: &str, symptoms: &[(&str, &str)]| SymptomGroup {
        id: id.into(),
        label: label.into(),
        symptoms: symptoms
            .iter()
            .map(|(id, label)| Symptom {
                id: id.to_string(),
                label: label.to_string(),
            })
            .collect(),
    };

    let symptom_groups = vec![
        group(
            "generales",
            "Generales",
            &[
                ("fiebre", "Fiebre"),
                ("escalofrios", "Escalofríos"),
                ("cefalea", "Cefalea"),
                ("mialgias", "Mialgias"),
                ("artralgias", "Artralgias"),
                ("dolor_retroocular", "Dolor retroocular"),
                ("dolor_agudo", "Dolor agudo intenso"),
            ],
        ),
        group(
            "respiratorios",
            "Respiratorios",
            &[
                ("tos", "Tos"),
                ("odinofagia", "Odinofagia"),
                ("rinorrea", "Rinorrea"),
                ("disnea", "Disnea"),
                ("sibilancias", "Sibilancias"),
            ],
        ),
        group(
            "digestivos",
            "Digestivos",
            &[
                ("nauseas", "Náuseas"),
                ("vomitos", "Vómitos"),
                ("diarrea", "Diarrea"),
                ("dolor_abdominal", "Dolor abdominal"),
            ],
        ),
        group(
            "piel",
            "Piel y mucosas",
            &[
                ("exantema", "Exantema"),
                ("prurito", "Prurito"),
                ("urticaria", "Urticaria"),
                ("angioedema", "Angioedema"),
                ("petequias", "Petequias"),
                ("sangrado_mucosas", "Sangrado de mucosas"),
            ],
        ),
        group(
            "neurologicos",
            "Neurológicos",
            &[
                ("convulsiones", "Convulsiones"),
                ("rigidez_nuca", "Rigidez de nuca"),
                ("alteracion_conciencia", "Alteración de la conciencia"),
            ],
        ),
        group(
            "otros",
            "Otros",
            &[
                ("hipotension", "Hipotensión"),
                ("dolor_lumbar", "Dolor lumbar / flanco"),
                ("hematuria", "Hematuria"),
            ],
        ),
    ];

    let nsaid_dengue = "Riesgo de sangrado mientras no se descarte dengue.";
    let syndromes = vec![
        SyndromeRule {
            id: "dengue".into(),
            name: "Dengue".into(),
            cardinal_symptoms: ids(&["fiebre", "cefalea", "dolor_retroocular", "mialgias"]),
            support_symptoms: ids(&["artralgias", "exantema", "nauseas", "vomitos"]),
            min_cardinal_threshold: 2,
            red_flags: vec![
                red_flag("dolor_abdominal", "Dolor abdominal intenso: signo de alarma de dengue grave."),
                red_flag("sangrado_mucosas", "Sangrado de mucosas: derivar para control de plaquetas."),
                red_flag("alteracion_conciencia", "Alteración de conciencia: dengue grave probable."),
            ],
            recommended_drugs: ids(&["metamizol", "ondansetron"]),
            forbidden_drugs: vec![forbid("diclofenac", nsaid_dengue), forbid("ketorolaco", nsaid_dengue)],
            differential_guide: "Diferenciar de chikungunya (artralgias intensas) e influenza (síntomas respiratorios).".into(),
            management_guide: "Hidratación, antipiréticos no AINE, control de signos de alarma.".into(),
        },
        SyndromeRule {
            id: "chikungunya".into(),
            name: "Chikungunya".into(),
            cardinal_symptoms: ids(&["fiebre", "artralgias"]),
            support_symptoms: ids(&["exantema", "mialgias", "cefalea"]),
            min_cardinal_threshold: 2,
            red_flags: vec![],
            recommended_drugs: ids(&["metamizol"]),
            forbidden_drugs: vec![forbid("diclofenac", nsaid_dengue), forbid("ketorolaco", nsaid_dengue)],
            differential_guide: "Las artralgias incapacitantes orientan frente a dengue.".into(),
            management_guide: "Analgesia no AINE hasta descartar dengue.".into(),
        },
        SyndromeRule {
            id: "influenza".into(),
            name: "Influenza".into(),
            cardinal_symptoms: ids(&["fiebre", "tos", "mialgias"]),
            support_symptoms: ids(&["cefalea", "odinofagia", "rinorrea", "escalofrios"]),
            min_cardinal_threshold: 2,
            red_flags: vec![red_flag("disnea", "Disnea: valorar neumonía o insuficiencia respiratoria.")],
            recommended_drugs: ids(&["metamizol"]),
            forbidden_drugs: vec![],
            differential_guide: "Tos y rinorrea orientan a influenza frente a arbovirosis.".into(),
            management_guide: "Sintomático; valorar antiviral en grupos de riesgo.".into(),
        },
        SyndromeRule {
            id: "meningitis".into(),
            name: "Meningitis bacteriana".into(),
            cardinal_symptoms: ids(&["fiebre", "rigidez_nuca", "cefalea", "alteracion_conciencia"]),
            support_symptoms: ids(&["vomitos", "petequias", "convulsiones"]),
            min_cardinal_threshold: 3,
            red_flags: vec![
                red_flag("petequias", "Petequias: sospechar meningococemia, antibiótico inmediato."),
                red_flag("convulsiones", "Convulsiones: traslado urgente."),
            ],
            recommended_drugs: ids(&["ceftriaxona", "dexametasona"]),
            forbidden_drugs: vec![],
            differential_guide: "Rigidez de nuca con fiebre obliga a descartar meningitis.".into(),
            management_guide: "Primera dosis de ceftriaxona sin demorar el traslado.".into(),
        },
        SyndromeRule {
            id: "gastroenteritis".into(),
            name: "Gastroenteritis aguda".into(),
            cardinal_symptoms: ids(&["diarrea", "vomitos", "dolor_abdominal"]),
            support_symptoms: ids(&["fiebre", "nauseas"]),
            min_cardinal_threshold: 2,
            red_flags: vec![red_flag("hipotension", "Hipotensión: deshidratación grave.")],
            recommended_drugs: ids(&["ondansetron"]),
            forbidden_drugs: vec![forbid(
                "metoclopramida",
                "Riesgo extrapiramidal en niños; preferir ondansetrón.",
            )],
            differential_guide: "Dolor abdominal localizado orienta a causa quirúrgica.".into(),
            management_guide: "Rehidratación oral; antiemético si impide la hidratación.".into(),
        },
    ];

    let clinical_pictures = vec![
        ClinicalPictureRule {
            id: "anafilaxia".into(),
            name: "Anafilaxia".into(),
            description: "Reacción alérgica sistémica grave.".into(),
            required_symptoms: ids(&["urticaria", "angioedema", "disnea", "hipotension"]),
            optional_symptoms: ids(&["prurito", "sibilancias", "vomitos"]),
            min_required_threshold: 2,
            recommended_drugs: ids(&["adrenalina", "difenhidramina", "hidrocortisona"]),
            forbidden_drugs: vec![],
            clinical_notes: "Adrenalina IM en cara anterolateral del muslo es el tratamiento de primera línea.".into(),
            is_emergency: true,
        },
        ClinicalPictureRule {
            id: "urticaria_aguda".into(),
            name: "Urticaria aguda".into(),
            description: "Habones pruriginosos sin compromiso sistémico.".into(),
            required_symptoms: ids(&["urticaria", "prurito"]),
            optional_symptoms: ids(&["angioedema"]),
            min_required_threshold: 1,
            recommended_drugs: ids(&["difenhidramina", "dexametasona"]),
            forbidden_drugs: vec![],
            clinical_notes: "Descartar compromiso respiratorio o hemodinámico.".into(),
            is_emergency: false,
        },
        ClinicalPictureRule {
            id: "crisis_convulsiva".into(),
            name: "Crisis convulsiva".into(),
            description: "Convulsión activa o prolongada.".into(),
            required_symptoms: ids(&["convulsiones"]),
            optional_symptoms: ids(&["fiebre", "alteracion_conciencia"]),
            min_required_threshold: 1,
            recommended_drugs: ids(&["diazepam", "lorazepam"]),
            forbidden_drugs: vec![forbid("tramadol", "Reduce el umbral convulsivo.")],
            clinical_notes: "Benzodiacepina si la crisis dura más de 5 minutos.".into(),
            is_emergency: true,
        },
        ClinicalPictureRule {
            id: "colico_renal".into(),
            name: "Cólico renal".into(),
            description: "Dolor lumbar cólico irradiado.".into(),
            required_symptoms: ids(&["dolor_lumbar", "dolor_agudo"]),
            optional_symptoms: ids(&["nauseas", "vomitos", "hematuria"]),
            min_required_threshold: 2,
            recommended_drugs: ids(&["ketorolaco", "diclofenac", "metamizol"]),
            forbidden_drugs: vec![],
            clinical_notes: "Los AINE son de primera línea si la función renal es normal.".into(),
            is_emergency: false,
        },
        ClinicalPictureRule {
            id: "nauseas_vomitos".into(),
            name: "Náuseas y vómitos".into(),
            description: "Náuseas o vómitos que impiden la vía oral.".into(),
            required_symptoms: ids(&["nauseas", "vomitos"]),
            optional_symptoms: ids(&["dolor_abdominal", "cefalea"]),
            min_required_threshold: 1,
            recommended_drugs: ids(&["ondansetron", "metoclopramida"]),
            forbidden_drugs: vec![],
            clinical_notes: "En niños preferir ondansetrón.".into(),
            is_emergency: false,
        },
    ];

    // ========================================================================
    // Local anesthetic (lidocaine 1%) guide
    // ========================================================================

    let mut adjuvant_guide = BTreeMap::new();
    adjuvant_guide.insert(
        "ceftriaxona".to_string(),
        AdjuvantGuideEntry {
            recommended: true,
            evidence: Some(EvidenceLevel::High),
            note: Some("Diluyente aprobado en ficha técnica. Lidocaína 1% sin epinefrina.".into()),
            warning: Some("La solución con lidocaína NO debe administrarse IV.".into()),
            weight_min_kg: Some(5.0),
            restriction_note: Some("Solo en pacientes >5 kg. Menores usar agua estéril.".into()),
            volume_breakpoints: breakpoints(&[(250.0, 0.9), (500.0, 1.0), (1000.0, 2.1), (2000.0, 3.5)]),
            ..Default::default()
        },
    );
    adjuvant_guide.insert(
        "penicilina".to_string(),
        AdjuvantGuideEntry {
            recommended: true,
            evidence: Some(EvidenceLevel::High),
            note: Some("Reduce significativamente el dolor sin alterar la farmacocinética.".into()),
            age_min_months: Some(12.0),
            restriction_note: Some("Menores de 1 año: reconstituir con agua estéril para inyectables.".into()),
            volume_breakpoints: breakpoints(&[(600_000.0, 1.5), (1_200_000.0, 2.5), (2_400_000.0, 3.0)]),
            ..Default::default()
        },
    );
    adjuvant_guide.insert(
        "diclofenac".to_string(),
        AdjuvantGuideEntry {
            recommended: true,
            evidence: Some(EvidenceLevel::Moderate),
            note: Some("Existen presentaciones comerciales premezcladas con lidocaína.".into()),
            restriction_note: Some("Preferir presentaciones premezcladas cuando estén disponibles.".into()),
            volume_breakpoints: breakpoints(&[(75.0, 2.0)]),
            ..Default::default()
        },
    );
    adjuvant_guide.insert(
        "metamizol".to_string(),
        AdjuvantGuideEntry {
            recommended: true,
            evidence: Some(EvidenceLevel::Moderate),
            note: Some("No mezclar con otros medicamentos en la misma jeringa.".into()),
            volume_breakpoints: breakpoints(&[(1000.0, 1.0), (500.0, 0.5)]),
            ..Default::default()
        },
    );
    adjuvant_guide.insert(
        "ketorolaco".to_string(),
        AdjuvantGuideEntry {
            recommended: true,
            evidence: Some(EvidenceLevel::Moderate),
            note: Some("Buena tolerancia; la lidocaína no figura entre sus incompatibilidades.".into()),
            warning: Some("NO mezclar con morfina, meperidina, prometazina o hidroxizina.".into()),
            volume_breakpoints: breakpoints(&[(30.0, 1.0), (60.0, 1.5)]),
            ..Default::default()
        },
    );
    adjuvant_guide.insert(
        "hidrocortisona".to_string(),
        AdjuvantGuideEntry {
            evidence: Some(EvidenceLevel::High),
            note: Some("El fabricante indica no diluir ni mezclar con otras soluciones.".into()),
            ..not_recommended("Incompatibilidad física según ficha técnica.")
        },
    );
    adjuvant_guide.insert(
        "tramadol".to_string(),
        AdjuvantGuideEntry {
            evidence: Some(EvidenceLevel::Moderate),
            note: Some("Ambos reducen el umbral convulsivo.".into()),
            ..not_recommended("Interacción farmacodinámica: riesgo aumentado de convulsiones.")
        },
    );
    adjuvant_guide.insert(
        "difenhidramina".to_string(),
        AdjuvantGuideEntry {
            evidence: Some(EvidenceLevel::Moderate),
            note: Some("La difenhidramina tiene efecto anestésico local propio.".into()),
            ..not_recommended("Redundante: el medicamento ya tiene efecto anestésico local.")
        },
    );
    for (id, reason) in [
        ("adrenalina", "No aplica para adrenalina IM."),
        ("ondansetron", "No hay evidencia de beneficio."),
        ("atropina", "No aplica para atropina."),
        ("dexametasona", "No hay evidencia de beneficio para dexametasona IM."),
        ("metoclopramida", "No hay evidencia de beneficio."),
        ("diazepam", "Incompatible con otros medicamentos en la misma jeringa."),
        ("lorazepam", "Lorazepam se administra preferentemente IV, no IM."),
    ] {
        adjuvant_guide.insert(id.to_string(), not_recommended(reason));
    }

    // ========================================================================
    // Reference notes
    // ========================================================================

    let combinations = vec![
        CommonCombination {
            name: "Anafilaxia".into(),
            drugs: ids(&["adrenalina", "difenhidramina", "hidrocortisona"]),
            indication: "Tratamiento escalonado de la reacción anafiláctica.".into(),
        },
        CommonCombination {
            name: "Reacción alérgica".into(),
            drugs: ids(&["difenhidramina", "dexametasona"]),
            indication: "Urticaria o reacción alérgica sin compromiso sistémico.".into(),
        },
        CommonCombination {
            name: "Analgesia con antiemético".into(),
            drugs: ids(&["ketorolaco", "ondansetron"]),
            indication: "Dolor agudo acompañado de náuseas.".into(),
        },
        CommonCombination {
            name: "Cóctel de migraña".into(),
            drugs: ids(&["metoclopramida", "difenhidramina", "ketorolaco"]),
            indication: "Migraña refractaria en urgencias.".into(),
        },
    ];

    let guideline = |title: &str, after: Option<f64>, up_to: f64, recommendations: &[&str]| PediatricGuideline {
        title: title.into(),
        after_months: after,
        up_to_months: up_to,
        recommendations: ids(recommendations),
    };

    let pediatric_guidelines = vec![
        guideline(
            "Lactantes (0-12 meses)",
            None,
            12.0,
            &[
                "Cara anterolateral del muslo para inyección IM.",
                "No usar lidocaína como diluyente; reconstituir con agua estéril.",
                "Volumen IM máximo 1 mL por sitio.",
            ],
        ),
        guideline(
            "Preescolares (1-5 años)",
            Some(12.0),
            60.0,
            &[
                "Volumen IM máximo 1,5 mL por sitio.",
                "Confirmar el peso actual antes de calcular.",
            ],
        ),
        guideline(
            "Escolares (6-12 años)",
            Some(60.0),
            144.0,
            &["Volumen IM máximo 2 mL por sitio.", "Puede usarse el deltoides para volúmenes pequeños."],
        ),
        guideline(
            "Adolescentes (12-18 años)",
            Some(144.0),
            216.0,
            &["Dosis de adulto cuando el peso supera los 40 kg, sin exceder el máximo por dosis."],
        ),
    ];

    Catalog {
        drugs,
        interactions,
        pediatric_interactions,
        mix_compatibility,
        conditions,
        condition_interactions,
        symptom_groups,
        syndromes,
        clinical_pictures,
        adjuvant_guide,
        combinations,
        pediatric_guidelines,
        anesthetic_allergy_condition: "alergia_anestesicos".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        let catalog = build_default_catalog();
        assert_eq!(catalog.drugs.len(), 15);
        assert!(!catalog.interactions.is_empty());
        assert!(!catalog.syndromes.is_empty());
    }

    #[test]
    fn test_default_catalog_is_valid() {
        let errors = build_default_catalog().validate();
        assert!(errors.is_empty(), "validation errors: {:?}", errors);
    }

    #[test]
    fn test_every_drug_has_adjuvant_entry() {
        let catalog = build_default_catalog();
        for id in catalog.drugs.keys() {
            assert!(catalog.adjuvant_guide.contains_key(id), "no adjuvant entry for {}", id);
        }
    }

    #[test]
    fn test_legacy_doses_are_migrated() {
        let catalog = build_default_catalog();

        let penicillin = catalog.drug("penicilina").unwrap();
        let tiers = &penicillin.dose_rule.as_ref().unwrap().pediatric;
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].source, RuleSource::Migrated);
        assert!(penicillin.legacy_dose.as_ref().unwrap().pediatric.is_empty());

        // free text survives as text
        let metoclopramide = catalog.drug("metoclopramida").unwrap();
        assert_eq!(metoclopramide.legacy_dose.as_ref().unwrap().pediatric.len(), 1);
    }

    #[test]
    fn test_validation_catches_dangling_references() {
        let mut catalog = build_default_catalog();
        catalog
            .interactions
            .push(interaction("ceftriaxona", "no_such_drug", InteractionLevel::Caution, "", ""));
        catalog.syndromes[0].cardinal_symptoms.push("no_such_symptom".into());
        catalog.anesthetic_allergy_condition = "missing".into();

        let errors = catalog.validate();
        assert!(errors.iter().any(|e| e.contains("no_such_drug")));
        assert!(errors.iter().any(|e| e.contains("no_such_symptom")));
        assert!(errors.iter().any(|e| e.contains("missing")));
    }

    #[test]
    fn test_validation_catches_bad_presentation() {
        let mut catalog = build_default_catalog();
        if let Some(drug) = catalog.drugs.get_mut("tramadol") {
            drug.presentations[0].volume_ml = 0.0;
        }
        let errors = catalog.validate();
        assert!(errors.iter().any(|e| e.contains("tramadol")));
    }

    #[test]
    fn test_json_round_trip_through_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");

        build_unmigrated_catalog().save_to(&path).unwrap();
        let loaded = Catalog::load_from(&path).unwrap();

        assert_eq!(loaded.drugs.len(), 15);
        let dexamethasone = loaded.drug("dexametasona").unwrap();
        assert_eq!(
            dexamethasone.dose_rule.as_ref().unwrap().pediatric[0].source,
            RuleSource::Migrated
        );
    }

    #[test]
    fn test_invalid_json_catalog_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");

        let mut catalog = build_unmigrated_catalog();
        catalog.combinations.push(CommonCombination {
            name: "solo".into(),
            drugs: vec!["tramadol".into()],
            indication: String::new(),
        });
        catalog.save_to(&path).unwrap();

        assert!(matches!(
            Catalog::load_from(&path),
            Err(Error::CatalogValidation(_))
        ));
    }

    #[test]
    fn test_load_catalog_defaults_to_builtin() {
        let catalog = load_catalog(None).unwrap();
        assert!(catalog.drugs.contains_key("ceftriaxona"));
    }
}
