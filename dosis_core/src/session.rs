//! Per-session state and the full re-derivation of every output.
//!
//! `Session` is a plain value. Each reducer returns a new session and
//! `evaluate` recomputes the report from scratch; nothing is cached between
//! input changes.

use crate::adjuvant::{self, AdditiveChoice, AdjuvantPlan};
use crate::combination::{match_combinations, CombinationMatch};
use crate::condition::{self, ConditionAlert};
use crate::dose::{calculate_all, DoseResult};
use crate::interaction::{find_interactions, InteractionFinding};
use crate::selection::{DiluentChoice, Removal, SelectOutcome, SelectionAlert, SelectionState};
use crate::syndrome::{
    annotate_drugs, forbidden_by, match_clinical_pictures, match_syndromes, ClinicalPictureMatch,
    DrugAnnotation, Prohibition, SyndromeMatch,
};
use crate::{Catalog, Error, PatientContext, PediatricGuideline, Presentation, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub patient: PatientContext,
    pub selection: SelectionState,
    pub conditions: Vec<String>,
    pub symptoms: Vec<String>,
    pub additive: AdditiveChoice,
}

impl Session {
    pub fn new(patient: PatientContext) -> Result<Self> {
        patient.validate()?;
        Ok(Self {
            patient,
            ..Self::default()
        })
    }

    /// Replace the patient, dropping drugs the new patient can't take
    pub fn with_patient(&self, catalog: &Catalog, patient: PatientContext) -> Result<(Session, Vec<Removal>)> {
        patient.validate()?;
        let (selection, removals) = self.selection.reconcile(catalog, &patient, &self.conditions);
        let next = Session {
            patient,
            selection,
            ..self.clone()
        };
        Ok((next.settle_additive(catalog), removals))
    }

    /// Replace the active conditions, dropping drugs they block
    pub fn with_conditions(&self, catalog: &Catalog, conditions: Vec<String>) -> Result<(Session, Vec<Removal>)> {
        if let Some(unknown) = conditions.iter().find(|c| !catalog.has_condition(c)) {
            return Err(Error::NotFound(format!("condition '{}'", unknown)));
        }
        let (selection, removals) = self.selection.reconcile(catalog, &self.patient, &conditions);
        let next = Session {
            selection,
            conditions,
            ..self.clone()
        };
        Ok((next.settle_additive(catalog), removals))
    }

    pub fn with_symptoms(&self, catalog: &Catalog, symptoms: Vec<String>) -> Result<Session> {
        let known = catalog.symptom_ids();
        if let Some(unknown) = symptoms.iter().find(|s| !known.contains(s.as_str())) {
            return Err(Error::NotFound(format!("symptom '{}'", unknown)));
        }
        Ok(Session {
            symptoms,
            ..self.clone()
        })
    }

    /// Gate and add a drug; a rejection leaves the session unchanged
    pub fn select(&self, catalog: &Catalog, drug_id: &str) -> Result<(Session, Option<SelectionAlert>)> {
        match self
            .selection
            .select(catalog, drug_id, &self.patient, &self.conditions)?
        {
            SelectOutcome::Selected(selection) => {
                let next = Session {
                    selection,
                    ..self.clone()
                };
                Ok((next.settle_additive(catalog), None))
            }
            SelectOutcome::Rejected(alert) => Ok((self.clone(), Some(alert))),
        }
    }

    pub fn deselect(&self, catalog: &Catalog, drug_id: &str) -> Session {
        Session {
            selection: self.selection.deselect(drug_id),
            ..self.clone()
        }
        .settle_additive(catalog)
    }

    pub fn with_presentation(&self, catalog: &Catalog, drug_id: &str, presentation: &str) -> Result<Session> {
        let selection = self
            .selection
            .change_presentation(catalog, drug_id, presentation)?;
        Ok(Session {
            selection,
            ..self.clone()
        }
        .settle_additive(catalog))
    }

    pub fn with_diluent_proportion(&self, catalog: &Catalog, drug_id: &str, dose: f64) -> Result<Session> {
        let selection = self
            .selection
            .choose_diluent_proportion(catalog, drug_id, dose)?;
        Ok(Session {
            selection,
            ..self.clone()
        })
    }

    /// Set the additive choice; it is cleared if the plan can't support it
    pub fn with_additive(&self, catalog: &Catalog, additive: AdditiveChoice) -> Session {
        Session {
            additive,
            ..self.clone()
        }
        .settle_additive(catalog)
    }

    fn adjuvant_plan(&self, catalog: &Catalog, doses: &BTreeMap<String, DoseResult>) -> AdjuvantPlan {
        adjuvant::plan(
            catalog,
            &self.selection.drug_ids,
            doses,
            &self.patient,
            &self.conditions,
        )
    }

    fn settle_additive(mut self, catalog: &Catalog) -> Session {
        if self.additive == AdditiveChoice::Off {
            return self;
        }
        let doses = self.doses(catalog);
        let settled = self.additive.reconcile(&self.adjuvant_plan(catalog, &doses));
        if settled != self.additive {
            tracing::info!("Additive choice {:?} cleared to {:?}", self.additive, settled);
            self.additive = settled;
        }
        self
    }

    fn doses(&self, catalog: &Catalog) -> BTreeMap<String, DoseResult> {
        calculate_all(
            catalog,
            &self.selection.drug_ids,
            &self.selection.presentations,
            &self.patient,
        )
    }
}

/// One selected drug as it goes into the syringe
#[derive(Clone, Debug, Serialize)]
pub struct DrugLine {
    pub drug_id: String,
    pub name: String,
    pub dose: DoseResult,
    pub presentation: Option<Presentation>,
    pub diluent: Option<DiluentChoice>,
    /// Volume this drug adds to the syringe: diluent volume when reconstituted
    pub syringe_volume_ml: f64,
    pub forbidden_by: Vec<Prohibition>,
}

/// Everything derived from one session
#[derive(Clone, Debug, Serialize)]
pub struct SessionReport {
    pub patient: PatientContext,
    pub drugs: Vec<DrugLine>,
    pub interactions: Vec<InteractionFinding>,
    pub condition_alerts: Vec<ConditionAlert>,
    pub syndromes: Vec<SyndromeMatch>,
    pub clinical_pictures: Vec<ClinicalPictureMatch>,
    pub annotations: BTreeMap<String, DrugAnnotation>,
    pub combinations: Vec<CombinationMatch>,
    pub guidelines: Vec<PediatricGuideline>,
    pub adjuvant: AdjuvantPlan,
    /// Effective choice after the plan was applied
    pub additive: AdditiveChoice,
    pub additive_volume_ml: Option<f64>,
    pub total_syringe_volume_ml: f64,
}

impl SessionReport {
    pub fn drug(&self, drug_id: &str) -> Option<&DrugLine> {
        self.drugs.iter().find(|line| line.drug_id == drug_id)
    }
}

/// Recompute every output from the session's current inputs
pub fn evaluate(catalog: &Catalog, session: &Session) -> SessionReport {
    let selected = &session.selection.drug_ids;
    let patient = &session.patient;
    let mut doses = session.doses(catalog);

    let syndromes = match_syndromes(catalog, &session.symptoms);
    let clinical_pictures = match_clinical_pictures(catalog, &session.symptoms);
    let annotations = annotate_drugs(&syndromes, &clinical_pictures);

    let adjuvant = session.adjuvant_plan(catalog, &doses);
    let additive = session.additive.reconcile(&adjuvant);
    let additive_volume_ml = additive.volume_ml(&adjuvant);

    let drugs: Vec<DrugLine> = selected
        .iter()
        .filter_map(|id| {
            let dose = doses.remove(id)?;
            let diluent = session.selection.diluents.get(id).cloned();
            let syringe_volume_ml = match &diluent {
                Some(choice) => choice.proportion.volume_ml,
                None => dose.volume_ml().unwrap_or(0.0),
            };
            Some(DrugLine {
                drug_id: id.clone(),
                name: catalog.drug_name(id).to_string(),
                presentation: session.selection.presentations.get(id).cloned(),
                diluent,
                syringe_volume_ml,
                forbidden_by: forbidden_by(id, &syndromes),
                dose,
            })
        })
        .collect();

    let total_syringe_volume_ml = drugs.iter().map(|d| d.syringe_volume_ml).sum::<f64>()
        + additive_volume_ml.unwrap_or(0.0);

    let guidelines = if patient.is_pediatric() {
        let months = patient.age_months();
        catalog
            .pediatric_guidelines
            .iter()
            .filter(|g| g.applies_to(months))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    SessionReport {
        patient: patient.clone(),
        interactions: find_interactions(catalog, selected, patient),
        condition_alerts: condition::alerts(catalog, selected, &session.conditions),
        combinations: match_combinations(catalog, selected),
        drugs,
        syndromes,
        clinical_pictures,
        annotations,
        guidelines,
        adjuvant,
        additive,
        additive_volume_ml,
        total_syringe_volume_ml,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_default_catalog, AgeUnit, Route};

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn with_drugs(catalog: &Catalog, session: Session, ids: &[&str]) -> Session {
        ids.iter().fold(session, |s, id| {
            let (next, alert) = s.select(catalog, id).unwrap();
            assert!(alert.is_none(), "{} rejected", id);
            next
        })
    }

    #[test]
    fn test_empty_session_report() {
        crate::logging::init_test();
        let catalog = build_default_catalog();
        let report = evaluate(&catalog, &Session::default());

        assert!(report.drugs.is_empty());
        assert!(report.interactions.is_empty());
        assert!(report.syndromes.is_empty());
        assert!(!report.adjuvant.compatibility.available);
        assert_eq!(report.total_syringe_volume_ml, 0.0);
        assert!(report.guidelines.is_empty());
    }

    #[test]
    fn test_total_syringe_volume_uses_diluent_and_additive() {
        let catalog = build_default_catalog();
        let session = with_drugs(&catalog, Session::default(), &["ceftriaxona", "ketorolaco"])
            .with_additive(&catalog, AdditiveChoice::Recommended);
        let report = evaluate(&catalog, &session);

        // ceftriaxone reconstituted in 3.5 mL, ketorolac 45 mg = 1.5 mL,
        // lidocaine 2.1 + 1.0 = 3.1 mL floored to 3.0
        assert_eq!(report.drug("ceftriaxona").unwrap().syringe_volume_ml, 3.5);
        assert_eq!(report.drug("ketorolaco").unwrap().syringe_volume_ml, 1.5);
        assert_eq!(report.additive_volume_ml, Some(3.0));
        assert!((report.total_syringe_volume_ml - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_additive_cleared_by_incompatible_drug() {
        let catalog = build_default_catalog();
        let session = with_drugs(&catalog, Session::default(), &["ceftriaxona"])
            .with_additive(&catalog, AdditiveChoice::Reduced);
        assert_eq!(session.additive, AdditiveChoice::Reduced);

        let session = with_drugs(&catalog, session, &["tramadol"]);
        assert_eq!(session.additive, AdditiveChoice::Off);

        let report = evaluate(&catalog, &session);
        assert_eq!(report.additive_volume_ml, None);
        assert!(!report.adjuvant.compatibility.available);
    }

    #[test]
    fn test_conditions_remove_blocked_drugs() {
        let catalog = build_default_catalog();
        let session = with_drugs(&catalog, Session::default(), &["ketorolaco", "ondansetron"]);

        let (session, removals) = session
            .with_conditions(&catalog, strings(&["embarazo"]))
            .unwrap();
        assert_eq!(removals.len(), 1);
        assert_eq!(session.selection.drug_ids, strings(&["ondansetron"]));

        assert!(session.with_conditions(&catalog, strings(&["gripe"])).is_err());
    }

    #[test]
    fn test_rejected_select_keeps_session() {
        let catalog = build_default_catalog();
        let session = with_drugs(&catalog, Session::default(), &["diazepam"]);
        let (next, alert) = session.select(&catalog, "lorazepam").unwrap();
        assert!(alert.is_some());
        assert_eq!(next, session);
    }

    #[test]
    fn test_pediatric_patient_gets_guidelines() {
        let catalog = build_default_catalog();
        let child = PatientContext {
            weight_kg: 16.0,
            age: 4.0,
            age_unit: AgeUnit::Years,
            route: Route::Intramuscular,
        };
        let (session, _) = Session::default().with_patient(&catalog, child).unwrap();
        let report = evaluate(&catalog, &session);

        assert_eq!(report.guidelines.len(), 1);
        assert_eq!(report.guidelines[0].title, "Preescolares (1-5 años)");

        let bad = PatientContext {
            weight_kg: -1.0,
            ..PatientContext::default()
        };
        assert!(session.with_patient(&catalog, bad).is_err());
    }

    #[test]
    fn test_symptoms_annotate_selected_drugs() {
        let catalog = build_default_catalog();
        let session = with_drugs(&catalog, Session::default(), &["diclofenac"])
            .with_symptoms(&catalog, strings(&["fiebre", "cefalea", "mialgias", "dolor_retroocular"]))
            .unwrap();
        let report = evaluate(&catalog, &session);

        assert_eq!(report.syndromes[0].id, "dengue");
        assert!(!report.drug("diclofenac").unwrap().forbidden_by.is_empty());
        assert!(report.annotations["diclofenac"].is_forbidden());
        // annotations never change the selection
        assert!(session.selection.contains("diclofenac"));

        assert!(session.with_symptoms(&catalog, strings(&["no_such_symptom"])).is_err());
    }

    #[test]
    fn test_evaluate_is_pure() {
        let catalog = build_default_catalog();
        let session = with_drugs(&catalog, Session::default(), &["adrenalina", "difenhidramina", "hidrocortisona"]);
        let first = serde_json::to_string(&evaluate(&catalog, &session)).unwrap();
        let second = serde_json::to_string(&evaluate(&catalog, &session)).unwrap();
        assert_eq!(first, second);

        let report = evaluate(&catalog, &session);
        assert_eq!(report.combinations.len(), 1);
    }
}
