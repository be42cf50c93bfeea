//! Selection gating.
//!
//! A drug may join the selection only if no active condition blocks it and
//! it forms no dangerous or contraindicated pair with an already selected
//! drug. Every transition returns a new `SelectionState`; a rejected select
//! returns an alert and leaves the state untouched.

use crate::condition::{self, ConditionStatus};
use crate::interaction::gate_level;
use crate::{
    Catalog, DiluentOption, DiluentProportion, DiluentRule, Error, InteractionLevel,
    PatientContext, Presentation, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Tolerance when matching a diluent proportion to a presentation amount
const AMOUNT_EPSILON: f64 = 1e-6;

/// Diluent picked for a selected drug
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DiluentChoice {
    pub name: String,
    pub proportion: DiluentProportion,
}

/// Selected drugs with their presentation and diluent choices
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct SelectionState {
    /// In the order they were added
    pub drug_ids: Vec<String>,
    pub presentations: BTreeMap<String, Presentation>,
    pub diluents: BTreeMap<String, DiluentChoice>,
}

/// Display status of one drug relative to the current selection
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DrugStatus {
    Available,
    Selected,
    Caution,
    BlockedByInteraction,
    BlockedByCondition,
}

impl DrugStatus {
    pub fn is_blocked(&self) -> bool {
        matches!(self, DrugStatus::BlockedByInteraction | DrugStatus::BlockedByCondition)
    }
}

/// Why a select was refused
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    Condition { condition: String, recommendation: String },
    Interaction { with: String, level: InteractionLevel },
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SelectionAlert {
    pub drug_id: String,
    pub message: String,
    pub rejection: Rejection,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SelectOutcome {
    Selected(SelectionState),
    Rejected(SelectionAlert),
}

/// A drug dropped by `reconcile`
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Removal {
    pub drug_id: String,
    pub reason: String,
}

fn same_amount(a: f64, b: f64) -> bool {
    (a - b).abs() < AMOUNT_EPSILON
}

/// Proportion whose dose equals the presentation amount, else the first
fn match_proportion(option: &DiluentOption, presentation: Option<&Presentation>) -> Option<DiluentProportion> {
    presentation
        .and_then(|p| {
            option
                .proportions
                .iter()
                .find(|prop| same_amount(prop.dose, p.concentration))
        })
        .or_else(|| option.proportions.first())
        .cloned()
}

/// Diluent chosen automatically for a drug on selection
pub fn auto_diluent(
    rule: &DiluentRule,
    patient: &PatientContext,
    presentation: Option<&Presentation>,
) -> Option<DiluentChoice> {
    let option = rule
        .options
        .iter()
        .find(|option| option.is_eligible(patient))
        .or_else(|| {
            if rule.fallback_to_first {
                rule.options.first()
            } else {
                None
            }
        })?;

    match_proportion(option, presentation).map(|proportion| DiluentChoice {
        name: option.name.clone(),
        proportion,
    })
}

impl SelectionState {
    pub fn contains(&self, drug_id: &str) -> bool {
        self.drug_ids.iter().any(|id| id == drug_id)
    }

    pub fn is_empty(&self) -> bool {
        self.drug_ids.is_empty()
    }

    /// Gate and add a drug
    ///
    /// Selecting an already selected drug returns the state unchanged.
    pub fn select(
        &self,
        catalog: &Catalog,
        drug_id: &str,
        patient: &PatientContext,
        conditions: &[String],
    ) -> Result<SelectOutcome> {
        let drug = catalog.drug(drug_id)?;
        if self.contains(drug_id) {
            return Ok(SelectOutcome::Selected(self.clone()));
        }

        if let Some(record) = condition::blocking_record(catalog, drug_id, conditions) {
            tracing::info!("Rejected {}: blocked by condition {}", drug_id, record.condition);
            return Ok(SelectOutcome::Rejected(SelectionAlert {
                drug_id: drug_id.to_string(),
                message: record.message.clone(),
                rejection: Rejection::Condition {
                    condition: record.condition.clone(),
                    recommendation: record.recommendation.clone(),
                },
            }));
        }

        for other in &self.drug_ids {
            if let Some(level) = gate_level(catalog, other, drug_id, patient) {
                if level.is_blocking() {
                    tracing::info!("Rejected {}: {} interaction with {}", drug_id, level, other);
                    return Ok(SelectOutcome::Rejected(SelectionAlert {
                        drug_id: drug_id.to_string(),
                        message: format!(
                            "{} has a {} interaction with {}",
                            drug.name,
                            level,
                            catalog.drug_name(other)
                        ),
                        rejection: Rejection::Interaction {
                            with: other.clone(),
                            level,
                        },
                    }));
                }
            }
        }

        let mut next = self.clone();
        next.drug_ids.push(drug_id.to_string());

        let presentation = drug.default_presentation().cloned();
        if let Some(rule) = &drug.diluent {
            if let Some(choice) = auto_diluent(rule, patient, presentation.as_ref()) {
                tracing::debug!("Diluent for {}: {}", drug_id, choice.name);
                next.diluents.insert(drug_id.to_string(), choice);
            }
        }
        if let Some(presentation) = presentation {
            next.presentations.insert(drug_id.to_string(), presentation);
        }

        Ok(SelectOutcome::Selected(next))
    }

    /// Remove a drug with its presentation and diluent
    pub fn deselect(&self, drug_id: &str) -> SelectionState {
        let mut next = self.clone();
        next.drug_ids.retain(|id| id != drug_id);
        next.presentations.remove(drug_id);
        next.diluents.remove(drug_id);
        next
    }

    /// Switch a selected drug to another of its presentations
    ///
    /// The diluent proportion is re-matched to the new amount.
    pub fn change_presentation(
        &self,
        catalog: &Catalog,
        drug_id: &str,
        presentation_name: &str,
    ) -> Result<SelectionState> {
        let drug = catalog.drug(drug_id)?;
        if !self.contains(drug_id) {
            return Err(Error::NotFound(format!("{} is not selected", drug_id)));
        }
        let presentation = drug
            .presentations
            .iter()
            .find(|p| p.name == presentation_name)
            .ok_or_else(|| {
                Error::NotFound(format!("presentation '{}' of {}", presentation_name, drug_id))
            })?;

        let mut next = self.clone();
        if let (Some(choice), Some(rule)) = (next.diluents.get_mut(drug_id), &drug.diluent) {
            if let Some(option) = rule.options.iter().find(|o| o.name == choice.name) {
                if let Some(proportion) = match_proportion(option, Some(presentation)) {
                    choice.proportion = proportion;
                }
            }
        }
        next.presentations
            .insert(drug_id.to_string(), presentation.clone());
        Ok(next)
    }

    /// Pick another proportion of the drug's current diluent
    pub fn choose_diluent_proportion(
        &self,
        catalog: &Catalog,
        drug_id: &str,
        dose: f64,
    ) -> Result<SelectionState> {
        let drug = catalog.drug(drug_id)?;
        let current = self
            .diluents
            .get(drug_id)
            .ok_or_else(|| Error::NotFound(format!("no diluent selected for {}", drug_id)))?;
        let proportion = drug
            .diluent
            .as_ref()
            .and_then(|rule| rule.options.iter().find(|o| o.name == current.name))
            .and_then(|option| option.proportions.iter().find(|p| same_amount(p.dose, dose)))
            .ok_or_else(|| {
                Error::NotFound(format!("diluent proportion for {} {} of {}", dose, drug_id, current.name))
            })?;

        let mut next = self.clone();
        next.diluents.insert(
            drug_id.to_string(),
            DiluentChoice {
                name: current.name.clone(),
                proportion: proportion.clone(),
            },
        );
        Ok(next)
    }

    /// Status of a drug against the current selection, without changing it
    pub fn status(
        &self,
        catalog: &Catalog,
        drug_id: &str,
        patient: &PatientContext,
        conditions: &[String],
    ) -> DrugStatus {
        // a selected drug the conditions now block still reports the block
        let by_condition = condition::status(catalog, drug_id, conditions);
        if by_condition == ConditionStatus::Blocked {
            return DrugStatus::BlockedByCondition;
        }
        if self.contains(drug_id) {
            return DrugStatus::Selected;
        }

        let worst = self
            .drug_ids
            .iter()
            .filter_map(|other| gate_level(catalog, other, drug_id, patient))
            .map(|level| level.severity())
            .max()
            .unwrap_or(0);

        if worst >= InteractionLevel::Dangerous.severity() {
            DrugStatus::BlockedByInteraction
        } else if worst > 0 || by_condition == ConditionStatus::Caution {
            DrugStatus::Caution
        } else {
            DrugStatus::Available
        }
    }

    /// Drop drugs that the current patient and conditions no longer allow
    ///
    /// Condition blocks are removed first, then the later-added member of
    /// every blocking pair. Diluents are re-picked for the new patient.
    pub fn reconcile(
        &self,
        catalog: &Catalog,
        patient: &PatientContext,
        conditions: &[String],
    ) -> (SelectionState, Vec<Removal>) {
        let mut removals = Vec::new();
        let mut kept: Vec<String> = Vec::new();

        for id in &self.drug_ids {
            if let Some(record) = condition::blocking_record(catalog, id, conditions) {
                removals.push(Removal {
                    drug_id: id.clone(),
                    reason: format!("blocked by condition {}", record.condition),
                });
            } else {
                kept.push(id.clone());
            }
        }

        let mut survivors: Vec<String> = Vec::new();
        for id in kept {
            let conflict = survivors.iter().find_map(|earlier| {
                gate_level(catalog, earlier, &id, patient)
                    .filter(|level| level.is_blocking())
                    .map(|level| (earlier.clone(), level))
            });
            match conflict {
                Some((earlier, level)) => removals.push(Removal {
                    drug_id: id,
                    reason: format!("{} interaction with {}", level, earlier),
                }),
                None => survivors.push(id),
            }
        }

        let mut next = SelectionState::default();
        for id in survivors {
            let presentation = self.presentations.get(&id).cloned();
            let rule = catalog.drugs.get(&id).and_then(|d| d.diluent.as_ref());
            if let Some(choice) = rule.and_then(|r| auto_diluent(r, patient, presentation.as_ref())) {
                let choice = match self.diluents.get(&id) {
                    Some(previous) if previous.name == choice.name => previous.clone(),
                    _ => choice,
                };
                next.diluents.insert(id.clone(), choice);
            }
            if let Some(presentation) = presentation {
                next.presentations.insert(id.clone(), presentation);
            }
            next.drug_ids.push(id);
        }

        for removal in &removals {
            tracing::info!("Removed {} from selection: {}", removal.drug_id, removal.reason);
        }
        (next, removals)
    }
}
