//! Symptom scoring against syndrome and clinical-picture rules.
//!
//! Both rule kinds share one weighted scorer: primary symptoms count double,
//! secondary symptoms once, and a rule stays inactive until enough primary
//! symptoms are present. Results only annotate drugs; they never change the
//! selection.

use crate::{Catalog, ForbiddenDrug, RedFlag};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Weighted match of one rule against the active symptoms
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct RuleScore {
    /// 0..=100
    pub confidence: u8,
    pub primary_matched: Vec<String>,
    pub secondary_matched: Vec<String>,
}

/// Score one rule; `None` while fewer than `threshold` primary symptoms match
pub fn score(
    primary: &[String],
    secondary: &[String],
    threshold: usize,
    active: &BTreeSet<&str>,
) -> Option<RuleScore> {
    let primary_matched: Vec<String> = primary
        .iter()
        .filter(|s| active.contains(s.as_str()))
        .cloned()
        .collect();
    if primary_matched.len() < threshold {
        return None;
    }
    let secondary_matched: Vec<String> = secondary
        .iter()
        .filter(|s| active.contains(s.as_str()))
        .cloned()
        .collect();

    let total = 2 * primary.len() + secondary.len();
    let matched = 2 * primary_matched.len() + secondary_matched.len();
    let confidence = if total == 0 {
        0
    } else {
        ((100 * matched) as f64 / total as f64).round().min(100.0) as u8
    };

    Some(RuleScore {
        confidence,
        primary_matched,
        secondary_matched,
    })
}

/// An active epidemiological alert
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SyndromeMatch {
    pub id: String,
    pub name: String,
    pub confidence: u8,
    pub cardinal_matched: Vec<String>,
    pub support_matched: Vec<String>,
    pub active_red_flags: Vec<RedFlag>,
    pub recommended_drugs: Vec<String>,
    pub forbidden_drugs: Vec<ForbiddenDrug>,
    pub differential_guide: String,
    pub management_guide: String,
}

/// An active differential clinical picture
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ClinicalPictureMatch {
    pub id: String,
    pub name: String,
    pub description: String,
    pub confidence: u8,
    pub required_matched: Vec<String>,
    pub optional_matched: Vec<String>,
    pub recommended_drugs: Vec<String>,
    pub forbidden_drugs: Vec<ForbiddenDrug>,
    pub clinical_notes: String,
    pub is_emergency: bool,
}

fn symptom_set(active: &[String]) -> BTreeSet<&str> {
    active.iter().map(|s| s.as_str()).collect()
}

/// Epidemiological alerts for the active symptoms, by confidence descending
///
/// Ties keep catalog order.
pub fn match_syndromes(catalog: &Catalog, active: &[String]) -> Vec<SyndromeMatch> {
    if active.is_empty() {
        return Vec::new();
    }
    let set = symptom_set(active);

    let mut matches: Vec<SyndromeMatch> = catalog
        .syndromes
        .iter()
        .filter_map(|rule| {
            let scored = score(
                &rule.cardinal_symptoms,
                &rule.support_symptoms,
                rule.min_cardinal_threshold,
                &set,
            )?;
            Some(SyndromeMatch {
                id: rule.id.clone(),
                name: rule.name.clone(),
                confidence: scored.confidence,
                cardinal_matched: scored.primary_matched,
                support_matched: scored.secondary_matched,
                active_red_flags: rule
                    .red_flags
                    .iter()
                    .filter(|flag| set.contains(flag.symptom.as_str()))
                    .cloned()
                    .collect(),
                recommended_drugs: rule.recommended_drugs.clone(),
                forbidden_drugs: rule.forbidden_drugs.clone(),
                differential_guide: rule.differential_guide.clone(),
                management_guide: rule.management_guide.clone(),
            })
        })
        .collect();

    matches.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    tracing::debug!("{} syndrome alerts active", matches.len());
    matches
}

/// Clinical pictures for the active symptoms, by confidence descending
pub fn match_clinical_pictures(catalog: &Catalog, active: &[String]) -> Vec<ClinicalPictureMatch> {
    if active.is_empty() {
        return Vec::new();
    }
    let set = symptom_set(active);

    let mut matches: Vec<ClinicalPictureMatch> = catalog
        .clinical_pictures
        .iter()
        .filter_map(|rule| {
            let scored = score(
                &rule.required_symptoms,
                &rule.optional_symptoms,
                rule.min_required_threshold,
                &set,
            )?;
            Some(ClinicalPictureMatch {
                id: rule.id.clone(),
                name: rule.name.clone(),
                description: rule.description.clone(),
                confidence: scored.confidence,
                required_matched: scored.primary_matched,
                optional_matched: scored.secondary_matched,
                recommended_drugs: rule.recommended_drugs.clone(),
                forbidden_drugs: rule.forbidden_drugs.clone(),
                clinical_notes: rule.clinical_notes.clone(),
                is_emergency: rule.is_emergency,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    matches
}

/// Why a drug is discouraged by an active rule
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Prohibition {
    pub rule_name: String,
    pub reason: String,
}

/// Display annotation for one drug
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct DrugAnnotation {
    /// Names of the active rules that suggest the drug
    pub recommended_by: Vec<String>,
    pub forbidden: Vec<Prohibition>,
}

impl DrugAnnotation {
    pub fn is_forbidden(&self) -> bool {
        !self.forbidden.is_empty()
    }
}

/// Recommended/forbidden annotations from every active rule
pub fn annotate_drugs(
    syndromes: &[SyndromeMatch],
    pictures: &[ClinicalPictureMatch],
) -> BTreeMap<String, DrugAnnotation> {
    let mut annotations: BTreeMap<String, DrugAnnotation> = BTreeMap::new();

    let rules = syndromes
        .iter()
        .map(|m| (&m.name, &m.recommended_drugs, &m.forbidden_drugs))
        .chain(
            pictures
                .iter()
                .map(|m| (&m.name, &m.recommended_drugs, &m.forbidden_drugs)),
        );

    for (name, recommended, forbidden) in rules {
        for id in recommended {
            annotations
                .entry(id.clone())
                .or_default()
                .recommended_by
                .push(name.clone());
        }
        for drug in forbidden {
            annotations
                .entry(drug.id.clone())
                .or_default()
                .forbidden
                .push(Prohibition {
                    rule_name: name.clone(),
                    reason: drug.reason.clone(),
                });
        }
    }

    annotations
}

/// Active epidemiological alerts that forbid `drug_id`
pub fn forbidden_by(drug_id: &str, syndromes: &[SyndromeMatch]) -> Vec<Prohibition> {
    syndromes
        .iter()
        .filter_map(|m| {
            m.forbidden_drugs
                .iter()
                .find(|f| f.id == drug_id)
                .map(|f| Prohibition {
                    rule_name: m.name.clone(),
                    reason: f.reason.clone(),
                })
        })
        .collect()
}
