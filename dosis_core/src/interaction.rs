//! Pairwise drug-drug interaction and mixing lookup.
//!
//! For pediatric patients an age-banded pediatric record takes priority over
//! the general table, and same-syringe compatibility is reported as its own
//! finding. Severity ordering is left to the gating layer.

use crate::{
    Catalog, Compatibility, DrugPair, InteractionLevel, PatientContext, PediatricMix,
};
use serde::Serialize;
use std::collections::HashSet;

/// One interaction reported for the current selection
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct InteractionFinding {
    pub drugs: DrugPair,
    /// "Drug A + Drug B"
    pub display_name: String,
    pub level: InteractionLevel,
    pub description: String,
    pub advice: String,
    /// Came from the age-banded pediatric table
    pub pediatric: bool,
    /// Same-syringe compatibility rather than a pharmacological interaction
    pub mix: bool,
}

struct ResolvedInteraction<'a> {
    level: InteractionLevel,
    description: &'a str,
    advice: &'a str,
    pediatric: bool,
}

fn resolve_interaction<'a>(
    catalog: &'a Catalog,
    a: &str,
    b: &str,
    patient: &PatientContext,
) -> Option<ResolvedInteraction<'a>> {
    if patient.is_pediatric() {
        let months = patient.age_months();
        let banded = catalog
            .pediatric_interactions
            .iter()
            .find(|r| r.drugs.matches(a, b))
            .and_then(|record| {
                record
                    .bands
                    .iter()
                    .find(|band| months >= band.age_min_months && months <= band.age_max_months)
                    .map(|band| ResolvedInteraction {
                        level: band.level,
                        description: &record.description,
                        advice: &record.advice,
                        pediatric: true,
                    })
            });
        if banded.is_some() {
            return banded;
        }
    }

    catalog
        .interactions
        .iter()
        .find(|r| r.drugs.matches(a, b))
        .map(|record| ResolvedInteraction {
            level: record.level,
            description: &record.description,
            advice: &record.advice,
            pediatric: false,
        })
}

fn resolve_mix<'a>(
    catalog: &'a Catalog,
    a: &str,
    b: &str,
    patient: &PatientContext,
) -> Option<(InteractionLevel, &'a str)> {
    if !patient.is_pediatric() {
        return None;
    }
    let months = patient.age_months();
    let record = catalog
        .mix_compatibility
        .iter()
        .find(|r| r.drugs.matches(a, b))?;

    let compatibility = match &record.pediatric {
        PediatricMix::Flat(compatibility) => *compatibility,
        PediatricMix::Banded(bands) => bands
            .iter()
            .find(|band| months >= band.age_min_months && months <= band.age_max_months)
            .map(|band| band.compatibility)
            .unwrap_or(Compatibility::Compatible),
    };

    compatibility
        .as_level()
        .map(|level| (level, record.comment.as_str()))
}

/// Interaction level for a pair, pediatric bands first
pub fn resolve_pair_level(
    catalog: &Catalog,
    a: &str,
    b: &str,
    patient: &PatientContext,
) -> Option<InteractionLevel> {
    resolve_interaction(catalog, a, b, patient).map(|r| r.level)
}

/// Same-syringe level for a pair (pediatric patients only)
pub fn mix_level(
    catalog: &Catalog,
    a: &str,
    b: &str,
    patient: &PatientContext,
) -> Option<InteractionLevel> {
    resolve_mix(catalog, a, b, patient).map(|(level, _)| level)
}

/// Level the selection gate acts on: the more severe of interaction and mix
pub fn gate_level(
    catalog: &Catalog,
    a: &str,
    b: &str,
    patient: &PatientContext,
) -> Option<InteractionLevel> {
    let interaction = resolve_pair_level(catalog, a, b, patient);
    let mix = mix_level(catalog, a, b, patient);
    match (interaction, mix) {
        (Some(i), Some(m)) if m.severity() > i.severity() => Some(m),
        (Some(i), _) => Some(i),
        (None, m) => m,
    }
}

/// All findings for every unordered pair of the selection
///
/// Deduplicated by (pair, level); the first occurrence wins.
pub fn find_interactions(
    catalog: &Catalog,
    selected: &[String],
    patient: &PatientContext,
) -> Vec<InteractionFinding> {
    let mut findings = Vec::new();
    let mut seen: HashSet<(String, String, InteractionLevel)> = HashSet::new();

    let mut push = |finding: InteractionFinding| {
        let (x, y) = finding.drugs.key();
        if seen.insert((x.to_string(), y.to_string(), finding.level)) {
            findings.push(finding);
        }
    };

    for (i, a) in selected.iter().enumerate() {
        for b in &selected[i + 1..] {
            let display_name = format!("{} + {}", catalog.drug_name(a), catalog.drug_name(b));

            if let Some(resolved) = resolve_interaction(catalog, a, b, patient) {
                push(InteractionFinding {
                    drugs: DrugPair::new(a.as_str(), b.as_str()),
                    display_name: display_name.clone(),
                    level: resolved.level,
                    description: resolved.description.to_string(),
                    advice: resolved.advice.to_string(),
                    pediatric: resolved.pediatric,
                    mix: false,
                });
            }

            if let Some((level, comment)) = resolve_mix(catalog, a, b, patient) {
                push(InteractionFinding {
                    drugs: DrugPair::new(a.as_str(), b.as_str()),
                    display_name,
                    level,
                    description: format!("Mezcla en jeringa: {}", comment),
                    advice: comment.to_string(),
                    pediatric: true,
                    mix: true,
                });
            }
        }
    }

    tracing::debug!("{} interaction findings for {} drugs", findings.len(), selected.len());
    findings
}
