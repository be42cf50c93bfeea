//! Recognition of common therapeutic combinations in the selection.

use crate::Catalog;
use serde::Serialize;

#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CombinationCoverage {
    Complete,
    Partial,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CombinationMatch {
    pub name: String,
    pub indication: String,
    pub coverage: CombinationCoverage,
    pub matched_drugs: Vec<String>,
    pub missing_drugs: Vec<String>,
}

/// Combinations with at least two of their drugs selected
pub fn match_combinations(catalog: &Catalog, selected: &[String]) -> Vec<CombinationMatch> {
    if selected.len() < 2 {
        return Vec::new();
    }

    catalog
        .combinations
        .iter()
        .filter_map(|combo| {
            let (matched_drugs, missing_drugs): (Vec<String>, Vec<String>) =
                combo.drugs.iter().cloned().partition(|id| selected.contains(id));
            if matched_drugs.len() < 2 {
                return None;
            }
            let coverage = if missing_drugs.is_empty() {
                CombinationCoverage::Complete
            } else {
                CombinationCoverage::Partial
            };
            Some(CombinationMatch {
                name: combo.name.clone(),
                indication: combo.indication.clone(),
                coverage,
                matched_drugs,
                missing_drugs,
            })
        })
        .collect()
}
