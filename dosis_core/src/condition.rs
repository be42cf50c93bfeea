//! Drug-disease gating from the patient's active conditions.

use crate::{Catalog, ConditionInteractionRecord, ConditionSeverity};
use serde::Serialize;

/// Effect of the active conditions on one drug
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionStatus {
    Available,
    Caution,
    Blocked,
}

/// A drug-disease record that applies to the selection
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct ConditionAlert {
    pub drug_id: String,
    pub drug_name: String,
    pub condition: String,
    pub severity: ConditionSeverity,
    pub blocks: bool,
    pub message: String,
    pub recommendation: String,
}

fn matching_records<'a>(
    catalog: &'a Catalog,
    drug_id: &'a str,
    conditions: &'a [String],
) -> impl Iterator<Item = &'a ConditionInteractionRecord> + 'a {
    conditions.iter().filter_map(move |condition| {
        catalog
            .condition_interactions
            .iter()
            .find(|r| r.drug_id == drug_id && &r.condition == condition)
    })
}

/// Blocked if any matching record blocks, Caution if any is high severity
///
/// Total: no matching record means Available.
pub fn status(catalog: &Catalog, drug_id: &str, conditions: &[String]) -> ConditionStatus {
    let mut result = ConditionStatus::Available;
    for record in matching_records(catalog, drug_id, conditions) {
        if record.blocks {
            return ConditionStatus::Blocked;
        }
        if record.severity == ConditionSeverity::High {
            result = ConditionStatus::Caution;
        }
    }
    result
}

/// First blocking record for a drug, used for rejection messages
pub fn blocking_record<'a>(
    catalog: &'a Catalog,
    drug_id: &'a str,
    conditions: &'a [String],
) -> Option<&'a ConditionInteractionRecord> {
    matching_records(catalog, drug_id, conditions).find(|r| r.blocks)
}

/// Every drug-disease record for the selection, high severity first
pub fn alerts(catalog: &Catalog, selected: &[String], conditions: &[String]) -> Vec<ConditionAlert> {
    let mut alerts: Vec<ConditionAlert> = selected
        .iter()
        .flat_map(|drug_id| {
            matching_records(catalog, drug_id, conditions).map(move |record| ConditionAlert {
                drug_id: drug_id.clone(),
                drug_name: catalog.drug_name(drug_id).to_string(),
                condition: record.condition.clone(),
                severity: record.severity,
                blocks: record.blocks,
                message: record.message.clone(),
                recommendation: record.recommendation.clone(),
            })
        })
        .collect();

    // stable: equal severities keep selection order
    alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_default_catalog;

    fn conditions(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_blocking_condition() {
        let catalog = build_default_catalog();
        assert_eq!(
            status(&catalog, "ketorolaco", &conditions(&["embarazo"])),
            ConditionStatus::Blocked
        );
    }

    #[test]
    fn test_high_severity_without_block_is_caution() {
        let catalog = build_default_catalog();
        assert_eq!(
            status(&catalog, "ceftriaxona", &conditions(&["alergia_penicilina"])),
            ConditionStatus::Caution
        );
    }

    #[test]
    fn test_medium_severity_is_available() {
        let catalog = build_default_catalog();
        assert_eq!(
            status(&catalog, "metamizol", &conditions(&["embarazo"])),
            ConditionStatus::Available
        );
    }

    #[test]
    fn test_block_wins_regardless_of_condition_order() {
        let catalog = build_default_catalog();
        // renal is high without block for diclofenac, embarazo blocks
        for order in [["renal", "embarazo"], ["embarazo", "renal"]] {
            assert_eq!(
                status(&catalog, "diclofenac", &conditions(&order)),
                ConditionStatus::Blocked
            );
        }
    }

    #[test]
    fn test_unknown_drug_or_no_conditions_is_available() {
        let catalog = build_default_catalog();
        assert_eq!(status(&catalog, "nothing", &conditions(&["renal"])), ConditionStatus::Available);
        assert_eq!(status(&catalog, "ketorolaco", &[]), ConditionStatus::Available);
    }

    #[test]
    fn test_alerts_sorted_by_severity() {
        let catalog = build_default_catalog();
        let selected = conditions(&["metamizol", "lorazepam", "diazepam"]);
        let alerts = alerts(&catalog, &selected, &conditions(&["hepatica"]));

        let severities: Vec<_> = alerts.iter().map(|a| a.severity).collect();
        assert_eq!(
            severities,
            vec![ConditionSeverity::High, ConditionSeverity::Low, ConditionSeverity::Low]
        );
        assert_eq!(alerts[0].drug_id, "diazepam");
        assert_eq!(alerts[1].drug_id, "metamizol");
    }
}
