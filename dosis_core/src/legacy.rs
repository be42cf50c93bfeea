//! One-time migration of legacy free-text pediatric doses.
//!
//! Older catalog entries describe pediatric doses as text such as
//! `"10-15 mg/kg IM cada 8 horas, máximo 1000 mg"` or `"50000 UI/kg IM"`.
//! At catalog load, lines that fit these shapes become structured tiers with
//! `RuleSource::Migrated`; the numbers they produce match what the text
//! always meant (range mean × weight, capped by the ceiling for mg/kg; the
//! single value × weight for IU/kg). Anything else stays as text and is
//! surfaced verbatim by the dose calculator.

use crate::{
    Catalog, DoseAmount, DoseRule, Drug, LegacyPediatricDose, MonthRange, PediatricTier, Route,
    RuleSource,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static MG_PER_KG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?)(?:\s*-\s*(\d+(?:\.\d+)?))?\s*mg/kg").expect("valid mg/kg pattern")
});

static IU_PER_KG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*UI/kg").expect("valid UI/kg pattern"));

// "50.000 UI/kg" style thousands separators would read as 50.
static GROUPED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,3}(?:[.,]\d{3})+\s*UI").expect("valid grouping pattern"));

static FREQUENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)cada\s+(\d+)\s+horas").expect("valid frequency pattern"));

static CEILING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)m[áa]ximo\s+(\d+(?:\.\d+)?)\s*mg").expect("valid ceiling pattern")
});

static ROUTE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(IM|IV|SC)\b").expect("valid route pattern"));

/// Why a legacy line stayed as text
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnsupportedReason {
    /// Neither an mg/kg nor a UI/kg amount could be read
    UnrecognizedFormat,
    /// Thousands separators make the amount ambiguous
    AmbiguousNumber,
}

impl fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnsupportedReason::UnrecognizedFormat => "unrecognized format",
            UnsupportedReason::AmbiguousNumber => "ambiguous number",
        })
    }
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct MigrationEntry {
    pub drug_id: String,
    pub text: String,
    pub outcome: Result<(), UnsupportedReason>,
}

/// What the migration did, for logging and the `catalog migrate` command
#[derive(Clone, Debug, Default, Serialize)]
pub struct MigrationReport {
    pub entries: Vec<MigrationEntry>,
}

impl MigrationReport {
    pub fn migrated(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_ok()).count()
    }

    pub fn unsupported(&self) -> impl Iterator<Item = &MigrationEntry> {
        self.entries.iter().filter(|e| e.outcome.is_err())
    }
}

/// Parse one legacy line into a structured tier
pub fn parse_line(line: &LegacyPediatricDose) -> Result<PediatricTier, UnsupportedReason> {
    let text = line.text.as_str();
    let window = band(line);

    let amount = if let Some(caps) = MG_PER_KG.captures(text) {
        let min = parse_number(caps.get(1).map(|m| m.as_str()))?;
        let max = match caps.get(2) {
            Some(m) => Some(parse_number(Some(m.as_str()))?),
            None => None,
        };
        DoseAmount::PerWeightMg {
            min_per_kg: min,
            max_per_kg: max,
        }
    } else if text.contains("UI/kg") {
        if GROUPED_NUMBER.is_match(text) {
            return Err(UnsupportedReason::AmbiguousNumber);
        }
        let caps = IU_PER_KG
            .captures(text)
            .ok_or(UnsupportedReason::UnrecognizedFormat)?;
        DoseAmount::PerWeightIu {
            min_per_kg: parse_number(caps.get(1).map(|m| m.as_str()))?,
            max_per_kg: None,
        }
    } else {
        return Err(UnsupportedReason::UnrecognizedFormat);
    };

    // The ceiling only ever applied to mg/kg lines
    let max_per_administration = match amount {
        DoseAmount::PerWeightMg { .. } => CEILING
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok()),
        _ => None,
    };

    let frequency_hours = FREQUENCY
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u32>().ok())
        .map(|h| vec![h])
        .unwrap_or_default();

    let mut routes: Vec<Route> = ROUTE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).and_then(|m| Route::parse(m.as_str())))
        .collect();
    routes.dedup();

    Ok(PediatricTier {
        age_min_months: window.min,
        age_max_months: window.max,
        amount,
        max_per_administration,
        routes,
        frequency_hours,
        source: RuleSource::Migrated,
        deferred_months: Vec::new(),
    })
}

fn parse_number(s: Option<&str>) -> Result<f64, UnsupportedReason> {
    s.and_then(|s| s.parse::<f64>().ok())
        .ok_or(UnsupportedReason::UnrecognizedFormat)
}

fn band(line: &LegacyPediatricDose) -> MonthRange {
    MonthRange {
        min: line.unit.to_months(line.age_min),
        max: line.unit.to_months(line.age_max),
    }
}

/// Migrate the legacy pediatric lines of one drug
///
/// Lines were read first match per age, so a tier defers to every earlier
/// text line over the ages they share. Drugs that already carry structured
/// pediatric tiers are left alone.
pub fn migrate_drug(drug: &Drug, report: &mut MigrationReport) -> Drug {
    let mut migrated = drug.clone();

    let Some(legacy) = drug.legacy_dose.as_ref() else {
        return migrated;
    };
    let has_structured = drug
        .dose_rule
        .as_ref()
        .map_or(false, |rule| !rule.pediatric.is_empty());
    if has_structured || legacy.pediatric.is_empty() {
        return migrated;
    }

    let mut tiers = Vec::new();
    let mut kept: Vec<LegacyPediatricDose> = Vec::new();

    for line in &legacy.pediatric {
        match parse_line(line) {
            Ok(mut tier) => {
                let own = band(line);
                tier.deferred_months = kept
                    .iter()
                    .map(band)
                    .filter(|earlier| earlier.overlaps(&own))
                    .collect();
                tiers.push(tier);
                report.entries.push(MigrationEntry {
                    drug_id: drug.id.clone(),
                    text: line.text.clone(),
                    outcome: Ok(()),
                });
            }
            Err(reason) => {
                tracing::warn!(
                    "Legacy dose for '{}' kept as text ({}): {}",
                    drug.id,
                    reason,
                    line.text
                );
                kept.push(line.clone());
                report.entries.push(MigrationEntry {
                    drug_id: drug.id.clone(),
                    text: line.text.clone(),
                    outcome: Err(reason),
                });
            }
        }
    }

    if !tiers.is_empty() {
        let rule = migrated.dose_rule.get_or_insert_with(DoseRule::default);
        rule.pediatric = tiers;
    }
    if let Some(legacy) = migrated.legacy_dose.as_mut() {
        legacy.pediatric = kept;
    }

    migrated
}

impl Catalog {
    /// Convert legacy pediatric text to structured tiers across the catalog
    pub fn migrate_legacy(&self) -> (Catalog, MigrationReport) {
        let mut report = MigrationReport::default();
        let mut catalog = self.clone();
        for drug in catalog.drugs.values_mut() {
            *drug = migrate_drug(drug, &mut report);
        }
        tracing::info!(
            "Legacy migration: {} lines migrated, {} kept as text",
            report.migrated(),
            report.unsupported().count()
        );
        (catalog, report)
    }
}
