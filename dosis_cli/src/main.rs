use clap::{Args, Parser, Subcommand};
use dosis_core::adjuvant::AdjuvantPlan;
use dosis_core::catalog::build_unmigrated_catalog;
use dosis_core::selection::SelectionAlert;
use dosis_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dosis")]
#[command(about = "Injectable dose and syringe calculator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// JSON catalog to use instead of the built-in one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Args, Clone)]
struct PatientArgs {
    /// Weight in kg
    #[arg(long)]
    weight: f64,

    /// Age in years (or months with --months)
    #[arg(long)]
    age: f64,

    /// Age is given in months
    #[arg(long)]
    months: bool,

    /// Administration route (IM, IV, SC)
    #[arg(long, value_parser = parse_route, default_value = "IM")]
    route: Route,

    /// Active condition id (repeatable)
    #[arg(long = "condition")]
    conditions: Vec<String>,
}

impl PatientArgs {
    fn patient(&self) -> PatientContext {
        PatientContext {
            weight_kg: self.weight,
            age: self.age,
            age_unit: if self.months { AgeUnit::Months } else { AgeUnit::Years },
            route: self.route,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate doses, interactions and the syringe for a set of drugs
    Calc {
        #[command(flatten)]
        patient: PatientArgs,

        /// Active symptom id (repeatable)
        #[arg(long = "symptom")]
        symptoms: Vec<String>,

        /// Presentation override as drug=presentation name
        #[arg(long = "presentation", value_parser = parse_presentation)]
        presentations: Vec<(String, String)>,

        /// Diluent proportion as drug=dose
        #[arg(long = "diluent", value_parser = parse_diluent)]
        diluents: Vec<(String, f64)>,

        /// Lidocaine additive (off, recommended, reduced)
        #[arg(long, value_parser = parse_additive, default_value = "off")]
        additive: AdditiveChoice,

        /// Drug ids in the order they are added
        drugs: Vec<String>,
    },

    /// Show every drug's status against a selection
    Status {
        #[command(flatten)]
        patient: PatientArgs,

        /// Already selected drug id (repeatable)
        #[arg(long = "selected")]
        selected: Vec<String>,
    },

    /// List catalog drugs
    Drugs,

    /// List patient conditions
    Conditions,

    /// List symptoms by group
    Symptoms,

    /// Rank syndromes and clinical pictures for a set of symptoms
    Syndromes {
        /// Symptom ids
        symptoms: Vec<String>,
    },

    /// Manage saved presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Inspect the reference catalog
    Catalog {
        #[command(subcommand)]
        action: CatalogAction,
    },
}

#[derive(Subcommand)]
enum PresetAction {
    /// Save a patient and selection to a slot
    Save {
        #[arg(long)]
        slot: usize,

        #[arg(long)]
        name: String,

        #[command(flatten)]
        patient: PatientArgs,

        drugs: Vec<String>,
    },
    /// Restore a slot and calculate it
    Load {
        #[arg(long)]
        slot: usize,
    },
    /// Clear a slot
    Delete {
        #[arg(long)]
        slot: usize,
    },
    /// List all slots
    List,
}

#[derive(Subcommand)]
enum CatalogAction {
    /// Validate the catalog
    Check,
    /// Write the catalog as JSON
    Export {
        #[arg(long)]
        out: PathBuf,
    },
    /// Report how legacy text doses convert to structured tiers
    Migrate,
}

fn parse_route(s: &str) -> std::result::Result<Route, String> {
    Route::parse(s).ok_or_else(|| format!("unknown route '{}' (expected IM, IV or SC)", s))
}

fn parse_additive(s: &str) -> std::result::Result<AdditiveChoice, String> {
    match s.to_lowercase().as_str() {
        "off" => Ok(AdditiveChoice::Off),
        "recommended" => Ok(AdditiveChoice::Recommended),
        "reduced" => Ok(AdditiveChoice::Reduced),
        _ => Err(format!("unknown additive '{}' (expected off, recommended or reduced)", s)),
    }
}

fn parse_presentation(s: &str) -> std::result::Result<(String, String), String> {
    s.split_once('=')
        .map(|(drug, name)| (drug.trim().to_string(), name.trim().to_string()))
        .ok_or_else(|| format!("expected drug=presentation, got '{}'", s))
}

fn parse_diluent(s: &str) -> std::result::Result<(String, f64), String> {
    let (drug, dose) = s
        .split_once('=')
        .ok_or_else(|| format!("expected drug=dose, got '{}'", s))?;
    let dose = dose
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid dose '{}': {}", dose, e))?;
    Ok((drug.trim().to_string(), dose))
}

fn main() -> Result<()> {
    dosis_core::logging::init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let data_dir = cli.data_dir.clone().unwrap_or_else(|| config.data.data_dir.clone());
    let catalog_path = cli.catalog.clone().or_else(|| config.catalog.path.clone());
    let json = cli.json;
    tracing::debug!(?data_dir, ?catalog_path, "Resolved paths");

    match cli.command {
        Commands::Calc {
            patient,
            symptoms,
            presentations,
            diluents,
            additive,
            drugs,
        } => {
            let catalog = load_catalog(catalog_path.as_deref())?;
            let (mut session, alerts) = build_session(&catalog, &patient, &drugs)?;
            session = session.with_symptoms(&catalog, symptoms)?;
            for (drug, name) in &presentations {
                session = session.with_presentation(&catalog, drug, name)?;
            }
            for (drug, dose) in &diluents {
                session = session.with_diluent_proportion(&catalog, drug, *dose)?;
            }
            session = session.with_additive(&catalog, additive);
            print_report(&evaluate(&catalog, &session), &alerts, json)
        }
        Commands::Status { patient, selected } => {
            let catalog = load_catalog(catalog_path.as_deref())?;
            cmd_status(&catalog, &patient, &selected, json)
        }
        Commands::Drugs => cmd_drugs(&load_catalog(catalog_path.as_deref())?, json),
        Commands::Conditions => cmd_conditions(&load_catalog(catalog_path.as_deref())?, json),
        Commands::Symptoms => cmd_symptoms(&load_catalog(catalog_path.as_deref())?, json),
        Commands::Syndromes { symptoms } => {
            cmd_syndromes(&load_catalog(catalog_path.as_deref())?, symptoms, json)
        }
        Commands::Preset { action } => {
            let store = FilePresetStore::new(data_dir.join("presets.json"), config.presets.slots);
            cmd_preset(action, &store, catalog_path.as_deref(), json)
        }
        Commands::Catalog { action } => cmd_catalog(action, catalog_path.as_deref(), json),
    }
}

/// Build a session by selecting drugs in order; rejections are collected
fn build_session(
    catalog: &Catalog,
    args: &PatientArgs,
    drugs: &[String],
) -> Result<(Session, Vec<SelectionAlert>)> {
    let session = Session::new(args.patient())?;
    let (mut session, _) = session.with_conditions(catalog, args.conditions.clone())?;

    let mut alerts = Vec::new();
    for id in drugs {
        let (next, alert) = session.select(catalog, id)?;
        session = next;
        alerts.extend(alert);
    }
    Ok((session, alerts))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_status(catalog: &Catalog, args: &PatientArgs, selected: &[String], json: bool) -> Result<()> {
    let (session, alerts) = build_session(catalog, args, selected)?;
    for alert in &alerts {
        eprintln!("Not selected: {}: {}", alert.drug_id, alert.message);
    }

    let statuses: Vec<(&str, DrugStatus)> = catalog
        .drugs
        .keys()
        .map(|id| {
            let status = session
                .selection
                .status(catalog, id, &session.patient, &session.conditions);
            (id.as_str(), status)
        })
        .collect();

    if json {
        let map: std::collections::BTreeMap<&str, DrugStatus> = statuses.into_iter().collect();
        return print_json(&map);
    }

    for (id, status) in statuses {
        println!("  {:<16} {}", id, status_label(status));
    }
    Ok(())
}

fn status_label(status: DrugStatus) -> &'static str {
    match status {
        DrugStatus::Available => "available",
        DrugStatus::Selected => "selected",
        DrugStatus::Caution => "caution",
        DrugStatus::BlockedByInteraction => "blocked (interaction)",
        DrugStatus::BlockedByCondition => "blocked (condition)",
    }
}

fn cmd_drugs(catalog: &Catalog, json: bool) -> Result<()> {
    if json {
        let drugs: Vec<&Drug> = catalog.drugs.values().collect();
        return print_json(&drugs);
    }

    for drug in catalog.drugs.values() {
        let routes: Vec<&str> = drug.routes.iter().map(|r| r.as_str()).collect();
        println!("{:<16} {} ({}) [{}]", drug.id, drug.name, drug.class, routes.join(", "));
        for p in &drug.presentations {
            let marker = if p.principal { "*" } else { " " };
            println!("    {} {}: {} {} / {} mL", marker, p.name, p.concentration, p.unit, p.volume_ml);
        }
    }
    Ok(())
}

fn cmd_conditions(catalog: &Catalog, json: bool) -> Result<()> {
    if json {
        return print_json(&catalog.conditions);
    }
    for condition in &catalog.conditions {
        println!("{:<22} {}", condition.id, condition.label);
    }
    Ok(())
}

fn cmd_symptoms(catalog: &Catalog, json: bool) -> Result<()> {
    if json {
        return print_json(&catalog.symptom_groups);
    }
    for group in &catalog.symptom_groups {
        println!("{}:", group.label);
        for symptom in &group.symptoms {
            println!("    {:<22} {}", symptom.id, symptom.label);
        }
    }
    Ok(())
}

fn cmd_syndromes(catalog: &Catalog, symptoms: Vec<String>, json: bool) -> Result<()> {
    let session = Session::default().with_symptoms(catalog, symptoms)?;
    let syndromes = match_syndromes(catalog, &session.symptoms);
    let pictures = match_clinical_pictures(catalog, &session.symptoms);

    if json {
        return print_json(&serde_json::json!({
            "syndromes": syndromes,
            "clinical_pictures": pictures,
        }));
    }

    if syndromes.is_empty() && pictures.is_empty() {
        println!("No syndrome matches these symptoms.");
        return Ok(());
    }
    for m in &syndromes {
        println!("{} {}%", m.name, m.confidence);
        for flag in &m.active_red_flags {
            println!("    ! {}", flag.message);
        }
    }
    for m in &pictures {
        let marker = if m.is_emergency { " (EMERGENCY)" } else { "" };
        println!("{} {}%{}", m.name, m.confidence, marker);
    }
    Ok(())
}

fn cmd_preset(action: PresetAction, store: &FilePresetStore, catalog_path: Option<&Path>, json: bool) -> Result<()> {
    match action {
        PresetAction::Save {
            slot,
            name,
            patient,
            drugs,
        } => {
            let catalog = load_catalog(catalog_path)?;
            let (session, alerts) = build_session(&catalog, &patient, &drugs)?;
            for alert in &alerts {
                eprintln!("Not saved: {}: {}", alert.drug_id, alert.message);
            }
            store.save(slot, &Preset::from_session(name.clone(), &session))?;
            println!("✓ Saved preset '{}' to slot {}", name, slot);
            Ok(())
        }
        PresetAction::Load { slot } => {
            let preset = store
                .load(slot)?
                .ok_or_else(|| Error::Preset(format!("slot {} is empty", slot)))?;
            let catalog = load_catalog(catalog_path)?;
            let (session, alerts) = preset.restore(&catalog)?;
            if !json {
                println!("Preset '{}' (saved {})", preset.name, preset.saved_at.format("%Y-%m-%d %H:%M"));
            }
            print_report(&evaluate(&catalog, &session), &alerts, json)
        }
        PresetAction::Delete { slot } => {
            store.delete(slot)?;
            println!("✓ Cleared slot {}", slot);
            Ok(())
        }
        PresetAction::List => {
            let slots = store.list()?;
            if json {
                return print_json(&slots);
            }
            for (i, slot) in slots.iter().enumerate() {
                match slot {
                    Some(p) => println!(
                        "{:>2}: {} ({} kg, {} drugs, saved {})",
                        i,
                        p.name,
                        p.patient.weight_kg,
                        p.drug_ids.len(),
                        p.saved_at.format("%Y-%m-%d")
                    ),
                    None => println!("{:>2}: (empty)", i),
                }
            }
            Ok(())
        }
    }
}

fn cmd_catalog(action: CatalogAction, catalog_path: Option<&Path>, json: bool) -> Result<()> {
    match action {
        CatalogAction::Check => {
            let catalog = match catalog_path {
                Some(path) => Catalog::read_from(path)?.migrate_legacy().0,
                None => get_default_catalog().clone(),
            };
            let errors = catalog.validate();
            if !errors.is_empty() {
                eprintln!("Catalog validation errors:");
                for error in &errors {
                    eprintln!("  - {}", error);
                }
                return Err(Error::CatalogValidation(format!("{} problems", errors.len())));
            }
            println!(
                "Catalog OK: {} drugs, {} interactions, {} syndromes",
                catalog.drugs.len(),
                catalog.interactions.len(),
                catalog.syndromes.len()
            );
            Ok(())
        }
        CatalogAction::Export { out } => {
            load_catalog(catalog_path)?.save_to(&out)?;
            println!("✓ Wrote catalog to {}", out.display());
            Ok(())
        }
        CatalogAction::Migrate => {
            let raw = match catalog_path {
                Some(path) => Catalog::read_from(path)?,
                None => build_unmigrated_catalog(),
            };
            let (_, report) = raw.migrate_legacy();
            if json {
                return print_json(&report);
            }
            for entry in &report.entries {
                match &entry.outcome {
                    Ok(()) => println!("  migrated  {}: {}", entry.drug_id, entry.text),
                    Err(reason) => println!("  kept      {}: {} ({})", entry.drug_id, entry.text, reason),
                }
            }
            println!(
                "{} migrated, {} kept as text",
                report.migrated(),
                report.unsupported().count()
            );
            Ok(())
        }
    }
}

fn print_report(report: &SessionReport, alerts: &[SelectionAlert], json: bool) -> Result<()> {
    if json {
        return print_json(&serde_json::json!({
            "rejected": alerts,
            "report": report,
        }));
    }

    let patient = &report.patient;
    let population = if patient.is_pediatric() {
        "pediatric"
    } else if patient.is_elderly() {
        "elderly"
    } else {
        "adult"
    };
    println!(
        "Patient: {} kg, {} months, {} ({})",
        patient.weight_kg,
        patient.age_months(),
        patient.route,
        population
    );

    for alert in alerts {
        println!("✗ Rejected {}: {}", alert.drug_id, alert.message);
    }

    if !report.drugs.is_empty() {
        println!("\nDoses:");
    }
    for line in &report.drugs {
        print_drug_line(line);
    }

    if !report.interactions.is_empty() {
        println!("\nInteractions:");
        for finding in &report.interactions {
            println!("  [{}] {}: {}", finding.level, finding.display_name, finding.description);
            println!("      {}", finding.advice);
        }
    }

    if !report.condition_alerts.is_empty() {
        println!("\nCondition alerts:");
        for alert in &report.condition_alerts {
            println!(
                "  [{:?}] {} / {}: {}",
                alert.severity, alert.drug_name, alert.condition, alert.message
            );
        }
    }

    if !report.syndromes.is_empty() || !report.clinical_pictures.is_empty() {
        println!("\nSyndromes:");
        for m in &report.syndromes {
            println!("  {} {}%", m.name, m.confidence);
            for flag in &m.active_red_flags {
                println!("      ! {}", flag.message);
            }
        }
        for m in &report.clinical_pictures {
            println!("  {} {}%{}", m.name, m.confidence, if m.is_emergency { " (EMERGENCY)" } else { "" });
        }
    }

    for combo in &report.combinations {
        let missing = if combo.missing_drugs.is_empty() {
            String::new()
        } else {
            format!(" (missing: {})", combo.missing_drugs.join(", "))
        };
        println!("\nCombination: {}{}", combo.name, missing);
    }

    for guideline in &report.guidelines {
        println!("\n{}:", guideline.title);
        for rec in &guideline.recommendations {
            println!("  - {}", rec);
        }
    }

    if !report.drugs.is_empty() {
        print_adjuvant(&report.adjuvant, report);
        println!("\nTotal syringe volume: {} mL", round2(report.total_syringe_volume_ml));
    }
    Ok(())
}

fn print_drug_line(line: &session::DrugLine) {
    match &line.dose.outcome {
        DoseOutcome::Computed(c) => {
            let frequency = if c.frequency_hours.is_empty() {
                String::new()
            } else {
                let hours: Vec<String> = c.frequency_hours.iter().map(|h| h.to_string()).collect();
                format!(" every {} h", hours.join("/"))
            };
            println!(
                "  {}: {} {} = {} mL of {} (draw {} mL in {} syringe){}{}",
                line.name,
                round2(c.dose),
                c.unit,
                round2(c.volume_ml),
                c.presentation.name,
                c.volume.snapped,
                c.volume.tier.label,
                frequency,
                if c.capped { " [capped]" } else { "" }
            );
        }
        DoseOutcome::Unstructured { text } => {
            println!("  {}: see text dose: \"{}\"", line.name, text);
        }
        DoseOutcome::NoDosingAvailable { reason } => {
            println!("  {}: no dosing available ({})", line.name, reason);
        }
        DoseOutcome::MissingPresentation => {
            println!("  {}: no presentation available", line.name);
        }
    }
    if let Some(diluent) = &line.diluent {
        println!("      diluent: {} {} mL", diluent.name, diluent.proportion.volume_ml);
    }
    for prohibition in &line.forbidden_by {
        println!("      ! avoid ({}): {}", prohibition.rule_name, prohibition.reason);
    }
    for advisory in &line.dose.advisories {
        println!("      note: {}", advisory);
    }
}

fn print_adjuvant(plan: &AdjuvantPlan, report: &SessionReport) {
    println!("\nLidocaine 1%: {}", plan.compatibility.summary);
    for reason in &plan.compatibility.reasons {
        println!("  - {}", reason);
    }
    if let Some(volume) = &plan.volume {
        println!(
            "  recommended {} mL (max safe {} mL){}",
            volume.recommended_ml,
            volume.max_safe_ml,
            if volume.capped { " [capped]" } else { "" }
        );
        if let Some(reduced) = volume.reduced_ml {
            println!("  reduced {} mL", reduced);
        }
        for advisory in &volume.advisories {
            println!("  note: {}", advisory);
        }
    }
    if let Some(ml) = report.additive_volume_ml {
        println!("  added: {} mL ({:?})", ml, report.additive);
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
