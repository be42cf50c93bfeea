#![forbid(unsafe_code)]

//! Core domain model and decision engine for the Dosis injectable-dose
//! calculator.
//!
//! This crate provides:
//! - Domain types (patients, drugs, dose rules, clinical rule tables)
//! - Catalog management and legacy dose migration
//! - Dose, interaction, condition, syndrome and adjuvant engines
//! - Selection gating and per-session evaluation
//! - Preset persistence and label lookup caching

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod snap;
pub mod dose;
pub mod legacy;
pub mod interaction;
pub mod condition;
pub mod syndrome;
pub mod combination;
pub mod adjuvant;
pub mod selection;
pub mod session;
pub mod preset;
pub mod label;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog, load_catalog};
pub use config::Config;
pub use snap::{snap, snap_info, SnapInfo};
pub use dose::{calculate_all, calculate_dose, DoseOutcome, DoseResult};
pub use legacy::MigrationReport;
pub use interaction::{find_interactions, gate_level, InteractionFinding};
pub use condition::ConditionStatus;
pub use syndrome::{match_clinical_pictures, match_syndromes};
pub use adjuvant::{AdditiveChoice, AdjuvantPlan};
pub use selection::{DrugStatus, SelectOutcome, SelectionState};
pub use session::{evaluate, Session, SessionReport};
pub use preset::{FilePresetStore, Preset, PresetStore};
pub use label::{LabelClient, LabelSource, LabelView};
