//! Bounded preset slots with file locking.
//!
//! A preset is a snapshot of the patient, the selected drug ids and the
//! active conditions. The file store keeps a JSON array with one entry per
//! slot and degrades to empty slots when the file is missing or corrupt.

use crate::selection::SelectionAlert;
use crate::session::Session;
use crate::{Catalog, Error, PatientContext, Result};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const DEFAULT_SLOTS: usize = 10;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Preset {
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub patient: PatientContext,
    pub drug_ids: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl Preset {
    pub fn from_session(name: impl Into<String>, session: &Session) -> Self {
        Self {
            name: name.into(),
            saved_at: Utc::now(),
            patient: session.patient.clone(),
            drug_ids: session.selection.drug_ids.clone(),
            conditions: session.conditions.clone(),
        }
    }

    /// Rebuild a session, re-gating every drug against the current catalog
    ///
    /// Drugs the catalog now rejects are left out and reported.
    pub fn restore(&self, catalog: &Catalog) -> Result<(Session, Vec<SelectionAlert>)> {
        let session = Session::new(self.patient.clone())?;
        let (mut session, _) = session.with_conditions(catalog, self.conditions.clone())?;

        let mut alerts = Vec::new();
        for id in &self.drug_ids {
            let (next, alert) = session.select(catalog, id)?;
            session = next;
            alerts.extend(alert);
        }
        Ok((session, alerts))
    }
}

/// Slot-indexed preset storage
pub trait PresetStore {
    fn capacity(&self) -> usize;

    fn save(&self, slot: usize, preset: &Preset) -> Result<()>;

    fn load(&self, slot: usize) -> Result<Option<Preset>>;

    fn delete(&self, slot: usize) -> Result<()>;

    /// Every slot, `None` where empty
    fn list(&self) -> Result<Vec<Option<Preset>>>;
}

/// Presets persisted to one JSON file
pub struct FilePresetStore {
    path: PathBuf,
    slots: usize,
}

impl FilePresetStore {
    pub fn new(path: impl Into<PathBuf>, slots: usize) -> Self {
        Self {
            path: path.into(),
            slots,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn check_slot(&self, slot: usize) -> Result<()> {
        if slot >= self.slots {
            return Err(Error::Preset(format!(
                "slot {} out of range (0..{})",
                slot, self.slots
            )));
        }
        Ok(())
    }

    /// Read all slots with a shared lock, padded or truncated to capacity
    fn read_slots(&self) -> Result<Vec<Option<Preset>>> {
        let empty = vec![None; self.slots];
        if !self.path.exists() {
            return Ok(empty);
        }

        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open preset file {:?}: {}. Using empty slots.", self.path, e);
                return Ok(empty);
            }
        };

        file.lock_shared()?;
        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;

        if let Err(e) = read {
            tracing::warn!("Failed to read preset file {:?}: {}. Using empty slots.", self.path, e);
            return Ok(empty);
        }

        match serde_json::from_str::<Vec<Option<Preset>>>(&contents) {
            Ok(mut slots) => {
                slots.resize(self.slots, None);
                Ok(slots)
            }
            Err(e) => {
                tracing::warn!("Failed to parse preset file {:?}: {}. Using empty slots.", self.path, e);
                Ok(empty)
            }
        }
    }

    /// Write all slots atomically through a locked temp file
    fn write_slots(&self, slots: &[Option<Preset>]) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Preset(format!("preset path {:?} has no parent", self.path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            writer.write_all(serde_json::to_string_pretty(slots)?.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        tracing::debug!("Saved presets to {:?}", self.path);
        Ok(())
    }
}

impl PresetStore for FilePresetStore {
    fn capacity(&self) -> usize {
        self.slots
    }

    fn save(&self, slot: usize, preset: &Preset) -> Result<()> {
        self.check_slot(slot)?;
        let mut slots = self.read_slots()?;
        slots[slot] = Some(preset.clone());
        self.write_slots(&slots)?;
        tracing::info!("Saved preset '{}' to slot {}", preset.name, slot);
        Ok(())
    }

    fn load(&self, slot: usize) -> Result<Option<Preset>> {
        self.check_slot(slot)?;
        Ok(self.read_slots()?.swap_remove(slot))
    }

    fn delete(&self, slot: usize) -> Result<()> {
        self.check_slot(slot)?;
        let mut slots = self.read_slots()?;
        if slots[slot].take().is_some() {
            self.write_slots(&slots)?;
            tracing::info!("Deleted preset in slot {}", slot);
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<Option<Preset>>> {
        self.read_slots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_default_catalog, AgeUnit, Route};

    fn sample(name: &str) -> Preset {
        Preset {
            name: name.into(),
            saved_at: Utc::now(),
            patient: PatientContext {
                weight_kg: 22.5,
                age: 7.0,
                age_unit: AgeUnit::Years,
                route: Route::Intramuscular,
            },
            drug_ids: vec!["ceftriaxona".into(), "metamizol".into()],
            conditions: vec!["asma".into()],
        }
    }

    fn store(dir: &tempfile::TempDir) -> FilePresetStore {
        FilePresetStore::new(dir.path().join("presets.json"), DEFAULT_SLOTS)
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(&temp_dir);

        let preset = sample("otitis");
        store.save(3, &preset).unwrap();

        assert_eq!(store.load(3).unwrap(), Some(preset));
        assert_eq!(store.load(0).unwrap(), None);
        assert_eq!(store.list().unwrap().len(), DEFAULT_SLOTS);
    }

    #[test]
    fn test_out_of_range_slot() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(&temp_dir);

        assert!(matches!(store.save(10, &sample("x")), Err(Error::Preset(_))));
        assert!(store.load(42).is_err());
        assert!(store.delete(10).is_err());
    }

    #[test]
    fn test_delete_clears_slot() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(&temp_dir);

        store.save(1, &sample("a")).unwrap();
        store.delete(1).unwrap();
        assert_eq!(store.load(1).unwrap(), None);
        // deleting an empty slot is fine
        store.delete(2).unwrap();
    }

    #[test]
    fn test_corrupt_file_gives_empty_slots() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(&temp_dir);
        std::fs::write(store.path(), "{ not json ]").unwrap();

        let slots = store.list().unwrap();
        assert_eq!(slots.len(), DEFAULT_SLOTS);
        assert!(slots.iter().all(|s| s.is_none()));

        // a save over a corrupt file starts from empty slots
        store.save(0, &sample("fresh")).unwrap();
        assert!(store.load(0).unwrap().is_some());
    }

    #[test]
    fn test_short_file_is_padded() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(&temp_dir);
        let short = serde_json::to_string(&vec![Some(sample("only"))]).unwrap();
        std::fs::write(store.path(), short).unwrap();

        let slots = store.list().unwrap();
        assert_eq!(slots.len(), DEFAULT_SLOTS);
        assert_eq!(slots[0].as_ref().unwrap().name, "only");
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = store(&temp_dir);
        store.save(0, &sample("a")).unwrap();

        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "presets.json")
            .collect();
        assert!(extras.is_empty(), "Expected only presets.json, found extras: {:?}", extras);
    }

    #[test]
    fn test_restore_rebuilds_equivalent_session() {
        let catalog = build_default_catalog();
        let preset = sample("otitis");
        let (session, alerts) = preset.restore(&catalog).unwrap();

        assert!(alerts.is_empty());
        assert_eq!(session.patient, preset.patient);
        assert_eq!(session.selection.drug_ids, preset.drug_ids);
        assert_eq!(session.conditions, preset.conditions);
        assert!(session.selection.presentations.contains_key("ceftriaxona"));
    }

    #[test]
    fn test_restore_reports_now_blocked_drugs() {
        let catalog = build_default_catalog();
        let mut preset = sample("pregnant");
        preset.patient = PatientContext::default();
        preset.drug_ids = vec!["ketorolaco".into(), "ondansetron".into()];
        preset.conditions = vec!["embarazo".into()];

        let (session, alerts) = preset.restore(&catalog).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].drug_id, "ketorolaco");
        assert_eq!(session.selection.drug_ids, vec!["ondansetron".to_string()]);
    }
}
