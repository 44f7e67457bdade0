//! Canonical record store: one JSON object keyed by company, rewritten wholesale per run.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::models::RiskProfile;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordStore {
    profiles: BTreeMap<String, RiskProfile>,
}

impl RecordStore {
    pub fn insert(&mut self, company: String, profile: RiskProfile) {
        self.profiles.insert(company, profile);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RiskProfile)> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Parse only the outer object, leaving each entry for the caller to validate on its own.
    pub fn load_entries(path: &Path) -> Result<BTreeMap<String, serde_json::Value>> {
        let content = read(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Replace the store on disk atomically: write a sibling temp file, then rename over
    /// the target. Readers see either the previous store or this one, never a mix.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        serde_json::to_writer_pretty(&mut tmp, self)?;
        tmp.write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;

        info!(path = %path.display(), entries = self.len(), "record store written");
        Ok(())
    }
}

#[cfg(test)]
impl RecordStore {
    pub fn get(&self, company: &str) -> Option<&RiskProfile> {
        self.profiles.get(company)
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Strictly parse a store; any malformed entry fails the whole load.
    pub fn load(path: &Path) -> Result<Self> {
        let content = read(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| Error::data_unavailable(format!("record store {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn profile(v: f64) -> RiskProfile {
        RiskProfile {
            deforestation_risk: v,
            water_pollution_score: v,
            biodiversity_loss_risk: v,
            natural_capital_value: 1000.0,
            recommendations: vec!["Reduce industrial water discharge.".to_string()],
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("multi_org_report.json");

        let mut store = RecordStore::default();
        store.insert("Acme Co".to_string(), profile(0.25));
        store.save(&path).unwrap();

        let loaded = RecordStore::load(&path).unwrap();
        assert_eq!(loaded, store);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["Acme Co"]["Deforestation Risk"], 0.25);
    }

    #[test]
    fn test_save_overwrites_wholesale() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let mut first = RecordStore::default();
        first.insert("Old Co".to_string(), profile(0.1));
        first.save(&path).unwrap();

        let mut second = RecordStore::default();
        second.insert("New Co".to_string(), profile(0.2));
        second.save(&path).unwrap();

        let loaded = RecordStore::load(&path).unwrap();
        assert!(loaded.get("Old Co").is_none());
        assert!(loaded.get("New Co").is_some());
        // only the store itself remains; no temp files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_store() {
        let err = RecordStore::load(Path::new("nope/store.json")).unwrap_err();
        assert!(matches!(err, Error::DataUnavailable { .. }));
    }

    #[test]
    fn test_load_entries_tolerates_bad_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, r#"{"Good": {"Deforestation Risk": 0.1}, "Bad": 3}"#).unwrap();

        assert!(RecordStore::load(&path).is_err());
        let entries = RecordStore::load_entries(&path).unwrap();
        assert_eq!(entries.len(), 2);
    }
}
