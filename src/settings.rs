use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::capture::{validate_phases, PhaseSpec};
use crate::comparison::NormalRangeTable;
use crate::error::CaptureError;
use crate::progress::ProgressConfig;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

/// Clinical protocol: which phases a session walks through and the table its
/// measurements are scored against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClinicalConfig {
    pub phases: Vec<PhaseSpec>,
    pub normal_ranges: NormalRangeTable,
}

impl Default for ClinicalConfig {
    fn default() -> Self {
        Self {
            phases: PhaseSpec::wrist_protocol(),
            normal_ranges: NormalRangeTable::default(),
        }
    }
}

impl ClinicalConfig {
    /// A phase's range and the table entry for the field it fills must agree
    /// when both are present.
    pub fn validate(&self) -> Result<(), CaptureError> {
        validate_phases(&self.phases)?;
        for spec in &self.phases {
            let Some(field) = spec.phase.field() else {
                continue;
            };
            if let Some(range) = self.normal_ranges.range(field) {
                if range != spec.normal_range {
                    return Err(CaptureError::InvalidConfig(format!(
                        "{} range {}-{} disagrees with phase {} range {}-{}",
                        field,
                        range.min,
                        range.max,
                        spec.phase,
                        spec.normal_range.min,
                        spec.normal_range.max
                    )));
                }
            }
        }
        Ok(())
    }

    /// Table measurements are scored against: the configured table with each
    /// measured phase's range filled in for its field.
    pub fn comparison_table(&self) -> NormalRangeTable {
        self.phases
            .iter()
            .fold(self.normal_ranges.clone(), |table, spec| match spec.phase.field() {
                Some(field) => table.with_range(field, spec.normal_range),
                None => table,
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    pub clinical: ClinicalConfig,
    pub progress: ProgressConfig,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<EngineSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log_warn!(
                    "Ignoring unreadable settings at {}: {}",
                    path.display(),
                    err
                );
                EngineSettings::default()
            })
        } else {
            EngineSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, EngineSettings> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, EngineSettings> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn settings(&self) -> EngineSettings {
        self.read().clone()
    }

    pub fn clinical(&self) -> ClinicalConfig {
        self.read().clinical.clone()
    }

    pub fn progress(&self) -> ProgressConfig {
        self.read().progress.clone()
    }

    /// Replace the clinical protocol. Rejected configs are neither applied nor written.
    pub fn update_clinical(&self, clinical: ClinicalConfig) -> Result<()> {
        clinical.validate()?;
        let mut guard = self.write();
        guard.clinical = clinical;
        self.persist(&guard)
    }

    pub fn update_progress(&self, progress: ProgressConfig) -> Result<()> {
        let mut guard = self.write();
        guard.progress = progress;
        self.persist(&guard)
    }

    fn persist(&self, data: &EngineSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: EngineSettings = serde_json::from_str(&contents)?;
        *self.write() = data;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PhaseId;
    use crate::comparison::{MeasurementField, NormalRange};

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("romtrack-{}-{}.json", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = SettingsStore::new(temp_path("missing")).unwrap();
        let settings = store.settings();
        assert_eq!(settings.clinical.phases.len(), 4);
        assert_eq!(settings.clinical.phases[0].phase, PhaseId::PalmarFlexion);
        assert_eq!(settings.progress, ProgressConfig::default());
    }

    #[test]
    fn garbage_file_falls_back_to_defaults() {
        let path = temp_path("garbage");
        fs::write(&path, "{ not json").unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.clinical(), ClinicalConfig::default());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn updates_are_written_and_reloaded() {
        let path = temp_path("persist");
        let store = SettingsStore::new(path.clone()).unwrap();
        let mut clinical = ClinicalConfig::default();
        clinical.phases = PhaseSpec::full_protocol();
        store.update_clinical(clinical.clone()).unwrap();

        let reopened = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(reopened.clinical(), clinical);
        let _ = fs::remove_file(path);
    }

    #[test]
    fn phase_ranges_fill_the_comparison_table() {
        let mut clinical = ClinicalConfig::default();
        clinical.normal_ranges = NormalRangeTable::default().without(MeasurementField::WristFlexion);
        clinical.phases[0].normal_range = NormalRange::new(60.0, 90.0);
        clinical.validate().unwrap();

        let table = clinical.comparison_table();
        assert_eq!(
            table.range(MeasurementField::WristFlexion),
            Some(NormalRange::new(60.0, 90.0))
        );
        assert_eq!(
            table.range(MeasurementField::ThumbAbduction),
            NormalRangeTable::default().range(MeasurementField::ThumbAbduction)
        );
    }

    #[test]
    fn disagreeing_ranges_are_rejected() {
        let mut clinical = ClinicalConfig::default();
        clinical.phases[0].normal_range = NormalRange::new(60.0, 90.0);
        let err = clinical.validate().unwrap_err();
        assert!(matches!(err, CaptureError::InvalidConfig(_)));

        let store = SettingsStore::new(temp_path("disagree")).unwrap();
        assert!(store.update_clinical(clinical).is_err());
    }

    #[test]
    fn invalid_protocol_is_rejected() {
        let path = temp_path("invalid");
        let store = SettingsStore::new(path.clone()).unwrap();
        let clinical = ClinicalConfig {
            phases: Vec::new(),
            normal_ranges: NormalRangeTable::default(),
        };
        assert!(store.update_clinical(clinical).is_err());
        assert!(!path.exists());
    }
}
