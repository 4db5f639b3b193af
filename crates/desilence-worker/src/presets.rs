//! Registry of named presets.

use std::collections::BTreeMap;
use std::path::Path;

use desilence_media::{load_preset_file, Preset, DEFAULT_PRESET};
use tracing::{debug, info};

use crate::error::{WorkerError, WorkerResult};

/// Named presets; a later preset with the same name replaces the earlier one.
#[derive(Debug, Clone, Default)]
pub struct PresetRegistry {
    presets: BTreeMap<String, Preset>,
}

impl PresetRegistry {
    /// Registry holding only the built-in preset.
    pub fn builtin() -> WorkerResult<Self> {
        let mut presets = BTreeMap::new();
        presets.insert(
            DEFAULT_PRESET.to_string(),
            Preset::builtin().map_err(|e| WorkerError::config(e.to_string()))?,
        );
        Ok(Self { presets })
    }

    /// Add presets, replacing whole presets that share a name.
    pub fn merge(&mut self, presets: BTreeMap<String, Preset>) {
        for (name, preset) in presets {
            if self.presets.insert(name.clone(), preset).is_some() {
                debug!(preset = %name, "Preset replaced");
            }
        }
    }

    /// Load a JSON preset file and merge it in.
    pub fn load_file(&mut self, path: &Path) -> WorkerResult<()> {
        let presets = load_preset_file(path).map_err(|e| WorkerError::config(e.to_string()))?;
        info!(
            path = %path.display(),
            count = presets.len(),
            "Loaded additional presets"
        );
        self.merge(presets);
        Ok(())
    }

    pub fn get(&self, name: &str) -> WorkerResult<&Preset> {
        self.presets.get(name).ok_or_else(|| {
            WorkerError::config(format!(
                "unknown preset '{}', available presets: {}",
                name,
                self.names().collect::<Vec<_>>().join(", ")
            ))
        })
    }

    /// Preset names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.presets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}
