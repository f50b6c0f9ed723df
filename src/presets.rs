// src/presets.rs
//
// Storage for user-named canvas size presets.

use crate::engine::write_atomic;
use crate::error::{CanvasError, Result};
use crate::ops::SizePreset;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Key the preset list lives under in a JSON store.
pub const PRESETS_KEY: &str = "customPresets";

/// Label carried by user-created presets.
pub const CUSTOM_LABEL: &str = "Custom";

/// Persistence for custom size presets. The whole list is rewritten on every change.
pub trait PresetStore {
    fn load(&self) -> Result<Vec<SizePreset>>;
    fn save(&self, presets: &[SizePreset]) -> Result<()>;

    /// Append a preset. An empty `name` becomes "Custom N" (N = new list length).
    fn add(&self, name: &str, width: u32, height: u32) -> Result<SizePreset> {
        if width == 0 || height == 0 {
            return Err(CanvasError::invalid_argument(
                "preset",
                format!("{width}x{height}"),
                "dimensions must be positive",
            ));
        }
        crate::engine::check_dimensions(width, height)?;
        let mut presets = self.load()?;
        let name = match name.trim() {
            "" => format!("Custom {}", presets.len() + 1),
            trimmed => trimmed.to_string(),
        };
        let preset = SizePreset {
            label: Some(CUSTOM_LABEL.to_string()),
            ..SizePreset::new(name, width, height)
        };
        presets.push(preset.clone());
        self.save(&presets)?;
        Ok(preset)
    }

    /// Delete the preset at `index`.
    fn delete(&self, index: usize) -> Result<SizePreset> {
        let mut presets = self.load()?;
        if index >= presets.len() {
            return Err(CanvasError::invalid_preset(format!("#{index}")));
        }
        let removed = presets.remove(index);
        self.save(&presets)?;
        Ok(removed)
    }
}

/// In-process store, mostly for tests and short-lived hosts.
#[derive(Debug, Default)]
pub struct MemoryPresetStore {
    presets: Mutex<Vec<SizePreset>>,
}

impl MemoryPresetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PresetStore for MemoryPresetStore {
    fn load(&self) -> Result<Vec<SizePreset>> {
        let presets = self
            .presets
            .lock()
            .map_err(|_| CanvasError::internal_panic("preset store lock poisoned"))?;
        Ok(presets.clone())
    }

    fn save(&self, presets: &[SizePreset]) -> Result<()> {
        let mut stored = self
            .presets
            .lock()
            .map_err(|_| CanvasError::internal_panic("preset store lock poisoned"))?;
        *stored = presets.to_vec();
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Default)]
struct PresetFile {
    #[serde(rename = "customPresets", default)]
    custom_presets: Vec<SizePreset>,
}

/// JSON file store: `{"customPresets": [...]}`, written atomically.
///
/// A missing file reads as an empty list.
#[derive(Debug, Clone)]
pub struct JsonFilePresetStore {
    path: PathBuf,
}

impl JsonFilePresetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn path_str(&self) -> String {
        self.path.display().to_string()
    }
}

impl PresetStore for JsonFilePresetStore {
    fn load(&self) -> Result<Vec<SizePreset>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CanvasError::file_read_failed(self.path_str(), e)),
        };
        let file: PresetFile = serde_json::from_slice(&data).map_err(|e| {
            CanvasError::invalid_argument(PRESETS_KEY, self.path_str(), e.to_string())
        })?;
        debug!(path = %self.path.display(), count = file.custom_presets.len(), "loaded presets");
        Ok(file.custom_presets)
    }

    fn save(&self, presets: &[SizePreset]) -> Result<()> {
        let file = PresetFile {
            custom_presets: presets.to_vec(),
        };
        let json = serde_json::to_vec_pretty(&file).map_err(|e| {
            CanvasError::invalid_argument(PRESETS_KEY, self.path_str(), e.to_string())
        })?;
        write_atomic(&self.path, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_add_delete() {
        let store = MemoryPresetStore::new();
        let first = store.add("", 800, 600).unwrap();
        assert_eq!(first.name, "Custom 1");
        assert_eq!(first.label.as_deref(), Some(CUSTOM_LABEL));
        store.add("Banner", 1500, 500).unwrap();
        assert_eq!(store.load().unwrap().len(), 2);

        let removed = store.delete(0).unwrap();
        assert_eq!(removed.name, "Custom 1");
        assert_eq!(store.load().unwrap()[0].name, "Banner");
        assert!(matches!(store.delete(5), Err(CanvasError::InvalidPreset { .. })));
    }

    #[test]
    fn test_add_rejects_zero_dimension() {
        let store = MemoryPresetStore::new();
        assert!(store.add("flat", 0, 10).is_err());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_json_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePresetStore::new(dir.path().join("presets.json"));
        assert!(store.load().unwrap().is_empty());

        store.add("Cover", 1640, 624).unwrap();
        let reopened = JsonFilePresetStore::new(store.path());
        let presets = reopened.load().unwrap();
        assert_eq!(presets.len(), 1);
        assert_eq!((presets[0].width, presets[0].height), (1640, 624));

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains(PRESETS_KEY));
    }

    #[test]
    fn test_json_store_accepts_short_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        std::fs::write(&path, r#"{"customPresets":[{"name":"Old","w":300,"h":200}]}"#).unwrap();
        let presets = JsonFilePresetStore::new(&path).load().unwrap();
        assert_eq!(presets[0].width, 300);
        assert_eq!(presets[0].height, 200);
    }

    #[test]
    fn test_json_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(JsonFilePresetStore::new(&path).load().is_err());
    }
}
