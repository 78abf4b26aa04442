//! Resolution preset files
//!
//! Every `*.json` file in the presets directory is a flat object mapping a
//! preset name to `[width, height]`. Files are read in sorted filename order;
//! a later file overrides an earlier one for the same name, but the name keeps
//! the position where it was first seen.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::inputs::coerce_int;

/// Ordered name -> (width, height) table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresetTable {
    entries: Vec<(String, (u32, u32))>,
}

impl PresetTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or override a preset, keeping first-seen order
    pub fn insert(&mut self, name: impl Into<String>, size: (u32, u32)) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = size,
            None => self.entries.push((name, size)),
        }
    }

    pub fn get(&self, name: &str) -> Option<(u32, u32)> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, size)| *size)
    }

    /// Preset names in table order
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge one parsed preset file. Malformed entries are skipped.
    fn merge_object(&mut self, object: &serde_json::Map<String, Value>) {
        for (name, value) in object {
            if let Some(size) = parse_size(value) {
                self.insert(name.clone(), size);
            }
        }
    }
}

fn parse_size(value: &Value) -> Option<(u32, u32)> {
    let pair = value.as_array().filter(|a| a.len() == 2)?;
    let width = coerce_int(&pair[0])?;
    let height = coerce_int(&pair[1])?;
    if width <= 0 || height <= 0 {
        return None;
    }
    Some((u32::try_from(width).ok()?, u32::try_from(height).ok()?))
}

fn preset_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    files
}

/// Load every preset file in `dir`.
///
/// A missing directory yields an empty table. Files that cannot be read or
/// parsed, or whose top level is not an object, are logged and skipped.
pub fn load_presets(dir: &Path) -> PresetTable {
    let mut table = PresetTable::new();

    for path in preset_files(dir) {
        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|text| serde_json::from_str::<Value>(&text).map_err(|e| e.to_string()));

        match parsed {
            Ok(Value::Object(object)) => table.merge_object(&object),
            Ok(_) => log::warn!(
                "Failed to load presets from {}: top level is not an object",
                path.display()
            ),
            Err(e) => log::warn!("Failed to load presets from {}: {}", path.display(), e),
        }
    }

    log::debug!("Loaded {} presets from {}", table.len(), dir.display());
    table
}
