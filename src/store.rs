//! Persisted collection of tracked mods; the sole on-disk source of truth.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::runtime::Runtime;

/// Persisted record of an installed mod.
///
/// `dependencies` holds the ids of the mods this one required at install
/// time. A dependency id may reference an entry that was later independently
/// removed; dangling references are tolerated, not repaired.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackedMod {
    pub id: String,
    pub name: String,
    pub file_name: String,
    pub version: String,
    pub source: String,
    pub essential: bool,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// In-memory view of the mod store file. Mutations only reach disk through
/// [`ModStore::save`], which rewrites the whole file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ModStore {
    mods: Vec<TrackedMod>,
}

impl ModStore {
    /// Loads the store from the given path. A missing file is an empty store.
    #[tracing::instrument(skip(runtime, path))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            return Ok(Self::default());
        }

        let contents = runtime
            .read_to_string(path)
            .with_context(|| format!("Failed to read mod store at {}", path.display()))?;
        let mods: Vec<TrackedMod> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse mod store at {}", path.display()))?;

        Ok(Self { mods })
    }

    /// Rewrites the store file. Writes to a temporary file next to the
    /// target and renames it into place, so a crash mid-write cannot leave
    /// a truncated store behind.
    #[tracing::instrument(skip(self, runtime, path))]
    pub fn save<R: Runtime>(&self, runtime: &R, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.mods)
            .context("Failed to serialise the mod store")?;

        let mut temp = path.as_os_str().to_owned();
        temp.push(".tmp");
        let temp = Path::new(&temp);

        runtime.write(temp, contents.as_bytes())?;
        runtime.rename(temp, path)?;
        Ok(())
    }

    pub fn from_mods(mods: Vec<TrackedMod>) -> Self {
        Self { mods }
    }

    pub fn mods(&self) -> &[TrackedMod] {
        &self.mods
    }

    pub fn is_empty(&self) -> bool {
        self.mods.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mods.len()
    }

    pub fn get(&self, id: &str) -> Option<&TrackedMod> {
        self.mods.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Adds a mod to the store, replacing any existing entry with the same id.
    pub fn track(&mut self, entry: TrackedMod) {
        self.mods.retain(|m| m.id != entry.id);
        self.mods.push(entry);
    }

    /// Removes and returns the entry with the given id.
    pub fn untrack(&mut self, id: &str) -> Option<TrackedMod> {
        let index = self.mods.iter().position(|m| m.id == id)?;
        Some(self.mods.remove(index))
    }

    /// All entries that list `id` in their dependencies. The entry with that
    /// id itself is never its own dependent.
    pub fn dependents_of(&self, id: &str) -> Vec<&TrackedMod> {
        self.mods
            .iter()
            .filter(|m| m.id != id && m.dependencies.iter().any(|d| d == id))
            .collect()
    }

    /// Sets the essential flag on the entry with the given id.
    /// Returns false when no such entry exists.
    pub fn set_essential(&mut self, id: &str, essential: bool) -> bool {
        match self.mods.iter_mut().find(|m| m.id == id) {
            Some(entry) => {
                entry.essential = essential;
                true
            }
            None => false,
        }
    }
}
