//! Source abstraction for mod hosting back-ends.
//!
//! This module provides a unified interface over the hosting services a mod
//! can be installed from (Modrinth, Forgejo), enabling multi-source fallback.

mod forgejo;
mod modrinth;
mod registry;

pub use forgejo::ForgejoSource;
pub use modrinth::ModrinthSource;
pub use registry::SourceRegistry;

use anyhow::Result;
use async_trait::async_trait;

/// Integrity hash of a downloadable artifact, as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checksum {
    Sha1(String),
    Sha512(String),
}

/// A source's resolved installation candidate for a mod on a given game
/// version. Transient: consumed by install/update/migrate and discarded
/// once converted into a tracked entry, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ModVersion {
    pub mod_id: String,
    pub file_name: String,
    pub url: String,
    pub version_number: String,
    /// Required dependencies, themselves fully resolved.
    pub dependencies: Vec<ModVersion>,
    pub checksum: Option<Checksum>,
}

/// Capability contract for a mod hosting back-end.
///
/// `search` and `latest_version` return `Ok(None)` when no candidate exists
/// (the Absent condition); any `Err` is a source-local failure. Callers fall
/// through to the next registered source on either.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModSource: Send + Sync {
    /// Human-readable source name; also the foreign key stored on tracked mods.
    fn name(&self) -> &'static str;

    /// Searches for a mod compatible with the given game version.
    /// Returns the source-assigned project id of the best hit.
    async fn search(&self, query: &str, game_version: &str) -> Result<Option<String>>;

    /// Resolves the latest installable version of a project for the given
    /// game version, including its required dependencies.
    async fn latest_version(&self, id: &str, game_version: &str) -> Result<Option<ModVersion>>;

    /// Fetches the display name of a project. `Ok(None)` means the id does
    /// not exist on this source, which install uses as an id-validity probe.
    async fn project_name(&self, id: &str) -> Result<Option<String>>;
}

impl ModVersion {
    /// Ids of the directly required dependencies, in resolution order.
    pub fn dependency_ids(&self) -> Vec<String> {
        self.dependencies.iter().map(|d| d.mod_id.clone()).collect()
    }
}
