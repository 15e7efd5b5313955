//! Minecraft game-version catalog and the persisted version marker.
//!
//! The catalog comes from the Fabric meta service. Any version string
//! accepted from a user is validated against it before use. The version
//! marker is a plain text file under the manager directory holding the
//! server's current target game version.

use anyhow::{Context, Result, bail};
use log::debug;
use serde::Deserialize;
use std::path::Path;

use crate::http::HttpClient;
use crate::runtime::Runtime;

const FABRIC_META_VERSIONS_URL: &str = "https://meta.fabricmc.net/v2/versions/game";

#[derive(Deserialize, Debug)]
struct GameVersion {
    version: String,
}

/// Read-only view of the known Minecraft versions.
pub struct VersionCatalog {
    http: HttpClient,
    versions_url: String,
}

impl VersionCatalog {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            versions_url: FABRIC_META_VERSIONS_URL.to_string(),
        }
    }

    /// Points the catalog at a different meta endpoint. Used by tests.
    pub fn with_versions_url(http: HttpClient, versions_url: impl Into<String>) -> Self {
        Self {
            http,
            versions_url: versions_url.into(),
        }
    }

    /// All known versions, newest first as reported by the meta service.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_versions(&self) -> Result<Vec<String>> {
        let versions: Vec<GameVersion> = self
            .http
            .get_json(&self.versions_url, &[])
            .await
            .context("Failed to fetch the Minecraft version list")?;

        Ok(versions.into_iter().map(|v| v.version).collect())
    }

    pub async fn is_valid_version(&self, version: &str) -> Result<bool> {
        let versions = self.list_all_versions().await?;
        Ok(versions.iter().any(|v| v == version))
    }
}

/// Reads the current target game version from the version marker.
pub fn current_version<R: Runtime>(runtime: &R, version_path: &Path) -> Result<String> {
    let contents = runtime
        .read_to_string(version_path)
        .with_context(|| format!("Failed to read the version marker at {}", version_path.display()))?;
    Ok(contents.trim().to_string())
}

/// Overwrites the version marker after validating the version against the
/// catalog. An invalid version is refused, never written.
pub async fn write_current_version<R: Runtime>(
    runtime: &R,
    catalog: &VersionCatalog,
    version_path: &Path,
    version: &str,
) -> Result<()> {
    if !catalog.is_valid_version(version).await? {
        bail!("Attempted to update the version marker with invalid version: {version}");
    }

    debug!("Writing version marker: {}", version);
    runtime.write(version_path, version.as_bytes())
}

/// Prompts the user for a version until a valid one is entered. Blocks
/// until a validated answer is given.
pub async fn ask_version<R: Runtime>(
    runtime: &R,
    catalog: &VersionCatalog,
    prompt: &str,
) -> Result<String> {
    loop {
        let answer = runtime.prompt_line(prompt)?;
        if catalog.is_valid_version(&answer).await? {
            return Ok(answer);
        }
        println!("{} is not a valid Minecraft version", answer);
    }
}
