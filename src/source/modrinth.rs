//! Modrinth adapter.
//!
//! Talks to the Modrinth v2 API, filtered to Fabric server mods. Version
//! resolution also resolves required dependencies, depth-first, so the
//! returned [`ModVersion`] carries its full dependency tree.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use super::{Checksum, ModSource, ModVersion};
use crate::http::{HttpClient, is_not_found};

const MODRINTH_API_URL: &str = "https://api.modrinth.com/v2";

/// How a dependency entry on a Modrinth version relates to it. Only
/// `required` entries are resolved and installed.
const REQUIRED_DEPENDENCY: &str = "required";

pub struct ModrinthSource {
    http: HttpClient,
    base_url: String,
}

#[derive(Deserialize, Debug)]
struct SearchResults {
    hits: Vec<SearchHit>,
}

#[derive(Deserialize, Debug)]
struct SearchHit {
    project_id: String,
}

#[derive(Deserialize, Debug)]
struct Project {
    title: String,
}

#[derive(Deserialize, Debug)]
struct ProjectVersion {
    version_number: String,
    files: Vec<VersionFile>,
    #[serde(default)]
    dependencies: Vec<VersionDependency>,
}

#[derive(Deserialize, Debug)]
struct VersionFile {
    url: String,
    filename: String,
    #[serde(default)]
    primary: bool,
    hashes: FileHashes,
}

#[derive(Deserialize, Debug, Default)]
struct FileHashes {
    sha512: Option<String>,
    sha1: Option<String>,
}

#[derive(Deserialize, Debug)]
struct VersionDependency {
    project_id: Option<String>,
    dependency_type: String,
}

impl ModrinthSource {
    pub fn new(http: HttpClient) -> Self {
        Self {
            http,
            base_url: MODRINTH_API_URL.to_string(),
        }
    }

    /// Points the adapter at a different API endpoint. Used by tests.
    pub fn with_base_url(http: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Resolves the latest version of a project, recursing into required
    /// dependencies. The visited set guards against malformed source data
    /// describing a dependency cycle.
    fn resolve_version<'a>(
        &'a self,
        id: &'a str,
        game_version: &'a str,
        visited: &'a mut HashSet<String>,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ModVersion>>> + Send + 'a>> {
        Box::pin(async move {
            visited.insert(id.to_string());

            let url = format!("{}/project/{}/version", self.base_url, id);
            let loaders = r#"["fabric"]"#.to_string();
            let game_versions = format!(r#"["{}"]"#, game_version);
            let versions: Vec<ProjectVersion> = match self
                .http
                .get_json(
                    &url,
                    &[
                        ("loaders", loaders.as_str()),
                        ("game_versions", game_versions.as_str()),
                    ],
                )
                .await
            {
                Ok(versions) => versions,
                Err(e) if is_not_found(&e) => return Ok(None),
                Err(e) => return Err(e),
            };

            let Some(latest) = versions.into_iter().next() else {
                return Ok(None);
            };

            let file = latest
                .files
                .iter()
                .find(|f| f.primary)
                .or_else(|| latest.files.first())
                .with_context(|| format!("Version {} of {} has no files", latest.version_number, id))?;

            let mut dependencies = Vec::new();
            for dep in &latest.dependencies {
                if dep.dependency_type != REQUIRED_DEPENDENCY {
                    continue;
                }
                let Some(dep_id) = &dep.project_id else {
                    continue;
                };
                if visited.contains(dep_id) {
                    warn!("Dependency cycle detected at project {}; skipping", dep_id);
                    continue;
                }

                match self.resolve_version(dep_id, game_version, visited).await? {
                    Some(dep_version) => dependencies.push(dep_version),
                    None => bail!(
                        "Required dependency {} of {} has no version for Minecraft {}",
                        dep_id,
                        id,
                        game_version
                    ),
                }
            }

            let checksum = file
                .hashes
                .sha512
                .clone()
                .map(Checksum::Sha512)
                .or_else(|| file.hashes.sha1.clone().map(Checksum::Sha1));

            Ok(Some(ModVersion {
                mod_id: id.to_string(),
                file_name: file.filename.clone(),
                url: file.url.clone(),
                version_number: latest.version_number,
                dependencies,
                checksum,
            }))
        })
    }
}

#[async_trait]
impl ModSource for ModrinthSource {
    fn name(&self) -> &'static str {
        "Modrinth"
    }

    #[tracing::instrument(skip(self))]
    async fn search(&self, query: &str, game_version: &str) -> Result<Option<String>> {
        let url = format!("{}/search", self.base_url);
        let facets = format!(r#"[["categories:fabric"],["versions:{}"]]"#, game_version);

        let results: SearchResults = self
            .http
            .get_json(
                &url,
                &[("query", query), ("limit", "1"), ("facets", facets.as_str())],
            )
            .await
            .with_context(|| format!("Search for '{}' on Modrinth failed", query))?;

        debug!("Modrinth search for '{}': {} hit(s)", query, results.hits.len());
        Ok(results.hits.into_iter().next().map(|hit| hit.project_id))
    }

    #[tracing::instrument(skip(self))]
    async fn latest_version(&self, id: &str, game_version: &str) -> Result<Option<ModVersion>> {
        let mut visited = HashSet::new();
        self.resolve_version(id, game_version, &mut visited).await
    }

    #[tracing::instrument(skip(self))]
    async fn project_name(&self, id: &str) -> Result<Option<String>> {
        let url = format!("{}/project/{}", self.base_url, id);
        match self.http.get_json::<Project>(&url, &[]).await {
            Ok(project) => Ok(Some(project.title)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
