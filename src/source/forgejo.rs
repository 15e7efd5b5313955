//! Forgejo adapter.
//!
//! Mods hosted on a Forgejo instance are published to its package registry.
//! The registry has no game-version filter, so the adapter pages through
//! search results and inspects each package's `gradle.properties` to find a
//! build for the wanted Minecraft version. Download URLs are synthesised
//! from the package page URL and the file id.

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use std::collections::HashMap;

use super::{Checksum, ModSource, ModVersion};
use crate::http::{HttpClient, is_not_found};

const FORGEJO_API_URL: &str = "https://git.bits.team/api/v1";
const FORGEJO_PACKAGE_OWNER: &str = "Bits";

pub struct ForgejoSource {
    http: HttpClient,
    api_key: String,
    base_url: String,
    package_owner: String,
}

#[derive(Deserialize, Debug, Clone)]
struct ForgejoPackage {
    name: String,
    version: String,
    #[serde(rename = "type")]
    kind: String,
    html_url: String,
    owner: PackageOwner,
    repository: PackageRepository,
}

#[derive(Deserialize, Debug, Clone)]
struct PackageOwner {
    username: String,
}

#[derive(Deserialize, Debug, Clone)]
struct PackageRepository {
    id: i64,
    name: String,
}

#[derive(Deserialize, Debug)]
struct Repository {
    name: String,
}

#[derive(Deserialize, Debug)]
struct PackageFile {
    id: i64,
    name: String,
    sha1: String,
}

/// Minimal `key = value` parser for gradle.properties content. Lines
/// without an equals sign and comment lines are ignored.
fn parse_properties(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            Some((key.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

impl ForgejoSource {
    pub fn new(http: HttpClient, api_key: String) -> Self {
        Self {
            http,
            api_key,
            base_url: FORGEJO_API_URL.to_string(),
            package_owner: FORGEJO_PACKAGE_OWNER.to_string(),
        }
    }

    /// Points the adapter at a different Forgejo instance. Used by tests.
    pub fn with_base_url(
        http: HttpClient,
        api_key: String,
        base_url: impl Into<String>,
        package_owner: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key,
            base_url: base_url.into(),
            package_owner: package_owner.into(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut query = query.to_vec();
        query.push(("access_token", self.api_key.as_str()));
        self.http.get_json(&url, &query).await
    }

    /// Pages through the package registry until a package built for the
    /// wanted game version turns up. Returns the package and the id of its
    /// backing repository, which serves as the project id.
    async fn find_package(
        &self,
        query: &str,
        game_version: &str,
    ) -> Result<Option<(ForgejoPackage, String)>> {
        let mut page: u32 = 1;

        loop {
            let page_param = page.to_string();
            let packages: Vec<ForgejoPackage> = self
                .get_json(
                    &format!("/packages/{}", self.package_owner),
                    &[("q", query), ("page", page_param.as_str())],
                )
                .await
                .with_context(|| format!("Package search for '{}' on Forgejo failed", query))?;

            if packages.is_empty() {
                return Ok(None);
            }

            for package in packages {
                let properties_url = format!(
                    "{}/repos/{}/{}/media/gradle.properties",
                    self.base_url, package.owner.username, package.repository.name
                );
                let properties = match self
                    .http
                    .get_text(
                        &properties_url,
                        &[
                            ("ref", package.version.as_str()),
                            ("access_token", self.api_key.as_str()),
                        ],
                    )
                    .await
                {
                    Ok(text) => parse_properties(&text),
                    // A package without gradle.properties is not a mod build.
                    Err(_) => continue,
                };

                if properties.get("minecraft_version").map(String::as_str) == Some(game_version) {
                    let project_id = package.repository.id.to_string();
                    debug!(
                        "Matched Forgejo package {} {} for Minecraft {}",
                        package.name, package.version, game_version
                    );
                    return Ok(Some((package, project_id)));
                }
            }

            page += 1;
        }
    }
}

#[async_trait]
impl ModSource for ForgejoSource {
    fn name(&self) -> &'static str {
        "Forgejo"
    }

    #[tracing::instrument(skip(self))]
    async fn search(&self, query: &str, game_version: &str) -> Result<Option<String>> {
        Ok(self
            .find_package(query, game_version)
            .await?
            .map(|(_, project_id)| project_id))
    }

    #[tracing::instrument(skip(self))]
    async fn latest_version(&self, id: &str, game_version: &str) -> Result<Option<ModVersion>> {
        let Some(project_name) = self.project_name(id).await? else {
            return Ok(None);
        };

        let Some((package, project_id)) = self.find_package(&project_name, game_version).await?
        else {
            return Ok(None);
        };

        let files: Vec<PackageFile> = self
            .get_json(
                &format!(
                    "/packages/{}/{}/{}/{}/files",
                    package.owner.username, package.kind, package.name, package.version
                ),
                &[],
            )
            .await
            .with_context(|| format!("Failed to list files of Forgejo package {}", package.name))?;

        let Some(jar) = files.into_iter().find(|f| f.name.ends_with(".jar")) else {
            return Ok(None);
        };

        // The package API exposes no direct download URL; build one from the
        // package page and the file id.
        let url = format!("{}/files/{}", package.html_url, jar.id);

        Ok(Some(ModVersion {
            mod_id: project_id,
            file_name: jar.name,
            url,
            version_number: package.version,
            dependencies: vec![],
            checksum: Some(Checksum::Sha1(jar.sha1)),
        }))
    }

    #[tracing::instrument(skip(self))]
    async fn project_name(&self, id: &str) -> Result<Option<String>> {
        match self
            .get_json::<Repository>(&format!("/repositories/{}", id), &[])
            .await
        {
            Ok(repository) => Ok(Some(repository.name)),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
