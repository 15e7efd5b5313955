//! Install a mod, searching sources in priority order and recursively
//! installing required dependencies.

use anyhow::Result;
use log::{debug, warn};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use crate::commands::Config;
use crate::download::fetch_artifact;
use crate::http::HttpClient;
use crate::minecraft;
use crate::runtime::Runtime;
use crate::source::{ModSource, ModVersion, SourceRegistry};
use crate::store::{ModStore, TrackedMod};

/// Explicit result of an install attempt, so multi-token commands can
/// report each token honestly instead of logging and moving on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadyInstalled,
    /// No registered source produced a confirmed match.
    NotFound,
    /// The user rejected the resolved match; the whole command stops rather
    /// than advancing to the next source.
    Declined,
    /// A source was chosen but resolution or the fetch failed afterwards.
    Failed,
}

struct SourceMatch {
    id: String,
    name: String,
}

/// Probes whether the token is already a valid id on this source, and
/// searches by the token otherwise. `Ok(None)` means the source has no
/// candidate at all.
async fn resolve_on_source(
    source: &dyn ModSource,
    token: &str,
    game_version: &str,
) -> Result<Option<SourceMatch>> {
    if let Some(name) = source.project_name(token).await? {
        return Ok(Some(SourceMatch {
            id: token.to_string(),
            name,
        }));
    }

    match source.search(token, game_version).await? {
        Some(id) => {
            let name = source.project_name(&id).await?.unwrap_or_else(|| id.clone());
            Ok(Some(SourceMatch { id, name }))
        }
        None => Ok(None),
    }
}

/// Installs the mod identified by `token` (an id or free text).
///
/// Sources are tried in registration order; an Absent answer falls through
/// to the next source and a source-local error is logged and skipped. The
/// first source to produce a resolved and confirmed match is final: later
/// failures end the command instead of falling through.
#[tracing::instrument(skip(runtime, http, registry, config))]
pub async fn install<R: Runtime>(
    runtime: &R,
    http: &HttpClient,
    registry: &SourceRegistry,
    config: &Config,
    token: &str,
    essential: bool,
    yes: bool,
) -> Result<InstallOutcome> {
    let mut store = ModStore::load(runtime, &config.store_path())?;
    let game_version = minecraft::current_version(runtime, &config.version_path())?;

    for source in registry.iter() {
        println!("Searching for {} on {}...", token, source.name());

        let matched = match resolve_on_source(source.as_ref(), token, &game_version).await {
            Ok(Some(matched)) => matched,
            Ok(None) => {
                println!("{} not found on {}", token, source.name());
                continue;
            }
            Err(e) => {
                warn!("Searching {} on {} failed: {:#}", token, source.name(), e);
                continue;
            }
        };

        if !yes {
            let prompt = format!(
                "Found {} ({}) on {}. Install this mod?",
                matched.name,
                matched.id,
                source.name()
            );
            if !runtime.confirm(&prompt)? {
                println!("Install of {} cancelled.", token);
                return Ok(InstallOutcome::Declined);
            }
        }

        if store.contains(&matched.id) {
            println!("{} is already installed", matched.name);
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        let version = match source.latest_version(&matched.id, &game_version).await {
            Ok(Some(version)) => version,
            Ok(None) => {
                println!(
                    "{} has no available version on {} for Minecraft {}",
                    matched.name,
                    source.name(),
                    game_version
                );
                return Ok(InstallOutcome::Failed);
            }
            Err(e) => {
                warn!(
                    "Resolving a version of {} on {} failed: {:#}",
                    matched.name,
                    source.name(),
                    e
                );
                return Ok(InstallOutcome::Failed);
            }
        };

        let mut visited = HashSet::new();
        let result = install_version(
            runtime,
            http,
            source.as_ref(),
            config,
            &mut store,
            &version,
            essential,
            &mut visited,
        )
        .await;

        // Dependencies that made it in stay tracked even when the root
        // failed; the store must reflect every artifact on disk.
        store.save(runtime, &config.store_path())?;

        return match result {
            Ok(()) => {
                println!("Successfully installed {}", matched.name);
                Ok(InstallOutcome::Installed)
            }
            Err(e) => {
                warn!(
                    "An error occurred downloading {} from {}: {:#}",
                    matched.name,
                    source.name(),
                    e
                );
                Ok(InstallOutcome::Failed)
            }
        };
    }

    println!("{} could not be found on any registered source", token);
    Ok(InstallOutcome::NotFound)
}

/// Installs a resolved version and everything it requires, depth-first:
/// each dependency is fully installed before its parent, all carrying the
/// parent's essential flag. The visited set defends against malformed
/// source data describing a dependency cycle.
pub(crate) fn install_version<'a, R: Runtime>(
    runtime: &'a R,
    http: &'a HttpClient,
    source: &'a dyn ModSource,
    config: &'a Config,
    store: &'a mut ModStore,
    version: &'a ModVersion,
    essential: bool,
    visited: &'a mut HashSet<String>,
) -> Pin<Box<dyn Future<Output = Result<()>> + 'a>> {
    Box::pin(async move {
        if !visited.insert(version.mod_id.clone()) {
            warn!(
                "Dependency cycle detected at {}; skipping repeated install",
                version.mod_id
            );
            return Ok(());
        }

        for dep in &version.dependencies {
            if store.contains(&dep.mod_id) {
                debug!("Dependency {} is already installed", dep.mod_id);
                continue;
            }
            install_version(
                runtime,
                http,
                source,
                config,
                &mut *store,
                dep,
                essential,
                &mut *visited,
            )
            .await?;
        }

        fetch_artifact(runtime, http, version, &config.mods_dir()).await?;

        let name = source
            .project_name(&version.mod_id)
            .await?
            .unwrap_or_else(|| version.mod_id.clone());

        store.track(TrackedMod {
            id: version.mod_id.clone(),
            name,
            file_name: version.file_name.clone(),
            version: version.version_number.clone(),
            source: source.name().to_string(),
            essential,
            dependencies: version.dependency_ids(),
        });

        Ok(())
    })
}
