//! Update every tracked mod to the latest version for the current game
//! version.

use anyhow::Result;
use log::warn;
use std::collections::HashSet;

use crate::commands::Config;
use crate::commands::install::install_version;
use crate::download::remove_artifact;
use crate::http::HttpClient;
use crate::minecraft;
use crate::runtime::Runtime;
use crate::source::{ModSource, ModVersion, SourceRegistry};
use crate::store::ModStore;

/// Result of probing a single tracked mod for an update. Distinguishes
/// "the source has nothing at all" from "the source has exactly what is
/// installed" instead of overloading one absence signal for both.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateProbe {
    Available(ModVersion),
    UpToDate,
    Absent,
}

/// Asks the source for the latest version and compares it to what is
/// installed.
pub async fn probe_update(
    source: &dyn ModSource,
    id: &str,
    installed_version: &str,
    game_version: &str,
) -> Result<UpdateProbe> {
    match source.latest_version(id, game_version).await? {
        None => Ok(UpdateProbe::Absent),
        Some(version) if version.version_number == installed_version => Ok(UpdateProbe::UpToDate),
        Some(version) => Ok(UpdateProbe::Available(version)),
    }
}

/// Checks every tracked mod against its source and reinstalls the ones
/// with a newer version, keeping each mod's essential flag. Per-mod
/// failures are reported and the command continues; a summary always
/// concludes the run.
#[tracing::instrument(skip(runtime, http, registry, config))]
pub async fn update<R: Runtime>(
    runtime: &R,
    http: &HttpClient,
    registry: &SourceRegistry,
    config: &Config,
) -> Result<()> {
    let mut store = ModStore::load(runtime, &config.store_path())?;
    let game_version = minecraft::current_version(runtime, &config.version_path())?;

    let entries = store.mods().to_vec();
    let (mut updated, mut up_to_date, mut unavailable, mut failed) = (0, 0, 0, 0);

    for entry in entries {
        let Some(source) = registry.by_name(&entry.source) else {
            warn!(
                "Source {} of {} is not registered (missing credential?); skipping",
                entry.source, entry.name
            );
            failed += 1;
            continue;
        };

        match probe_update(source.as_ref(), &entry.id, &entry.version, &game_version).await {
            Ok(UpdateProbe::UpToDate) => {
                println!("No update available for {}", entry.name);
                up_to_date += 1;
            }
            Ok(UpdateProbe::Absent) => {
                println!(
                    "{} is no longer available on {} for Minecraft {}",
                    entry.name,
                    source.name(),
                    game_version
                );
                unavailable += 1;
            }
            Ok(UpdateProbe::Available(version)) => {
                // Silent replace: old artifact and entry go first, then the
                // new version is installed with the same essential flag.
                remove_artifact(runtime, &config.mods_dir(), &entry.file_name)?;
                store.untrack(&entry.id);

                let mut visited = HashSet::new();
                match install_version(
                    runtime,
                    http,
                    source.as_ref(),
                    config,
                    &mut store,
                    &version,
                    entry.essential,
                    &mut visited,
                )
                .await
                {
                    Ok(()) => {
                        println!("Updated {} to {}", entry.name, version.version_number);
                        updated += 1;
                    }
                    Err(e) => {
                        warn!("Failed to update {}: {:#}", entry.name, e);
                        failed += 1;
                    }
                }
            }
            Err(e) => {
                warn!("Failed to check {} for updates: {:#}", entry.name, e);
                failed += 1;
            }
        }
    }

    store.save(runtime, &config.store_path())?;

    println!(
        "Update finished: {} updated, {} up to date, {} unavailable, {} failed",
        updated, up_to_date, unavailable, failed
    );
    Ok(())
}
