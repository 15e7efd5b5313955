//! Migrate every tracked mod to a new target game version.

use anyhow::{Result, bail};
use log::warn;
use std::collections::HashSet;

use crate::commands::Config;
use crate::commands::install::install_version;
use crate::download::remove_artifact;
use crate::http::HttpClient;
use crate::minecraft::{self, VersionCatalog};
use crate::runtime::Runtime;
use crate::source::SourceRegistry;
use crate::store::ModStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrateOutcome {
    Completed,
    /// The feasibility probe failed; nothing was changed.
    Infeasible,
    /// An essential mod became unavailable mid-migration. The remaining
    /// loop was abandoned; already-migrated mods stay migrated.
    AbortedOnEssential(String),
}

/// Read-only feasibility probe: would a migration to `target_version`
/// fully succeed?
///
/// With `force` only essential mods are considered; otherwise every
/// tracked mod must have a version on the target. Each per-mod outcome is
/// printed as the probe progresses.
#[tracing::instrument(skip(runtime, registry, catalog, config))]
pub async fn is_migrate_possible<R: Runtime>(
    runtime: &R,
    registry: &SourceRegistry,
    catalog: &VersionCatalog,
    config: &Config,
    target_version: &str,
    force: bool,
) -> Result<bool> {
    if !catalog.is_valid_version(target_version).await? {
        bail!("{} is not a valid Minecraft version", target_version);
    }

    let store = ModStore::load(runtime, &config.store_path())?;
    let candidates: Vec<_> = store
        .mods()
        .iter()
        .filter(|m| !force || m.essential)
        .collect();

    if candidates.is_empty() {
        bail!("There are no tracked mods to migrate");
    }

    let mut all_available = true;
    for entry in candidates {
        let available = match registry.by_name(&entry.source) {
            Some(source) => matches!(
                source.latest_version(&entry.id, target_version).await,
                Ok(Some(_))
            ),
            None => false,
        };

        if available {
            println!("{} is available on Minecraft {}", entry.name, target_version);
        } else {
            println!(
                "{} is NOT available on Minecraft {}",
                entry.name, target_version
            );
            all_available = false;
        }
    }

    Ok(all_available)
}

/// Migrates all tracked mods to `target_version`.
///
/// Re-runs the feasibility probe first and aborts with no changes when it
/// fails. During the migration loop an unavailable non-essential mod is
/// discarded with a warning; an unavailable essential mod aborts the rest
/// of the loop immediately, without rolling back mods already migrated.
#[tracing::instrument(skip(runtime, http, registry, catalog, config))]
pub async fn migrate<R: Runtime>(
    runtime: &R,
    http: &HttpClient,
    registry: &SourceRegistry,
    catalog: &VersionCatalog,
    config: &Config,
    target_version: &str,
    force: bool,
) -> Result<MigrateOutcome> {
    if !is_migrate_possible(runtime, registry, catalog, config, target_version, force).await? {
        println!(
            "It is not possible to migrate to Minecraft {}; no changes were made",
            target_version
        );
        return Ok(MigrateOutcome::Infeasible);
    }

    let mut store = ModStore::load(runtime, &config.store_path())?;
    let entries = store.mods().to_vec();

    // The probe only constrained essential mods under force; the migration
    // itself always walks every tracked mod.
    for entry in entries {
        remove_artifact(runtime, &config.mods_dir(), &entry.file_name)?;
        store.untrack(&entry.id);

        let resolved = match registry.by_name(&entry.source) {
            Some(source) => {
                match source.latest_version(&entry.id, target_version).await {
                    Ok(resolved) => resolved.map(|version| (source.clone(), version)),
                    Err(e) => {
                        warn!("Failed to resolve {} on {}: {:#}", entry.name, entry.source, e);
                        None
                    }
                }
            }
            None => None,
        };

        let Some((source, version)) = resolved else {
            if entry.essential {
                println!(
                    "Migration aborted: essential mod {} is not available on Minecraft {}",
                    entry.name, target_version
                );
                store.save(runtime, &config.store_path())?;
                return Ok(MigrateOutcome::AbortedOnEssential(entry.name));
            }
            warn!(
                "Discarded {}: not available on Minecraft {}",
                entry.name, target_version
            );
            continue;
        };

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
            Ok(()) => println!(
                "Migrated {} to {} for Minecraft {}",
                entry.name, version.version_number, target_version
            ),
            Err(e) => {
                if entry.essential {
                    warn!("Failed to reinstall essential mod {}: {:#}", entry.name, e);
                    store.save(runtime, &config.store_path())?;
                    return Ok(MigrateOutcome::AbortedOnEssential(entry.name));
                }
                warn!("Discarded {}: reinstall failed: {:#}", entry.name, e);
            }
        }
    }

    store.save(runtime, &config.store_path())?;
    minecraft::write_current_version(runtime, catalog, &config.version_path(), target_version)
        .await?;

    report_untracked_artifacts(runtime, config, &store)?;
    println!("Successfully migrated to Minecraft {}", target_version);
    Ok(MigrateOutcome::Completed)
}

/// Lists on-disk artifacts with no matching store entry. They were never
/// installed through the manager and have to be migrated by hand.
fn report_untracked_artifacts<R: Runtime>(
    runtime: &R,
    config: &Config,
    store: &ModStore,
) -> Result<()> {
    let mods_dir = config.mods_dir();
    if !runtime.exists(&mods_dir) {
        return Ok(());
    }

    for path in runtime.read_dir(&mods_dir)? {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if store.mods().iter().all(|m| m.file_name != file_name) {
            println!("{} is untracked and requires manual migration", file_name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::source::{MockModSource, ModVersion};
    use crate::store::TrackedMod;
    use crate::test_utils::tracked;
    use mockall::Sequence;
    use mockall::predicate::eq;
    use reqwest::Client;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    fn config() -> Config {
        Config::at(PathBuf::from("/server"))
    }

    async fn catalog_for(server: &mut mockito::ServerGuard) -> VersionCatalog {
        server
            .mock("GET", "/versions/game")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"version": "1.20"}, {"version": "1.19.2"}]"#)
            .create_async()
            .await;
        VersionCatalog::with_versions_url(
            HttpClient::new(Client::new()),
            format!("{}/versions/game", server.url()),
        )
    }

    fn version_on(server_url: &str, id: &str, number: &str) -> ModVersion {
        ModVersion {
            mod_id: id.to_string(),
            file_name: format!("{id}-{number}.jar"),
            url: format!("{server_url}/{id}-{number}.jar"),
            version_number: number.to_string(),
            dependencies: vec![],
            checksum: None,
        }
    }

    fn store_runtime(mods: &[TrackedMod], saved: Arc<Mutex<Vec<u8>>>) -> MockRuntime {
        let json = serde_json::to_string(mods).unwrap();
        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .with(eq(PathBuf::from("/server/.mod-manager/mods.json")))
            .returning(move |_| Ok(json.clone()));
        runtime.expect_exists().returning(|_| true);
        runtime.expect_remove_file().returning(|_| Ok(()));
        runtime
            .expect_create_file()
            .returning(|_| Ok(Box::new(std::io::sink())));
        runtime.expect_write().returning(move |path, contents| {
            if path.ends_with("mods.json.tmp") {
                *saved.lock().unwrap() = contents.to_vec();
            }
            Ok(())
        });
        runtime.expect_rename().returning(|_, _| Ok(()));
        runtime
    }

    fn saved_mods(saved: &Arc<Mutex<Vec<u8>>>) -> Vec<TrackedMod> {
        serde_json::from_slice(&saved.lock().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn probe_is_false_iff_any_candidate_is_absent() {
        let mut server = mockito::Server::new_async().await;
        let catalog = catalog_for(&mut server).await;

        let mut source = MockModSource::new();
        source.expect_name().return_const("Modrinth");
        source
            .expect_latest_version()
            .with(eq("a"), eq("1.20"))
            .returning(|id, _| Ok(Some(version_on("http://u", id, "2.0"))));
        source
            .expect_latest_version()
            .with(eq("b"), eq("1.20"))
            .returning(|_, _| Ok(None));

        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(source));

        let saved = Arc::new(Mutex::new(Vec::new()));
        let runtime = store_runtime(&[tracked("a", &[]), tracked("b", &[])], saved);

        let possible =
            is_migrate_possible(&runtime, &registry, &catalog, &config(), "1.20", false)
                .await
                .unwrap();
        assert!(!possible);
    }

    #[tokio::test]
    async fn probe_with_force_only_considers_essential_mods() {
        let mut server = mockito::Server::new_async().await;
        let catalog = catalog_for(&mut server).await;

        // Only the essential mod is probed; the non-essential one would
        // return Absent but is never asked for.
        let mut source = MockModSource::new();
        source.expect_name().return_const("Modrinth");
        source
            .expect_latest_version()
            .with(eq("e"), eq("1.20"))
            .times(1)
            .returning(|id, _| Ok(Some(version_on("http://u", id, "2.0"))));

        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(source));

        let mut essential = tracked("e", &[]);
        essential.essential = true;
        let saved = Arc::new(Mutex::new(Vec::new()));
        let runtime = store_runtime(&[tracked("x", &[]), essential], saved);

        let possible =
            is_migrate_possible(&runtime, &registry, &catalog, &config(), "1.20", true)
                .await
                .unwrap();
        assert!(possible);
    }

    #[tokio::test]
    async fn probe_with_force_is_false_when_an_essential_mod_is_absent() {
        let mut server = mockito::Server::new_async().await;
        let catalog = catalog_for(&mut server).await;

        let mut source = MockModSource::new();
        source.expect_name().return_const("Modrinth");
        source
            .expect_latest_version()
            .with(eq("e"), eq("1.20"))
            .returning(|_, _| Ok(None));

        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(source));

        let mut essential = tracked("e", &[]);
        essential.essential = true;
        let saved = Arc::new(Mutex::new(Vec::new()));
        let runtime = store_runtime(&[essential], saved);

        let possible =
            is_migrate_possible(&runtime, &registry, &catalog, &config(), "1.20", true)
                .await
                .unwrap();
        assert!(!possible);
    }

    #[tokio::test]
    async fn probe_rejects_invalid_target_version() {
        let mut server = mockito::Server::new_async().await;
        let catalog = catalog_for(&mut server).await;

        let runtime = MockRuntime::new();
        let registry = SourceRegistry::new();

        let result =
            is_migrate_possible(&runtime, &registry, &catalog, &config(), "9.99", false).await;
        assert!(result.unwrap_err().to_string().contains("not a valid"));
    }

    #[tokio::test]
    async fn probe_errors_on_empty_candidate_set() {
        let mut server = mockito::Server::new_async().await;
        let catalog = catalog_for(&mut server).await;

        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        let registry = SourceRegistry::new();
        let result =
            is_migrate_possible(&runtime, &registry, &catalog, &config(), "1.20", false).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn infeasible_migration_changes_nothing() {
        let mut server = mockito::Server::new_async().await;
        let catalog = catalog_for(&mut server).await;

        let mut source = MockModSource::new();
        source.expect_name().return_const("Modrinth");
        source.expect_latest_version().returning(|_, _| Ok(None));

        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(source));

        let mut essential = tracked("e", &[]);
        essential.essential = true;
        let json = serde_json::to_string(&[essential]).unwrap();

        // No write, rename, or remove_file expectations: the mock panics
        // if migrate touches anything.
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(move |_| Ok(json.clone()));

        let outcome = migrate(
            &runtime,
            &HttpClient::new(Client::new()),
            &registry,
            &catalog,
            &config(),
            "1.20",
            false,
        )
        .await
        .unwrap();
        assert_eq!(outcome, MigrateOutcome::Infeasible);
    }

    #[tokio::test]
    async fn migration_replaces_mods_and_persists_version() {
        let mut server = mockito::Server::new_async().await;
        let catalog = catalog_for(&mut server).await;
        server
            .mock("GET", "/a-2.0.jar")
            .with_status(200)
            .with_body("jar")
            .create_async()
            .await;
        let url = server.url();

        let mut source = MockModSource::new();
        source.expect_name().return_const("Modrinth");
        source
            .expect_latest_version()
            .with(eq("a"), eq("1.20"))
            .returning(move |id, _| Ok(Some(version_on(&url, id, "2.0"))));
        source
            .expect_project_name()
            .returning(|id| Ok(Some(format!("Mod {}", id.to_uppercase()))));

        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(source));

        let saved = Arc::new(Mutex::new(Vec::new()));
        let saved_clone = Arc::clone(&saved);
        let json = serde_json::to_string(&[tracked("a", &[])]).unwrap();

        let mut runtime = MockRuntime::new();
        runtime
            .expect_read_to_string()
            .returning(move |_| Ok(json.clone()));
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_remove_file()
            .with(eq(PathBuf::from("/server/mods/a.jar")))
            .times(1)
            .returning(|_| Ok(()));
        runtime
            .expect_create_file()
            .returning(|_| Ok(Box::new(std::io::sink())));
        runtime.expect_write().returning(move |path, contents| {
            if path.ends_with("mods.json.tmp") {
                *saved_clone.lock().unwrap() = contents.to_vec();
            } else {
                assert_eq!(path, PathBuf::from("/server/.mod-manager/version.txt"));
                assert_eq!(contents, b"1.20");
            }
            Ok(())
        });
        runtime.expect_rename().returning(|_, _| Ok(()));
        // Untracked report: one stray file next to the migrated artifact.
        runtime.expect_read_dir().returning(|_| {
            Ok(vec![
                PathBuf::from("/server/mods/a-2.0.jar"),
                PathBuf::from("/server/mods/handmade.jar"),
            ])
        });

        let outcome = migrate(
            &runtime,
            &HttpClient::new(Client::new()),
            &registry,
            &catalog,
            &config(),
            "1.20",
            false,
        )
        .await
        .unwrap();
        assert_eq!(outcome, MigrateOutcome::Completed);

        let mods = saved_mods(&saved);
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].version, "2.0");
        assert_eq!(mods[0].file_name, "a-2.0.jar");
    }

    #[tokio::test]
    async fn essential_mod_vanishing_mid_migration_aborts_the_loop() {
        let mut server = mockito::Server::new_async().await;
        let catalog = catalog_for(&mut server).await;
        server
            .mock("GET", "/x-2.0.jar")
            .with_status(200)
            .with_body("jar")
            .create_async()
            .await;
        let url = server.url();

        let mut essential = tracked("e", &[]);
        essential.essential = true;

        let mut source = MockModSource::new();
        source.expect_name().return_const("Modrinth");
        source
            .expect_project_name()
            .returning(|id| Ok(Some(format!("Mod {}", id.to_uppercase()))));
        // x stays resolvable throughout.
        source
            .expect_latest_version()
            .with(eq("x"), eq("1.20"))
            .returning(move |id, _| Ok(Some(version_on(&url, id, "2.0"))));
        // e resolves during the probe, then vanishes during the migration.
        let mut seq = Sequence::new();
        source
            .expect_latest_version()
            .with(eq("e"), eq("1.20"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id, _| Ok(Some(version_on("http://u", id, "2.0"))));
        source
            .expect_latest_version()
            .with(eq("e"), eq("1.20"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(None));

        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(source));

        let saved = Arc::new(Mutex::new(Vec::new()));
        let runtime = store_runtime(&[tracked("x", &[]), essential], Arc::clone(&saved));

        let outcome = migrate(
            &runtime,
            &HttpClient::new(Client::new()),
            &registry,
            &catalog,
            &config(),
            "1.20",
            false,
        )
        .await
        .unwrap();
        assert_eq!(outcome, MigrateOutcome::AbortedOnEssential("Mod E".to_string()));

        // x stays migrated, e is gone, the version marker was not written.
        let mods = saved_mods(&saved);
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].id, "x");
        assert_eq!(mods[0].version, "2.0");
    }
}
