//! Uninstall a mod and cascade-remove dependencies nothing else needs.

use anyhow::Result;
use log::debug;

use crate::commands::Config;
use crate::download::remove_artifact;
use crate::resolve;
use crate::runtime::Runtime;
use crate::store::ModStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UninstallOutcome {
    Removed,
    /// The token matched no stored mod.
    NotFound,
    /// The mod has dependents and the user kept it.
    Declined,
}

/// Uninstalls the mod matching `token`.
///
/// When other tracked mods list the target as a dependency, removal needs
/// explicit confirmation. Dependencies of the removed mod that no remaining
/// entry references are uninstalled too, silently.
#[tracing::instrument(skip(runtime, config))]
pub fn uninstall<R: Runtime>(
    runtime: &R,
    config: &Config,
    token: &str,
) -> Result<UninstallOutcome> {
    let mut store = ModStore::load(runtime, &config.store_path())?;

    let Some(target) = resolve::resolve(&store, token) else {
        println!("{} does not match any installed mod", token);
        return Ok(UninstallOutcome::NotFound);
    };
    let id = target.id.clone();
    let name = target.name.clone();

    let dependents: Vec<String> = store
        .dependents_of(&id)
        .iter()
        .map(|m| m.name.clone())
        .collect();
    if !dependents.is_empty() {
        println!(
            "{} is a dependency of: {}",
            name,
            dependents.join(", ")
        );
        if !runtime.confirm("Uninstalling it may break those mods. Uninstall anyway?")? {
            println!("Uninstall of {} cancelled.", name);
            return Ok(UninstallOutcome::Declined);
        }
    }

    remove_with_orphans(runtime, config, &mut store, &id)?;
    store.save(runtime, &config.store_path())?;

    println!("Successfully uninstalled {}", name);
    Ok(UninstallOutcome::Removed)
}

/// Removes one entry and its artifact, then walks the entry's recorded
/// dependency ids and removes any that no remaining entry references.
/// Deeper transitivity falls out of each dependency's own recorded list.
pub(crate) fn remove_with_orphans<R: Runtime>(
    runtime: &R,
    config: &Config,
    store: &mut ModStore,
    id: &str,
) -> Result<()> {
    let Some(removed) = store.untrack(id) else {
        debug!("{} was already removed from the store", id);
        return Ok(());
    };

    remove_artifact(runtime, &config.mods_dir(), &removed.file_name)?;
    debug!("Removed {} ({})", removed.name, removed.id);

    for dep_id in &removed.dependencies {
        if !store.contains(dep_id) {
            // Dangling reference; tolerated, nothing to do.
            continue;
        }
        if store.dependents_of(dep_id).is_empty() {
            remove_with_orphans(runtime, config, store, dep_id)?;
        }
    }

    Ok(())
}
