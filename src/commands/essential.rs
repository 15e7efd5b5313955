//! Toggle the essential flag on a mod and its dependency closure.

use anyhow::Result;
use std::collections::HashSet;

use crate::commands::Config;
use crate::resolve;
use crate::runtime::Runtime;
use crate::store::ModStore;

/// Flips the essential flag of the mod matching `token` and of every
/// recorded dependency, transitively. Each visited entry flips its own
/// flag rather than inheriting the root's, so applying the command twice
/// restores every original flag.
#[tracing::instrument(skip(runtime, config))]
pub fn toggle_essential<R: Runtime>(runtime: &R, config: &Config, token: &str) -> Result<bool> {
    let mut store = ModStore::load(runtime, &config.store_path())?;

    let Some(root) = resolve::resolve(&store, token).cloned() else {
        println!("Could not find a mod matching {}", token);
        return Ok(false);
    };

    let mut visited = HashSet::new();
    mark(&mut store, &root.id, &mut visited);

    store.save(runtime, &config.store_path())?;
    if !root.essential {
        println!("{} and its dependencies are now essential", root.name);
    } else {
        println!("{} and its dependencies are no longer essential", root.name);
    }
    Ok(true)
}

fn mark(store: &mut ModStore, id: &str, visited: &mut HashSet<String>) {
    if !visited.insert(id.to_string()) {
        return;
    }
    let Some(entry) = store.get(id) else {
        // Dependency ids can dangle after a manual store edit.
        return;
    };
    let dependencies = entry.dependencies.clone();
    let flipped = !entry.essential;
    store.set_essential(id, flipped);
    for dep in dependencies {
        mark(store, &dep, visited);
    }
}
