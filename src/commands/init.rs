//! Set up the mod manager inside an existing Fabric server directory.

use anyhow::{Result, bail};
use log::warn;

use crate::commands::Config;
use crate::minecraft::{self, VersionCatalog};
use crate::runtime::Runtime;
use crate::store::ModStore;

/// Initialises the manager directory, an empty store, and the version
/// marker. Refuses to run anywhere that does not look like a Fabric
/// server root.
#[tracing::instrument(skip(runtime, catalog, config))]
pub async fn init<R: Runtime>(
    runtime: &R,
    catalog: &VersionCatalog,
    config: &Config,
) -> Result<()> {
    if config.is_initialised(runtime) {
        warn!("Mod Manager is already initialised here");
        return Ok(());
    }

    let root = &config.server_root;
    if !runtime.exists(&root.join("server.properties")) || !runtime.exists(&root.join(".fabric")) {
        bail!(
            "{} does not look like a Fabric Minecraft server; \
             expected server.properties and a .fabric directory",
            root.display()
        );
    }

    let version = minecraft::ask_version(
        runtime,
        catalog,
        "Which Minecraft version does this server run?",
    )
    .await?;

    runtime.create_dir_all(&config.manager_dir())?;
    runtime.create_dir_all(&config.mods_dir())?;
    ModStore::default().save(runtime, &config.store_path())?;
    minecraft::write_current_version(runtime, catalog, &config.version_path(), &version).await?;

    println!("Initialised the mod manager for Minecraft {}", version);
    Ok(())
}
