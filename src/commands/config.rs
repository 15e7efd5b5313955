//! Managed paths under the server directory.

use anyhow::{Result, bail};
use std::path::PathBuf;

use crate::runtime::Runtime;

pub const MANAGER_DIR: &str = ".mod-manager";
pub const STORE_FILE: &str = "mods.json";
pub const VERSION_FILE: &str = "version.txt";
pub const MODS_DIR: &str = "mods";

/// Locations of everything the manager owns, all anchored at the server
/// root (the working directory unless overridden).
#[derive(Debug, Clone)]
pub struct Config {
    pub server_root: PathBuf,
}

impl Config {
    pub fn new<R: Runtime>(runtime: &R, root: Option<PathBuf>) -> Result<Self> {
        let server_root = match root {
            Some(path) => path,
            None => runtime.current_dir()?,
        };
        Ok(Self { server_root })
    }

    pub fn at(server_root: PathBuf) -> Self {
        Self { server_root }
    }

    pub fn manager_dir(&self) -> PathBuf {
        self.server_root.join(MANAGER_DIR)
    }

    pub fn store_path(&self) -> PathBuf {
        self.manager_dir().join(STORE_FILE)
    }

    pub fn version_path(&self) -> PathBuf {
        self.manager_dir().join(VERSION_FILE)
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.server_root.join(MODS_DIR)
    }

    pub fn is_initialised<R: Runtime>(&self, runtime: &R) -> bool {
        runtime.exists(&self.manager_dir())
    }

    /// Errors unless `init` has been run in this directory.
    pub fn ensure_initialised<R: Runtime>(&self, runtime: &R) -> Result<()> {
        if !self.is_initialised(runtime) {
            bail!("Mod Manager is not initialised here; run `modman init` first");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;

    #[test]
    fn paths_are_anchored_at_server_root() {
        let config = Config::at(PathBuf::from("/server"));
        assert_eq!(config.manager_dir(), PathBuf::from("/server/.mod-manager"));
        assert_eq!(
            config.store_path(),
            PathBuf::from("/server/.mod-manager/mods.json")
        );
        assert_eq!(
            config.version_path(),
            PathBuf::from("/server/.mod-manager/version.txt")
        );
        assert_eq!(config.mods_dir(), PathBuf::from("/server/mods"));
    }

    #[test]
    fn new_defaults_to_current_dir() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_current_dir()
            .returning(|| Ok(PathBuf::from("/cwd")));

        let config = Config::new(&runtime, None).unwrap();
        assert_eq!(config.server_root, PathBuf::from("/cwd"));

        let config = Config::new(&runtime, Some(PathBuf::from("/other"))).unwrap();
        assert_eq!(config.server_root, PathBuf::from("/other"));
    }

    #[test]
    fn ensure_initialised_errors_without_manager_dir() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/server/.mod-manager")))
            .returning(|_| false);

        let config = Config::at(PathBuf::from("/server"));
        assert!(config.ensure_initialised(&runtime).is_err());
    }
}
