//! Print the tracked mods.

use anyhow::Result;

use crate::commands::Config;
use crate::runtime::Runtime;
use crate::store::ModStore;

pub fn list<R: Runtime>(runtime: &R, config: &Config) -> Result<()> {
    let store = ModStore::load(runtime, &config.store_path())?;

    if store.is_empty() {
        println!("There are no mods installed yet!");
        println!("Install one with `modman install <mod>`");
        return Ok(());
    }

    println!("{:<30} {:<15} {:<10} {:<10}", "Name", "Version", "Source", "Essential");
    for entry in store.mods() {
        println!(
            "{:<30} {:<15} {:<10} {:<10}",
            entry.name,
            entry.version,
            entry.source,
            if entry.essential { "yes" } else { "no" },
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use crate::test_utils::tracked;
    use std::path::PathBuf;

    #[test]
    fn empty_store_is_not_an_error() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        list(&runtime, &Config::at(PathBuf::from("/server"))).unwrap();
    }

    #[test]
    fn lists_tracked_mods() {
        let json = serde_json::to_string(&[tracked("a", &[]), tracked("b", &[])]).unwrap();
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(move |_| Ok(json.clone()));

        list(&runtime, &Config::at(PathBuf::from("/server"))).unwrap();
    }
}
