//! Ordered registry of mod sources.
//!
//! Registration order defines fallback priority. Sources whose credential is
//! missing from the environment are simply excluded with a warning; that is
//! not a runtime failure.

use log::{debug, warn};
use std::sync::Arc;

use super::{ForgejoSource, ModSource, ModrinthSource};
use crate::http::HttpClient;
use crate::runtime::Runtime;

/// Environment variable holding the Forgejo access token.
pub const FORGEJO_API_KEY: &str = "FORGEJO_API_KEY";

pub struct SourceRegistry {
    sources: Vec<Arc<dyn ModSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Builds the registry from the environment. Modrinth requires no
    /// credential and is always first; Forgejo is registered only when its
    /// API key is present.
    #[tracing::instrument(skip(runtime, http))]
    pub fn from_env<R: Runtime>(runtime: &R, http: &HttpClient) -> Self {
        let mut registry = Self::new();

        registry.register(Arc::new(ModrinthSource::new(http.clone())));

        match runtime.env_var(FORGEJO_API_KEY) {
            Ok(key) => {
                registry.register(Arc::new(ForgejoSource::new(http.clone(), key)));
            }
            Err(_) => {
                warn!(
                    "{} is not set; mods hosted on Forgejo will not be searched",
                    FORGEJO_API_KEY
                );
            }
        }

        debug!("Registered {} mod source(s)", registry.len());
        registry
    }

    /// Appends a source. Later registrations have lower priority.
    pub fn register(&mut self, source: Arc<dyn ModSource>) {
        self.sources.push(source);
    }

    /// Sources in priority order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ModSource>> {
        self.sources.iter()
    }

    /// Looks up a source by its stored name, e.g. to route an update for a
    /// tracked mod back to the source it was installed from.
    pub fn by_name(&self, name: &str) -> Option<&Arc<dyn ModSource>> {
        self.sources.iter().find(|s| s.name() == name)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
