//! Maps a user-supplied id/name token to a stored mod.
//!
//! Exact-id matches win immediately. Otherwise display names are compared
//! by normalized similarity and the first entry at or above the threshold
//! wins, in store order. There is deliberately no cross-candidate ranking.

use strsim::normalized_levenshtein;

use crate::store::{ModStore, TrackedMod};

/// Minimum similarity between a normalized token and a normalized display
/// name for a fuzzy match to be accepted.
const NAME_MATCH_THRESHOLD: f64 = 0.8;

/// Lower-cases the token (Unicode-aware, not just ASCII) and folds
/// underscores and dashes into spaces, so "my_mod" and "my-mod" both line
/// up with the display name "My Mod".
pub fn normalize(token: &str) -> String {
    token.replace(['_', '-'], " ").to_lowercase()
}

/// Resolves a token against the store. Returns None when nothing matches.
pub fn resolve<'a>(store: &'a ModStore, token: &str) -> Option<&'a TrackedMod> {
    let normalized_token = normalize(token);

    store.mods().iter().find(|entry| {
        entry.id == token
            || normalized_levenshtein(&normalized_token, &normalize(&entry.name))
                >= NAME_MATCH_THRESHOLD
    })
}
