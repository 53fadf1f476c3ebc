//! Resolving the mod a user refers to on the command line.

use modshelf::package::{Mod, ModId};
use url::Url;

use crate::error::CliError;

/// Find the registered mod matching `query`.
///
/// Accepts a mod id, the mod's page URL, or its display name
/// (case-insensitive, must be unique).
pub fn find_target(mods: &[Mod], query: &str) -> Result<ModId, CliError> {
    let query = query.trim();

    if let Some(entry) = mods.iter().find(|m| m.id.as_str() == query) {
        return Ok(entry.id.clone());
    }

    if let Ok(url) = Url::parse(query) {
        let id = ModId::from_page_url(&url);
        if let Some(entry) = mods.iter().find(|m| m.id == id) {
            return Ok(entry.id.clone());
        }
    }

    let by_name: Vec<&Mod> = mods
        .iter()
        .filter(|m| m.name.eq_ignore_ascii_case(query))
        .collect();
    match by_name.as_slice() {
        [entry] => Ok(entry.id.clone()),
        [] => Err(CliError::UnknownMod(query.to_string())),
        many => Err(CliError::AmbiguousMod {
            query: query.to_string(),
            matches: many.iter().map(|m| m.id.to_string()).collect(),
        }),
    }
}
