//! Stable mod identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// Digest bytes appended to a slug.
const SLUG_HASH_BYTES: usize = 4;

/// Stable identifier of a managed mod.
///
/// Identifiers are derived from the mod's page URL so that adding the same
/// page twice, or updating a mod through its stored page URL, always
/// addresses the same registry entry.
///
/// # Example
///
/// ```
/// use modshelf::package::ModId;
/// use url::Url;
///
/// let url = Url::parse("https://Mods.Example.com/mods/foo/").unwrap();
/// assert_eq!(ModId::from_page_url(&url).as_str(), "mods.example.com/mods/foo");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModId(String);

impl ModId {
    /// Create an identifier from an already-normalized string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the identifier for a mod page.
    ///
    /// The scheme, query and fragment are ignored; the host is lowercased and
    /// trailing slashes are trimmed from the path.
    pub fn from_page_url(url: &Url) -> Self {
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let path = url.path().trim_end_matches('/');
        Self(format!("{}{}", host, path))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A filesystem-safe rendering of the identifier.
    ///
    /// Readable characters are kept and the rest replaced with `_`; a short
    /// hash of the full identifier keeps ids that differ only in replaced
    /// characters apart.
    pub fn slug(&self) -> String {
        let readable: String = self
            .0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let digest = Sha256::digest(self.0.as_bytes());
        let suffix: String = digest[..SLUG_HASH_BYTES]
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        format!("{}_{}", readable, suffix)
    }
}

impl fmt::Display for ModId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_page_url_ignores_scheme_and_query() {
        let a = Url::parse("http://example.com/mods/foo?tab=files").unwrap();
        let b = Url::parse("https://EXAMPLE.com/mods/foo/#description").unwrap();

        assert_eq!(ModId::from_page_url(&a), ModId::from_page_url(&b));
        assert_eq!(ModId::from_page_url(&a).as_str(), "example.com/mods/foo");
    }

    #[test]
    fn test_distinct_pages_have_distinct_ids() {
        let a = Url::parse("https://example.com/mods/foo").unwrap();
        let b = Url::parse("https://example.com/mods/bar").unwrap();

        assert_ne!(ModId::from_page_url(&a), ModId::from_page_url(&b));
    }

    #[test]
    fn test_slug_is_filesystem_safe() {
        let slug = ModId::new("example.com/mods/foo-bar").slug();
        assert!(slug.starts_with("example_com_mods_foo_bar_"));
        assert!(slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        assert_eq!(slug, ModId::new("example.com/mods/foo-bar").slug());
    }

    #[test]
    fn test_slugs_differ_when_only_punctuation_differs() {
        let dash = ModId::new("example.com/mods/foo-bar");
        let underscore = ModId::new("example.com/mods/foo_bar");
        assert_ne!(dash.slug(), underscore.slug());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = ModId::new("example.com/mods/foo");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"example.com/mods/foo\"");
    }
}
