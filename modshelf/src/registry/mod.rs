//! Persisted registry of managed mods.
//!
//! The registry owns the canonical [`Mod`](crate::package::Mod) instances and
//! the record of which mod owns each installed file. It is persisted as a
//! single JSON document inside the archive directory:
//!
//! ```text
//! {
//!   "mods":  [ { "id": ..., "name": ..., "filename": ..., "enabled": ... } ],
//!   "files": { "Foo/part.cfg": { "owner": "example.com/mods/foo" } }
//! }
//! ```

mod error;
mod ownership;
mod store;

pub use error::{RegistryError, RegistryResult};
pub use ownership::{ClaimKind, FileClaim, FileClaims, FileOwner};
pub use store::{ModRegistry, RegistryDocument};
