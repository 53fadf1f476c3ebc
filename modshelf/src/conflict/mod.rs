//! Conflict resolution for install-destination collisions.
//!
//! When an enable would write a path that already exists in the install
//! directory and is not owned by the mod being enabled, the workflow asks a
//! [`ConflictResolver`] what to do:
//!
//! ```text
//! existing file ──► identical bytes? ──yes──► share, no question asked
//!                         │
//!                         no
//!                         ▼
//!                  ConflictResolver::resolve
//!                   ├── Keep      ─► leave the file, share it if tracked
//!                   ├── Overwrite ─► write candidate bytes, take ownership
//!                   └── Abort     ─► fail the workflow, nothing written
//! ```
//!
//! Two resolvers are provided: [`PolicyResolver`] answers every conflict with
//! a fixed decision for unattended runs, and [`PromptResolver`] asks a human
//! through a [`HumanPrompt`], falling back to a policy when nobody answers.

mod policy;
mod prompt;

use std::fmt;
use std::path::PathBuf;

use crate::package::ModId;

pub use policy::{ConflictPolicy, ParsePolicyError, PolicyResolver};
pub use prompt::{ChannelPrompt, HumanPrompt, PromptRequest, PromptResolver};

/// Verdict for one conflicting destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictDecision {
    /// Leave the existing file in place.
    Keep,
    /// Replace the existing file with the candidate's bytes.
    Overwrite,
    /// Stop the whole install.
    Abort,
}

impl ConflictDecision {
    /// Short lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Overwrite => "overwrite",
            Self::Abort => "abort",
        }
    }
}

impl fmt::Display for ConflictDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A proposed write that collides with an existing file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Destination path relative to the install directory.
    pub path: PathBuf,

    /// Mod that owns the existing file, if the file is tracked.
    pub existing_owner: Option<ModId>,

    /// Mod being enabled.
    pub candidate: ModId,

    /// Display name of the mod being enabled.
    pub candidate_name: String,
}

impl Conflict {
    /// Human-readable question for prompts.
    pub fn question(&self) -> String {
        match &self.existing_owner {
            Some(owner) => format!(
                "{} wants to overwrite {}, installed by {}. Overwrite?",
                self.candidate_name,
                self.path.display(),
                owner
            ),
            None => format!(
                "{} wants to overwrite {}, which no managed mod installed. Overwrite?",
                self.candidate_name,
                self.path.display()
            ),
        }
    }
}

/// Decides what happens to a conflicting destination path.
///
/// Implementations must answer the same conflict the same way for the
/// duration of one workflow run. They may block; enable workflows run on
/// the serialized filesystem pool, so blocking never stalls downloads.
pub trait ConflictResolver: Send + Sync {
    /// Decide the fate of one conflicting path.
    fn resolve(&self, conflict: &Conflict) -> ConflictDecision;
}

impl<R: ConflictResolver + ?Sized> ConflictResolver for std::sync::Arc<R> {
    fn resolve(&self, conflict: &Conflict) -> ConflictDecision {
        (**self).resolve(conflict)
    }
}
