//! Terminal results of workflows.

use std::fmt;

use crate::package::Mod;

/// How a workflow ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// Every step ran and the result was committed.
    Succeeded,
    /// A step failed; the registry entry is unchanged.
    Failed(String),
    /// The workflow was cancelled between steps.
    Cancelled,
}

impl WorkflowOutcome {
    /// Returns true if the workflow succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Returns true if the workflow failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Returns true if the workflow was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Failure reason, if the workflow failed.
    pub fn failure(&self) -> Option<&str> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Registry change committed by a successful workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModChange {
    /// The entry was added or modified.
    Updated(Mod),
    /// The entry was removed.
    Deleted(Mod),
}

impl ModChange {
    /// The affected entry.
    pub fn entry(&self) -> &Mod {
        match self {
            Self::Updated(entry) | Self::Deleted(entry) => entry,
        }
    }

    /// Whether the entry was removed.
    pub fn is_deleted(&self) -> bool {
        matches!(self, Self::Deleted(_))
    }
}
