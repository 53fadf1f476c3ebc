//! Cancellable, steppable units of work.
//!
//! A workflow is an ordered list of named steps run on a pool worker. Steps
//! run strictly one after another; cancellation is checked between them.
//! The registry commit is always the final step, so a workflow that fails or
//! is cancelled leaves the registry as it found it.
//!
//! # Variants
//!
//! ```text
//! Download  Fetching metadata → Comparing versions → Downloading archive
//!           → Storing archive → Updating registry
//! Check     Fetching metadata → Comparing versions
//! Enable    Unpacking archive → Resolving conflicts → Writing files
//!           → Updating registry
//! Disable   Removing files → Updating registry
//! Delete    Removing files → Removing archive → Updating registry
//! ```
//!
//! Download and check workflows run on the download pool. Enable, disable
//! and delete mutate the install directory and run on the single-worker
//! filesystem pool.

mod check;
mod context;
mod delete;
mod disable;
mod download;
mod enable;
mod event;
mod files;
mod outcome;
mod runner;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::manager::ManagerResult;
use crate::package::ModId;

pub use check::CheckWorkflow;
pub use context::StepContext;
pub use delete::DeleteWorkflow;
pub use disable::DisableWorkflow;
pub use download::DownloadWorkflow;
pub use enable::EnableWorkflow;
pub use event::ManagerEvent;
pub use outcome::{ModChange, WorkflowOutcome};
pub use runner::WorkflowHandle;

pub(crate) use runner::WorkflowJob;

/// Global sequence counter for workflow ids.
static NEXT_WORKFLOW_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique workflow identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkflowId(u64);

impl WorkflowId {
    /// Allocate the next identifier.
    pub fn next() -> Self {
        Self(NEXT_WORKFLOW_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorkflowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wf-{}", self.0)
    }
}

/// Pool a workflow runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolKind {
    /// Bounded parallel pool for network-bound work.
    Download,
    /// Single worker for install-directory mutations.
    Filesystem,
}

/// The kinds of workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkflowKind {
    /// Fetch and store the newest archive.
    Download,
    /// Compare remote metadata against the registry.
    Check,
    /// Install the archive's files.
    Enable,
    /// Remove the installed files.
    Disable,
    /// Remove the mod entirely.
    Delete,
}

impl WorkflowKind {
    /// Returns the display name for this kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Check => "check",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Delete => "delete",
        }
    }

    /// Pool this kind of workflow runs on.
    pub fn pool(&self) -> PoolKind {
        match self {
            Self::Download | Self::Check => PoolKind::Download,
            Self::Enable | Self::Disable | Self::Delete => PoolKind::Filesystem,
        }
    }
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What the runner should do after a step.
#[derive(Debug)]
pub enum Step {
    /// Run the next step.
    Continue,
    /// Stop with a committed change; remaining steps are skipped.
    Finish(ModChange),
}

/// A steppable unit of work on one mod.
///
/// A workflow holds only what it was given at construction: the target
/// mod's id, the registry, and the collaborators its steps call. Any state
/// carried between steps lives in the workflow value itself.
pub trait Workflow: Send + 'static {
    /// Kind of workflow.
    fn kind(&self) -> WorkflowKind;

    /// Mod the workflow operates on.
    fn mod_id(&self) -> &ModId;

    /// Names of the steps, in execution order.
    fn steps(&self) -> &'static [&'static str];

    /// Run one step.
    ///
    /// The final step must return [`Step::Finish`].
    fn run_step(&mut self, index: usize, ctx: &StepContext<'_>) -> ManagerResult<Step>;
}
