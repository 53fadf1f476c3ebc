//! Events broadcast by the mod manager.

use super::outcome::WorkflowOutcome;
use super::{WorkflowId, WorkflowKind};
use crate::package::{Mod, ModId};

/// Notification delivered to every subscriber of the manager.
///
/// For each workflow, subscribers see zero or more `Progress` events, then
/// exactly one `ModChanged` if it succeeded, then exactly one `Finished`.
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    /// A workflow made progress.
    Progress {
        workflow: WorkflowId,
        kind: WorkflowKind,
        mod_id: ModId,
        message: String,
        /// Overall completion of the workflow, `0.0..=1.0`.
        fraction: f64,
    },

    /// A workflow committed a change to a mod.
    ModChanged { entry: Mod, deleted: bool },

    /// A workflow ended.
    Finished {
        workflow: WorkflowId,
        kind: WorkflowKind,
        mod_id: ModId,
        outcome: WorkflowOutcome,
    },
}

impl ManagerEvent {
    /// Workflow the event belongs to, if any.
    pub fn workflow(&self) -> Option<WorkflowId> {
        match self {
            Self::Progress { workflow, .. } | Self::Finished { workflow, .. } => Some(*workflow),
            Self::ModChanged { .. } => None,
        }
    }

    /// Mod the event is about.
    pub fn mod_id(&self) -> &ModId {
        match self {
            Self::Progress { mod_id, .. } | Self::Finished { mod_id, .. } => mod_id,
            Self::ModChanged { entry, .. } => &entry.id,
        }
    }
}
