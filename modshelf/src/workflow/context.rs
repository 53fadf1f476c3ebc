//! Per-step context handed to workflows.

use super::event::ManagerEvent;
use super::{WorkflowId, WorkflowKind};
use crate::executor::EventBus;
use crate::package::ModId;

/// What a running step can see of its workflow.
///
/// Progress reported here is step-local; it is mapped onto the workflow's
/// overall completion as `(index + fraction) / steps`.
pub struct StepContext<'a> {
    workflow: WorkflowId,
    kind: WorkflowKind,
    mod_id: &'a ModId,
    index: usize,
    steps: usize,
    events: &'a EventBus<ManagerEvent>,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        workflow: WorkflowId,
        kind: WorkflowKind,
        mod_id: &'a ModId,
        index: usize,
        steps: usize,
        events: &'a EventBus<ManagerEvent>,
    ) -> Self {
        Self {
            workflow,
            kind,
            mod_id,
            index,
            steps,
            events,
        }
    }

    /// Workflow this step belongs to.
    pub fn workflow(&self) -> WorkflowId {
        self.workflow
    }

    /// Position of this step.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Overall completion for a step-local fraction.
    pub fn overall(&self, fraction: f64) -> f64 {
        if self.steps == 0 {
            return 1.0;
        }
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        (self.index as f64 + fraction) / self.steps as f64
    }

    /// Emit a progress event.
    pub fn report(&self, message: impl Into<String>, fraction: f64) {
        self.events.emit(ManagerEvent::Progress {
            workflow: self.workflow,
            kind: self.kind,
            mod_id: self.mod_id.clone(),
            message: message.into(),
            fraction: self.overall(fraction),
        });
    }
}
