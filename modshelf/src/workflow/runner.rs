//! Step-by-step execution of workflows.
//!
//! ```text
//! for each step:
//!     cancelled? ──yes──► Cancelled (registry untouched)
//!     Progress(step name, 0%)
//!     run_step ──Err──► Failed(reason)
//!              ──Continue──► next step
//!              ──Finish(change)──► ModChanged ─► Succeeded
//! release single-flight claim ─► Finished(outcome)
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::context::StepContext;
use super::event::ManagerEvent;
use super::outcome::{ModChange, WorkflowOutcome};
use super::{Step, Workflow, WorkflowId, WorkflowKind};
use crate::executor::EventBus;
use crate::manager::InFlightGuard;
use crate::package::ModId;

/// Handle to a submitted workflow.
#[derive(Debug)]
pub struct WorkflowHandle {
    id: WorkflowId,
    kind: WorkflowKind,
    mod_id: ModId,
    cancel: CancellationToken,
    done: oneshot::Receiver<WorkflowOutcome>,
}

impl WorkflowHandle {
    /// Workflow identifier, matching the one in its events.
    pub fn id(&self) -> WorkflowId {
        self.id
    }

    /// Kind of workflow.
    pub fn kind(&self) -> WorkflowKind {
        self.kind
    }

    /// Mod the workflow operates on.
    pub fn mod_id(&self) -> &ModId {
        &self.mod_id
    }

    /// Request cancellation.
    ///
    /// Takes effect before the next step starts. Has no effect once the
    /// final step has begun.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this workflow.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the workflow to end.
    pub async fn wait(self) -> WorkflowOutcome {
        self.done
            .await
            .unwrap_or_else(|_| WorkflowOutcome::Failed("workflow was dropped".to_string()))
    }
}

/// A workflow packaged for a pool worker.
pub(crate) struct WorkflowJob {
    id: WorkflowId,
    workflow: Box<dyn Workflow>,
    events: Arc<EventBus<ManagerEvent>>,
    cancel: CancellationToken,
    in_flight: InFlightGuard,
    done: oneshot::Sender<WorkflowOutcome>,
}

impl WorkflowJob {
    /// Package a workflow and create the caller's handle to it.
    pub(crate) fn new(
        workflow: Box<dyn Workflow>,
        events: Arc<EventBus<ManagerEvent>>,
        in_flight: InFlightGuard,
    ) -> (Self, WorkflowHandle) {
        let id = WorkflowId::next();
        let cancel = CancellationToken::new();
        let (done, done_rx) = oneshot::channel();

        let handle = WorkflowHandle {
            id,
            kind: workflow.kind(),
            mod_id: workflow.mod_id().clone(),
            cancel: cancel.clone(),
            done: done_rx,
        };
        let job = Self {
            id,
            workflow,
            events,
            cancel,
            in_flight,
            done,
        };
        (job, handle)
    }

    /// Run the workflow to completion on the current thread.
    pub(crate) fn run(self) {
        let Self {
            id,
            mut workflow,
            events,
            cancel,
            in_flight,
            done,
        } = self;
        let kind = workflow.kind();
        let mod_id = workflow.mod_id().clone();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            execute(id, workflow.as_mut(), &events, &cancel)
        }))
        .unwrap_or_else(|payload| {
            let reason = panic_message(payload.as_ref());
            error!(workflow = %id, mod_id = %mod_id, reason = %reason, "Workflow panicked");
            WorkflowOutcome::Failed(format!("workflow panicked: {}", reason))
        });

        // Released before Finished so a listener can resubmit immediately.
        // Dropping the workflow also frees whatever it reserved.
        drop(workflow);
        drop(in_flight);

        events.emit(ManagerEvent::Finished {
            workflow: id,
            kind,
            mod_id,
            outcome: outcome.clone(),
        });
        let _ = done.send(outcome);
    }
}

/// Run every step of a workflow, emitting progress and the committed change.
pub(crate) fn execute(
    id: WorkflowId,
    workflow: &mut dyn Workflow,
    events: &EventBus<ManagerEvent>,
    cancel: &CancellationToken,
) -> WorkflowOutcome {
    let kind = workflow.kind();
    let mod_id = workflow.mod_id().clone();
    let steps = workflow.steps();

    info!(workflow = %id, kind = kind.name(), mod_id = %mod_id, "Workflow started");

    for (index, name) in steps.iter().enumerate() {
        if cancel.is_cancelled() {
            info!(workflow = %id, mod_id = %mod_id, step = *name, "Workflow cancelled");
            return WorkflowOutcome::Cancelled;
        }

        let ctx = StepContext::new(id, kind, &mod_id, index, steps.len(), events);
        debug!(workflow = %id, step = *name, index, "Running step");
        ctx.report(*name, 0.0);

        match workflow.run_step(index, &ctx) {
            Ok(Step::Continue) => {}
            Ok(Step::Finish(change)) => {
                publish(events, change);
                info!(workflow = %id, kind = kind.name(), mod_id = %mod_id, "Workflow succeeded");
                return WorkflowOutcome::Succeeded;
            }
            Err(e) => {
                warn!(
                    workflow = %id,
                    kind = kind.name(),
                    mod_id = %mod_id,
                    step = *name,
                    error = %e,
                    "Workflow failed"
                );
                return WorkflowOutcome::Failed(e.to_string());
            }
        }
    }

    error!(workflow = %id, mod_id = %mod_id, "Workflow ran out of steps without a result");
    WorkflowOutcome::Failed("workflow ended without committing a result".to_string())
}

fn publish(events: &EventBus<ManagerEvent>, change: ModChange) {
    let deleted = change.is_deleted();
    let entry = match change {
        ModChange::Updated(entry) | ModChange::Deleted(entry) => entry,
    };
    events.emit(ManagerEvent::ModChanged { entry, deleted });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
