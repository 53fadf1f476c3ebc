//! Running submitted workflows to completion on the terminal.
//!
//! ```text
//! ModManager ──ManagerEvent──► Session ──► one progress bar per workflow
//!                                 ▲
//!                     Ctrl-C ─────┘ cancels every workflow it waits for
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use modshelf::manager::{ManagerError, ModManager};
use modshelf::workflow::{ManagerEvent, WorkflowHandle, WorkflowId, WorkflowOutcome};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::CliError;

/// Progress bars count in thousandths.
const PROGRESS_SCALE: u64 = 1000;

/// Tally of finished workflows, plus requests rejected before submission.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub rejected: usize,
}

impl Summary {
    fn record(&mut self, outcome: &WorkflowOutcome) {
        match outcome {
            WorkflowOutcome::Succeeded => self.succeeded += 1,
            WorkflowOutcome::Failed(_) => self.failed += 1,
            WorkflowOutcome::Cancelled => self.cancelled += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.cancelled + self.rejected
    }

    /// Count requests that never became workflows.
    pub fn with_rejected(mut self, rejected: usize) -> Self {
        self.rejected += rejected;
        self
    }

    /// Error when anything did not succeed.
    pub fn into_result(self) -> Result<(), CliError> {
        let unsuccessful = self.failed + self.cancelled + self.rejected;
        if unsuccessful == 0 {
            Ok(())
        } else {
            Err(CliError::WorkflowsFailed {
                failed: unsuccessful,
                total: self.total(),
            })
        }
    }
}

/// A manager plus the terminal state that follows its workflows.
pub struct Session {
    manager: ModManager,
    events: mpsc::UnboundedReceiver<ManagerEvent>,
    progress: MultiProgress,
    cancels: Arc<Mutex<Vec<CancellationToken>>>,
}

impl Session {
    /// Subscribe to the manager and install the Ctrl-C handler.
    pub fn new(manager: ModManager, progress: MultiProgress) -> Self {
        let events = manager.subscribe();
        let cancels: Arc<Mutex<Vec<CancellationToken>>> = Arc::default();

        let handler_cancels = Arc::clone(&cancels);
        if let Err(e) = ctrlc::set_handler(move || {
            if let Ok(tokens) = handler_cancels.lock() {
                for token in tokens.iter() {
                    token.cancel();
                }
            }
        }) {
            warn!(error = %e, "Could not install Ctrl-C handler");
        }

        Self {
            manager,
            events,
            progress,
            cancels,
        }
    }

    pub fn manager(&self) -> &ModManager {
        &self.manager
    }

    /// Print requests the manager refused, keyed by mod id or URL.
    pub fn report_rejected<K: fmt::Display>(&self, rejected: &[(K, ManagerError)]) {
        for (key, error) in rejected {
            self.progress
                .suspend(|| println!("{} {}: {}", style("skipped").yellow(), key, error));
        }
    }

    /// Follow the workflows until every one has finished.
    pub async fn drive(&mut self, handles: Vec<WorkflowHandle>) -> Summary {
        let mut pending: HashMap<WorkflowId, ProgressBar> = HashMap::new();

        for handle in &handles {
            let bar = self.progress.add(ProgressBar::new(PROGRESS_SCALE));
            bar.set_style(bar_style());
            bar.set_prefix(format!("{:<8} {}", handle.kind().name(), handle.mod_id()));
            pending.insert(handle.id(), bar);

            if let Ok(mut tokens) = self.cancels.lock() {
                tokens.push(handle.cancellation_token());
            }
        }

        let mut summary = Summary::default();
        while !pending.is_empty() {
            let Some(event) = self.events.recv().await else {
                break;
            };

            match event {
                ManagerEvent::Progress {
                    workflow,
                    message,
                    fraction,
                    ..
                } => {
                    if let Some(bar) = pending.get(&workflow) {
                        bar.set_position((fraction.clamp(0.0, 1.0) * PROGRESS_SCALE as f64) as u64);
                        bar.set_message(message);
                    }
                }
                ManagerEvent::ModChanged { .. } => {}
                ManagerEvent::Finished {
                    workflow, outcome, ..
                } => {
                    if let Some(bar) = pending.remove(&workflow) {
                        finish_bar(&bar, &outcome);
                        summary.record(&outcome);
                    }
                }
            }
        }

        if let Ok(mut tokens) = self.cancels.lock() {
            tokens.clear();
        }
        summary
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:.bold} [{bar:30.cyan/blue}] {percent:>3}% {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ")
}

fn finish_bar(bar: &ProgressBar, outcome: &WorkflowOutcome) {
    match outcome {
        WorkflowOutcome::Succeeded => {
            bar.set_position(PROGRESS_SCALE);
            bar.finish_with_message(style("done").green().to_string());
        }
        WorkflowOutcome::Failed(reason) => {
            bar.abandon_with_message(style(format!("failed: {}", reason)).red().to_string());
        }
        WorkflowOutcome::Cancelled => {
            bar.abandon_with_message(style("cancelled").yellow().to_string());
        }
    }
}
