//! Interactive conflict prompt.

use console::style;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use indicatif::MultiProgress;
use modshelf::conflict::{Conflict, ConflictDecision, HumanPrompt};
use tracing::warn;

const CHOICES: [(ConflictDecision, &str); 3] = [
    (ConflictDecision::Keep, "Keep the existing file"),
    (ConflictDecision::Overwrite, "Overwrite it"),
    (ConflictDecision::Abort, "Abort this install"),
];

/// Asks the user on the terminal, pausing progress bars while waiting.
pub struct ConsolePrompt {
    progress: MultiProgress,
}

impl ConsolePrompt {
    pub fn new(progress: MultiProgress) -> Self {
        Self { progress }
    }
}

impl HumanPrompt for ConsolePrompt {
    fn ask(&self, conflict: &Conflict) -> Option<ConflictDecision> {
        let prompt = format!("{} {}", style("Conflict:").yellow().bold(), conflict.question());
        let items: Vec<&str> = CHOICES.iter().map(|(_, label)| *label).collect();

        let answer = self.progress.suspend(|| {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .items(&items)
                .default(0)
                .interact_opt()
        });

        match answer {
            Ok(Some(index)) => CHOICES.get(index).map(|(decision, _)| *decision),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Conflict prompt failed");
                None
            }
        }
    }
}
