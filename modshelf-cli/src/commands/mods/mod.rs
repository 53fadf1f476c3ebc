//! Mod lifecycle commands.
//!
//! Every command builds a [`ModManager`] from the user's configuration,
//! submits its workflows and follows them in a [`Session`] until they end.
//! The process exits non-zero when any workflow fails or is cancelled.
//!
//! Install conflicts are answered on the terminal when the configured policy
//! is `ask` and a user is present. With `--yes`, or without a terminal, the
//! configured policy decides (`ask` then aborts).

mod output;
mod prompt;
mod session;
mod target;

use std::sync::Arc;

use dialoguer::Confirm;
use indicatif::MultiProgress;
use modshelf::config::ConfigFile;
use modshelf::conflict::{ConflictPolicy, ConflictResolver, PolicyResolver, PromptResolver};
use modshelf::manager::{BatchSubmission, ManagerError, ManagerResult, ModManager};

use crate::error::CliError;
use prompt::ConsolePrompt;
use session::Session;
use target::find_target;

/// A lifecycle request from the command line.
#[derive(Debug, Clone)]
pub enum Request {
    Add { urls: Vec<String> },
    Update { target: Option<String> },
    Enable { target: String },
    Disable { target: String },
    Delete { target: String, force: bool },
    Check,
    List { verbose: bool, no_check: bool },
    Cleanup,
}

/// Options shared by every lifecycle command.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionOptions {
    /// Never ask; use the configured policy.
    pub assume_yes: bool,
}

/// Run a lifecycle command.
pub fn run(request: Request, options: SessionOptions) -> Result<(), CliError> {
    let config = ConfigFile::load()?;
    let manager_config = config.to_manager_config()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(async move {
        let interactive = !options.assume_yes && console::user_attended();
        let progress = MultiProgress::new();
        let resolver = conflict_resolver(manager_config.conflict_policy, interactive, &progress);

        let manager = ModManager::builder(manager_config)
            .with_conflict_resolver(resolver)
            .build()?;
        let mut session = Session::new(manager, progress);
        execute(&mut session, request, &config, interactive).await
    })
}

fn conflict_resolver(
    policy: ConflictPolicy,
    interactive: bool,
    progress: &MultiProgress,
) -> Arc<dyn ConflictResolver> {
    if policy == ConflictPolicy::Ask && interactive {
        Arc::new(PromptResolver::new(
            ConsolePrompt::new(progress.clone()),
            ConflictPolicy::Abort,
        ))
    } else {
        Arc::new(PolicyResolver::new(policy))
    }
}

async fn execute(
    session: &mut Session,
    request: Request,
    config: &ConfigFile,
    interactive: bool,
) -> Result<(), CliError> {
    match request {
        Request::Add { urls } => {
            let (handles, rejected) = submit_each(&urls, |url| session.manager().add_new_mod(url));
            session.report_rejected(&rejected);
            let summary = session.drive(handles).await;
            summary.with_rejected(rejected.len()).into_result()
        }

        Request::Update { target: Some(query) } => {
            let id = find_target(&session.manager().mods()?, &query)?;
            let handle = session.manager().update_mod(&id)?;
            session.drive(vec![handle]).await.into_result()
        }

        Request::Update { target: None } => {
            let batch = session.manager().update_mods()?;
            run_batch(session, batch).await
        }

        Request::Enable { target } => {
            let id = find_target(&session.manager().mods()?, &target)?;
            let handle = session.manager().enable_mod(&id)?;
            session.drive(vec![handle]).await.into_result()
        }

        Request::Disable { target } => {
            let id = find_target(&session.manager().mods()?, &target)?;
            let handle = session.manager().disable_mod(&id)?;
            session.drive(vec![handle]).await.into_result()
        }

        Request::Delete { target, force } => {
            let id = find_target(&session.manager().mods()?, &target)?;
            if !force && interactive && !confirm_delete(&session.manager().find_mod(&id)?.name) {
                println!("Nothing deleted.");
                return Ok(());
            }
            let handle = session.manager().delete_mod(&id)?;
            session.drive(vec![handle]).await.into_result()
        }

        Request::Check => {
            let batch = session.manager().check_for_mod_updates()?;
            let result = run_batch(session, batch).await;
            output::print_updates(&session.manager().mods()?);
            result
        }

        Request::List { verbose, no_check } => {
            if config.updates.check_on_startup && !no_check {
                let batch = session.manager().check_for_mod_updates()?;
                session.report_rejected(&batch.rejected);
                // A failed check must not hide the list.
                let _ = session.drive(batch.handles).await;
            }
            let manager = session.manager();
            output::print_mods(&manager.mods()?, verbose, |entry| {
                manager.is_downloaded(entry)
            });
            Ok(())
        }

        Request::Cleanup => {
            let removed = session.manager().cleanup_staging()?;
            println!("Removed {} leftover download(s).", removed);
            Ok(())
        }
    }
}

async fn run_batch(session: &mut Session, batch: BatchSubmission) -> Result<(), CliError> {
    if batch.is_empty() {
        println!("No mods registered.");
        return Ok(());
    }
    session.report_rejected(&batch.rejected);
    session.drive(batch.handles).await.into_result()
}

/// Submit every item, keeping the accepted handles and the refusals so one
/// bad request does not strand the workflows already started.
fn submit_each<T: Clone, H>(
    items: &[T],
    mut submit: impl FnMut(&T) -> ManagerResult<H>,
) -> (Vec<H>, Vec<(T, ManagerError)>) {
    let mut handles = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for item in items {
        match submit(item) {
            Ok(handle) => handles.push(handle),
            Err(e) => rejected.push((item.clone(), e)),
        }
    }
    (handles, rejected)
}

fn confirm_delete(name: &str) -> bool {
    Confirm::new()
        .with_prompt(format!(
            "Delete {}? Its installed files and archive will be removed.",
            name
        ))
        .default(false)
        .interact()
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_each_keeps_going_after_rejections() {
        let urls = vec![
            "https://mods.test/foo".to_string(),
            "not a url".to_string(),
            "https://mods.test/bar".to_string(),
            "also bad".to_string(),
        ];

        let (handles, rejected) = submit_each(&urls, |url| {
            if url.starts_with("https://") {
                Ok(url.len())
            } else {
                Err(ManagerError::CannotAddMod { url: url.clone() })
            }
        });

        assert_eq!(handles.len(), 2);
        let refused: Vec<_> = rejected.iter().map(|(url, _)| url.as_str()).collect();
        assert_eq!(refused, vec!["not a url", "also bad"]);
    }
}
