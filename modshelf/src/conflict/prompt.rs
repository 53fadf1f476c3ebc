//! Human-in-the-loop conflict resolution.
//!
//! The enable workflow suspends at a conflict until a decision arrives. With
//! [`ChannelPrompt`] the question travels over a channel to whatever owns the
//! terminal or window, and the workflow thread waits for the reply:
//!
//! ```text
//! enable step (blocking thread)        presentation layer
//!   │  PromptRequest ───────────────────►  show question
//!   │  blocking_recv ◄─────────────────── respond(decision)
//!   ▼
//! ```

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::{Conflict, ConflictDecision, ConflictPolicy, ConflictResolver};

/// Something that can put a conflict to a human.
pub trait HumanPrompt: Send + Sync {
    /// Ask about one conflict.
    ///
    /// Returns `None` when no human is available to answer.
    fn ask(&self, conflict: &Conflict) -> Option<ConflictDecision>;
}

/// Resolver that asks a human and falls back to a policy.
pub struct PromptResolver<P> {
    prompt: P,
    fallback: ConflictPolicy,
}

impl<P: HumanPrompt> PromptResolver<P> {
    /// Create a resolver asking through `prompt`.
    pub fn new(prompt: P, fallback: ConflictPolicy) -> Self {
        Self { prompt, fallback }
    }
}

impl<P: HumanPrompt> ConflictResolver for PromptResolver<P> {
    fn resolve(&self, conflict: &Conflict) -> ConflictDecision {
        match self.prompt.ask(conflict) {
            Some(decision) => {
                debug!(path = %conflict.path.display(), decision = %decision, "Conflict answered");
                decision
            }
            None => {
                let decision = self.fallback.unattended_decision();
                warn!(
                    path = %conflict.path.display(),
                    decision = %decision,
                    "No answer to conflict prompt, using fallback policy"
                );
                decision
            }
        }
    }
}

/// A conflict waiting for an answer.
#[derive(Debug)]
pub struct PromptRequest {
    /// The conflict to decide.
    pub conflict: Conflict,
    reply: oneshot::Sender<ConflictDecision>,
}

impl PromptRequest {
    /// Answer the conflict and resume the waiting workflow.
    pub fn respond(self, decision: ConflictDecision) {
        // The workflow may have been torn down; nothing to resume then.
        let _ = self.reply.send(decision);
    }
}

/// Prompt that forwards conflicts over a channel.
///
/// Must be asked from a blocking thread, never from inside an async task.
#[derive(Debug, Clone)]
pub struct ChannelPrompt {
    requests: mpsc::UnboundedSender<PromptRequest>,
}

impl ChannelPrompt {
    /// Create a prompt and the receiver the presentation layer answers from.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PromptRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { requests: tx }, rx)
    }
}

impl HumanPrompt for ChannelPrompt {
    fn ask(&self, conflict: &Conflict) -> Option<ConflictDecision> {
        let (reply, answer) = oneshot::channel();
        let request = PromptRequest {
            conflict: conflict.clone(),
            reply,
        };
        self.requests.send(request).ok()?;
        answer.blocking_recv().ok()
    }
}
