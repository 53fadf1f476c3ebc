//! Execution pools and event delivery for workflows.
//!
//! The manager runs two [`WorkflowPool`]s: a download pool with bounded
//! parallelism for network-bound workflows, and a single-worker filesystem
//! pool that serializes every workflow mutating the install directory.
//! Completion and progress are broadcast through an [`EventBus`].

mod events;
mod pool;

pub use events::EventBus;
pub use pool::{Job, WorkflowPool};
