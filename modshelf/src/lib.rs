//! Modshelf - lifecycle engine for game mod packages
//!
//! Modshelf keeps a directory of downloaded mod archives and a game's data
//! directory in step: it downloads and updates archives, installs and removes
//! their files, and records in a persisted registry which mod owns every
//! installed file.
//!
//! # Modules
//!
//! - [`manager`] - [`ModManager`](manager::ModManager), the entry point
//! - [`workflow`] - the step-wise operations the manager runs
//! - [`registry`] - persisted mod records and file ownership
//! - [`conflict`] - decisions for colliding install paths
//! - [`executor`] - worker pools and event delivery
//! - [`package`] - mod records and metadata
//! - [`config`] - the user's configuration file
//! - [`logging`] - tracing subscriber setup

pub mod config;
pub mod conflict;
pub mod executor;
pub mod logging;
pub mod manager;
pub mod package;
pub mod registry;
pub mod workflow;
