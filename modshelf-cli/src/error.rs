//! CLI error type.

use std::fmt;

use modshelf::config::ConfigError;
use modshelf::logging::LoggingError;
use modshelf::manager::ManagerError;

/// Errors reported by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded, saved or understood.
    Config(String),
    /// The mod manager rejected a request or failed to start.
    Manager(ManagerError),
    /// No registered mod matches the given name or id.
    UnknownMod(String),
    /// A name matched more than one registered mod.
    AmbiguousMod { query: String, matches: Vec<String> },
    /// Some submitted workflows did not succeed.
    WorkflowsFailed { failed: usize, total: usize },
    /// The async runtime could not be started.
    Runtime(std::io::Error),
    /// Logging could not be set up.
    Logging(LoggingError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Manager(e) => write!(f, "{}", e),
            CliError::UnknownMod(query) => write!(
                f,
                "No mod matches '{}'. Use 'modshelf list' to see registered mods.",
                query
            ),
            CliError::AmbiguousMod { query, matches } => write!(
                f,
                "'{}' matches several mods: {}. Use the mod id instead.",
                query,
                matches.join(", ")
            ),
            CliError::WorkflowsFailed { failed, total } => {
                write!(f, "{} of {} operations did not succeed", failed, total)
            }
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::Logging(e) => write!(f, "Failed to set up logging: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Manager(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Logging(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ManagerError> for CliError {
    fn from(e: ManagerError) -> Self {
        CliError::Manager(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}
