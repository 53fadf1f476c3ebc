//! Modshelf CLI - Command-line interface
//!
//! Downloads, updates, enables and removes game mods through the modshelf
//! library. Settings come from `~/.modshelf/config.ini`; see
//! `modshelf config list`.

mod commands;
mod error;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;
use modshelf::config::ConfigFile;
use modshelf::logging::{init_logging, LoggingConfig, LoggingGuard};

use commands::config::ConfigCommands;
use commands::mods::{Request, SessionOptions};
use error::CliError;

/// Manage game mods from the command line.
#[derive(Debug, Parser)]
#[command(name = "modshelf", version, about)]
struct Cli {
    /// Also print log output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Never prompt; answer install conflicts with the configured policy
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Add mods by page URL and download them
    Add {
        /// Mod page URLs
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Download newer versions of registered mods
    Update {
        /// Mod id, page URL or name (all mods when omitted)
        target: Option<String>,

        /// Update every registered mod
        #[arg(long, conflicts_with = "target")]
        all: bool,
    },

    /// Install a downloaded mod's files into the game directory
    Enable {
        /// Mod id, page URL or name
        target: String,
    },

    /// Remove a mod's files from the game directory
    Disable {
        /// Mod id, page URL or name
        target: String,
    },

    /// Remove a mod's files, archive and registry entry
    Delete {
        /// Mod id, page URL or name
        target: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Check registered mods for newer versions without downloading
    Check,

    /// List registered mods
    List {
        /// Show ids, creators and page URLs
        #[arg(long)]
        details: bool,

        /// Skip the update check even when enabled in the config
        #[arg(long)]
        no_check: bool,
    },

    /// Remove leftovers of interrupted downloads
    Cleanup,

    /// View or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _logging = start_logging(cli.verbose);

    let options = SessionOptions {
        assume_yes: cli.yes,
    };
    let result = match cli.command {
        Commands::Config(command) => commands::config::run(command),
        command => into_request(command)
            .map_or(Ok(()), |request| commands::mods::run(request, options)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Lifecycle request for a command, `None` for `config`.
fn into_request(command: Commands) -> Option<Request> {
    let request = match command {
        Commands::Add { urls } => Request::Add { urls },
        Commands::Update { target, all: _ } => Request::Update { target },
        Commands::Enable { target } => Request::Enable { target },
        Commands::Disable { target } => Request::Disable { target },
        Commands::Delete { target, force } => Request::Delete { target, force },
        Commands::Check => Request::Check,
        Commands::List { details, no_check } => Request::List {
            verbose: details,
            no_check,
        },
        Commands::Cleanup => Request::Cleanup,
        Commands::Config(_) => return None,
    };
    Some(request)
}

/// Set up file logging, continuing without it when that fails.
fn start_logging(verbose: bool) -> Option<LoggingGuard> {
    let config = ConfigFile::load().unwrap_or_default();
    let logging = LoggingConfig::new(config.logging.directory.clone())
        .with_level(config.logging.level.clone())
        .with_stderr(verbose);

    match init_logging(logging).map_err(CliError::from) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{} {}", style("warning:").yellow().bold(), e);
            None
        }
    }
}
