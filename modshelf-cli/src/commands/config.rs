//! `modshelf config`: inspect and change `~/.modshelf/config.ini`.
//!
//! Keys are addressed as `section.key`. Pointing `paths.install_dir` at a
//! different game directory resets the mod list, since its file ownership
//! records describe the old directory.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use console::style;
use modshelf::config::{config_file_path, ConfigFile, ConfigKey};
use modshelf::manager::REGISTRY_FILENAME;
use modshelf::registry::ModRegistry;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print one setting
    Get {
        /// Setting name, e.g. conflicts.policy
        key: String,
    },

    /// Change one setting
    Set {
        /// Setting name, e.g. paths.install_dir
        key: String,

        /// New value
        value: String,
    },

    /// Show every setting with its accepted values
    List,

    /// Show where modshelf keeps its files
    Path,
}

/// Run a config subcommand against the user's config file.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    let path = config_file_path();
    match command {
        ConfigCommands::Get { key } => {
            let config = ConfigFile::load_from(&path)?;
            println!("{}", shown_value(parse_key(&key)?, &config));
        }
        ConfigCommands::Set { key, value } => {
            let key = parse_key(&key)?;
            let change = set_in(&path, key, &value)?;
            println!("{} = {}", key, shown_value(key, &change.config));
            if change.registry_reset {
                println!(
                    "{} install directory changed; the mod list was reset",
                    style("note:").yellow()
                );
            }
        }
        ConfigCommands::List => {
            let config = ConfigFile::load_from(&path)?;
            let defaults = ConfigFile::default();
            let mut section = "";
            for key in ConfigKey::all() {
                if key.section() != section {
                    section = key.section();
                    println!("\n{}", style(format!("[{}]", section)).bold());
                }
                println!("{}", setting_line(*key, &config, &defaults));
            }
        }
        ConfigCommands::Path => {
            let config = ConfigFile::load_from(&path)?;
            for (label, location) in locations(&path, &config) {
                println!("{:<9} {}", label, location.display());
            }
        }
    }
    Ok(())
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "unknown setting '{}'; 'modshelf config list' shows them all",
            key
        ))
    })
}

fn shown_value(key: ConfigKey, config: &ConfigFile) -> String {
    let value = key.get(config);
    if value.is_empty() {
        "(not set)".to_string()
    } else {
        value
    }
}

/// A saved setting change.
struct SettingChange {
    config: ConfigFile,
    registry_reset: bool,
}

/// Apply one setting to the file at `path` and save it.
///
/// A file that cannot be read is reported instead of being replaced, so a
/// typo elsewhere in it never costs the user their other settings.
fn set_in(path: &Path, key: ConfigKey, value: &str) -> Result<SettingChange, CliError> {
    let mut config = ConfigFile::load_from(path)?;
    let previous_install_dir = config.paths.install_dir.clone();

    key.set(&mut config, value)?;
    config.save_to(path)?;

    let registry_reset = key == ConfigKey::PathsInstallDir
        && previous_install_dir.is_some()
        && previous_install_dir != config.paths.install_dir;
    if registry_reset {
        ModRegistry::open(config.paths.archive_dir.join(REGISTRY_FILENAME))
            .clear()
            .map_err(|e| CliError::Config(e.to_string()))?;
    }

    Ok(SettingChange {
        config,
        registry_reset,
    })
}

/// `name = value` plus the accepted values, marking settings left at
/// their defaults.
fn setting_line(key: ConfigKey, config: &ConfigFile, defaults: &ConfigFile) -> String {
    let mut line = format!("  {} = {}", key.key_name(), shown_value(key, config));
    if key.get(config) == key.get(defaults) {
        line.push_str(" (default)");
    }
    if let Some(choices) = key.choices() {
        line.push_str(&format!(" [{}]", choices.join("|")));
    }
    format!("{:<48} # {}", line, key.description())
}

/// Files and directories modshelf reads or writes.
fn locations(config_path: &Path, config: &ConfigFile) -> Vec<(&'static str, PathBuf)> {
    let mut locations = vec![
        ("config", config_path.to_path_buf()),
        ("registry", config.paths.archive_dir.join(REGISTRY_FILENAME)),
        ("archives", config.paths.archive_dir.clone()),
        ("staging", config.paths.staging_dir.clone()),
        ("logs", config.logging.directory.clone()),
    ];
    if let Some(install_dir) = &config.paths.install_dir {
        locations.insert(1, ("install", install_dir.clone()));
    }
    locations
}
