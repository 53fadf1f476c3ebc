//! Printing the mod list.

use console::style;
use modshelf::package::Mod;

/// Print registered mods, one per line.
///
/// `downloaded` reports whether a mod's archive is present.
pub fn print_mods(mods: &[Mod], verbose: bool, downloaded: impl Fn(&Mod) -> bool) {
    if mods.is_empty() {
        println!("No mods registered. Add one with 'modshelf add <url>'.");
        return;
    }

    let name_width = mods.iter().map(|m| m.name.len()).max().unwrap_or(0);
    let mut sorted: Vec<&Mod> = mods.iter().collect();
    sorted.sort_by_key(|m| m.name.to_lowercase());

    for entry in sorted {
        let marker = if entry.enabled {
            style("[x]").green()
        } else {
            style("[ ]").dim()
        };
        let mut notes = Vec::new();
        if entry.update_available {
            notes.push(style("update available").yellow().to_string());
        }
        if !downloaded(entry) {
            notes.push(style("archive missing").red().to_string());
        }

        println!(
            "{} {:<width$}  {}  {}  {}",
            marker,
            entry.name,
            entry.filename(),
            entry.updated_on().format("%Y-%m-%d"),
            notes.join(", "),
            width = name_width
        );

        if verbose {
            println!("      id:      {}", entry.id);
            println!("      creator: {}", entry.creator);
            println!("      page:    {}", entry.source_url());
            if let Some(image) = &entry.image_url {
                println!("      image:   {}", image);
            }
        }
    }
}

/// Print the mods flagged as having a newer version.
pub fn print_updates(mods: &[Mod]) {
    let outdated: Vec<&Mod> = mods.iter().filter(|m| m.update_available).collect();
    if outdated.is_empty() {
        println!("All mods are up to date.");
        return;
    }

    println!("Updates available ({}):", outdated.len());
    for entry in outdated {
        println!("  {} ({})", entry.name, entry.id);
    }
    println!();
    println!("Run 'modshelf update --all' to download them.");
}
