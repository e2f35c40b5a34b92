use anyhow::Result;
use owo_colors::OwoColorize;
use shiftboard_core::{Mode, Settings};

use super::load_settings;
use crate::render::Render;

pub fn run() -> Result<()> {
    let settings = load_settings()?;
    let mode = if settings.remote_configured() {
        Mode::Remote
    } else {
        Mode::Local
    };

    println!("{} {}", "Config:".bold(), Settings::config_path()?.display());
    println!("{} {}", "Cache: ".bold(), settings.display_cache_path().display());
    println!("{} {}", "Mode:  ".bold(), mode.render());

    if let Some(remote) = settings.remote.as_ref().filter(|_| settings.remote_configured()) {
        println!("{} {}", "Remote:".bold(), remote.database_url);
    }

    println!();
    println!("{}", "Collections".bold());
    for collection in [settings.entries(), settings.pins(), settings.strokes()] {
        println!(
            "   {} {}",
            collection.name,
            format!("(by {})", collection.partition_field).dimmed()
        );
    }

    Ok(())
}
