use anyhow::Result;
use owo_colors::OwoColorize;
use shiftboard_core::Mode;

use super::{load_settings, open_calendar, parse_month};
use crate::render::Render;

pub async fn run(month: Option<&str>) -> Result<()> {
    let settings = load_settings()?;
    let month = parse_month(month)?;
    let mut calendar = open_calendar(&settings, month).await?;

    println!("{}", calendar.render());

    if calendar.mode() == Mode::Local {
        println!("\n{}", "No remote store configured, nothing to follow.".dimmed());
        return Ok(());
    }
    if calendar.is_degraded() {
        return Ok(());
    }

    println!("{}", "Watching for changes (Ctrl-C to stop)".dimmed());
    loop {
        tokio::select! {
            applied = calendar.next_feed() => {
                if applied {
                    println!();
                    println!("{}", calendar.render());
                }
                if calendar.is_degraded() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    Ok(())
}
