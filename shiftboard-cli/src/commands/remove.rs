use anyhow::Result;
use owo_colors::OwoColorize;
use shiftboard_core::{Month, RecordId};

use super::{confirm, load_settings, open_calendar};

pub async fn run(id: &str, month: &str) -> Result<()> {
    let settings = load_settings()?;
    let month = Month::parse(month)?;
    let mut calendar = open_calendar(&settings, month).await?;

    let id = RecordId::from(id);
    let Some(entry) = calendar.entries().iter().find(|r| r.id == id) else {
        anyhow::bail!("No entry {id} in {month}");
    };
    let label = format!("{month}-{:02} {}: {}", entry.payload.day, entry.payload.name, entry.payload.text);

    calendar.remove(&id).await?;
    println!("{} {}", "-".red(), label.red());

    Ok(())
}

pub async fn clear(month: &str, yes: bool) -> Result<()> {
    let settings = load_settings()?;
    let month = Month::parse(month)?;
    let mut calendar = open_calendar(&settings, month).await?;

    let count = calendar.entries().len();
    if count == 0 {
        println!("{}", format!("{month} has no entries").dimmed());
        return Ok(());
    }
    if !confirm(format!("Delete all {count} entries of {month}?"), yes)? {
        return Ok(());
    }

    calendar.clear_month().await?;
    println!("{} {}", "-".red(), format!("Cleared {count} entries from {month}").red());

    Ok(())
}
