use anyhow::Result;
use owo_colors::OwoColorize;
use shiftboard_core::{CalendarDate, Mode, Month};

use super::{load_settings, open_calendar};

pub async fn run(date: &str, name: &str, text: &str) -> Result<()> {
    let settings = load_settings()?;

    // Open straight on the entry's month; a bad date is reported by `post`.
    let month = CalendarDate::parse(date)
        .map(|d| d.month())
        .unwrap_or_else(|_| Month::current());
    let mut calendar = open_calendar(&settings, month).await?;

    let id = calendar.post(date, name, text).await?;

    let confirmed = match calendar.mode() {
        Mode::Local => "saved locally",
        Mode::Remote => "sent",
    };
    println!(
        "{} {} {} {}",
        "+".green(),
        format!("{date} {}: {}", name.trim(), text.trim()).green(),
        confirmed,
        format!("[{id}]").dimmed()
    );

    Ok(())
}
