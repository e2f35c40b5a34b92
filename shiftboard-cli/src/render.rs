//! Terminal rendering for shiftboard-core types.
//!
//! Extension traits adding colored output via owo_colors.

use chrono::Weekday;
use owo_colors::OwoColorize;
use shiftboard_core::{Day, Mode, Month, Pin, Record, RemoteStore, ShiftCalendar, Stroke};

pub trait Render {
    fn render(&self) -> String;
}

impl Render for Mode {
    fn render(&self) -> String {
        match self {
            Mode::Remote => "● live".green().to_string(),
            Mode::Local => "○ offline".yellow().to_string(),
        }
    }
}

fn weekday_label(weekday: Weekday) -> String {
    let label = weekday.to_string();
    match weekday {
        Weekday::Sat => label.blue().to_string(),
        Weekday::Sun => label.red().to_string(),
        _ => label,
    }
}

/// "12/05 Fri" style label for one day of `month`.
fn day_label(month: Month, day: &Day<'_>) -> String {
    format!(
        "{:02}/{:02} {}",
        month.month(),
        day.day,
        weekday_label(day.weekday)
    )
}

impl<R: RemoteStore> Render for ShiftCalendar<R> {
    fn render(&self) -> String {
        let month = self.month();
        let mut lines = vec![format!("{} {}", month.to_string().bold(), self.mode().render())];
        if self.is_degraded() {
            lines.push(format!("   {}", "Live feed unavailable, showing cached state".red()));
        }

        for day in self.days() {
            if day.entries.is_empty() {
                lines.push(day_label(month, &day).dimmed().to_string());
                continue;
            }
            lines.push(day_label(month, &day));
            for entry in &day.entries {
                lines.push(format!(
                    "   {} {} {}",
                    entry.payload.name.bold(),
                    entry.payload.text,
                    format!("[{}]", entry.id).dimmed()
                ));
            }
        }

        lines.join("\n")
    }
}

impl Render for Record<Pin> {
    fn render(&self) -> String {
        format!(
            "{} at ({:.3}, {:.3}) size {} {}",
            self.payload.icon.bold(),
            self.payload.x,
            self.payload.y,
            self.payload.size,
            format!("[{}]", self.id).dimmed()
        )
    }
}

impl Render for Record<Stroke> {
    fn render(&self) -> String {
        let points = self.payload.points.len();
        format!(
            "{} width {} {points} {} {}",
            self.payload.color.bold(),
            self.payload.width,
            pluralize("point", points),
            format!("[{}]", self.id).dimmed()
        )
    }
}

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_labels_carry_month_and_weekday() {
        let month = Month::new(2025, 12).unwrap();
        let day = Day {
            day: 5,
            weekday: Weekday::Fri,
            entries: Vec::new(),
        };
        assert_eq!(day_label(month, &day), "12/05 Fri");
    }

    #[test]
    fn pluralizes_counts() {
        assert_eq!(pluralize("point", 1), "point");
        assert_eq!(pluralize("point", 3), "points");
    }
}
