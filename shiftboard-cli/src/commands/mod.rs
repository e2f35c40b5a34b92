pub mod map;
pub mod month;
pub mod post;
pub mod remove;
pub mod share;
pub mod status;
pub mod watch;

use anyhow::{Context, Result};
use dialoguer::Confirm;
use shiftboard_core::{AnnotationBoard, FirebaseStore, Month, Settings, ShiftCalendar};

use crate::MapArgs;
use crate::utils::tui::create_spinner;

pub type Calendar = ShiftCalendar<FirebaseStore>;
pub type Board = AnnotationBoard<FirebaseStore>;

pub fn load_settings() -> Result<Settings> {
    Settings::load().context("Could not load ~/.config/shiftboard/config.toml")
}

fn remote(settings: &Settings) -> Result<Option<FirebaseStore>> {
    settings
        .firebase()
        .context("Invalid [remote] section in config")
}

/// Parse an optional `YYYY-MM`, falling back to the current month.
pub fn parse_month(month: Option<&str>) -> Result<Month> {
    match month {
        Some(month) => Ok(Month::parse(month)?),
        None => Ok(Month::current()),
    }
}

/// Open the calendar on `month` and wait for its first data.
pub async fn open_calendar(settings: &Settings, month: Month) -> Result<Calendar> {
    let mut calendar = ShiftCalendar::open(settings.entries(), settings.cache(), remote(settings)?, month);

    let spinner = create_spinner(format!("Loading {month}"));
    calendar.settle().await;
    spinner.finish_and_clear();

    Ok(calendar)
}

/// Open the board on one map and wait for its first data.
pub async fn open_board(settings: &Settings, map: &MapArgs) -> Result<Board> {
    let mut board = AnnotationBoard::open(
        settings.pins(),
        settings.strokes(),
        settings.cache(),
        remote(settings)?,
    );
    board.open_map(&map.room, &map.map)?;

    let spinner = create_spinner(format!("Loading {}/{}", map.room, map.map));
    board.settle().await;
    spinner.finish_and_clear();

    Ok(board)
}

pub fn confirm(prompt: String, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}
