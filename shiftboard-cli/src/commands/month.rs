use anyhow::Result;

use super::{load_settings, open_calendar, parse_month};
use crate::render::Render;

pub async fn run(month: Option<&str>, next: bool, prev: bool) -> Result<()> {
    let settings = load_settings()?;
    let mut month = parse_month(month)?;
    if next {
        month = month.succ();
    } else if prev {
        month = month.pred();
    }

    let calendar = open_calendar(&settings, month).await?;
    println!("{}", calendar.render());

    Ok(())
}
