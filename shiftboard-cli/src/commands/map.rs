use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use shiftboard_core::{Point, RecordId};

use super::{confirm, load_settings, open_board};
use crate::render::Render;
use crate::{MapArgs, PinAction, StrokeAction};

pub const DEFAULT_PIN_SIZE: f64 = 32.0;

fn header(map: &MapArgs) -> String {
    format!("{}/{}", map.room, map.map).bold().to_string()
}

pub async fn list_pins(map: &MapArgs) -> Result<()> {
    let settings = load_settings()?;
    let board = open_board(&settings, map).await?;

    println!("{} {}", header(map), board.mode().render());
    if board.pins().is_empty() {
        println!("   {}", "No pins".dimmed());
    }
    for pin in board.pins() {
        println!("   {}", pin.render());
    }

    Ok(())
}

pub async fn list_strokes(map: &MapArgs) -> Result<()> {
    let settings = load_settings()?;
    let board = open_board(&settings, map).await?;

    println!("{} {}", header(map), board.mode().render());
    if board.strokes().is_empty() {
        println!("   {}", "No strokes".dimmed());
    }
    for stroke in board.strokes() {
        println!("   {}", stroke.render());
    }

    Ok(())
}

pub async fn pin(action: PinAction) -> Result<()> {
    let settings = load_settings()?;

    match action {
        PinAction::Add {
            icon,
            x,
            y,
            size,
            map,
        } => {
            let mut board = open_board(&settings, &map).await?;
            let id = board.place(&icon, x, y, size).await?;
            println!(
                "{} {} {}",
                "+".green(),
                format!("{icon} at ({x:.3}, {y:.3})").green(),
                format!("[{id}]").dimmed()
            );
        }
        PinAction::Move { id, x, y, map } => {
            let mut board = open_board(&settings, &map).await?;
            board.move_to(&RecordId::from(id.as_str()), x, y).await?;
            println!("{} {}", "~".yellow(), format!("{id} moved to ({x:.3}, {y:.3})").yellow());
        }
        PinAction::Resize { id, size, map } => {
            let mut board = open_board(&settings, &map).await?;
            board.resize(&RecordId::from(id.as_str()), size).await?;
            println!("{} {}", "~".yellow(), format!("{id} resized to {size}").yellow());
        }
        PinAction::Remove { id, map } => {
            let mut board = open_board(&settings, &map).await?;
            board.remove_pin(&RecordId::from(id.as_str())).await?;
            println!("{} {}", "-".red(), format!("{id} removed").red());
        }
    }

    Ok(())
}

pub async fn stroke(action: StrokeAction) -> Result<()> {
    let settings = load_settings()?;

    match action {
        StrokeAction::Add {
            points,
            color,
            width,
            map,
        } => {
            let points = points
                .iter()
                .map(|p| parse_point(p))
                .collect::<Result<Vec<_>>>()?;
            let count = points.len();

            let mut board = open_board(&settings, &map).await?;
            let id = board.draw(points, &color, width).await?;
            println!(
                "{} {} {}",
                "+".green(),
                format!("stroke with {count} points").green(),
                format!("[{id}]").dimmed()
            );
        }
        StrokeAction::Remove { id, map } => {
            let mut board = open_board(&settings, &map).await?;
            board.erase(&RecordId::from(id.as_str())).await?;
            println!("{} {}", "-".red(), format!("{id} erased").red());
        }
    }

    Ok(())
}

pub async fn clear(map: &MapArgs, yes: bool) -> Result<()> {
    let settings = load_settings()?;
    let mut board = open_board(&settings, map).await?;

    let (pins, strokes) = (board.pins().len(), board.strokes().len());
    if pins + strokes == 0 {
        println!("{}", format!("{}/{} is already empty", map.room, map.map).dimmed());
        return Ok(());
    }
    let prompt = format!(
        "Remove {pins} pins and {strokes} strokes from {}/{}?",
        map.room, map.map
    );
    if !confirm(prompt, yes)? {
        return Ok(());
    }

    board.clear_all().await?;
    println!(
        "{} {}",
        "-".red(),
        format!("Cleared {pins} pins and {strokes} strokes").red()
    );

    Ok(())
}

/// Parse an "x,y" pair.
fn parse_point(raw: &str) -> Result<Point> {
    let (x, y) = raw
        .split_once(',')
        .with_context(|| format!("Point '{raw}' should look like 0.25,0.5"))?;
    let x = x.trim().parse().with_context(|| format!("Invalid x in '{raw}'"))?;
    let y = y.trim().parse().with_context(|| format!("Invalid y in '{raw}'"))?;
    Ok(Point { x, y })
}
