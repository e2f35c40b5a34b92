use anyhow::Result;
use owo_colors::OwoColorize;
use shiftboard_core::{AnnotationBoard, Settings};

use super::{Board, load_settings};
use crate::MapArgs;
use crate::utils::tui::create_spinner;

pub async fn run(map: &MapArgs) -> Result<()> {
    let settings = load_settings()?;
    let Some(remote) = settings.firebase()? else {
        anyhow::bail!(
            "No remote store configured.\n\n\
            Set a database URL in {}:\n  \
            [remote]\n  \
            database_url = \"https://<project>-default-rtdb.firebaseio.com\"",
            Settings::config_path()?.display()
        );
    };

    // Start from the local copy only; sharing makes it the remote state.
    let mut board: Board =
        AnnotationBoard::open(settings.pins(), settings.strokes(), settings.cache(), None);
    board.open_map(&map.room, &map.map)?;
    let (pins, strokes) = (board.pins().len(), board.strokes().len());

    let spinner = create_spinner(format!("Sharing {}/{}", map.room, map.map));
    let result = board.share(remote).await;
    if result.is_ok() {
        board.settle().await;
    }
    spinner.finish_and_clear();
    result?;

    println!(
        "{} {}",
        "↑".green(),
        format!(
            "Shared {pins} pins and {strokes} strokes on {}/{}",
            map.room, map.map
        )
        .green()
    );
    if board.is_degraded() {
        println!("   {}", "Live feed unavailable, showing cached state".red());
    }

    Ok(())
}
