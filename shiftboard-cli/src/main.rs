mod commands;
mod render;
mod utils;

use std::env;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "shiftboard")]
#[command(about = "Shared shift calendar and map annotations, live or offline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which map to work on.
#[derive(Args, Clone)]
pub struct MapArgs {
    /// Room the map belongs to
    #[arg(long)]
    room: String,

    /// Map name within the room
    #[arg(long)]
    map: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show configuration and connectivity mode
    Status,
    /// Show one month of the shift calendar
    Month {
        /// Month to show (YYYY-MM, defaults to the current month)
        month: Option<String>,

        /// Show the month after
        #[arg(long, conflicts_with = "prev")]
        next: bool,

        /// Show the month before
        #[arg(long)]
        prev: bool,
    },
    /// Add an entry to the calendar
    Post {
        /// Day of the entry (YYYY-MM-DD)
        date: String,
        name: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Delete one calendar entry
    Remove {
        id: String,

        /// Month the entry is in (YYYY-MM)
        #[arg(long)]
        month: String,
    },
    /// Delete every entry of a month
    Clear {
        /// Month to clear (YYYY-MM)
        #[arg(long)]
        month: String,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Follow a month live until interrupted
    Watch {
        /// Month to follow (YYYY-MM, defaults to the current month)
        month: Option<String>,
    },
    /// List the pins on a map
    Pins {
        #[command(flatten)]
        map: MapArgs,
    },
    /// List the strokes on a map
    Strokes {
        #[command(flatten)]
        map: MapArgs,
    },
    /// Place, move, resize or remove pins
    Pin {
        #[command(subcommand)]
        action: PinAction,
    },
    /// Draw or erase strokes
    Stroke {
        #[command(subcommand)]
        action: StrokeAction,
    },
    /// Remove every pin and stroke from a map
    ClearMap {
        #[command(flatten)]
        map: MapArgs,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Upload a locally edited map to the shared database and follow it live
    Share {
        #[command(flatten)]
        map: MapArgs,
    },
}

#[derive(Subcommand)]
pub enum PinAction {
    Add {
        /// Icon type, e.g. "smoke" or "flash"
        icon: String,
        /// Horizontal position, 0..1 of the map width
        x: f64,
        /// Vertical position, 0..1 of the map height
        y: f64,
        #[arg(long, default_value_t = commands::map::DEFAULT_PIN_SIZE)]
        size: f64,
        #[command(flatten)]
        map: MapArgs,
    },
    Move {
        id: String,
        x: f64,
        y: f64,
        #[command(flatten)]
        map: MapArgs,
    },
    Resize {
        id: String,
        size: f64,
        #[command(flatten)]
        map: MapArgs,
    },
    Remove {
        id: String,
        #[command(flatten)]
        map: MapArgs,
    },
}

#[derive(Subcommand)]
pub enum StrokeAction {
    Add {
        /// Points as "x,y" pairs, each normalised to 0..1
        #[arg(required = true, num_args = 1..)]
        points: Vec<String>,
        #[arg(long, default_value = "#ff3b30")]
        color: String,
        #[arg(long, default_value_t = 3.0)]
        width: f64,
        #[command(flatten)]
        map: MapArgs,
    },
    Remove {
        id: String,
        #[command(flatten)]
        map: MapArgs,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SHIFTBOARD_LOG")
        .unwrap_or_else(|_| EnvFilter::new("shiftboard=warn"));

    let format = env::var("SHIFTBOARD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Status => commands::status::run(),
        Commands::Month { month, next, prev } => {
            commands::month::run(month.as_deref(), next, prev).await
        }
        Commands::Post { date, name, text } => {
            commands::post::run(&date, &name, &text.join(" ")).await
        }
        Commands::Remove { id, month } => commands::remove::run(&id, &month).await,
        Commands::Clear { month, yes } => commands::remove::clear(&month, yes).await,
        Commands::Watch { month } => commands::watch::run(month.as_deref()).await,
        Commands::Pins { map } => commands::map::list_pins(&map).await,
        Commands::Strokes { map } => commands::map::list_strokes(&map).await,
        Commands::Pin { action } => commands::map::pin(action).await,
        Commands::Stroke { action } => commands::map::stroke(action).await,
        Commands::ClearMap { map, yes } => commands::map::clear(&map, yes).await,
        Commands::Share { map } => commands::share::run(&map).await,
    }
}
