use anyhow::{Context, Result};
use clap::Parser;
use snake_engine::game::{Direction, GameConfig};
use snake_engine::modes::{HeadlessMode, HeadlessOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "snake")]
#[command(version, about = "Snake simulation core driven by a headless front-end")]
struct Cli {
    /// JSON game configuration; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid width, walls included
    #[arg(long)]
    width: Option<usize>,

    /// Grid height, walls included
    #[arg(long)]
    height: Option<usize>,

    /// Delay between engine ticks in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Initial snake length
    #[arg(long)]
    length: Option<usize>,

    /// Seed for food placement
    #[arg(long)]
    seed: Option<u64>,

    /// Number of games to play; the engine restarts after each game over
    #[arg(long, default_value = "1")]
    games: u32,

    /// Direction script applied one per tick, e.g. "LLUURRD" (U/D/L/R)
    #[arg(long, default_value = "")]
    moves: String,

    /// Snapshot polling interval in milliseconds
    #[arg(long, default_value = "33")]
    poll_ms: u64,
}

impl Cli {
    fn game_config(&self) -> Result<GameConfig> {
        let mut config = match &self.config {
            Some(path) => GameConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => GameConfig::default(),
        };

        if let Some(width) = self.width {
            config.grid_width = width;
        }
        if let Some(height) = self.height {
            config.grid_height = height;
        }
        if let Some(delay_ms) = self.delay_ms {
            config.tick_delay_ms = delay_ms;
        }
        if let Some(length) = self.length {
            config.initial_snake_length = length;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }

        config.validate().context("Invalid game configuration")?;
        Ok(config)
    }

    fn headless_options(&self) -> Result<HeadlessOptions> {
        let moves = parse_moves(&self.moves)?;
        Ok(HeadlessOptions {
            games: self.games,
            moves,
            poll_interval: Duration::from_millis(self.poll_ms.max(1)),
        })
    }
}

fn parse_moves(script: &str) -> Result<Vec<Direction>> {
    script
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .map(|c| {
            c.to_string()
                .parse::<Direction>()
                .with_context(|| format!("Invalid move {c:?} in --moves"))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging - use RUST_LOG env var or default to info
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = cli.game_config()?;
    let options = cli.headless_options()?;

    tracing::info!(
        width = config.grid_width,
        height = config.grid_height,
        delay_ms = config.tick_delay_ms,
        games = options.games,
        "Starting headless session"
    );

    let mut mode = HeadlessMode::new(config, options)?;
    mode.run().await?;

    Ok(())
}
