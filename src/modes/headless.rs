use anyhow::{Context, Result, ensure};
use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info};

use crate::game::{Direction, GameConfig, GameEngine, GameSnapshot, GameState};
use crate::metrics::GameMetrics;

/// How the headless driver plays
#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    /// Number of games to play before stopping
    pub games: u32,
    /// Directions sent to the engine, one per observed tick, replayed every game
    pub moves: Vec<Direction>,
    /// How often the engine is polled for a snapshot
    pub poll_interval: Duration,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            games: 1,
            moves: Vec::new(),
            poll_interval: Duration::from_millis(33),
        }
    }
}

/// Presentation-side driver without a screen
///
/// Polls the engine on its own timer like a renderer would, forwards
/// scripted direction changes and restarts the game after each game over.
pub struct HeadlessMode {
    engine: GameEngine,
    options: HeadlessOptions,
    metrics: GameMetrics,
    pending_moves: VecDeque<Direction>,
    last_seen_tick: u64,
    should_quit: bool,
}

impl HeadlessMode {
    pub fn new(config: GameConfig, options: HeadlessOptions) -> Result<Self> {
        ensure!(
            !options.poll_interval.is_zero(),
            "Poll interval must be positive"
        );
        let engine = GameEngine::new(config).context("Failed to create game engine")?;

        Ok(Self {
            engine,
            pending_moves: options.moves.iter().copied().collect(),
            options,
            metrics: GameMetrics::new(),
            last_seen_tick: 0,
            should_quit: false,
        })
    }

    pub fn metrics(&self) -> &GameMetrics {
        &self.metrics
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    /// Play until the requested number of games is over or Ctrl+C
    pub async fn run(&mut self) -> Result<()> {
        self.run_until(async {
            // An error here only means no Ctrl+C handler; keep playing
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Play until the requested number of games is over or `shutdown` resolves
    pub async fn run_until(&mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        if self.options.games == 0 {
            return Ok(());
        }

        self.engine.start().context("Failed to start game")?;
        self.metrics.on_game_start();

        let mut poll_timer = interval(self.options.poll_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = poll_timer.tick() => {
                    self.poll()?;
                }

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    self.should_quit = true;
                }
            }

            if self.should_quit {
                break;
            }
        }

        self.metrics.update();
        info!(
            elapsed = %self.metrics.format_time(),
            "Session finished: {}",
            self.metrics.format_summary()
        );
        Ok(())
    }

    fn poll(&mut self) -> Result<()> {
        let snapshot = self.engine.snapshot();

        if snapshot.ticks != self.last_seen_tick {
            self.last_seen_tick = snapshot.ticks;
            log_snapshot(&snapshot);

            if snapshot.state == GameState::Playing {
                if let Some(direction) = self.pending_moves.pop_front() {
                    self.engine.change_direction(direction);
                }
            }
        }

        if snapshot.state == GameState::GameOver {
            self.on_game_over(&snapshot)?;
        }

        Ok(())
    }

    fn on_game_over(&mut self, snapshot: &GameSnapshot) -> Result<()> {
        self.metrics.update();
        self.metrics.on_game_over(snapshot.score, snapshot.ticks);
        info!(
            game = self.metrics.games_played,
            score = snapshot.score,
            ticks = snapshot.ticks,
            time = %self.metrics.format_time(),
            "Game over! Score: {}",
            snapshot.score
        );

        if self.metrics.games_played >= self.options.games {
            self.should_quit = true;
            return Ok(());
        }

        self.engine.restart().context("Failed to restart game")?;
        self.metrics.on_game_start();
        self.pending_moves = self.options.moves.iter().copied().collect();
        self.last_seen_tick = 0;
        Ok(())
    }
}

fn log_snapshot(snapshot: &GameSnapshot) {
    if let Some(head) = snapshot.head() {
        debug!(
            tick = snapshot.ticks,
            head_x = head.x(),
            head_y = head.y(),
            length = snapshot.snake.len(),
            score = snapshot.score,
            direction = %snapshot.direction,
            "Tick"
        );
    }
}
