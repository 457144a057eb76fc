use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

use super::{
    action::Direction,
    arena::create_rect,
    config::GameConfig,
    food::create_food,
    state::{CollisionType, GameSnapshot, GameState, Point, Snake},
};
use crate::error::{GameError, GameResult};

/// Information about a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    /// Whether the snake ate food this tick
    pub ate_food: bool,
    /// Type of collision if one occurred
    pub collision: Option<CollisionType>,
    /// Lifecycle state after the tick
    pub state: GameState,
}

impl TickOutcome {
    fn idle(state: GameState) -> Self {
        Self {
            ate_food: false,
            collision: None,
            state,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state == GameState::GameOver
    }
}

/// All mutable state of one game
///
/// Only ever touched through the engine's lock.
struct World {
    config: GameConfig,
    blocks: HashSet<Point>,
    snake: Snake,
    food: Point,
    score: u32,
    ticks: u64,
    state: GameState,
    /// Bumped on every rebuild so a loop of a discarded game can tell
    generation: u64,
    rng: StdRng,
}

impl World {
    fn new(config: GameConfig) -> GameResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let snake = config.initial_snake();
        let mut world = Self {
            blocks: create_rect(config.grid_width, config.grid_height),
            food: snake.head(),
            snake,
            score: 0,
            ticks: 0,
            state: GameState::Ready,
            generation: 0,
            rng,
            config,
        };
        world.food = world.place_food()?;
        Ok(world)
    }

    /// Rebuild arena, snake, food and score; the RNG keeps its stream
    fn rebuild(&mut self) -> GameResult<()> {
        self.blocks = create_rect(self.config.grid_width, self.config.grid_height);
        self.snake = self.config.initial_snake();
        self.score = 0;
        self.ticks = 0;
        self.state = GameState::Ready;
        self.generation += 1;
        self.food = self.place_food()?;
        Ok(())
    }

    fn place_food(&mut self) -> GameResult<Point> {
        create_food(
            self.config.grid_width,
            self.config.grid_height,
            &self.snake,
            &mut self.rng,
            self.config.max_food_attempts,
        )
    }

    /// Run one tick of the game rules
    ///
    /// Does nothing unless the game is PLAYING. Once GAME_OVER is reached
    /// no further mutation happens.
    fn advance(&mut self) -> GameResult<TickOutcome> {
        if self.state != GameState::Playing {
            return Ok(TickOutcome::idle(self.state));
        }

        self.snake.make_step();
        self.ticks += 1;
        let head = self.snake.head();

        let collision = if self.blocks.contains(&head) {
            Some(CollisionType::Wall)
        } else if self.snake.exist_circle_collision() {
            Some(CollisionType::SelfCollision)
        } else {
            None
        };

        if let Some(collision) = collision {
            self.state = GameState::GameOver;
            tracing::info!(
                score = self.score,
                ticks = self.ticks,
                ?collision,
                "Game over"
            );
            return Ok(TickOutcome {
                ate_food: false,
                collision: Some(collision),
                state: self.state,
            });
        }

        let ate_food = head == self.food;
        if ate_food {
            self.snake.feed();
            self.score += 1;
            match self.place_food() {
                Ok(food) => self.food = food,
                Err(err) => {
                    self.state = GameState::GameOver;
                    tracing::error!(score = self.score, %err, "Cannot place food, ending game");
                    return Err(err);
                }
            }
        }

        Ok(TickOutcome {
            ate_food,
            collision: None,
            state: self.state,
        })
    }

    fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            state: self.state,
            score: self.score,
            ticks: self.ticks,
            snake: self.snake.points(),
            food: self.food,
            direction: self.snake.direction(),
        }
    }
}

/// The game engine that owns all game state
///
/// State lives behind a single mutex shared with the tick loop task. Every
/// accessor returns a copy, so callers never observe a half-applied tick.
pub struct GameEngine {
    config: GameConfig,
    world: Arc<Mutex<World>>,
    tick_loop: Mutex<Option<JoinHandle<()>>>,
}

impl GameEngine {
    /// Create a new engine in the READY state
    pub fn new(config: GameConfig) -> GameResult<Self> {
        let world = World::new(config.clone())?;
        Ok(Self {
            config,
            world: Arc::new(Mutex::new(world)),
            tick_loop: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// READY → PLAYING and spawn the tick loop on the current Tokio runtime
    pub fn start(&self) -> GameResult<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| GameError::NoRuntime)?;
        let generation = self.begin_playing()?;

        let world = Arc::clone(&self.world);
        let delay = self.config.tick_delay();
        let handle = runtime.spawn(run_tick_loop(world, generation, delay));

        if let Some(previous) = lock(&self.tick_loop).replace(handle) {
            previous.abort();
        }
        tracing::info!(generation, "Game started");
        Ok(())
    }

    /// READY → PLAYING without a tick loop; the caller drives [`GameEngine::tick`]
    pub fn start_manual(&self) -> GameResult<()> {
        let generation = self.begin_playing()?;
        tracing::debug!(generation, "Game started in manual mode");
        Ok(())
    }

    /// Rebuild everything from scratch and start a new game
    pub fn restart(&self) -> GameResult<()> {
        self.reset()?;
        self.start()
    }

    /// Rebuild everything from scratch and leave the game READY
    ///
    /// A running loop is discarded; it stops before touching the new game.
    pub fn reset(&self) -> GameResult<()> {
        if let Some(previous) = lock(&self.tick_loop).take() {
            previous.abort();
        }
        let mut world = lock(&self.world);
        world.rebuild()?;
        tracing::info!(generation = world.generation, "Game reset");
        Ok(())
    }

    /// Run exactly one tick now
    ///
    /// Safe to call while a loop is running, but mixing both makes the game
    /// advance faster than the configured delay.
    pub fn tick(&self) -> GameResult<TickOutcome> {
        lock(&self.world).advance()
    }

    /// Forward a direction change to the snake; reversals are ignored
    pub fn change_direction(&self, direction: Direction) {
        lock(&self.world).snake.set_direction(direction);
    }

    pub fn get_state(&self) -> GameState {
        lock(&self.world).state
    }

    pub fn get_score(&self) -> u32 {
        lock(&self.world).score
    }

    pub fn get_blocks(&self) -> HashSet<Point> {
        lock(&self.world).blocks.clone()
    }

    pub fn get_food(&self) -> Point {
        lock(&self.world).food
    }

    /// Snake segments, head first
    pub fn get_snake_coords(&self) -> Vec<Point> {
        lock(&self.world).snake.points()
    }

    /// Copy of the whole snake, direction state and growth counter included
    pub fn get_snake(&self) -> Snake {
        lock(&self.world).snake.clone()
    }

    pub fn get_ticks(&self) -> u64 {
        lock(&self.world).ticks
    }

    /// Consistent view of one moment of the game
    pub fn snapshot(&self) -> GameSnapshot {
        lock(&self.world).snapshot()
    }

    /// Whether the tick loop of the current game is still running
    pub fn is_running(&self) -> bool {
        lock(&self.tick_loop)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn begin_playing(&self) -> GameResult<u64> {
        let mut world = lock(&self.world);
        if world.state != GameState::Ready {
            return Err(GameError::InvalidTransition { from: world.state });
        }
        world.state = GameState::Playing;
        Ok(world.generation)
    }
}

impl Drop for GameEngine {
    fn drop(&mut self) {
        if let Some(handle) = lock(&self.tick_loop).take() {
            handle.abort();
        }
    }
}

/// A panic while holding the lock cannot leave a World half-updated in a way
/// the rules care about, so poisoning is ignored.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn run_tick_loop(shared: Arc<Mutex<World>>, generation: u64, delay: Duration) {
    let mut timer = interval(delay);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        timer.tick().await;

        let mut world = lock(&shared);
        if world.generation != generation {
            tracing::debug!(generation, "Tick loop of a discarded game stopped");
            break;
        }

        match world.advance() {
            Ok(outcome) if outcome.state != GameState::Playing => break,
            Ok(_) => {}
            Err(err) => {
                tracing::error!(%err, "Tick loop aborted");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_engine(config: GameConfig) -> GameEngine {
        let engine = GameEngine::new(config.with_seed(11)).unwrap();
        engine.start_manual().unwrap();
        engine
    }

    #[test]
    fn test_new_engine_is_ready() {
        let engine = GameEngine::new(GameConfig::default().with_seed(1)).unwrap();

        assert_eq!(engine.get_state(), GameState::Ready);
        assert_eq!(engine.get_score(), 0);
        assert_eq!(engine.get_ticks(), 0);
        assert_eq!(
            engine.get_snake_coords(),
            vec![Point::new(10, 10), Point::new(10, 9), Point::new(10, 8)]
        );
        assert_eq!(engine.get_blocks().len(), 76);

        let food = engine.get_food();
        assert!(!engine.get_snake_coords().contains(&food));
        assert!(!engine.get_blocks().contains(&food));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            GameEngine::new(GameConfig::new(2, 2)),
            Err(GameError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_tick_does_nothing_before_start() {
        let engine = GameEngine::new(GameConfig::default().with_seed(1)).unwrap();
        let before = engine.snapshot();

        let outcome = engine.tick().unwrap();

        assert_eq!(outcome, TickOutcome::idle(GameState::Ready));
        assert_eq!(engine.snapshot(), before);
    }

    #[test]
    fn test_start_requires_runtime() {
        let engine = GameEngine::new(GameConfig::default()).unwrap();
        assert!(matches!(engine.start(), Err(GameError::NoRuntime)));
        assert_eq!(engine.get_state(), GameState::Ready);
    }

    #[test]
    fn test_start_only_from_ready() {
        let engine = manual_engine(GameConfig::default());
        assert!(matches!(
            engine.start_manual(),
            Err(GameError::InvalidTransition {
                from: GameState::Playing
            })
        ));
    }

    #[test]
    fn test_basic_movement() {
        let engine = manual_engine(GameConfig::default());

        let outcome = engine.tick().unwrap();

        assert_eq!(outcome.state, GameState::Playing);
        assert_eq!(engine.get_ticks(), 1);
        let snake = engine.get_snake_coords();
        assert_eq!(snake.len(), 3);
        assert_eq!(snake[0], Point::new(10, 11));
    }

    #[test]
    fn test_end_to_end_direction_commands() {
        let engine = manual_engine(GameConfig::new(20, 20));

        engine.change_direction(Direction::Down);
        assert_eq!(engine.get_snake().direction(), Direction::Up);

        engine.change_direction(Direction::Left);
        assert_eq!(engine.get_snake().direction(), Direction::Left);

        engine.tick().unwrap();
        assert_eq!(engine.get_snake_coords()[0], Point::new(9, 10));
    }

    #[test]
    fn test_food_consumption() {
        let engine = manual_engine(GameConfig::default());
        {
            let mut world = lock(&engine.world);
            world.food = Point::new(10, 11);
        }

        let outcome = engine.tick().unwrap();

        assert!(outcome.ate_food);
        assert_eq!(engine.get_score(), 1);
        // Growth is applied on the following step
        assert_eq!(engine.get_snake_coords().len(), 3);
        assert_eq!(engine.get_snake().pending_growth(), 1);
        assert!(!engine.get_snake_coords().contains(&engine.get_food()));

        engine.tick().unwrap();
        assert_eq!(engine.get_snake_coords().len(), 4);
    }

    #[test]
    fn test_eating_streak() {
        let engine = manual_engine(GameConfig::default());

        for eaten in 1..=6 {
            {
                let mut world = lock(&engine.world);
                world.food = world.snake.head().moved_in_direction(Direction::Up);
            }

            let outcome = engine.tick().unwrap();

            assert!(outcome.ate_food);
            assert_eq!(engine.get_score(), eaten);
            assert!(!engine.get_snake_coords().contains(&engine.get_food()));
        }

        // Each meal grows the snake on the step after it was eaten
        assert_eq!(engine.get_snake_coords().len(), 8);
        assert_eq!(engine.get_snake().pending_growth(), 1);
        assert_eq!(engine.get_snake_coords()[0], Point::new(10, 16));
    }

    #[test]
    fn test_wall_collision_ends_game() {
        let engine = manual_engine(GameConfig::default());

        let mut last = engine.tick().unwrap();
        while !last.is_terminal() {
            last = engine.tick().unwrap();
        }

        assert_eq!(last.collision, Some(CollisionType::Wall));
        assert_eq!(engine.get_state(), GameState::GameOver);
        assert_eq!(engine.get_snake_coords()[0], Point::new(10, 19));

        let frozen = engine.snapshot();
        let outcome = engine.tick().unwrap();
        assert_eq!(outcome, TickOutcome::idle(GameState::GameOver));
        assert_eq!(engine.snapshot(), frozen);
    }

    #[test]
    fn test_self_collision_ends_game() {
        let engine = manual_engine(GameConfig::default());
        {
            let mut world = lock(&engine.world);
            world.snake = Snake::from_segments(
                [
                    Point::new(5, 5),
                    Point::new(5, 6),
                    Point::new(6, 6),
                    Point::new(6, 5),
                    Point::new(6, 4),
                ],
                Direction::Right,
            )
            .unwrap();
            world.food = Point::new(15, 15);
        }

        let outcome = engine.tick().unwrap();

        assert_eq!(outcome.collision, Some(CollisionType::SelfCollision));
        assert_eq!(engine.get_state(), GameState::GameOver);
        assert_eq!(engine.get_score(), 0);
    }

    #[test]
    fn test_reset_rebuilds_initial_shape() {
        let engine = manual_engine(GameConfig::default());
        let initial = engine.get_snake_coords();
        engine.change_direction(Direction::Left);
        engine.tick().unwrap();
        {
            let mut world = lock(&engine.world);
            world.score = 7;
        }

        engine.reset().unwrap();

        assert_eq!(engine.get_state(), GameState::Ready);
        assert_eq!(engine.get_score(), 0);
        assert_eq!(engine.get_ticks(), 0);
        assert_eq!(engine.get_snake_coords(), initial);
        assert_eq!(engine.get_snake().direction(), Direction::Up);
        assert_eq!(engine.get_blocks().len(), 76);
        assert!(!initial.contains(&engine.get_food()));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let engine = manual_engine(GameConfig::default());
        let snapshot = engine.snapshot();

        engine.tick().unwrap();

        assert_eq!(snapshot.ticks, 0);
        assert_eq!(snapshot.head(), Some(Point::new(10, 10)));
        assert_eq!(engine.snapshot().head(), Some(Point::new(10, 11)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_runs_until_wall() {
        let engine = GameEngine::new(
            GameConfig::default()
                .with_seed(5)
                .with_tick_delay(Duration::from_millis(10)),
        )
        .unwrap();
        engine.start().unwrap();
        assert_eq!(engine.get_state(), GameState::Playing);

        for _ in 0..100 {
            if engine.get_state() == GameState::GameOver {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(engine.get_state(), GameState::GameOver);
        assert_eq!(engine.get_snake_coords()[0], Point::new(10, 19));
        assert_eq!(engine.get_ticks(), 9);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!engine.is_running());
        assert_eq!(engine.get_ticks(), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_direction_change_applies_to_next_step() {
        let engine = GameEngine::new(
            GameConfig::default()
                .with_seed(5)
                .with_tick_delay(Duration::from_millis(10)),
        )
        .unwrap();
        engine.start().unwrap();

        // First tick fires immediately once the loop task runs
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(engine.get_ticks(), 1);
        assert_eq!(engine.get_snake_coords()[0], Point::new(10, 11));

        engine.change_direction(Direction::Right);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(engine.get_ticks(), 2);
        assert_eq!(engine.get_snake_coords()[0], Point::new(11, 11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_game_over() {
        let engine = GameEngine::new(
            GameConfig::default()
                .with_seed(5)
                .with_tick_delay(Duration::from_millis(10)),
        )
        .unwrap();
        let initial = engine.get_snake_coords();
        engine.start().unwrap();

        while engine.get_state() != GameState::GameOver {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        engine.restart().unwrap();

        assert_eq!(engine.get_state(), GameState::Playing);
        assert_eq!(engine.get_score(), 0);
        assert_eq!(engine.get_ticks(), 0);
        assert_eq!(engine.get_snake_coords(), initial);
        assert_eq!(engine.get_blocks().len(), 76);
        assert!(!initial.contains(&engine.get_food()));
        assert!(engine.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_discards_running_loop() {
        let engine = GameEngine::new(
            GameConfig::default()
                .with_seed(5)
                .with_tick_delay(Duration::from_millis(10)),
        )
        .unwrap();
        engine.start().unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(engine.get_ticks(), 3);

        engine.restart().unwrap();
        tokio::time::sleep(Duration::from_millis(25)).await;

        // Only the new loop ticks: immediately, then at 10ms and 20ms
        assert_eq!(engine.get_ticks(), 3);
        assert_eq!(engine.get_snake_coords()[0], Point::new(10, 13));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_steering_and_reads_from_another_thread() {
        let engine = Arc::new(
            GameEngine::new(
                GameConfig::default()
                    .with_seed(5)
                    .with_tick_delay(Duration::from_millis(20)),
            )
            .unwrap(),
        );
        engine.start().unwrap();

        let remote = Arc::clone(&engine);
        let steering = std::thread::spawn(move || {
            let mut turned = false;
            loop {
                let snapshot = remote.snapshot();
                if snapshot.state == GameState::GameOver {
                    return snapshot;
                }

                // Every copy is a whole tick: the body stays connected
                for pair in snapshot.snake.windows(2) {
                    assert_eq!(pair[0].manhattan_distance(pair[1]), 1);
                }
                assert!(!snapshot.snake.contains(&snapshot.food));

                if !turned && snapshot.ticks >= 1 {
                    remote.change_direction(Direction::Down);
                    remote.change_direction(Direction::Right);
                    turned = true;
                }
                std::thread::sleep(Duration::from_millis(1));
            }
        });

        let last = tokio::task::spawn_blocking(move || steering.join())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(last.state, GameState::GameOver);
        let head = last.head().unwrap();
        assert_eq!(head.x(), 19);
        assert!(head.y() > 10 && head.y() < 19);
        assert_eq!(engine.get_state(), GameState::GameOver);
        assert_eq!(engine.get_snake_coords()[0], head);
    }
}
