use std::collections::{HashSet, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::action::Direction;

/// A cell on the game grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    x: i32,
    y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn inc_x(&mut self) {
        self.x += 1;
    }

    pub fn dec_x(&mut self) {
        self.x -= 1;
    }

    pub fn inc_y(&mut self) {
        self.y += 1;
    }

    pub fn dec_y(&mut self) {
        self.y -= 1;
    }

    /// Move point by delta
    pub fn moved_by(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The adjacent cell in a direction
    pub fn moved_in_direction(&self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.moved_by(dx, dy)
    }

    pub fn manhattan_distance(&self, other: Point) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x = {}, y = {}", self.x, self.y)
    }
}

/// Lifecycle of a single game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameState {
    Ready,
    Playing,
    GameOver,
}

/// Type of collision that ended a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionType {
    /// Snake hit a wall
    Wall,
    /// Snake hit itself
    SelfCollision,
}

/// The snake in the game
///
/// Head is at index 0. `direction` is the requested direction for the next
/// step, `last_step_direction` is the one the previous step actually used;
/// reversal checks are made against the latter so that two quick turns
/// between ticks cannot fold the head back into the neck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snake {
    body: VecDeque<Point>,
    direction: Direction,
    last_step_direction: Direction,
    pending_growth: u32,
}

impl Snake {
    /// Create a snake of `length` segments whose body trails away from `direction`
    ///
    /// A length of zero is treated as one: a snake always has a head.
    pub fn new(head: Point, length: usize, direction: Direction) -> Self {
        let length = length.max(1);
        let (back_dx, back_dy) = direction.opposite().delta();

        let mut body = VecDeque::with_capacity(length);
        let mut segment = head;
        body.push_back(segment);
        for _ in 1..length {
            segment = segment.moved_by(back_dx, back_dy);
            body.push_back(segment);
        }

        Self {
            body,
            direction,
            last_step_direction: direction,
            pending_growth: 0,
        }
    }

    /// Create a snake from explicit segments, head first
    ///
    /// Returns `None` for an empty segment list. Adjacency is not checked, so
    /// this can describe a body that already overlaps itself.
    pub fn from_segments(
        segments: impl IntoIterator<Item = Point>,
        direction: Direction,
    ) -> Option<Self> {
        let body: VecDeque<Point> = segments.into_iter().collect();
        if body.is_empty() {
            return None;
        }

        Some(Self {
            body,
            direction,
            last_step_direction: direction,
            pending_growth: 0,
        })
    }

    /// Request a new direction for the next step
    ///
    /// Returns false, leaving the direction unchanged, when `new_direction`
    /// reverses the last applied step.
    pub fn set_direction(&mut self, new_direction: Direction) -> bool {
        if self.last_step_direction.is_opposite(new_direction) {
            tracing::debug!(
                last_step = %self.last_step_direction,
                requested = %new_direction,
                "Rejected direction change"
            );
            return false;
        }

        self.direction = new_direction;
        true
    }

    /// Schedule one segment of growth
    pub fn feed(&mut self) {
        self.pending_growth += 1;
    }

    /// Advance one cell in the current direction
    pub fn make_step(&mut self) {
        let new_head = self.head().moved_in_direction(self.direction);
        self.last_step_direction = self.direction;
        self.body.push_front(new_head);

        if self.pending_growth > 0 {
            self.pending_growth -= 1;
        } else {
            self.body.pop_back();
        }
    }

    /// True if two segments share a cell
    pub fn exist_circle_collision(&self) -> bool {
        let distinct: HashSet<&Point> = self.body.iter().collect();
        distinct.len() != self.body.len()
    }

    /// True if any segment occupies `p`
    pub fn collision_with_point(&self, p: Point) -> bool {
        self.body.contains(&p)
    }

    /// Get the head position
    pub fn head(&self) -> Point {
        self.body[0]
    }

    /// Get the tail position (last segment)
    pub fn tail(&self) -> Point {
        self.body[self.body.len() - 1]
    }

    /// Copy of all segments, head first
    pub fn points(&self) -> Vec<Point> {
        self.body.iter().copied().collect()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn last_step_direction(&self) -> Direction {
        self.last_step_direction
    }

    pub fn pending_growth(&self) -> u32 {
        self.pending_growth
    }

    /// Get the length of the snake
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// True when the snake has no segments
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl fmt::Display for Snake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Snake")?;
        writeln!(f, "  points:")?;
        for p in &self.body {
            writeln!(f, "    [{p}]")?;
        }
        write!(f, "  direction: {}", self.direction)
    }
}

/// Everything a presentation layer needs for one frame, copied under one lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub state: GameState,
    pub score: u32,
    pub ticks: u64,
    /// Snake segments, head first
    pub snake: Vec<Point>,
    pub food: Point,
    pub direction: Direction,
}

impl GameSnapshot {
    pub fn head(&self) -> Option<Point> {
        self.snake.first().copied()
    }
}
