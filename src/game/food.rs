use rand::Rng;
use rand::seq::IteratorRandom;

use super::state::{Point, Snake};
use crate::error::{GameError, GameResult};

/// Pick a random interior cell not covered by the snake
///
/// Samples uniformly from x in [1, width-2] and y in [1, height-2] until a
/// free cell turns up. After `max_attempts` misses the free cells are
/// enumerated and one is chosen uniformly, so the result only fails when the
/// snake covers the whole interior.
pub fn create_food<R: Rng + ?Sized>(
    width: usize,
    height: usize,
    snake: &Snake,
    rng: &mut R,
    max_attempts: usize,
) -> GameResult<Point> {
    if width < 3 || height < 3 {
        return Err(GameError::NoFreeCell { width, height });
    }

    let (max_x, max_y) = (width as i32 - 2, height as i32 - 2);

    for _ in 0..max_attempts {
        let food = Point::new(rng.gen_range(1..=max_x), rng.gen_range(1..=max_y));
        if !snake.collision_with_point(food) {
            return Ok(food);
        }
    }

    tracing::debug!(
        attempts = max_attempts,
        snake_len = snake.len(),
        "Random food placement missed, scanning free cells"
    );

    (1..=max_x)
        .flat_map(|x| (1..=max_y).map(move |y| Point::new(x, y)))
        .filter(|p| !snake.collision_with_point(*p))
        .choose(rng)
        .ok_or(GameError::NoFreeCell { width, height })
}
