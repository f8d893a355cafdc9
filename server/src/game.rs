use std::collections::{HashSet, VecDeque};

use common::{log, CellTag, Direction, FieldSnapshot, GamePhase};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const START_HEAD: Point = Point { x: 3, y: 3 };
const START_FOOD: Point = Point { x: 4, y: 3 };
const START_DIRECTION: Direction = Direction::Right;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: usize,
    pub y: usize,
}

impl Point {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldSize {
    pub width: usize,
    pub height: usize,
}

impl FieldSize {
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    fn step(&self, from: Point, direction: Direction) -> Option<Point> {
        match direction {
            Direction::Up => from.y.checked_sub(1).map(|y| Point::new(from.x, y)),
            Direction::Down => (from.y + 1 < self.height).then(|| Point::new(from.x, from.y + 1)),
            Direction::Left => from.x.checked_sub(1).map(|x| Point::new(x, from.y)),
            Direction::Right => (from.x + 1 < self.width).then(|| Point::new(from.x + 1, from.y)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeathReason {
    WallCollision,
    SelfCollision,
}

/// Authoritative single-player snake simulation.
pub struct GameState {
    field_size: FieldSize,
    body: VecDeque<Point>,
    food: Option<Point>,
    direction: Direction,
    phase: GamePhase,
    score: u32,
    death_reason: Option<DeathReason>,
    rng: StdRng,
}

impl GameState {
    pub fn new(field_size: FieldSize) -> Self {
        Self::with_rng(field_size, StdRng::from_os_rng())
    }

    #[cfg(test)]
    pub fn with_seed(field_size: FieldSize, seed: u64) -> Self {
        Self::with_rng(field_size, StdRng::seed_from_u64(seed))
    }

    fn with_rng(field_size: FieldSize, rng: StdRng) -> Self {
        let mut state = Self {
            field_size,
            body: VecDeque::new(),
            food: None,
            direction: START_DIRECTION,
            phase: GamePhase::Starting,
            score: 0,
            death_reason: None,
            rng,
        };
        state.setup();
        state
    }

    /// Puts a fresh board in place. Everything from a previous run is dropped.
    pub fn setup(&mut self) {
        self.body = VecDeque::from([START_HEAD]);
        self.food = Some(START_FOOD);
        self.direction = START_DIRECTION;
        self.phase = GamePhase::Starting;
        self.score = 0;
        self.death_reason = None;
    }

    pub fn start(&mut self) {
        self.phase = GamePhase::Ongoing;
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn death_reason(&self) -> Option<DeathReason> {
        self.death_reason
    }

    pub fn head(&self) -> Point {
        self.body[0]
    }

    pub fn snake_length(&self) -> usize {
        self.body.len()
    }

    /// Advances one tick. Outside of `Ongoing` the board is left untouched.
    pub fn update(&mut self, requested: Direction) {
        if self.phase != GamePhase::Ongoing {
            return;
        }

        if !requested.is_opposite(&self.direction) || self.body.len() == 1 {
            self.direction = requested;
        }

        let Some(next_head) = self.field_size.step(self.head(), self.direction) else {
            self.finish_with_death(DeathReason::WallCollision);
            return;
        };

        let eating = self.food == Some(next_head);
        // The tail vacates its cell this tick unless the snake grows.
        let occupied = if eating {
            self.body.len()
        } else {
            self.body.len() - 1
        };
        if self.body.iter().take(occupied).any(|p| *p == next_head) {
            self.finish_with_death(DeathReason::SelfCollision);
            return;
        }

        self.body.push_front(next_head);
        if !eating {
            self.body.pop_back();
            return;
        }

        self.score += 1;
        if self.body.len() == self.field_size.cell_count() {
            self.food = None;
            self.phase = GamePhase::Win;
            log!("Board filled, game won with score {}", self.score);
            return;
        }
        self.food = self.random_free_cell();
    }

    pub fn render(&self) -> FieldSnapshot {
        let mut rows = vec![vec![CellTag::Empty; self.field_size.width]; self.field_size.height];
        if let Some(food) = self.food {
            rows[food.y][food.x] = CellTag::Food;
        }
        for (index, part) in self.body.iter().enumerate() {
            rows[part.y][part.x] = if index == 0 { CellTag::Head } else { CellTag::Body };
        }
        FieldSnapshot::new(rows)
    }

    fn finish_with_death(&mut self, reason: DeathReason) {
        self.death_reason = Some(reason);
        self.phase = GamePhase::Lose;
        log!("Snake died ({:?}) with score {}", reason, self.score);
    }

    fn random_free_cell(&mut self) -> Option<Point> {
        let occupied: HashSet<Point> = self.body.iter().copied().collect();
        let free: Vec<Point> = (0..self.field_size.height)
            .flat_map(|y| (0..self.field_size.width).map(move |x| Point::new(x, y)))
            .filter(|p| !occupied.contains(p))
            .collect();
        if free.is_empty() {
            return None;
        }
        let index = self.rng.random_range(0..free.len());
        Some(free[index])
    }

    #[cfg(test)]
    fn set_body(&mut self, body: Vec<Point>, direction: Direction) {
        self.body = VecDeque::from(body);
        self.direction = direction;
    }

    #[cfg(test)]
    fn set_food(&mut self, food: Option<Point>) {
        self.food = food;
    }
}
