use common::Direction;

pub fn direction_for_key(key: &str) -> Option<Direction> {
    match key {
        "w" => Some(Direction::Up),
        "a" => Some(Direction::Left),
        "s" => Some(Direction::Down),
        "d" => Some(Direction::Right),
        _ => None,
    }
}

/// Holds the direction the next tick will be sent with. Only the most recent
/// accepted key counts; reversal checks are left to the engine.
#[derive(Debug, Default)]
pub struct InputBuffer {
    current: Direction,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_key(&mut self, key: &str) -> bool {
        match direction_for_key(key) {
            Some(direction) => {
                self.current = direction;
                true
            }
            None => false,
        }
    }

    pub fn current(&self) -> Direction {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = Direction::default();
    }
}
