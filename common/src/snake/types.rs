use std::fmt;
use std::str::FromStr;

use crate::proto;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn is_opposite(&self, other: &Direction) -> bool {
        matches!(
            (self, other),
            (Direction::Left, Direction::Right)
                | (Direction::Right, Direction::Left)
                | (Direction::Up, Direction::Down)
                | (Direction::Down, Direction::Up)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Direction> for proto::Direction {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => proto::Direction::Up,
            Direction::Down => proto::Direction::Down,
            Direction::Left => proto::Direction::Left,
            Direction::Right => proto::Direction::Right,
        }
    }
}

impl TryFrom<proto::Direction> for Direction {
    type Error = String;

    fn try_from(direction: proto::Direction) -> Result<Self, Self::Error> {
        match direction {
            proto::Direction::Up => Ok(Direction::Up),
            proto::Direction::Down => Ok(Direction::Down),
            proto::Direction::Left => Ok(Direction::Left),
            proto::Direction::Right => Ok(Direction::Right),
            proto::Direction::Unspecified => Err("direction is unspecified".to_string()),
        }
    }
}

/// Coarse lifecycle of one run, as reported by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GamePhase {
    Starting,
    Ongoing,
    Win,
    Lose,
}

impl GamePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            GamePhase::Starting => "Starting",
            GamePhase::Ongoing => "Ongoing",
            GamePhase::Win => "Win",
            GamePhase::Lose => "Lose",
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, GamePhase::Win | GamePhase::Lose)
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePhaseError(pub String);

impl fmt::Display for ParsePhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown game phase: {:?}", self.0)
    }
}

impl std::error::Error for ParsePhaseError {}

impl FromStr for GamePhase {
    type Err = ParsePhaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Starting" => Ok(GamePhase::Starting),
            "Ongoing" => Ok(GamePhase::Ongoing),
            "Win" => Ok(GamePhase::Win),
            "Lose" => Ok(GamePhase::Lose),
            other => Err(ParsePhaseError(other.to_string())),
        }
    }
}
