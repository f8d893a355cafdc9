mod field;
mod types;

pub use field::{CellTag, FieldSnapshot, InvalidField, UnknownCellTag};
pub use types::{Direction, GamePhase, ParsePhaseError};
