pub mod proto {
    tonic::include_proto!("snake_engine");
}

pub mod config;
pub mod logger;
pub mod snake;

pub use snake::{
    CellTag, Direction, FieldSnapshot, GamePhase, InvalidField, ParsePhaseError, UnknownCellTag,
};
