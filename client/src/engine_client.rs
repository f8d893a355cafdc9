use std::fmt;
use std::future::Future;

use tonic::transport::{Channel, Endpoint};

use common::proto::snake_engine_client::SnakeEngineClient;
use common::proto::{
    self, GameStateRequest, InitializeFieldRequest, ScoreRequest, SetupGameRequest,
    StartGameRequest, UpdateSnakeRequest,
};
use common::{Direction, FieldSnapshot, GamePhase, InvalidField, ParsePhaseError};

#[derive(Debug)]
pub enum EngineError {
    Transport(tonic::transport::Error),
    Status(tonic::Status),
    UnknownPhase(String),
    InvalidField(InvalidField),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Transport(e) => write!(f, "Engine connection error: {}", e),
            EngineError::Status(status) => {
                write!(f, "Engine call failed ({:?}): {}", status.code(), status.message())
            }
            EngineError::UnknownPhase(phase) => write!(f, "Engine reported unknown phase {:?}", phase),
            EngineError::InvalidField(e) => write!(f, "Engine sent a malformed field: {}", e),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<tonic::transport::Error> for EngineError {
    fn from(e: tonic::transport::Error) -> Self {
        EngineError::Transport(e)
    }
}

impl From<tonic::Status> for EngineError {
    fn from(status: tonic::Status) -> Self {
        EngineError::Status(status)
    }
}

impl From<ParsePhaseError> for EngineError {
    fn from(e: ParsePhaseError) -> Self {
        EngineError::UnknownPhase(e.0)
    }
}

impl From<InvalidField> for EngineError {
    fn from(e: InvalidField) -> Self {
        EngineError::InvalidField(e)
    }
}

/// The remote, authoritative side of the game. Every call mutates or reads
/// engine-held state; `advance` in particular must be issued once per tick.
pub trait EngineClient: Send {
    fn setup(&mut self) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn start(&mut self) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn advance(
        &mut self,
        direction: Direction,
    ) -> impl Future<Output = Result<FieldSnapshot, EngineError>> + Send;

    fn fetch_phase(&mut self) -> impl Future<Output = Result<GamePhase, EngineError>> + Send;

    fn fetch_score(&mut self) -> impl Future<Output = Result<u32, EngineError>> + Send;

    fn fetch_initial_field(
        &mut self,
    ) -> impl Future<Output = Result<FieldSnapshot, EngineError>> + Send;
}

pub struct GrpcEngineClient {
    inner: SnakeEngineClient<Channel>,
}

impl GrpcEngineClient {
    /// Only the address is checked here. The connection is made on the first
    /// call and re-attempted by later calls, so an engine that is down at
    /// startup surfaces as a failed mount that the user can retry.
    /// Must be called inside a tokio runtime.
    pub fn connect_lazy(address: String) -> Result<Self, EngineError> {
        let channel = Endpoint::from_shared(address)?.connect_lazy();
        Ok(Self {
            inner: SnakeEngineClient::new(channel),
        })
    }
}

impl EngineClient for GrpcEngineClient {
    async fn setup(&mut self) -> Result<(), EngineError> {
        self.inner.setup_game(SetupGameRequest {}).await?;
        Ok(())
    }

    async fn start(&mut self) -> Result<(), EngineError> {
        self.inner.start_game(StartGameRequest {}).await?;
        Ok(())
    }

    async fn advance(&mut self, direction: Direction) -> Result<FieldSnapshot, EngineError> {
        let request = UpdateSnakeRequest {
            direction: proto::Direction::from(direction) as i32,
        };
        let response = self.inner.update_snake(request).await?.into_inner();
        Ok(FieldSnapshot::try_from(response)?)
    }

    async fn fetch_phase(&mut self) -> Result<GamePhase, EngineError> {
        let response = self.inner.return_game_state(GameStateRequest {}).await?.into_inner();
        Ok(response.phase.parse::<GamePhase>()?)
    }

    async fn fetch_score(&mut self) -> Result<u32, EngineError> {
        let response = self.inner.return_score(ScoreRequest {}).await?.into_inner();
        Ok(response.score)
    }

    async fn fetch_initial_field(&mut self) -> Result<FieldSnapshot, EngineError> {
        let response = self
            .inner
            .initialize_field(InitializeFieldRequest {})
            .await?
            .into_inner();
        Ok(FieldSnapshot::try_from(response)?)
    }
}
