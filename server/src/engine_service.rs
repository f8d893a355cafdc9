use std::sync::Arc;
use tokio::sync::Mutex;
use tonic::{Request, Response, Status};

use common::proto::snake_engine_server::SnakeEngine;
use common::proto::{
    Direction as ProtoDirection, FieldResponse, GameStateRequest, GameStateResponse,
    InitializeFieldRequest, ScoreRequest, ScoreResponse, SetupGameRequest, SetupGameResponse,
    StartGameRequest, StartGameResponse, UpdateSnakeRequest,
};
use common::{log, Direction, GamePhase};

use crate::game::{FieldSize, GameState};

/// Serves the one authoritative game behind the gRPC boundary. All calls
/// serialize on the state lock, so one tick is applied per `UpdateSnake`.
#[derive(Clone)]
pub struct EngineService {
    game: Arc<Mutex<GameState>>,
}

impl EngineService {
    pub fn new(field_size: FieldSize) -> Self {
        Self::from_state(GameState::new(field_size))
    }

    pub fn from_state(state: GameState) -> Self {
        Self {
            game: Arc::new(Mutex::new(state)),
        }
    }
}

#[tonic::async_trait]
impl SnakeEngine for EngineService {
    async fn setup_game(
        &self,
        _request: Request<SetupGameRequest>,
    ) -> Result<Response<SetupGameResponse>, Status> {
        self.game.lock().await.setup();
        log!("Board set up");
        Ok(Response::new(SetupGameResponse {}))
    }

    async fn start_game(
        &self,
        _request: Request<StartGameRequest>,
    ) -> Result<Response<StartGameResponse>, Status> {
        self.game.lock().await.start();
        log!("Game started");
        Ok(Response::new(StartGameResponse {}))
    }

    async fn update_snake(
        &self,
        request: Request<UpdateSnakeRequest>,
    ) -> Result<Response<FieldResponse>, Status> {
        let proto_direction = ProtoDirection::try_from(request.into_inner().direction)
            .map_err(|_| Status::invalid_argument("unknown direction value"))?;
        let direction = Direction::try_from(proto_direction).map_err(Status::invalid_argument)?;

        let mut game = self.game.lock().await;
        let was_ongoing = game.phase() == GamePhase::Ongoing;
        game.update(direction);
        if was_ongoing && game.phase().is_finished() {
            log!(
                "Game over: {} with score {}, length {}, cause {:?}",
                game.phase(),
                game.score(),
                game.snake_length(),
                game.death_reason()
            );
        }
        Ok(Response::new(game.render().to_proto()))
    }

    async fn return_game_state(
        &self,
        _request: Request<GameStateRequest>,
    ) -> Result<Response<GameStateResponse>, Status> {
        let phase = self.game.lock().await.phase();
        Ok(Response::new(GameStateResponse {
            phase: phase.as_str().to_string(),
        }))
    }

    async fn return_score(
        &self,
        _request: Request<ScoreRequest>,
    ) -> Result<Response<ScoreResponse>, Status> {
        let score = self.game.lock().await.score();
        Ok(Response::new(ScoreResponse { score }))
    }

    async fn initialize_field(
        &self,
        _request: Request<InitializeFieldRequest>,
    ) -> Result<Response<FieldResponse>, Status> {
        let field = self.game.lock().await.render();
        Ok(Response::new(field.to_proto()))
    }
}
