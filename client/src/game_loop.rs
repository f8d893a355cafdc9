use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use common::{error, log, warn, Direction, GamePhase};

use crate::engine_client::{EngineClient, EngineError};
use crate::input_buffer::InputBuffer;
use crate::state::{Intent, ViewState};
use crate::tick_clock::TickClock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Another frame is scheduled.
    Rearm,
    /// Nothing is scheduled until the next start intent.
    Dormant,
}

/// Drives the remote engine at a fixed tick cadence and republishes what it
/// reports into the view.
///
/// Frames only run while the loop is armed. A frame that ends a run (Win or
/// Lose) or fails leaves the loop dormant; a start intent arms it again and
/// the next frame decides what to do from the last published phase:
///
/// * `Win`/`Lose`: fresh board, fresh run, default direction.
/// * `Starting`: ask the engine to start.
/// * `Ongoing`: advance one tick if the tick interval has elapsed.
/// * no phase yet (the mount failed): mount again, then wait for Play.
pub struct GameLoopController<E: EngineClient> {
    engine: E,
    input: InputBuffer,
    clock: TickClock,
    view: ViewState,
    phase: Option<GamePhase>,
    armed: bool,
}

impl<E: EngineClient> GameLoopController<E> {
    pub fn new(engine: E, view: ViewState, tick_interval: Duration) -> Self {
        Self {
            engine,
            input: InputBuffer::new(),
            clock: TickClock::new(tick_interval, Instant::now()),
            view,
            phase: None,
            armed: false,
        }
    }

    pub fn phase(&self) -> Option<GamePhase> {
        self.phase
    }

    pub fn direction(&self) -> Direction {
        self.input.current()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn on_key(&mut self, key: &str) {
        self.input.on_key(key);
    }

    /// Arms the loop. Returns `false` if it was already running, in which case
    /// the intent is dropped so no second start/setup chain is issued.
    pub fn request_start(&mut self) -> bool {
        if self.armed {
            return false;
        }
        self.armed = true;
        self.view.clear_error();
        true
    }

    /// Mounts, or records why it failed so the next start intent retries it.
    pub async fn try_mount(&mut self, now: Instant) -> bool {
        match self.mount(now).await {
            Ok(()) => true,
            Err(e) => {
                error!("Mount failed: {}", e);
                self.view.set_error(e.to_string());
                false
            }
        }
    }

    /// Brings up a fresh board and publishes the engine's initial state.
    pub async fn mount(&mut self, now: Instant) -> Result<(), EngineError> {
        self.engine.setup().await?;
        let phase = self.engine.fetch_phase().await?;
        let field = self.engine.fetch_initial_field().await?;

        self.view.publish(field, phase);
        self.phase = Some(phase);
        self.clock.anchor(now);
        log!(
            "Mounted in phase {}, ticking every {} ms",
            phase,
            self.clock.tick_interval().as_millis()
        );
        Ok(())
    }

    pub async fn on_frame(&mut self, now: Instant) -> Result<FrameOutcome, EngineError> {
        if !self.armed {
            return Ok(FrameOutcome::Dormant);
        }

        match self.step(now).await {
            Ok(outcome) => {
                self.armed = outcome == FrameOutcome::Rearm;
                Ok(outcome)
            }
            Err(EngineError::UnknownPhase(phase)) if self.phase.is_some() => {
                warn!("Engine reported unknown phase {:?}, waiting for the next frame", phase);
                Ok(FrameOutcome::Rearm)
            }
            Err(e) => {
                self.armed = false;
                self.view.set_error(e.to_string());
                Err(e)
            }
        }
    }

    async fn step(&mut self, now: Instant) -> Result<FrameOutcome, EngineError> {
        match self.phase {
            Some(GamePhase::Win | GamePhase::Lose) => self.restart(now).await,
            Some(GamePhase::Starting) => self.begin(now).await,
            Some(GamePhase::Ongoing) => self.tick(now).await,
            None => {
                self.mount(now).await?;
                Ok(FrameOutcome::Dormant)
            }
        }
    }

    async fn restart(&mut self, now: Instant) -> Result<FrameOutcome, EngineError> {
        self.engine.setup().await?;
        self.engine.start().await?;
        let phase = self.engine.fetch_phase().await?;
        let field = self.engine.fetch_initial_field().await?;

        self.input.reset();
        self.view.publish_new_run(field, phase);
        self.phase = Some(phase);
        self.clock.anchor(now);
        log!("New run started, phase {}, heading {}", phase, self.direction());
        Ok(FrameOutcome::Rearm)
    }

    async fn begin(&mut self, now: Instant) -> Result<FrameOutcome, EngineError> {
        self.engine.start().await?;
        let phase = self.engine.fetch_phase().await?;

        self.view.publish_phase(phase);
        self.phase = Some(phase);
        self.clock.anchor(now);
        log!("Run started, phase {}", phase);
        Ok(FrameOutcome::Rearm)
    }

    async fn tick(&mut self, now: Instant) -> Result<FrameOutcome, EngineError> {
        if !self.clock.try_tick(now) {
            return Ok(FrameOutcome::Rearm);
        }

        let field = self.engine.advance(self.input.current()).await?;
        let phase = self.engine.fetch_phase().await?;

        self.view.publish(field, phase);
        if self.phase.replace(phase) != Some(phase) {
            log!("Phase changed to {}", phase);
        }

        if phase.is_finished() {
            let score = self.engine.fetch_score().await?;
            self.view.publish_score(score);
            log!("Run over: {} with score {}", phase, score);
        }

        if phase == GamePhase::Ongoing {
            Ok(FrameOutcome::Rearm)
        } else {
            Ok(FrameOutcome::Dormant)
        }
    }
}

/// Runs the loop on a thread of its own. The thread is not joined, so a frame
/// stuck in an engine call never holds up process exit.
pub fn spawn_detached<E: EngineClient + 'static>(
    runtime: tokio::runtime::Runtime,
    controller: GameLoopController<E>,
    intents: mpsc::UnboundedReceiver<Intent>,
    frame_interval: Duration,
) {
    std::thread::spawn(move || {
        runtime.block_on(run(controller, intents, frame_interval));
    });
}

/// Mounts the controller, then multiplexes intents and display frames until a
/// quit intent arrives or every intent sender is gone. A failed mount is
/// reported on the view and retried by the next start intent.
///
/// A frame's engine calls are awaited before anything else is looked at, so
/// there is never more than one chain in flight. Keys pressed meanwhile wait
/// in the channel and are applied before the next frame.
pub async fn run<E: EngineClient>(
    mut controller: GameLoopController<E>,
    mut intents: mpsc::UnboundedReceiver<Intent>,
    frame_interval: Duration,
) {
    controller.try_mount(Instant::now()).await;

    let mut frames = tokio::time::interval(frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            intent = intents.recv() => match intent {
                Some(Intent::Key(key)) => controller.on_key(&key),
                Some(Intent::Start) => {
                    if controller.request_start() {
                        log!("Start requested in phase {:?}", controller.phase());
                    }
                }
                Some(Intent::Quit) | None => {
                    log!("Quit requested, leaving game loop");
                    break;
                }
            },
            // The interval hands back missed deadlines after a dormant spell,
            // so the frame is stamped with the current time instead.
            _ = frames.tick(), if controller.is_armed() => {
                if let Err(e) = controller.on_frame(Instant::now()).await {
                    error!("Game loop halted: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CellTag, FieldSnapshot};
    use std::sync::{Arc, Mutex};

    const TICK: Duration = Duration::from_millis(75);

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Call {
        Setup,
        Start,
        Advance(Direction),
        FetchPhase,
        FetchScore,
        FetchInitialField,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum CallKind {
        Setup,
        Start,
        Advance,
        FetchPhase,
    }

    struct EngineScript {
        calls: Vec<Call>,
        phase: GamePhase,
        boards_created: u32,
        advances_this_run: usize,
        lose_after: Option<usize>,
        score: u32,
        unknown_phase: Option<String>,
        fail_next: Option<CallKind>,
        hang_setup: bool,
    }

    impl EngineScript {
        fn board(&self) -> FieldSnapshot {
            let mut field = FieldSnapshot::filled(5, 5, CellTag::Empty).rows().to_vec();
            field[0][self.advances_this_run % 5] = CellTag::Head;
            field[4][4] = CellTag::Food;
            FieldSnapshot::new(field)
        }

        fn check_failure(&mut self, kind: CallKind) -> Result<(), EngineError> {
            if self.fail_next == Some(kind) {
                self.fail_next = None;
                return Err(tonic::Status::unavailable("engine down").into());
            }
            Ok(())
        }
    }

    #[derive(Clone)]
    struct FakeEngine {
        script: Arc<Mutex<EngineScript>>,
    }

    impl FakeEngine {
        fn new() -> Self {
            Self {
                script: Arc::new(Mutex::new(EngineScript {
                    calls: Vec::new(),
                    phase: GamePhase::Starting,
                    boards_created: 0,
                    advances_this_run: 0,
                    lose_after: None,
                    score: 0,
                    unknown_phase: None,
                    fail_next: None,
                    hang_setup: false,
                })),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.script.lock().unwrap().calls.clone()
        }

        fn clear_calls(&self) {
            self.script.lock().unwrap().calls.clear();
        }

        fn advances(&self) -> Vec<Direction> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    Call::Advance(direction) => Some(direction),
                    _ => None,
                })
                .collect()
        }

        fn lose_after(&self, advances: usize, score: u32) {
            let mut script = self.script.lock().unwrap();
            script.lose_after = Some(advances);
            script.score = score;
        }

        fn fail_next(&self, kind: CallKind) {
            self.script.lock().unwrap().fail_next = Some(kind);
        }

        fn report_unknown_phase(&self, phase: Option<&str>) {
            self.script.lock().unwrap().unknown_phase = phase.map(str::to_string);
        }

        fn hang_setup(&self) {
            self.script.lock().unwrap().hang_setup = true;
        }

        fn boards_created(&self) -> u32 {
            self.script.lock().unwrap().boards_created
        }
    }

    impl EngineClient for FakeEngine {
        async fn setup(&mut self) -> Result<(), EngineError> {
            let hang = {
                let mut script = self.script.lock().unwrap();
                script.calls.push(Call::Setup);
                script.hang_setup
            };
            if hang {
                std::future::pending::<()>().await;
            }
            let mut script = self.script.lock().unwrap();
            script.check_failure(CallKind::Setup)?;
            script.phase = GamePhase::Starting;
            script.boards_created += 1;
            script.advances_this_run = 0;
            Ok(())
        }

        async fn start(&mut self) -> Result<(), EngineError> {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::Start);
            script.check_failure(CallKind::Start)?;
            script.phase = GamePhase::Ongoing;
            Ok(())
        }

        async fn advance(&mut self, direction: Direction) -> Result<FieldSnapshot, EngineError> {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::Advance(direction));
            script.check_failure(CallKind::Advance)?;
            if script.phase == GamePhase::Ongoing {
                script.advances_this_run += 1;
                if script.lose_after.is_some_and(|n| script.advances_this_run >= n) {
                    script.phase = GamePhase::Lose;
                }
            }
            Ok(script.board())
        }

        async fn fetch_phase(&mut self) -> Result<GamePhase, EngineError> {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::FetchPhase);
            script.check_failure(CallKind::FetchPhase)?;
            if let Some(phase) = script.unknown_phase.clone() {
                return Err(EngineError::UnknownPhase(phase));
            }
            Ok(script.phase)
        }

        async fn fetch_score(&mut self) -> Result<u32, EngineError> {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::FetchScore);
            Ok(script.score)
        }

        async fn fetch_initial_field(&mut self) -> Result<FieldSnapshot, EngineError> {
            let mut script = self.script.lock().unwrap();
            script.calls.push(Call::FetchInitialField);
            Ok(script.board())
        }
    }

    fn ms(t0: Instant, millis: u64) -> Instant {
        t0 + Duration::from_millis(millis)
    }

    async fn mounted() -> (GameLoopController<FakeEngine>, FakeEngine, ViewState, Instant) {
        let engine = FakeEngine::new();
        let view = ViewState::new();
        let mut controller = GameLoopController::new(engine.clone(), view.clone(), TICK);
        let t0 = Instant::now();
        controller.mount(t0).await.unwrap();
        (controller, engine, view, t0)
    }

    /// Mounted, started, and the start frame already processed at `t0`.
    async fn running() -> (GameLoopController<FakeEngine>, FakeEngine, ViewState, Instant) {
        let (mut controller, engine, view, t0) = mounted().await;
        assert!(controller.request_start());
        assert_eq!(controller.on_frame(t0).await.unwrap(), FrameOutcome::Rearm);
        engine.clear_calls();
        (controller, engine, view, t0)
    }

    #[tokio::test]
    async fn test_mount_publishes_initial_board() {
        let (controller, engine, view, _) = mounted().await;

        assert_eq!(
            engine.calls(),
            vec![Call::Setup, Call::FetchPhase, Call::FetchInitialField]
        );
        let snapshot = view.snapshot();
        assert_eq!(snapshot.phase, Some(GamePhase::Starting));
        assert_eq!(snapshot.field.width(), 5);
        assert_eq!(snapshot.field.cell(0, 0), Some(CellTag::Head));
        assert!(!controller.is_armed());
    }

    #[tokio::test]
    async fn test_frames_are_ignored_until_start_intent() {
        let (mut controller, engine, _, t0) = mounted().await;
        engine.clear_calls();

        assert_eq!(controller.on_frame(ms(t0, 500)).await.unwrap(), FrameOutcome::Dormant);
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_first_frame_after_start_starts_the_engine() {
        let (mut controller, engine, view, t0) = mounted().await;
        engine.clear_calls();

        controller.request_start();
        controller.on_frame(t0).await.unwrap();

        assert_eq!(engine.calls(), vec![Call::Start, Call::FetchPhase]);
        assert_eq!(view.snapshot().phase, Some(GamePhase::Ongoing));
        assert_eq!(controller.phase(), Some(GamePhase::Ongoing));
        assert!(controller.is_armed());
    }

    #[tokio::test]
    async fn test_frames_inside_tick_window_do_not_advance() {
        let (mut controller, engine, view, t0) = running().await;
        let before = view.snapshot().field;

        for millis in [1, 16, 33, 50, 66, 74] {
            let outcome = controller.on_frame(ms(t0, millis)).await.unwrap();
            assert_eq!(outcome, FrameOutcome::Rearm);
        }

        assert!(engine.calls().is_empty());
        assert_eq!(*view.snapshot().field, *before);
    }

    #[tokio::test]
    async fn test_one_advance_per_tick_window() {
        let (mut controller, engine, _, t0) = running().await;

        for millis in (5..=300).step_by(5) {
            controller.on_frame(ms(t0, millis)).await.unwrap();
        }

        assert_eq!(engine.advances().len(), 4);
    }

    #[tokio::test]
    async fn test_tick_publishes_new_field_and_phase() {
        let (mut controller, engine, view, t0) = running().await;

        controller.on_frame(ms(t0, 75)).await.unwrap();

        assert_eq!(
            engine.calls(),
            vec![Call::Advance(Direction::Down), Call::FetchPhase]
        );
        let snapshot = view.snapshot();
        assert_eq!(snapshot.phase, Some(GamePhase::Ongoing));
        assert_eq!(snapshot.field.cell(1, 0), Some(CellTag::Head));
    }

    #[tokio::test]
    async fn test_last_key_before_tick_wins() {
        let (mut controller, engine, _, t0) = running().await;

        controller.on_key("w");
        controller.on_frame(ms(t0, 40)).await.unwrap();
        controller.on_key("a");
        controller.on_frame(ms(t0, 75)).await.unwrap();

        assert_eq!(engine.advances(), vec![Direction::Left]);
    }

    #[tokio::test]
    async fn test_unrecognized_keys_keep_direction() {
        let (mut controller, engine, _, t0) = running().await;

        controller.on_key("q");
        controller.on_key("Enter");
        controller.on_frame(ms(t0, 75)).await.unwrap();

        assert_eq!(engine.advances(), vec![Direction::Down]);
    }

    #[tokio::test]
    async fn test_loss_fetches_score_and_stops_ticking() {
        let (mut controller, engine, view, t0) = running().await;
        engine.lose_after(3, 7);

        let mut last = FrameOutcome::Rearm;
        for millis in (16..=400).step_by(16) {
            last = controller.on_frame(ms(t0, millis)).await.unwrap();
        }

        assert_eq!(last, FrameOutcome::Dormant);
        assert_eq!(engine.advances(), vec![Direction::Down; 3]);
        assert!(engine.calls().contains(&Call::FetchScore));
        assert!(!controller.is_armed());

        let snapshot = view.snapshot();
        assert_eq!(snapshot.phase, Some(GamePhase::Lose));
        assert_eq!(snapshot.score, 7);
    }

    #[tokio::test]
    async fn test_end_to_end_run_until_loss() {
        let (mut controller, engine, view, t0) = mounted().await;
        engine.lose_after(2, 1);

        assert_eq!(view.snapshot().phase, Some(GamePhase::Starting));
        controller.request_start();

        let mut now = t0;
        while controller.is_armed() {
            controller.on_frame(now).await.unwrap();
            now += Duration::from_millis(16);
        }

        assert_eq!(
            engine.calls(),
            vec![
                Call::Setup,
                Call::FetchPhase,
                Call::FetchInitialField,
                Call::Start,
                Call::FetchPhase,
                Call::Advance(Direction::Down),
                Call::FetchPhase,
                Call::Advance(Direction::Down),
                Call::FetchPhase,
                Call::FetchScore,
            ]
        );
        assert_eq!(view.snapshot().phase, Some(GamePhase::Lose));
        assert_eq!(view.snapshot().score, 1);
    }

    #[tokio::test]
    async fn test_restart_resets_direction_score_and_board() {
        let (mut controller, engine, view, t0) = running().await;
        engine.lose_after(1, 3);

        controller.on_key("d");
        controller.on_frame(ms(t0, 75)).await.unwrap();
        assert_eq!(view.snapshot().phase, Some(GamePhase::Lose));
        assert_eq!(controller.direction(), Direction::Right);
        engine.clear_calls();

        assert!(controller.request_start());
        controller.on_frame(ms(t0, 200)).await.unwrap();

        assert_eq!(
            engine.calls(),
            vec![Call::Setup, Call::Start, Call::FetchPhase, Call::FetchInitialField]
        );
        assert_eq!(controller.direction(), Direction::Down);
        let snapshot = view.snapshot();
        assert_eq!(snapshot.phase, Some(GamePhase::Ongoing));
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.field.cell(0, 0), Some(CellTag::Head));

        engine.clear_calls();
        controller.on_frame(ms(t0, 275)).await.unwrap();
        assert_eq!(engine.advances(), vec![Direction::Down]);
    }

    #[tokio::test]
    async fn test_consecutive_restarts_get_fresh_boards() {
        let (mut controller, engine, view, t0) = running().await;
        engine.lose_after(2, 0);
        let boards_before = engine.boards_created();
        let mut now = t0;

        let mut fresh_boards = Vec::new();
        for _ in 0..2 {
            while controller.is_armed() {
                now += Duration::from_millis(16);
                controller.on_frame(now).await.unwrap();
            }
            assert_eq!(view.snapshot().phase, Some(GamePhase::Lose));

            controller.request_start();
            now += Duration::from_millis(16);
            controller.on_frame(now).await.unwrap();
            fresh_boards.push(view.snapshot().field);
        }

        assert_eq!(engine.boards_created(), boards_before + 2);
        assert_eq!(*fresh_boards[0], *fresh_boards[1]);
        assert_eq!(fresh_boards[0].cell(0, 0), Some(CellTag::Head));
    }

    #[tokio::test]
    async fn test_failed_advance_halts_without_touching_view() {
        let (mut controller, engine, view, t0) = running().await;
        let before = view.snapshot();
        engine.fail_next(CallKind::Advance);

        let result = controller.on_frame(ms(t0, 75)).await;

        assert!(matches!(result, Err(EngineError::Status(_))));
        assert!(!controller.is_armed());
        let after = view.snapshot();
        assert_eq!(after.phase, before.phase);
        assert_eq!(*after.field, *before.field);
        assert!(after.error.is_some());

        engine.clear_calls();
        assert_eq!(controller.on_frame(ms(t0, 500)).await.unwrap(), FrameOutcome::Dormant);
        assert!(engine.calls().is_empty());
    }

    #[tokio::test]
    async fn test_start_intent_recovers_after_failure() {
        let (mut controller, engine, view, t0) = running().await;
        engine.fail_next(CallKind::FetchPhase);
        assert!(controller.on_frame(ms(t0, 75)).await.is_err());

        assert!(controller.request_start());
        assert_eq!(view.snapshot().error, None);
        controller.on_frame(ms(t0, 150)).await.unwrap();

        assert_eq!(engine.advances().len(), 2);
        assert_eq!(view.snapshot().phase, Some(GamePhase::Ongoing));
        assert!(controller.is_armed());
    }

    #[tokio::test]
    async fn test_failed_start_keeps_starting_phase() {
        let (mut controller, engine, view, t0) = mounted().await;
        engine.fail_next(CallKind::Start);

        controller.request_start();
        assert!(controller.on_frame(t0).await.is_err());

        assert_eq!(controller.phase(), Some(GamePhase::Starting));
        assert_eq!(view.snapshot().phase, Some(GamePhase::Starting));
        assert!(!controller.is_armed());
    }

    #[tokio::test]
    async fn test_unknown_phase_is_passthrough() {
        let (mut controller, engine, view, t0) = running().await;
        let before = view.snapshot();
        engine.report_unknown_phase(Some("Paused"));

        let outcome = controller.on_frame(ms(t0, 75)).await.unwrap();

        assert_eq!(outcome, FrameOutcome::Rearm);
        assert!(controller.is_armed());
        assert_eq!(controller.phase(), Some(GamePhase::Ongoing));
        assert_eq!(*view.snapshot().field, *before.field);
        assert_eq!(view.snapshot().error, None);

        engine.report_unknown_phase(None);
        controller.on_frame(ms(t0, 150)).await.unwrap();
        assert_eq!(engine.advances().len(), 2);
    }

    #[tokio::test]
    async fn test_start_intent_while_armed_is_dropped() {
        let (mut controller, _, _, _) = running().await;
        assert!(!controller.request_start());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_on_cadence_until_quit() {
        let engine = FakeEngine::new();
        let view = ViewState::new();
        let controller = GameLoopController::new(engine.clone(), view.clone(), TICK);
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(run(controller, rx, Duration::from_millis(16)));
        tx.send(Intent::Key("a".to_string())).unwrap();
        tx.send(Intent::Start).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        tx.send(Intent::Quit).unwrap();
        handle.await.unwrap();

        let advances = engine.advances();
        assert!((3..=6).contains(&advances.len()), "advances: {:?}", advances);
        assert!(advances.iter().all(|d| *d == Direction::Left));
        assert_eq!(view.snapshot().phase, Some(GamePhase::Ongoing));

        let calls_after_quit = engine.calls().len();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(engine.calls().len(), calls_after_quit);
    }

    #[tokio::test]
    async fn test_restart_never_shows_old_score_with_new_board() {
        let (mut controller, engine, view, t0) = running().await;
        engine.lose_after(1, 5);
        controller.on_frame(ms(t0, 75)).await.unwrap();
        assert_eq!(view.snapshot().score, 5);

        controller.request_start();
        controller.on_frame(ms(t0, 100)).await.unwrap();

        let snapshot = view.snapshot();
        assert_eq!(snapshot.phase, Some(GamePhase::Ongoing));
        assert_eq!(snapshot.score, 0);
    }

    #[tokio::test]
    async fn test_failed_mount_is_retried_on_start() {
        let engine = FakeEngine::new();
        let view = ViewState::new();
        let mut controller = GameLoopController::new(engine.clone(), view.clone(), TICK);
        let t0 = Instant::now();
        engine.fail_next(CallKind::Setup);

        assert!(!controller.try_mount(t0).await);
        assert_eq!(controller.phase(), None);
        assert!(view.snapshot().error.is_some());

        assert!(controller.request_start());
        let outcome = controller.on_frame(ms(t0, 16)).await.unwrap();

        assert_eq!(outcome, FrameOutcome::Dormant);
        assert!(!controller.is_armed());
        assert_eq!(controller.phase(), Some(GamePhase::Starting));
        assert_eq!(view.snapshot().phase, Some(GamePhase::Starting));
        assert_eq!(view.snapshot().error, None);
        assert_eq!(
            engine.calls(),
            vec![Call::Setup, Call::Setup, Call::FetchPhase, Call::FetchInitialField]
        );
    }

    #[tokio::test]
    async fn test_unknown_phase_during_mount_halts_instead_of_spinning() {
        let engine = FakeEngine::new();
        let view = ViewState::new();
        let mut controller = GameLoopController::new(engine.clone(), view.clone(), TICK);
        let t0 = Instant::now();
        engine.report_unknown_phase(Some("Paused"));

        assert!(!controller.try_mount(t0).await);
        controller.request_start();
        assert!(controller.on_frame(ms(t0, 16)).await.is_err());

        assert!(!controller.is_armed());
        assert_eq!(controller.phase(), None);
        assert!(view.snapshot().error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_start_waits_a_full_tick_before_advancing() {
        let engine = FakeEngine::new();
        let view = ViewState::new();
        let controller = GameLoopController::new(engine.clone(), view.clone(), TICK);
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(run(controller, rx, Duration::from_millis(16)));
        tokio::time::sleep(Duration::from_secs(5)).await;
        tx.send(Intent::Start).unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(view.snapshot().phase, Some(GamePhase::Ongoing));
        assert!(engine.advances().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.advances().len(), 1);

        tx.send(Intent::Quit).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_failed_mount() {
        let engine = FakeEngine::new();
        engine.fail_next(CallKind::Setup);
        let view = ViewState::new();
        let controller = GameLoopController::new(engine.clone(), view.clone(), TICK);
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(run(controller, rx, Duration::from_millis(16)));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        assert_eq!(view.snapshot().phase, None);
        assert!(view.snapshot().error.is_some());

        tx.send(Intent::Start).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(view.snapshot().phase, Some(GamePhase::Starting));

        tx.send(Intent::Start).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(view.snapshot().phase, Some(GamePhase::Ongoing));

        tx.send(Intent::Quit).unwrap();
        handle.await.unwrap();
    }

    #[test]
    fn test_detached_loop_does_not_block_caller_on_hung_engine() {
        let engine = FakeEngine::new();
        engine.hang_setup();
        let view = ViewState::new();
        let controller = GameLoopController::new(engine.clone(), view.clone(), TICK);
        let (tx, rx) = mpsc::unbounded_channel();
        let runtime = tokio::runtime::Runtime::new().unwrap();

        spawn_detached(runtime, controller, rx, Duration::from_millis(16));
        tx.send(Intent::Quit).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while engine.calls().is_empty() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(engine.calls(), vec![Call::Setup]);
        assert_eq!(view.snapshot().phase, None);
    }
}
