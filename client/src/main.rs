mod config;
mod engine_client;
mod game_loop;
mod input_buffer;
mod state;
mod tick_clock;
mod ui;

use clap::Parser;
use eframe::egui;
use tokio::sync::mpsc;

use common::{log, logger};
use config::{get_config_manager, DEFAULT_CONFIG_FILE};
use engine_client::GrpcEngineClient;
use game_loop::GameLoopController;
use state::ViewState;
use ui::SnakeApp;

#[derive(Parser)]
#[command(name = "snake_client")]
struct Args {
    /// Overrides `server.address` from the config file.
    #[arg(long)]
    server_address: Option<String>,

    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    #[arg(long)]
    use_log_prefix: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let prefix = if args.use_log_prefix {
        Some("Client".to_string())
    } else {
        None
    };
    logger::init_logger(prefix);

    let config = get_config_manager(&args.config).get_or_init_config()?;
    let server_address = args.server_address.unwrap_or(config.server.address);
    let tick_interval = config.timing.tick_interval();
    let frame_interval = config.timing.frame_interval();

    let view = ViewState::new();
    let (intent_tx, intent_rx) = mpsc::unbounded_channel();

    let runtime = tokio::runtime::Runtime::new()?;
    let engine = {
        let _guard = runtime.enter();
        GrpcEngineClient::connect_lazy(server_address.clone())?
    };
    log!("Engine client configured for {}", server_address);

    let controller = GameLoopController::new(engine, view.clone(), tick_interval);
    game_loop::spawn_detached(runtime, controller, intent_rx, frame_interval);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 720.0])
            .with_title("Snake"),
        ..Default::default()
    };

    eframe::run_native(
        "Snake",
        options,
        Box::new(|_cc| Ok(Box::new(SnakeApp::new(view, intent_tx)))),
    )?;

    log!("Client shut down");

    Ok(())
}
