mod engine_service;
mod game;
mod server_config;

use clap::Parser;
use tonic::transport::Server;

use common::proto::snake_engine_server::SnakeEngineServer;
use common::{log, logger};
use engine_service::EngineService;
use server_config::{get_config_manager, DEFAULT_CONFIG_FILE};

#[derive(Parser)]
#[command(name = "snake_engine_server")]
struct Args {
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    #[arg(long)]
    use_log_prefix: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let prefix = if args.use_log_prefix {
        Some("Engine".to_string())
    } else {
        None
    };
    logger::init_logger(prefix);

    let config = get_config_manager(&args.config).get_config()?;
    let addr = config.socket_addr()?;
    let field_size = config.field_size();

    let service = EngineService::new(field_size);

    log!(
        "Snake engine listening on {} ({}x{} board)",
        addr,
        field_size.width,
        field_size.height
    );

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            common::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        log!("Shutdown signal received");
    };

    Server::builder()
        .add_service(SnakeEngineServer::new(service))
        .serve_with_shutdown(addr, shutdown_signal)
        .await?;

    log!("Engine shut down gracefully");

    Ok(())
}
