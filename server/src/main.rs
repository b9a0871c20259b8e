use arena_server::config::ServerConfig;
use arena_server::game_loop::{run_bots, run_game_loop, GameLoop};
use arena_server::state::World;
use arena_server::ws::{health_handler, ws_handler, AppState};
use axum::routing::get;
use axum::Router;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::from_env();

    // Validate configuration before starting
    if let Err(e) = config.validate() {
        eprintln!("Invalid server configuration: {}", e);
        std::process::exit(1);
    }

    let listen_addr = config.listen_addr.clone();
    let (world, command_rx) = World::new(config);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn game loop and bots
    let game = GameLoop::new(world.clone(), command_rx);
    let game_task = tokio::spawn(run_game_loop(game, shutdown_rx.clone()));
    let bot_task = tokio::spawn(run_bots(world.clone(), shutdown_rx));

    let app = Router::new()
        .route("/movement", get(ws_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(AppState { world });

    tracing::info!("Starting arena server on {}", listen_addr);

    let listener = match tokio::net::TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {}: {}", listen_addr, e);
            std::process::exit(1);
        }
    };

    let serve = axum::serve(listener, app).with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Shutdown requested");
    });
    if let Err(e) = serve.await {
        tracing::error!("Server error: {}", e);
    }

    let _ = shutdown_tx.send(true);
    let _ = game_task.await;
    let _ = bot_task.await;
}
