//! Othello Server
//!
//! WebSocket server for browser Othello games against an alpha-beta bot.
//! Keeps one authoritative game per session and streams only what changed
//! after every human or bot move.

mod config;
mod game;
mod server;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::{Settings, CONFIG_FILE};
use game::{AlphaBetaBot, Engine, OthelloEngine};
use server::{ConnectionHandler, ServerConfig, WebSocketServer};
use session::{SessionStore, TurnOrchestrator};

/// Othello Server
///
/// Human vs. bot Othello over WebSocket
#[derive(Parser, Debug)]
#[command(name = "othello-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Bind address
    #[arg(long)]
    bind: Option<String>,

    /// Path to the settings file
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Bot search depth in plies
    #[arg(long)]
    depth: Option<usize>,
}

impl Args {
    /// Apply command line overrides on top of file settings
    fn apply(&self, settings: &mut Settings) {
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(bind) = &self.bind {
            settings.server.bind = bind.clone();
        }
        if let Some(depth) = self.depth {
            settings.bot.depth = depth;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging; RUST_LOG takes precedence over --verbose
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Othello Server v{}", env!("CARGO_PKG_VERSION"));

    if !args.config.exists() {
        info!("No config file at {}, using defaults", args.config.display());
    }
    let mut settings = Settings::load(&args.config)?;
    args.apply(&mut settings);
    settings.validate()?;

    // Wire the session layer
    let engine: Arc<dyn Engine> = Arc::new(OthelloEngine::new());
    let bot = AlphaBetaBot::new(settings.bot.depth).with_randomize(settings.bot.randomize);
    info!(
        "Bot depth {}, randomize {}, intent timeout {:?}",
        bot.depth(),
        settings.bot.randomize,
        settings.intent_timeout()
    );
    let store = Arc::new(
        SessionStore::new(Arc::clone(&engine)).with_intent_timeout(settings.intent_timeout()),
    );
    let orchestrator = Arc::new(TurnOrchestrator::new(engine, Arc::new(bot)));
    let handler = Arc::new(ConnectionHandler::new(store, orchestrator));

    // Create and start the WebSocket server
    let config = ServerConfig::new(settings.server.bind, settings.server.port);
    let server = Arc::new(WebSocketServer::new(config, handler));
    let server_handle = Arc::clone(&server);

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Initiating graceful shutdown...");
        server_handle.shutdown();
    });

    // Run the server
    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }
}
