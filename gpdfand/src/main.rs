//! gpdfan daemon
//!
//! Drives the fan of a GPD handheld through its embedded controller and
//! exposes the fan channel over a small REST API.
//!
//! # Board selection
//!
//! `--board` wins over `[fan].board` in the config file, which wins over the
//! DMI identity in `/sys/class/dmi/id`. An unknown machine is a fatal error:
//! nothing is attached to an EC whose layout is not known.
//!
//! With `--mock` the EC is simulated in memory and DMI is not consulted
//! (the board defaults to `win_mini`).

mod api;
mod config;
mod shutdown;

use anyhow::{Context, Result};
use api::AppState;
use clap::Parser;
use gpdfan_core::{default_config_path, BoardDescriptor, BoardKind};
use gpdfan_hardware::{detect_board, DevPort, EcChannel, FanControl, PortIo, SimulatedEc};
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};

/// gpdfan API Server
#[derive(Parser, Debug)]
#[command(name = "gpdfand")]
#[command(version, about = "GPD handheld fan control daemon", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server bind address (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Simulate the embedded controller (run without hardware)
    #[arg(long)]
    mock: bool,

    /// Board override: win_mini, duo, win4 (win4_6800u) or wm2 (win_max_2)
    #[arg(long)]
    board: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.verbose);

    info!("gpdfan daemon starting...");

    // Config path: CLI flag > env var > default
    let config_path = args.config.clone().unwrap_or_else(|| {
        std::env::var("GPDFAN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_config_path())
    });
    info!("Configuration file: {}", config_path.display());

    let static_config = config::load(&config_path).await?;

    let bind = args
        .bind
        .clone()
        .unwrap_or_else(|| static_config.server.bind.clone());
    let port = args.port.unwrap_or(static_config.server.port);
    let bind_addr = format!("{}:{}", bind, port);

    let override_kind = config::board_override(args.board.as_deref(), &static_config);
    let board = match select_board(override_kind, args.mock) {
        Ok(board) => board,
        Err(e) => {
            error!("{}. Use --board to force a layout or --mock to run without hardware.", e);
            std::process::exit(1);
        }
    };

    let port_io = open_port(board, args.mock)?;
    let lock_timeout = static_config.fan.lock_timeout();
    let ec = EcChannel::new(port_io, board).with_lock_timeout(lock_timeout);
    let fan = FanControl::attach(board, ec).with_update_interval(static_config.fan.update_interval());

    let app_state = AppState::new(fan, args.mock, static_config.debug.registers, lock_timeout);
    let fan_for_shutdown = app_state.fan.clone();

    let app = api::create_router(app_state);

    info!("Starting server on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("gpdfan API Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown::restore_automatic(&fan_for_shutdown).await;
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolve the board; mock mode never reads DMI.
fn select_board(
    override_kind: Option<BoardKind>,
    mock: bool,
) -> gpdfan_core::Result<&'static BoardDescriptor> {
    if mock {
        let board = override_kind.unwrap_or(BoardKind::WinMini).descriptor();
        info!("Mock mode: simulating {}", board.kind);
        return Ok(board);
    }
    detect_board(override_kind)
}

/// Simulated EC for mock mode; no traffic log, so it can run indefinitely.
fn mock_ec(board: &BoardDescriptor) -> SimulatedEc {
    SimulatedEc::for_board(board).without_log()
}

/// Port transport for the selected board
fn open_port(board: &BoardDescriptor, mock: bool) -> Result<Box<dyn PortIo>> {
    if mock {
        return Ok(Box::new(mock_ec(board)));
    }

    let (first, last) = board.port_range();
    info!(
        "Using I/O ports 0x{:02X}-0x{:02X} via {}",
        first,
        last,
        DevPort::DEFAULT_PATH
    );

    let port = DevPort::open().with_context(|| {
        format!(
            "Failed to open {} (requires root or CAP_SYS_RAWIO)",
            DevPort::DEFAULT_PATH
        )
    })?;
    Ok(Box::new(port))
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        },
    }
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
