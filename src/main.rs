//! Storage bridge binary
//!
//! # Usage
//!
//! ```bash
//! # Defaults, or storage-bridge.json in the working directory
//! storage-bridge
//!
//! # Explicit config, overriding its port
//! storage-bridge bridge.json --port 20000
//! ```
//!
//! Popup commands are read from stdin, one per line.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use storage_bridge::config::{BridgeConfig, DEFAULT_CONFIG_FILE};
use storage_bridge::console::{self, ConsoleCommand};
use storage_bridge::error::AppError;
use storage_bridge::host::LockView;
use storage_bridge::logging::init_tracing;
use storage_bridge::popup::NoticeLevel;
use storage_bridge::AppState;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Lock-gated storage bridge
#[derive(Parser, Debug)]
#[command(name = "storage-bridge")]
#[command(version)]
struct Args {
    /// JSON configuration file
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the configured WebSocket port
    #[arg(short, long)]
    port: Option<u16>,
}

/// Tells the console user when the store locks itself
struct ConsoleView;

impl LockView for ConsoleView {
    fn show_locked(&self) {
        println!("[locked] run `unlock` to continue");
    }
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();
    let mut config = BridgeConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config.port = port;
    }

    init_tracing(&config.log_filter).map_err(AppError::Logging)?;
    tracing::info!("[App] Storage bridge starting");

    let state = AppState::build(config, Arc::new(ConsoleView)).await?;
    let addr = state.start_bridge().await?;
    println!("Listening on ws://{}", addr);
    println!("{}", console::HELP);

    // Surface page requests that need the popup
    let popup_requested = state.host.popup_requested();
    let popup_watch = tokio::spawn(async move {
        loop {
            popup_requested.notified().await;
            println!("[popup] a page needs you: `status` shows what it asked for");
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                let command = match ConsoleCommand::parse(&line) {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{}", message);
                        continue;
                    }
                };
                if command == ConsoleCommand::Quit {
                    break;
                }
                let notice = console::execute(&state.popup, command, &state.config.export_dir).await;
                let tag = match notice.level {
                    NoticeLevel::Success => "ok",
                    NoticeLevel::Warning => "warning",
                    NoticeLevel::Error => "error",
                };
                println!("[{}] {}", tag, notice.message);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("[App] Interrupted");
                break;
            }
        }
    }

    popup_watch.abort();
    state.shutdown().await?;
    tracing::info!("[App] Storage bridge stopped");
    Ok(())
}
