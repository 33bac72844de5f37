// src/console.rs
//!
//! Line-oriented stand-in for the popup window
//!
//! Each line is one popup command. Results come back as [`Notice`]s for the
//! binary to print.

use crate::popup::{Notice, NoticeLevel, PopupController, PopupError};
use crate::router::PopupRoute;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Unlock,
    Lock,
    Status,
    ConfirmClear,
    DismissClear,
    Import(PathBuf),
    Export(Option<PathBuf>),
    Help,
    Quit,
}

pub const HELP: &str = "commands: unlock | lock | status | confirm-clear | dismiss-clear | \
import <file> | export [dir] | help | quit";

impl ConsoleCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let argument = parts.next().map(PathBuf::from);

        let parsed = match command {
            "unlock" => ConsoleCommand::Unlock,
            "lock" => ConsoleCommand::Lock,
            "status" => ConsoleCommand::Status,
            "confirm-clear" => ConsoleCommand::ConfirmClear,
            "dismiss-clear" => ConsoleCommand::DismissClear,
            "import" => match argument {
                Some(path) => ConsoleCommand::Import(path),
                None => return Err("import needs a file path".to_string()),
            },
            "export" => ConsoleCommand::Export(argument),
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            "" => return Err(HELP.to_string()),
            other => return Err(format!("unknown command {:?}; {}", other, HELP)),
        };
        Ok(parsed)
    }
}

/// Run one command against the popup surface
pub async fn execute(
    popup: &PopupController,
    command: ConsoleCommand,
    export_dir: &Path,
) -> Notice {
    match run(popup, command, export_dir).await {
        Ok(notice) => notice,
        Err(e) => Notice {
            level: NoticeLevel::Error,
            message: e.to_string(),
        },
    }
}

async fn run(
    popup: &PopupController,
    command: ConsoleCommand,
    export_dir: &Path,
) -> Result<Notice, PopupError> {
    let notice = match command {
        ConsoleCommand::Unlock => {
            let deliveries = popup.unlock().await?;
            let delivered = deliveries.iter().filter(|d| d.is_delivered()).count();
            success(format!(
                "Unlocked, notified {} of {} clients",
                delivered,
                deliveries.len()
            ))
        }
        ConsoleCommand::Lock => {
            popup.lock().await?;
            success("Locked".to_string())
        }
        ConsoleCommand::Status => {
            let state = if popup.is_locked() { "locked" } else { "unlocked" };
            match popup.pending_route().await? {
                Some(PopupRoute::Clear) => Notice {
                    level: NoticeLevel::Warning,
                    message: format!("{}, a page asked to clear storage", state),
                },
                None => success(state.to_string()),
            }
        }
        ConsoleCommand::ConfirmClear => {
            popup.confirm_clear().await?;
            success("Storage cleared".to_string())
        }
        ConsoleCommand::DismissClear => {
            popup.dismiss_clear().await?;
            success("Clear request dismissed".to_string())
        }
        ConsoleCommand::Import(path) => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| PopupError::Io {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            popup.import_json(&text).await?.notice()
        }
        ConsoleCommand::Export(dir) => {
            let dir = dir.as_deref().unwrap_or(export_dir);
            popup.export_to(dir).await?.notice()
        }
        ConsoleCommand::Help => success(HELP.to_string()),
        ConsoleCommand::Quit => success("Bye".to_string()),
    };
    Ok(notice)
}

fn success(message: String) -> Notice {
    Notice {
        level: NoticeLevel::Success,
        message,
    }
}
