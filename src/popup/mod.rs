//! Popup commands
//!
//! Trusted operations available only to the extension's own popup: unlocking,
//! confirming or dismissing a pending clear, importing and exporting the
//! persistent store.

mod commands;
mod error;
#[cfg(test)]
mod tests;

pub use commands::{ExportReport, ImportReport, Notice, NoticeLevel, PopupController};
pub use error::PopupError;
