// src/storage/mod.rs
//!
//! Storage Gateway
//!
//! Key-value storage areas the bridge exposes. The persistent area backs the
//! page-visible store, the session area holds the lock flag and the popup
//! redirect intent.
//!

pub mod error;
pub mod file;
pub mod gateway;
pub mod memory;

pub use error::StorageError;
pub use file::FileStorage;
pub use gateway::{StorageChange, StorageGateway, StorageMap};
pub use memory::MemoryStorage;
