//! Error types untuk capring.
//!
//! Hanya kegagalan saat konstruksi (config tidak valid, alokasi arena gagal)
//! yang muncul sebagai `Result`. Pelanggaran kontrak di hot path
//! (record terlalu besar, claim saat kosong, publish saat penuh) adalah panic.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building a queue or loading its configuration.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Slot count must be a power of two with room for the two-slot margin.
    #[error("slot count {0} must be a power of two and at least 4")]
    InvalidSlotCount(usize),

    /// Maximum record size outside the supported range.
    #[error("max record size {0} must be between 1 and {limit} bytes", limit = crate::protocol::MAX_RECORD_LIMIT)]
    InvalidMaxRecord(usize),

    /// Arena size is not usable with the configured maximum record size.
    #[error("arena of {arena_bytes} bytes {reason}")]
    InvalidArena {
        /// Requested arena size.
        arena_bytes: usize,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Byte budget does not leave room for one maximal record below the arena size.
    #[error(
        "byte budget {budget} must be > 0 and leave {padded_max} bytes below the {arena_bytes}-byte arena"
    )]
    InvalidByteBudget {
        /// Requested budget.
        budget: usize,
        /// Padded size of one maximal record.
        padded_max: usize,
        /// Arena size.
        arena_bytes: usize,
    },

    /// Anonymous mapping for the arena could not be created.
    #[error("failed to map {bytes}-byte arena: {source}")]
    ArenaMap {
        /// Total mapping size including slack.
        bytes: usize,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Slot array could not be allocated.
    #[error("failed to allocate {slots} slots: {source}")]
    SlotAlloc {
        /// Requested slot count.
        slots: usize,
        /// Allocator error.
        #[source]
        source: std::collections::TryReserveError,
    },

    /// `mlock` on the arena failed.
    #[error("failed to lock arena in memory: {0}")]
    MemoryLock(#[source] io::Error),

    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML for the expected schema.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Harness thread could not be spawned.
    #[error("failed to spawn thread: {0}")]
    ThreadSpawn(#[source] io::Error),

    /// Wake signal (poll/waker) could not be created or polled.
    #[error("wake signal failed: {0}")]
    WakeSignal(#[source] io::Error),
}

/// Result type for queue construction and configuration.
pub type Result<T> = std::result::Result<T, QueueError>;
