//! Core module: Lock-Free Record Queue
//!
//! Prinsip desain:
//! - Lock-Free: Hanya atomic operations, tidak ada Mutex/RwLock
//! - No-Allocation: Ring dan arena pre-allocated saat init
//! - Zero-Copy: Consumer membaca payload langsung dari arena
//! - SPSC: Tepat satu `Producer` dan satu `Consumer` per queue

mod accounting;
mod arena;
mod queue;
mod slot_ring;

pub use accounting::Backoff;
pub use queue::{Claimed, Consumer, Grant, Producer, QueueSnapshot, RecordQueue};
pub use slot_ring::SlotRing;
