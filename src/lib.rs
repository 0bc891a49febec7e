//! capring - Lock-Free Record Queue untuk capture berkecepatan tinggi
//!
//! Arsitektur:
//! - Slot Ring: SPSC ring berisi referensi record (word offset)
//! - Byte Arena: circular buffer mmap untuk payload length-prefixed
//! - Backpressure: counter slot dan resident bytes untuk self-throttling producer
//! - No-Allocation: semua buffer pre-allocated saat init
//!
//! ```no_run
//! use capring::{QueueConfig, RecordQueue};
//!
//! let (mut producer, mut consumer) = RecordQueue::new(&QueueConfig::default())?.split();
//!
//! if producer.has_capacity() {
//!     producer.push(b"packet bytes");
//! }
//! while let Some(record) = consumer.try_claim() {
//!     assert_eq!(record.payload(), b"packet bytes");
//! }
//! # Ok::<(), capring::QueueError>(())
//! ```

pub mod capture;
pub mod config;
pub mod core;
pub mod error;
pub mod protocol;

pub use crate::config::{HarnessConfig, Limits, QueueConfig, SourceConfig};
pub use crate::core::{Backoff, Claimed, Consumer, Grant, Producer, QueueSnapshot, RecordQueue};
pub use crate::error::{QueueError, Result};
