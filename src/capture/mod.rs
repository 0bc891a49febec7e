//! Capture harness: kolaborator eksternal queue
//!
//! Record source, wake signal, timing/statistik, dan loop producer/consumer.
//! Core queue tidak bergantung pada modul ini; semua yang ada di sini bisa
//! diganti oleh aplikasi (misalnya source yang membaca NIC sungguhan).

mod pipeline;
mod source;
mod stats;
mod wake;

pub use pipeline::{run, run_consumer, run_producer, CaptureContext};
pub use source::{RecordSource, SequenceValidator, SyntheticSource};
pub use stats::{CaptureStats, RunReport, ThroughputMeter};
pub use wake::{wake_signal, Notifier, Waiter};
