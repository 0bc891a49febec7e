//! Statistik capture dan pelaporan throughput
//!
//! Timing source hanya dipakai untuk laporan; tidak mempengaruhi
//! correctness queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::info;

const MIB: f64 = 1024.0 * 1024.0;

/// Counter lock-free yang diisi producer dan consumer
#[derive(Debug, Default)]
pub struct CaptureStats {
    records_produced: AtomicU64,
    bytes_produced: AtomicU64,
    records_consumed: AtomicU64,
    bytes_consumed: AtomicU64,
    backoffs: AtomicU64,
    wakeups: AtomicU64,
    mismatches: AtomicU64,
    max_resident_bytes: AtomicU64,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn record_produced(&self, len: usize) {
        self.records_produced.fetch_add(1, Ordering::Relaxed);
        self.bytes_produced.fetch_add(len as u64, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_consumed(&self, len: usize) {
        self.records_consumed.fetch_add(1, Ordering::Relaxed);
        self.bytes_consumed.fetch_add(len as u64, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_backoff(&self) {
        self.backoffs.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_wakeup(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn record_mismatch(&self) {
        self.mismatches.fetch_add(1, Ordering::Relaxed);
    }

    /// Update max resident bytes. Hanya producer yang memanggil, jadi
    /// load + store cukup (tidak perlu CAS loop).
    #[inline(always)]
    pub fn observe_resident(&self, resident: usize) {
        let resident = resident as u64;
        if resident > self.max_resident_bytes.load(Ordering::Relaxed) {
            self.max_resident_bytes.store(resident, Ordering::Relaxed);
        }
    }

    pub fn records_produced(&self) -> u64 {
        self.records_produced.load(Ordering::Relaxed)
    }

    pub fn records_consumed(&self) -> u64 {
        self.records_consumed.load(Ordering::Relaxed)
    }

    pub fn bytes_produced(&self) -> u64 {
        self.bytes_produced.load(Ordering::Relaxed)
    }

    pub fn bytes_consumed(&self) -> u64 {
        self.bytes_consumed.load(Ordering::Relaxed)
    }

    pub fn backoffs(&self) -> u64 {
        self.backoffs.load(Ordering::Relaxed)
    }

    pub fn wakeups(&self) -> u64 {
        self.wakeups.load(Ordering::Relaxed)
    }

    pub fn mismatches(&self) -> u64 {
        self.mismatches.load(Ordering::Relaxed)
    }

    pub fn max_resident_bytes(&self) -> u64 {
        self.max_resident_bytes.load(Ordering::Relaxed)
    }
}

/// Log throughput setiap `every` record yang dikonsumsi
#[derive(Debug)]
pub struct ThroughputMeter {
    every: u64,
    next_report: u64,
    last_count: u64,
    last_time: Instant,
}

impl ThroughputMeter {
    pub fn new(every: u64) -> Self {
        Self {
            every,
            next_report: every,
            last_count: 0,
            last_time: Instant::now(),
        }
    }

    /// Dipanggil setelah setiap batch drain. Returns `true` jika melapor.
    pub fn observe(&mut self, consumed: u64, batch: usize, resident_bytes: usize) -> bool {
        if self.every == 0 || consumed < self.next_report {
            return false;
        }

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_time).max(Duration::from_micros(1));
        let rate = (consumed - self.last_count) as f64 / elapsed.as_secs_f64();

        info!(
            consumed,
            records_per_sec = rate as u64,
            resident_mib = resident_bytes as f64 / MIB,
            batch,
            "throughput"
        );

        self.last_count = consumed;
        self.last_time = now;
        while self.next_report <= consumed {
            self.next_report += self.every;
        }
        true
    }
}

/// Ringkasan satu run harness
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub records_produced: u64,
    pub records_consumed: u64,
    pub bytes_consumed: u64,
    pub mismatches: u64,
    pub checksum: u32,
    pub backoffs: u64,
    pub wakeups: u64,
    pub max_resident_bytes: u64,
    pub seed: u64,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn records_per_sec(&self) -> f64 {
        self.records_consumed as f64 / self.elapsed.as_secs_f64().max(1e-9)
    }

    pub fn mib_per_sec(&self) -> f64 {
        self.bytes_consumed as f64 / MIB / self.elapsed.as_secs_f64().max(1e-9)
    }

    pub fn is_clean(&self) -> bool {
        self.mismatches == 0 && self.records_produced == self.records_consumed
    }

    pub fn log(&self) {
        info!(
            produced = self.records_produced,
            consumed = self.records_consumed,
            mismatches = self.mismatches,
            checksum = %format!("{:#010x}", self.checksum),
            backoffs = self.backoffs,
            wakeups = self.wakeups,
            max_resident_mib = self.max_resident_bytes as f64 / MIB,
            seed = self.seed,
            elapsed_ms = self.elapsed.as_millis() as u64,
            records_per_sec = self.records_per_sec() as u64,
            mib_per_sec = self.mib_per_sec(),
            "capture run finished"
        );
    }
}
