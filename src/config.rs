//! Konfigurasi queue dan harness capture
//!
//! Semua margin keamanan diturunkan dari satu angka: `padded_max`, ukuran
//! record maksimal setelah length prefix dan padding.
//!
//! - slack arena   = 4 × padded_max (record terakhir sebelum wrap tidak overrun)
//! - byte budget   ≤ arena_bytes − padded_max (record baru tidak menimpa record
//!   tertua yang belum di-release, karena satu putaran arena ≥ arena_bytes)
//! - budget default = arena_bytes − 2 × padded_max

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QueueError, Result};
use crate::protocol::{padded_len, MAX_RECORD_LIMIT, WORD_BYTES};

/// Jumlah slot yang selalu dibiarkan kosong agar `head == tail` tidak ambigu
pub const SLOT_MARGIN: usize = 2;

/// Faktor slack arena terhadap satu record maksimal
pub const SLACK_RECORDS: usize = 4;

/// Parameter konstruksi queue (`init(slotCount, arenaBytes, maxRecordBytes)`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Jumlah slot, harus power of 2
    pub slot_count: usize,
    /// Kapasitas arena dalam bytes, tanpa slack
    pub arena_bytes: usize,
    /// Ukuran payload maksimal per record
    pub max_record_bytes: usize,
    /// Batas resident bytes sebelum producer back off. `None` = default aman.
    pub byte_budget: Option<usize>,
    /// Fault-in semua halaman arena saat konstruksi (MAP_POPULATE)
    pub prefault: bool,
    /// `mlock` arena supaya tidak di-swap
    pub lock_memory: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            slot_count: 32768,
            arena_bytes: 32 * 1024 * 1024,
            max_record_bytes: 0x10000,
            byte_budget: None,
            prefault: false,
            lock_memory: false,
        }
    }
}

impl QueueConfig {
    pub fn new(slot_count: usize, arena_bytes: usize, max_record_bytes: usize) -> Self {
        Self {
            slot_count,
            arena_bytes,
            max_record_bytes,
            ..Self::default()
        }
    }

    pub fn with_byte_budget(mut self, byte_budget: usize) -> Self {
        self.byte_budget = Some(byte_budget);
        self
    }

    /// Validasi config dan turunkan semua batas yang dipakai queue.
    pub fn validate(&self) -> Result<Limits> {
        if self.slot_count < 4 || !self.slot_count.is_power_of_two() {
            return Err(QueueError::InvalidSlotCount(self.slot_count));
        }

        if self.max_record_bytes == 0 || self.max_record_bytes > MAX_RECORD_LIMIT {
            return Err(QueueError::InvalidMaxRecord(self.max_record_bytes));
        }

        let arena_bytes = self.arena_bytes;
        if arena_bytes % WORD_BYTES != 0 {
            return Err(QueueError::InvalidArena {
                arena_bytes,
                reason: "must be a multiple of 8",
            });
        }

        let padded_max = padded_len(self.max_record_bytes);
        let Some(total_bytes) = SLACK_RECORDS
            .checked_mul(padded_max)
            .and_then(|slack_bytes| arena_bytes.checked_add(slack_bytes))
        else {
            return Err(QueueError::InvalidArena {
                arena_bytes,
                reason: "overflows the address space once slack is added",
            });
        };

        let byte_budget = match self.byte_budget {
            Some(budget) => {
                if budget == 0 || budget.saturating_add(padded_max) > arena_bytes {
                    return Err(QueueError::InvalidByteBudget {
                        budget,
                        padded_max,
                        arena_bytes,
                    });
                }
                budget
            }
            None => match padded_max
                .checked_mul(2)
                .and_then(|reserve| arena_bytes.checked_sub(reserve))
            {
                Some(budget) if budget > 0 => budget,
                _ => {
                    return Err(QueueError::InvalidArena {
                        arena_bytes,
                        reason: "must be larger than two maximal records",
                    });
                }
            },
        };

        Ok(Limits {
            slot_count: self.slot_count,
            arena_bytes,
            total_bytes,
            max_record_bytes: self.max_record_bytes,
            padded_max,
            byte_budget,
        })
    }
}

/// Batas turunan dari [`QueueConfig`] yang sudah tervalidasi
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub slot_count: usize,
    pub arena_bytes: usize,
    /// arena_bytes + slack
    pub total_bytes: usize,
    pub max_record_bytes: usize,
    pub padded_max: usize,
    pub byte_budget: usize,
}

impl Limits {
    /// Occupancy maksimal ring (`Q_SIZE - 2`)
    #[inline(always)]
    pub const fn max_occupied(&self) -> usize {
        self.slot_count - SLOT_MARGIN
    }

    #[inline(always)]
    pub const fn arena_words(&self) -> usize {
        self.arena_bytes / WORD_BYTES
    }

    #[inline(always)]
    pub const fn total_words(&self) -> usize {
        self.total_bytes / WORD_BYTES
    }

    #[inline(always)]
    pub const fn slack_bytes(&self) -> usize {
        self.total_bytes - self.arena_bytes
    }
}

/// Parameter record source sintetis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Ukuran record diambil acak dari `[0, max_size)`
    pub max_size: usize,
    /// Seed RNG; `None` = dari waktu sistem
    pub seed: Option<u64>,
    /// Rata-rata sekali per N record source "tersendat". 0 = tidak pernah.
    pub stall_one_in: u32,
    pub stall_us: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            // 1536 - 20, seperti frame Ethernet tanpa header
            max_size: 1516,
            seed: None,
            stall_one_in: 128,
            stall_us: 1000,
        }
    }
}

/// Konfigurasi lengkap harness producer/consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub queue: QueueConfig,
    pub source: SourceConfig,
    /// Jumlah record yang diproduksi sebelum producer berhenti
    pub records: u64,
    /// Sleep producer saat backpressure
    pub backoff_us: u64,
    /// Timeout consumer menunggu wake signal
    pub wait_timeout_us: u64,
    /// Log throughput setiap N record
    pub report_every: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            source: SourceConfig::default(),
            records: 10_000_000,
            backoff_us: 1000,
            wait_timeout_us: 1000,
            report_every: 1_000_000,
        }
    }
}

impl HarnessConfig {
    /// Load config dari file TOML. Field yang tidak ada memakai default.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| QueueError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    #[inline]
    pub fn backoff(&self) -> Duration {
        Duration::from_micros(self.backoff_us)
    }

    #[inline]
    pub fn wait_timeout(&self) -> Duration {
        Duration::from_micros(self.wait_timeout_us)
    }
}
