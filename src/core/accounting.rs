//! Backpressure accounting
//!
//! Dua counter monoton dengan satu writer masing-masing:
//! - `published_bytes` hanya ditambah producer
//! - `released_bytes` hanya ditambah consumer
//!
//! `resident_bytes = published - released`. Karena tidak ada field yang
//! ditulis dua thread, tidak perlu RMW atomik; cukup load relaxed + store
//! release oleh pemiliknya.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use super::slot_ring::CacheLinePadded;

/// Counter byte untuk flow control
pub(crate) struct Accounting {
    // Producer side
    published_bytes: CacheLinePadded<AtomicU64>,
    // Consumer side
    released_bytes: CacheLinePadded<AtomicU64>,
}

impl Default for Accounting {
    fn default() -> Self {
        Self::new()
    }
}

impl Accounting {
    pub const fn new() -> Self {
        Self {
            published_bytes: CacheLinePadded::new(AtomicU64::new(0)),
            released_bytes: CacheLinePadded::new(AtomicU64::new(0)),
        }
    }

    /// Catat bytes record baru. Hanya boleh dipanggil producer, dan harus
    /// sebelum record terlihat oleh consumer.
    #[inline(always)]
    pub(crate) fn add_published(&self, bytes: usize) {
        let current = self.published_bytes.value.load(Ordering::Relaxed);
        self.published_bytes
            .value
            .store(current.wrapping_add(bytes as u64), Ordering::Release);
    }

    /// Catat bytes record yang sudah selesai diproses. Hanya boleh dipanggil
    /// consumer, setelah semua akses ke payload selesai.
    #[inline(always)]
    pub(crate) fn add_released(&self, bytes: usize) {
        let current = self.released_bytes.value.load(Ordering::Relaxed);
        // Release: read payload selesai sebelum producer boleh menimpa region ini
        self.released_bytes
            .value
            .store(current.wrapping_add(bytes as u64), Ordering::Release);
    }

    /// Bytes yang masih dipegang record hidup (sudah publish, belum release)
    #[inline(always)]
    pub fn resident_bytes(&self) -> usize {
        let released = self.released_bytes.value.load(Ordering::Acquire);
        let published = self.published_bytes.value.load(Ordering::Acquire);
        published.saturating_sub(released) as usize
    }

    #[inline(always)]
    pub fn published_bytes(&self) -> u64 {
        self.published_bytes.value.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub fn released_bytes(&self) -> u64 {
        self.released_bytes.value.load(Ordering::Acquire)
    }
}

/// Jeda producer saat backpressure: sleep terbatas, atau yield jika nol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    sleep: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl Backoff {
    pub const fn new(sleep: Duration) -> Self {
        Self { sleep }
    }

    #[inline]
    pub fn pause(&self) {
        if self.sleep.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(self.sleep);
        }
    }
}
