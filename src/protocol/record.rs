//! Format record di dalam arena
//!
//! Layout (satu record, selalu 8-byte aligned):
//! ┌──────────────────────────┬──────────────────────────┬─────────────┐
//! │ length: u64 (native end) │ payload (length bytes)   │ pad → 8 B   │
//! └──────────────────────────┴──────────────────────────┴─────────────┘
//!
//! Format ini hanya hidup di memory, tidak pernah di-persist atau dikirim.

/// Ukuran satu word arena
pub const WORD_BYTES: usize = 8;

/// Panjang length prefix di depan setiap payload
pub const LEN_PREFIX_BYTES: usize = 8;

/// Batas atas `max_record_bytes` yang diterima config
pub const MAX_RECORD_LIMIT: usize = 1 << 30;

/// Jumlah word yang dipakai satu record: prefix + payload dibulatkan ke atas.
#[inline(always)]
pub const fn record_words(payload_len: usize) -> usize {
    1 + (payload_len + WORD_BYTES - 1) / WORD_BYTES
}

/// Ukuran record dalam bytes setelah padding.
#[inline(always)]
pub const fn padded_len(payload_len: usize) -> usize {
    record_words(payload_len) * WORD_BYTES
}

/// Adler-style checksum yang bisa di-update per potongan data.
///
/// Hasil `update(a); update(b)` sama dengan `update(a ++ b)`, jadi consumer
/// bisa menghitung checksum seluruh stream tanpa menyalin payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checksum {
    a: u32,
    b: u32,
}

impl Default for Checksum {
    fn default() -> Self {
        Self::new()
    }
}

impl Checksum {
    pub const fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    #[inline(always)]
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.a = self.a.wrapping_add(byte as u32);
            self.b = self.b.wrapping_add(self.a);
        }
    }

    #[inline(always)]
    pub fn value(&self) -> u32 {
        (self.b << 16) | (self.a & 0xFFFF)
    }
}

/// Checksum satu buffer sekaligus
#[inline(always)]
pub fn checksum(data: &[u8]) -> u32 {
    let mut sum = Checksum::new();
    sum.update(data);
    sum.value()
}
