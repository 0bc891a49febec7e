//! Byte Arena: circular buffer untuk payload record
//!
//! Arena adalah satu anonymous mmap berukuran `arena_bytes + slack`, dialokasikan
//! sekali saat init. Record ditulis berurutan mulai dari `WriteCursor`; begitu
//! cursor mencapai `arena_bytes`, cursor kembali ke 0. Slack di ujung arena
//! menampung record terakhir sebelum wrap sehingga tidak ada record yang
//! terpotong.
//!
//! Referensi record adalah offset dalam word (8 bytes), bukan pointer.

use std::io;
use std::ptr::NonNull;

use memmap2::{MmapMut, MmapOptions};

use crate::config::Limits;
use crate::error::{QueueError, Result};
use crate::protocol::{record_words, LEN_PREFIX_BYTES};

/// Region arena bersama antara producer dan consumer.
///
/// Arena sendiri tidak tahu siapa pemilik region mana; disiplin
/// single-writer dijaga oleh `Producer`/`Consumer` di `queue.rs`.
pub(crate) struct ByteArena {
    // Mapping harus hidup selama `base` dipakai
    _map: MmapMut,
    base: NonNull<u64>,
    total_words: usize,
}

// SAFETY: ByteArena hanya membagikan raw memory. Akses tulis dilakukan oleh
// satu producer ke region yang belum/tidak lagi dibaca consumer; akses baca
// oleh satu consumer ke region yang sudah di-publish dengan release ordering.
unsafe impl Send for ByteArena {}
unsafe impl Sync for ByteArena {}

impl ByteArena {
    /// Alokasi arena sesuai `limits`. Gagal map/lock = error konstruksi.
    pub(crate) fn new(limits: &Limits, prefault: bool, lock_memory: bool) -> Result<Self> {
        let bytes = limits.total_bytes;

        let mut options = MmapOptions::new();
        options.len(bytes);
        if prefault {
            options.populate();
        }

        let mut map = options
            .map_anon()
            .map_err(|source| QueueError::ArenaMap { bytes, source })?;

        // Mapping anonim selalu page-aligned, jadi aman dipakai sebagai u64
        let base = NonNull::new(map.as_mut_ptr() as *mut u64).ok_or_else(|| {
            QueueError::ArenaMap {
                bytes,
                source: io::Error::new(io::ErrorKind::Other, "mapping returned null"),
            }
        })?;

        if lock_memory {
            lock_pages(base.as_ptr() as *const u8, bytes)?;
        }

        Ok(Self {
            _map: map,
            base,
            total_words: limits.total_words(),
        })
    }

    /// Total kapasitas (arena + slack) dalam word
    #[inline(always)]
    pub(crate) fn total_words(&self) -> usize {
        self.total_words
    }

    #[inline(always)]
    fn check_bounds(&self, word: usize, payload_len: usize) {
        assert!(
            word + record_words(payload_len) <= self.total_words,
            "record at word {word} with {payload_len} bytes overruns arena of {} words",
            self.total_words
        );
    }

    /// Tulis length prefix record di word `word`.
    ///
    /// # Safety
    /// Caller adalah satu-satunya producer dan region record ini tidak sedang
    /// dibaca consumer.
    #[inline(always)]
    pub(crate) unsafe fn write_len(&self, word: usize, len: usize) {
        self.check_bounds(word, len);
        self.base.as_ptr().add(word).write(len as u64);
    }

    /// Slice payload yang bisa ditulis producer.
    ///
    /// # Safety
    /// Sama dengan [`write_len`](Self::write_len); selain itu tidak boleh ada
    /// slice lain yang overlap selama slice ini hidup.
    #[inline(always)]
    #[allow(clippy::mut_from_ref)]
    pub(crate) unsafe fn payload_mut(&self, word: usize, len: usize) -> &mut [u8] {
        self.check_bounds(word, len);
        let ptr = (self.base.as_ptr().add(word) as *mut u8).add(LEN_PREFIX_BYTES);
        std::slice::from_raw_parts_mut(ptr, len)
    }

    /// Baca length prefix record di word `word`.
    ///
    /// # Safety
    /// Record sudah di-publish (head dibaca dengan acquire) dan belum di-release.
    #[inline(always)]
    pub(crate) unsafe fn read_len(&self, word: usize) -> usize {
        assert!(word < self.total_words, "record ref {word} outside arena");
        self.base.as_ptr().add(word).read() as usize
    }

    /// Slice payload record yang sudah di-publish.
    ///
    /// # Safety
    /// Sama dengan [`read_len`](Self::read_len).
    #[inline(always)]
    pub(crate) unsafe fn payload(&self, word: usize, len: usize) -> &[u8] {
        self.check_bounds(word, len);
        let ptr = (self.base.as_ptr().add(word) as *const u8).add(LEN_PREFIX_BYTES);
        std::slice::from_raw_parts(ptr, len)
    }
}

#[cfg(unix)]
fn lock_pages(ptr: *const u8, len: usize) -> Result<()> {
    // SAFETY: range berasal dari mapping yang baru dibuat dan masih hidup
    let rc = unsafe { libc::mlock(ptr as *const libc::c_void, len) };
    if rc != 0 {
        return Err(QueueError::MemoryLock(io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn lock_pages(_ptr: *const u8, _len: usize) -> Result<()> {
    Err(QueueError::MemoryLock(io::Error::new(
        io::ErrorKind::Unsupported,
        "mlock is only available on unix",
    )))
}

/// Offset record hasil `reserve`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Reservation {
    /// Word tempat length prefix ditulis (juga referensi yang masuk slot)
    pub(crate) len_word: usize,
    /// Payload maksimal yang boleh ditulis
    pub(crate) capacity: usize,
}

/// Posisi tulis arena, dimiliki eksklusif oleh producer
#[derive(Debug)]
pub(crate) struct WriteCursor {
    word: usize,
    arena_words: usize,
    max_record_bytes: usize,
}

impl WriteCursor {
    pub(crate) fn new(limits: &Limits) -> Self {
        Self {
            word: 0,
            arena_words: limits.arena_words(),
            max_record_bytes: limits.max_record_bytes,
        }
    }

    /// Reserve region untuk record `size` bytes di posisi cursor saat ini.
    ///
    /// # Panics
    /// Panic jika `size > max_record_bytes`; itu berarti producer salah
    /// konfigurasi.
    #[inline(always)]
    pub(crate) fn reserve(&self, size: usize) -> Reservation {
        assert!(
            size <= self.max_record_bytes,
            "record of {size} bytes exceeds max record size {}",
            self.max_record_bytes
        );

        Reservation {
            len_word: self.word,
            capacity: size,
        }
    }

    /// Majukan cursor setelah record `size` bytes ditulis; wrap ke 0 begitu
    /// cursor mencapai akhir arena (sisa di belakangnya jadi slack).
    #[inline(always)]
    pub(crate) fn advance(&mut self, size: usize) {
        self.word += record_words(size);
        if self.word >= self.arena_words {
            self.word = 0;
        }
    }

    #[inline(always)]
    pub(crate) fn position(&self) -> usize {
        self.word
    }
}
