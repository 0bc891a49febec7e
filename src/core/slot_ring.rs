//! Lock-Free Single-Producer Single-Consumer (SPSC) Slot Ring
//!
//! Lamport queue berisi referensi record (word offset ke arena).
//! `head` hanya ditulis producer, `tail` hanya ditulis consumer; keduanya
//! naik monoton dan di-wrap lewat mask. Dua slot selalu dibiarkan kosong
//! sehingga `head == tail` selalu berarti kosong.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::SLOT_MARGIN;
use crate::error::{QueueError, Result};

/// Padding untuk cache line isolation (64 bytes pada x86-64)
#[repr(C, align(64))]
pub(crate) struct CacheLinePadded<T> {
    pub(crate) value: T,
}

impl<T> CacheLinePadded<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self { value }
    }
}

/// Lock-Free SPSC ring untuk referensi record
///
/// Menggunakan separate cache lines untuk head dan tail
/// untuk menghindari false sharing antara producer dan consumer.
#[repr(C)]
pub struct SlotRing {
    // Producer side
    head: CacheLinePadded<AtomicUsize>,
    // Consumer side
    tail: CacheLinePadded<AtomicUsize>,
    // Slot di-load/store relaxed; visibility dijamin oleh release/acquire
    // pada head dan tail
    slots: Box<[AtomicUsize]>,
    mask: usize,
}

impl SlotRing {
    /// Membuat ring dengan `slot_count` slot. `slot_count` HARUS power of 2
    /// dan minimal 4.
    ///
    /// Alokasi hanya terjadi sekali di sini; kegagalan alokasi dikembalikan
    /// sebagai error, bukan abort.
    pub fn new(slot_count: usize) -> Result<Self> {
        if slot_count < 4 || !slot_count.is_power_of_two() {
            return Err(QueueError::InvalidSlotCount(slot_count));
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(slot_count)
            .map_err(|source| QueueError::SlotAlloc {
                slots: slot_count,
                source,
            })?;
        slots.extend((0..slot_count).map(|_| AtomicUsize::new(0)));

        Ok(Self {
            head: CacheLinePadded::new(AtomicUsize::new(0)),
            tail: CacheLinePadded::new(AtomicUsize::new(0)),
            slots: slots.into_boxed_slice(),
            mask: slot_count - 1,
        })
    }

    /// Simpan referensi record ke slot berikutnya (Producer side)
    ///
    /// # Panics
    /// Panic jika ring sudah penuh (`occupied >= Q_SIZE - 2`).
    #[inline(always)]
    pub fn publish(&self, record_ref: usize) {
        let head = self.head.value.load(Ordering::Relaxed);
        let tail = self.tail.value.load(Ordering::Acquire);

        assert!(
            head.wrapping_sub(tail) < self.max_occupied(),
            "publish on full slot ring ({} of {} slots occupied)",
            head.wrapping_sub(tail),
            self.slots.len()
        );

        self.slots[head & self.mask].store(record_ref, Ordering::Relaxed);

        // Release: slot dan payload di arena visible sebelum head di-update
        self.head
            .value
            .store(head.wrapping_add(1), Ordering::Release);
    }

    /// Ambil referensi record berikutnya (Consumer side)
    ///
    /// # Panics
    /// Panic jika ring kosong; caller wajib cek `is_empty()` dulu.
    #[inline(always)]
    pub fn claim(&self) -> usize {
        let tail = self.tail.value.load(Ordering::Relaxed);
        let head = self.head.value.load(Ordering::Acquire);

        assert!(head != tail, "claim on empty slot ring");

        let record_ref = self.slots[tail & self.mask].load(Ordering::Relaxed);

        // Release: load slot di atas selesai sebelum producer boleh reuse slot ini
        self.tail
            .value
            .store(tail.wrapping_add(1), Ordering::Release);

        record_ref
    }

    /// Cek apakah ring kosong
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.occupied() == 0
    }

    /// Cek apakah ring penuh (`occupied >= Q_SIZE - 2`)
    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.occupied() >= self.max_occupied()
    }

    /// Jumlah slot terisi (`head - tail`)
    ///
    /// Tail dibaca lebih dulu supaya hasil tidak pernah underflow walaupun
    /// dipanggil dari thread ketiga.
    #[inline(always)]
    pub fn occupied(&self) -> usize {
        let tail = self.tail.value.load(Ordering::Acquire);
        let head = self.head.value.load(Ordering::Acquire);
        head.wrapping_sub(tail)
    }

    /// Total record yang pernah di-publish (wrapping)
    #[inline(always)]
    pub fn head(&self) -> usize {
        self.head.value.load(Ordering::Acquire)
    }

    /// Total record yang pernah di-claim (wrapping)
    #[inline(always)]
    pub fn tail(&self) -> usize {
        self.tail.value.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Occupancy maksimal
    #[inline(always)]
    pub fn max_occupied(&self) -> usize {
        self.slots.len() - SLOT_MARGIN
    }
}
