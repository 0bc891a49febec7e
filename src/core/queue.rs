//! Lock-Free Record Queue: Slot Ring + Byte Arena + Accounting
//!
//! Protokol per record:
//!
//! ```text
//! Free ──reserve──▶ Reserved ──publish──▶ Published ──claim──▶ Consumed ──drop──▶ Released
//!   (arena kosong)   (Grant)      (head++)                (tail++, Claimed)   (bytes boleh reuse)
//! ```
//!
//! Konstruksi menghasilkan tepat satu [`Producer`] dan satu [`Consumer`].
//! Keduanya tidak bisa di-clone, jadi disiplin single-producer /
//! single-consumer dijaga oleh type system, bukan oleh konvensi.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use super::accounting::Accounting;
use super::arena::{ByteArena, Reservation, WriteCursor};
use super::slot_ring::SlotRing;
use crate::config::{Limits, QueueConfig};
use crate::error::Result;
use crate::protocol::padded_len;

struct Shared {
    ring: SlotRing,
    arena: ByteArena,
    accounting: Accounting,
    limits: Limits,
}

impl Shared {
    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            occupied: self.ring.occupied(),
            resident_bytes: self.accounting.resident_bytes(),
            published_records: self.ring.head(),
            claimed_records: self.ring.tail(),
            published_bytes: self.accounting.published_bytes(),
            released_bytes: self.accounting.released_bytes(),
        }
    }
}

/// Snapshot counter queue untuk monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub occupied: usize,
    pub resident_bytes: usize,
    /// Wrapping counter `head`
    pub published_records: usize,
    /// Wrapping counter `tail`
    pub claimed_records: usize,
    pub published_bytes: u64,
    pub released_bytes: u64,
}

/// Queue yang sudah dialokasikan tapi belum dibagi ke dua thread
pub struct RecordQueue {
    shared: Shared,
}

impl RecordQueue {
    /// `init(slotCount, arenaBytes, maxRecordBytes)`: validasi config lalu
    /// alokasi ring dan arena sekali. Tidak ada queue setengah jadi; setiap
    /// kegagalan dikembalikan sebagai error.
    pub fn new(config: &QueueConfig) -> Result<Self> {
        let limits = config.validate()?;
        let ring = SlotRing::new(limits.slot_count)?;
        let arena = ByteArena::new(&limits, config.prefault, config.lock_memory)?;
        debug_assert_eq!(arena.total_words(), limits.total_words());

        Ok(Self {
            shared: Shared {
                ring,
                arena,
                accounting: Accounting::new(),
                limits,
            },
        })
    }

    pub fn limits(&self) -> &Limits {
        &self.shared.limits
    }

    /// Bagi queue menjadi handle producer dan consumer.
    ///
    /// Memory dilepas (`release()`) ketika kedua handle sudah di-drop.
    pub fn split(self) -> (Producer, Consumer) {
        let cursor = WriteCursor::new(&self.shared.limits);
        let shared = Arc::new(self.shared);

        (
            Producer {
                shared: Arc::clone(&shared),
                cursor,
            },
            Consumer { shared },
        )
    }
}

impl fmt::Debug for RecordQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordQueue")
            .field("limits", &self.shared.limits)
            .finish()
    }
}

/// Handle sisi producer. Hanya satu per queue.
pub struct Producer {
    shared: Arc<Shared>,
    cursor: WriteCursor,
}

impl fmt::Debug for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("cursor", &self.cursor.position())
            .field("snapshot", &self.shared.snapshot())
            .finish()
    }
}

impl Producer {
    #[inline(always)]
    pub fn limits(&self) -> &Limits {
        &self.shared.limits
    }

    #[inline(always)]
    pub fn is_full(&self) -> bool {
        self.shared.ring.is_full()
    }

    #[inline(always)]
    pub fn occupied(&self) -> usize {
        self.shared.ring.occupied()
    }

    #[inline(always)]
    pub fn resident_bytes(&self) -> usize {
        self.shared.accounting.resident_bytes()
    }

    /// Posisi cursor arena saat ini, dalam word
    #[inline(always)]
    pub fn write_cursor(&self) -> usize {
        self.cursor.position()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.shared.snapshot()
    }

    /// Cek backpressure: ada slot kosong DAN resident bytes di bawah budget.
    #[inline(always)]
    pub fn has_capacity(&self) -> bool {
        !self.shared.ring.is_full()
            && self.shared.accounting.resident_bytes() < self.shared.limits.byte_budget
    }

    /// Reserve region untuk satu record dengan kapasitas `max_record_bytes`.
    /// Panjang sebenarnya ditentukan saat [`Grant::publish`].
    ///
    /// # Panics
    /// Panic jika [`has_capacity`](Self::has_capacity) false.
    #[inline(always)]
    pub fn reserve(&mut self) -> Grant<'_> {
        let max = self.shared.limits.max_record_bytes;
        self.reserve_exact(max)
    }

    /// Reserve region untuk record tepat `size` bytes.
    ///
    /// # Panics
    /// Panic jika `size > max_record_bytes` atau queue tidak punya kapasitas.
    #[inline(always)]
    pub fn reserve_exact(&mut self, size: usize) -> Grant<'_> {
        let reservation = self.cursor.reserve(size);
        self.assert_capacity();
        Grant {
            producer: self,
            reservation,
        }
    }

    /// Seperti [`reserve`](Self::reserve), tapi `None` saat backpressure.
    #[inline(always)]
    pub fn try_reserve(&mut self) -> Option<Grant<'_>> {
        if !self.has_capacity() {
            return None;
        }
        Some(self.reserve())
    }

    /// Copy `payload` ke queue sebagai satu record.
    ///
    /// # Panics
    /// Panic jika payload terlalu besar atau queue tidak punya kapasitas.
    #[inline(always)]
    pub fn push(&mut self, payload: &[u8]) {
        let mut grant = self.reserve_exact(payload.len());
        grant.buffer().copy_from_slice(payload);
        grant.publish(payload.len());
    }

    /// Returns `false` tanpa menulis apa pun jika queue sedang backpressure.
    ///
    /// # Panics
    /// Panic jika payload lebih besar dari `max_record_bytes`.
    #[inline(always)]
    pub fn try_push(&mut self, payload: &[u8]) -> bool {
        if !self.has_capacity() {
            return false;
        }
        self.push(payload);
        true
    }

    /// Biarkan `fill` menulis langsung ke arena dan mengembalikan panjang
    /// record. Returns panjang yang di-publish, atau `None` saat backpressure.
    #[inline(always)]
    pub fn try_push_with<F>(&mut self, fill: F) -> Option<usize>
    where
        F: FnOnce(&mut [u8]) -> usize,
    {
        let mut grant = self.try_reserve()?;
        let len = fill(grant.buffer());
        grant.publish(len);
        Some(len)
    }

    #[inline(always)]
    fn assert_capacity(&self) {
        let shared = &self.shared;
        assert!(
            !shared.ring.is_full(),
            "publish on full queue ({} slots occupied)",
            shared.ring.occupied()
        );
        let resident = shared.accounting.resident_bytes();
        assert!(
            resident < shared.limits.byte_budget,
            "publish on full queue ({resident} resident bytes, budget {})",
            shared.limits.byte_budget
        );
    }
}

/// Region arena yang sedang ditulis producer (state *Reserved*).
///
/// Drop tanpa `publish` membatalkan reservasi; cursor tidak bergerak.
pub struct Grant<'a> {
    producer: &'a mut Producer,
    reservation: Reservation,
}

impl Grant<'_> {
    /// Buffer payload yang bisa ditulis
    #[inline(always)]
    pub fn buffer(&mut self) -> &mut [u8] {
        // SAFETY: Grant meminjam Producer secara eksklusif. Region ini sudah
        // dicek terhadap byte budget, jadi tidak overlap dengan record yang
        // belum di-release consumer.
        unsafe {
            self.producer
                .shared
                .arena
                .payload_mut(self.reservation.len_word, self.reservation.capacity)
        }
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.reservation.capacity
    }

    /// Publish `len` bytes pertama dari buffer sebagai record.
    ///
    /// Urutan: length prefix → accounting → slot + head (release) → cursor.
    /// Accounting ditambah sebelum record terlihat supaya `resident_bytes`
    /// tidak pernah lebih kecil dari kenyataan.
    ///
    /// # Panics
    /// Panic jika `len` melebihi kapasitas grant.
    #[inline(always)]
    pub fn publish(self, len: usize) {
        assert!(
            len <= self.reservation.capacity,
            "record of {len} bytes exceeds reserved capacity {}",
            self.reservation.capacity
        );

        let producer = self.producer;
        let word = self.reservation.len_word;
        let shared = &producer.shared;

        // SAFETY: lihat `buffer()`
        unsafe {
            shared.arena.write_len(word, len);
        }
        shared.accounting.add_published(padded_len(len));
        shared.ring.publish(word);

        producer.cursor.advance(len);
    }
}

/// Handle sisi consumer. Hanya satu per queue.
pub struct Consumer {
    shared: Arc<Shared>,
}

impl fmt::Debug for Consumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("snapshot", &self.shared.snapshot())
            .finish()
    }
}

impl Consumer {
    #[inline(always)]
    pub fn limits(&self) -> &Limits {
        &self.shared.limits
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.shared.ring.is_empty()
    }

    #[inline(always)]
    pub fn occupied(&self) -> usize {
        self.shared.ring.occupied()
    }

    #[inline(always)]
    pub fn resident_bytes(&self) -> usize {
        self.shared.accounting.resident_bytes()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.shared.snapshot()
    }

    /// Claim record berikutnya (state *Consumed*). Bytes-nya di-release
    /// ketika [`Claimed`] di-drop.
    ///
    /// # Panics
    /// Panic jika queue kosong; cek [`is_empty`](Self::is_empty) dulu.
    #[inline(always)]
    pub fn claim(&mut self) -> Claimed<'_> {
        let shared = &*self.shared;
        let word = shared.ring.claim();

        // SAFETY: head sudah dibaca dengan acquire di `claim`, jadi length
        // dan payload yang ditulis producer sebelum publish sudah visible.
        let len = unsafe { shared.arena.read_len(word) };
        assert!(
            len <= shared.limits.max_record_bytes,
            "corrupt record length {len} at word {word}"
        );
        let payload = unsafe { shared.arena.payload(word, len) };

        Claimed {
            accounting: &shared.accounting,
            payload,
        }
    }

    /// `None` jika queue kosong.
    #[inline(always)]
    pub fn try_claim(&mut self) -> Option<Claimed<'_>> {
        if self.is_empty() {
            return None;
        }
        Some(self.claim())
    }

    /// Proses semua record yang tersedia saat ini, berurutan.
    /// Returns jumlah record yang diproses.
    pub fn drain<F>(&mut self, mut process: F) -> usize
    where
        F: FnMut(&[u8]),
    {
        let mut count = 0;
        while let Some(record) = self.try_claim() {
            process(record.payload());
            count += 1;
        }
        count
    }
}

/// Record yang sedang diproses consumer.
///
/// Meminjam `Consumer` secara eksklusif sehingga record selalu di-release
/// sesuai urutan FIFO; drop mengurangi resident bytes.
pub struct Claimed<'a> {
    accounting: &'a Accounting,
    payload: &'a [u8],
}

impl Claimed<'_> {
    #[inline(always)]
    pub fn payload(&self) -> &[u8] {
        self.payload
    }

    /// Ukuran record di arena termasuk prefix dan padding
    #[inline(always)]
    pub fn padded_len(&self) -> usize {
        padded_len(self.payload.len())
    }
}

impl Deref for Claimed<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.payload
    }
}

impl fmt::Debug for Claimed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claimed")
            .field("len", &self.payload.len())
            .finish()
    }
}

impl Drop for Claimed<'_> {
    fn drop(&mut self) {
        self.accounting.add_released(padded_len(self.payload.len()));
    }
}
