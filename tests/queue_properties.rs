//! Property tests untuk RecordQueue
//!
//! FIFO, round-trip, byte accounting, wraparound, dan batas empty/full,
//! semuanya lewat API publik `Producer`/`Consumer`.
//!
//! Usage:
//!   cargo test --test queue_properties

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use capring::protocol::padded_len;
use capring::{Consumer, Producer, QueueConfig, RecordQueue};

fn queue(slots: usize, arena_bytes: usize, max_record: usize) -> (Producer, Consumer) {
    RecordQueue::new(&QueueConfig::new(slots, arena_bytes, max_record))
        .expect("create queue")
        .split()
}

/// Payload dari running byte counter
fn next_payload(counter: &mut u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|_| {
            let b = *counter;
            *counter = counter.wrapping_add(1);
            b
        })
        .collect()
}

#[test]
fn fifo_order_is_preserved() {
    let (mut producer, mut consumer) = queue(1024, 4 << 20, 1536);
    let mut counter = 0u8;
    let mut rng = StdRng::seed_from_u64(1);

    let mut published = Vec::new();
    for _ in 0..1000 {
        let payload = next_payload(&mut counter, rng.gen_range(0..1516));
        producer.push(&payload);
        published.push(payload);
    }

    for expected in &published {
        let record = consumer.claim();
        assert_eq!(record.payload(), expected.as_slice());
    }
    assert!(consumer.is_empty());
}

#[test]
fn round_trip_every_size_up_to_max() {
    const MAX: usize = 300;
    let (mut producer, mut consumer) = queue(16, 8192, MAX);

    for size in 0..=MAX {
        let payload: Vec<u8> = (0..size).map(|i| (i * 31 + size) as u8).collect();
        producer.push(&payload);

        let record = consumer.claim();
        assert_eq!(record.len(), size);
        assert_eq!(record.payload(), payload.as_slice());
    }
}

#[test]
fn resident_bytes_match_padded_sizes() {
    let (mut producer, mut consumer) = queue(256, 1 << 20, 2048);
    let mut rng = StdRng::seed_from_u64(2);
    let mut resident: VecDeque<usize> = VecDeque::new();

    for _ in 0..5000 {
        if rng.gen_bool(0.6) && producer.has_capacity() {
            let len = rng.gen_range(0..2048);
            producer.push(&vec![0xEE; len]);
            resident.push_back(len);
        } else if !consumer.is_empty() {
            let record = consumer.claim();
            assert_eq!(Some(record.len()), resident.pop_front());
        }

        let expected: usize = resident.iter().map(|&len| padded_len(len)).sum();
        assert_eq!(producer.resident_bytes(), expected);
        assert_eq!(consumer.resident_bytes(), expected);
        assert_eq!(producer.occupied(), resident.len());
    }
}

#[test]
fn occupied_never_exceeds_slot_margin() {
    let (mut producer, mut consumer) = queue(8, 1 << 16, 64);

    let mut pushed = 0;
    while producer.try_push(b"x") {
        pushed += 1;
        assert!(producer.occupied() <= 6);
    }
    assert_eq!(pushed, 6);
    assert!(producer.is_full());

    for _ in 0..6 {
        drop(consumer.claim());
    }
    assert!(consumer.is_empty());
}

#[test]
fn empty_and_full_edges() {
    let (mut producer, mut consumer) = queue(4, 4096, 64);

    assert!(consumer.is_empty());
    producer.push(b"one");
    assert!(!consumer.is_empty());
    assert!(!producer.is_full());

    producer.push(b"two");
    assert!(producer.is_full());

    drop(consumer.claim());
    assert!(!producer.is_full());

    drop(consumer.claim());
    assert!(consumer.is_empty());
}

#[test]
fn arena_wraparound_keeps_unclaimed_records_intact() {
    // Arena kecil: 1 KiB dengan record maksimal 100 bytes (padded 112)
    const MAX: usize = 100;
    let (mut producer, mut consumer) = queue(64, 1024, MAX);
    let budget = producer.limits().byte_budget;
    assert_eq!(budget, 1024 - 2 * 112);

    let mut rng = StdRng::seed_from_u64(3);
    let mut counter = 0u8;
    let mut pending: VecDeque<Vec<u8>> = VecDeque::new();
    let mut total_padded = 0usize;
    let mut wraps = 0;
    let mut last_cursor = 0;

    while total_padded < 50 * 1024 {
        // Isi sampai backpressure, lalu konsumsi sebagian
        while producer.has_capacity() {
            let payload = next_payload(&mut counter, rng.gen_range(0..=MAX));
            total_padded += padded_len(payload.len());
            producer.push(&payload);
            pending.push_back(payload);

            if producer.write_cursor() < last_cursor {
                wraps += 1;
            }
            last_cursor = producer.write_cursor();
        }

        let take = rng.gen_range(1..=pending.len());
        for _ in 0..take {
            let expected = pending.pop_front().unwrap();
            assert_eq!(consumer.claim().payload(), expected.as_slice());
        }
    }

    while let Some(expected) = pending.pop_front() {
        assert_eq!(consumer.claim().payload(), expected.as_slice());
    }
    assert!(wraps > 10, "arena only wrapped {wraps} times");
}

#[test]
fn grant_buffer_always_fits_in_slack() {
    // Grant kapasitas penuh di setiap posisi cursor, termasuk dekat akhir arena
    let (mut producer, mut consumer) = queue(64, 4096, 512);

    let mut counter = 0u8;
    for _ in 0..2000 {
        while !producer.has_capacity() {
            drop(consumer.claim());
        }
        let mut grant = producer.reserve();
        assert_eq!(grant.capacity(), 512);
        let payload = next_payload(&mut counter, 512);
        grant.buffer().copy_from_slice(&payload);
        grant.publish(1); // record pendek, cursor bergerak 2 word

        let _ = consumer.drain(|p| assert_eq!(p.len(), 1));
    }
}

#[test]
fn concurrent_fifo_with_backpressure() {
    use std::thread;

    const RECORDS: u32 = 200_000;
    let (mut producer, mut consumer) = queue(256, 32 * 1024, 1516);

    let writer = thread::spawn(move || {
        let mut rng = StdRng::seed_from_u64(4);
        let mut seq = 0u32;
        while seq < RECORDS {
            let len = rng.gen_range(4..64);
            let pushed = producer.try_push_with(|buf| {
                buf[..4].copy_from_slice(&seq.to_le_bytes());
                buf[4..len].fill(seq as u8);
                len
            });
            match pushed {
                Some(_) => seq += 1,
                None => thread::yield_now(),
            }
        }
    });

    let mut expected = 0u32;
    while expected < RECORDS {
        if consumer.is_empty() {
            thread::yield_now();
            continue;
        }
        let record = consumer.claim();
        let seq = u32::from_le_bytes(record[..4].try_into().unwrap());
        assert_eq!(seq, expected);
        assert!(record[4..].iter().all(|&b| b == seq as u8));
        expected += 1;
    }

    writer.join().unwrap();
    assert!(consumer.is_empty());
    assert_eq!(consumer.resident_bytes(), 0);
}
