//! Stress Test - Producer/Consumer Lintas Thread
//!
//! Producer mengisi queue dengan record ukuran acak [0, 1516) berisi
//! running byte counter; consumer memvalidasi setiap byte. Run 10 juta
//! record ditandai `#[ignore]`.
//!
//! Usage:
//!   cargo test --release --test stress_test -- --nocapture
//!   cargo test --release --test stress_test -- --ignored --nocapture

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use capring::capture::{self, RecordSource, SequenceValidator, SyntheticSource};
use capring::{HarnessConfig, QueueConfig, RecordQueue, SourceConfig};

/// Statistik latency publish → claim
struct LatencyStats {
    samples: AtomicU64,
    total_ns: AtomicU64,
    max_ns: AtomicU64,
}

impl LatencyStats {
    fn new() -> Self {
        Self {
            samples: AtomicU64::new(0),
            total_ns: AtomicU64::new(0),
            max_ns: AtomicU64::new(0),
        }
    }

    fn record(&self, latency_ns: u64) {
        self.samples.fetch_add(1, Ordering::Relaxed);
        self.total_ns.fetch_add(latency_ns, Ordering::Relaxed);
        self.max_ns.fetch_max(latency_ns, Ordering::Relaxed);
    }

    fn print_report(&self) {
        let samples = self.samples.load(Ordering::Relaxed);
        let avg = if samples > 0 {
            self.total_ns.load(Ordering::Relaxed) / samples
        } else {
            0
        };
        println!("\nLatency (publish → claim, {samples} samples):");
        println!("  Avg:           {:.2} μs", avg as f64 / 1000.0);
        println!(
            "  Max:           {:.2} μs",
            self.max_ns.load(Ordering::Relaxed) as f64 / 1000.0
        );
    }
}

fn source_config(seed: u64) -> SourceConfig {
    SourceConfig {
        max_size: 1516,
        seed: Some(seed),
        stall_one_in: 0,
        stall_us: 0,
    }
}

/// Dua thread langsung di atas Producer/Consumer, tanpa harness
fn run_handles(records: u64, slots: usize, arena_bytes: usize) -> SequenceValidator {
    let queue = RecordQueue::new(&QueueConfig::new(slots, arena_bytes, 1516)).unwrap();
    let (mut producer, mut consumer) = queue.split();
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut source = SyntheticSource::new(&source_config(7));
            let mut produced = 0u64;
            while produced < records {
                match producer.try_push_with(|buf| source.fill(buf)) {
                    Some(_) => produced += 1,
                    None => thread::yield_now(),
                }
            }
            done.store(true, Ordering::Release);
            producer.snapshot()
        })
    };

    let mut validator = SequenceValidator::new();
    loop {
        let finished = done.load(Ordering::Acquire);
        let batch = consumer.drain(|payload| {
            assert!(payload.len() < 1516);
            assert!(
                validator.validate(payload),
                "byte sequence broken at record {}",
                validator.records()
            );
        });
        if finished && consumer.is_empty() {
            break;
        }
        if batch == 0 {
            thread::yield_now();
        }
    }

    let snapshot = writer.join().unwrap();
    assert_eq!(validator.records(), records);
    assert_eq!(consumer.resident_bytes(), 0);
    assert_eq!(snapshot.published_records as u64, records);
    validator
}

#[test]
fn test_stress_200k_records() {
    println!("\n🧪 STRESS TEST - 200k records, 1024 slots, 1 MiB arena");

    let start = Instant::now();
    let validator = run_handles(200_000, 1024, 1 << 20);
    let duration = start.elapsed();

    println!("  Duration:      {:.2}s", duration.as_secs_f64());
    println!("  Records:       {}", validator.records());
    println!("  Bytes:         {}", validator.bytes());
    println!("  Checksum:      {:#010x}", validator.checksum());
    assert_eq!(validator.mismatches(), 0);
}

#[test]
fn test_stress_tiny_arena_constant_backpressure() {
    // Arena hanya muat beberapa record maksimal: producer hampir selalu
    // menunggu consumer, cursor wrap ribuan kali.
    let validator = run_handles(100_000, 16, 8 * 1024);
    assert_eq!(validator.mismatches(), 0);
}

#[test]
fn test_stress_same_seed_same_stream() {
    let a = run_handles(20_000, 64, 64 * 1024);
    let b = run_handles(20_000, 4096, 4 << 20);

    // Ukuran queue tidak boleh mengubah isi stream
    assert_eq!(a.checksum(), b.checksum());
    assert_eq!(a.bytes(), b.bytes());
}

#[test]
fn test_stress_latency() {
    println!("\n🧪 LATENCY TEST - timestamp di payload");

    const RECORDS: u64 = 50_000;
    let queue = RecordQueue::new(&QueueConfig::new(256, 1 << 20, 64)).unwrap();
    let (mut producer, mut consumer) = queue.split();
    let epoch = Instant::now();
    let stats = LatencyStats::new();

    thread::scope(|scope| {
        scope.spawn(|| {
            let mut sent = 0;
            while sent < RECORDS {
                let pushed = producer.try_push_with(|buf| {
                    let now = epoch.elapsed().as_nanos() as u64;
                    buf[..8].copy_from_slice(&now.to_le_bytes());
                    8
                });
                match pushed {
                    Some(_) => sent += 1,
                    None => thread::yield_now(),
                }
            }
        });

        let mut received = 0;
        while received < RECORDS {
            match consumer.try_claim() {
                Some(record) => {
                    let sent_at = u64::from_le_bytes(record[..8].try_into().unwrap());
                    let now = epoch.elapsed().as_nanos() as u64;
                    stats.record(now.saturating_sub(sent_at));
                    received += 1;
                }
                None => std::hint::spin_loop(),
            }
        }
    });

    stats.print_report();
    assert_eq!(stats.samples.load(Ordering::Relaxed), RECORDS);
}

#[test]
fn test_harness_run_with_stalls() {
    let config = HarnessConfig {
        queue: QueueConfig::new(256, 256 * 1024, 2048),
        source: SourceConfig {
            stall_one_in: 1024,
            stall_us: 50,
            ..source_config(11)
        },
        records: 50_000,
        backoff_us: 100,
        wait_timeout_us: 1000,
        report_every: 0,
    };

    let report = capture::run(&config).unwrap();
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.records_consumed, 50_000);
}

#[test]
#[ignore = "10 juta record; jalankan dengan --release --ignored"]
fn test_stress_10m_records_default_config() {
    println!("\n🧪 FULL RUN - 10,000,000 records, default config");

    let mut config = HarnessConfig::default();
    config.source.seed = Some(0x5EED);
    config.report_every = 1_000_000;

    let start = Instant::now();
    let report = capture::run(&config).unwrap();
    let duration = start.elapsed();

    println!("  Duration:      {:.2}s", duration.as_secs_f64());
    println!("  Rate:          {:.0} records/sec", report.records_per_sec());
    println!("  Throughput:    {:.1} MiB/s", report.mib_per_sec());
    println!("  Backoffs:      {}", report.backoffs);
    println!("  Wakeups:       {}", report.wakeups);
    println!(
        "  Max resident:  {:.2} MiB",
        report.max_resident_bytes as f64 / (1024.0 * 1024.0)
    );

    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.records_consumed, 10_000_000);
    assert!(duration < Duration::from_secs(600));
}
