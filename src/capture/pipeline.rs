//! Harness producer/consumer di atas `RecordQueue`
//!
//! Semua state yang dulu global (wake handle, timer, stop flag) berada di
//! [`CaptureContext`] yang dibuat sekali sebelum thread start dan di-drop
//! setelah keduanya selesai.
//!
//! Shutdown: producer berhenti setelah `records` record atau saat stop flag
//! dinaikkan, lalu menandai `producer_done`. Consumer men-drain sisa record
//! dan keluar begitu queue kosong.

use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::source::{RecordSource, SequenceValidator, SyntheticSource};
use super::stats::{CaptureStats, RunReport, ThroughputMeter};
use super::wake::{wake_signal, Notifier, Waiter};
use crate::config::HarnessConfig;
use crate::core::{Backoff, Consumer, Producer, RecordQueue};
use crate::error::{QueueError, Result};

/// Context eksplisit yang dibagi kedua thread
#[derive(Debug)]
pub struct CaptureContext {
    stop: AtomicBool,
    producer_done: AtomicBool,
    stats: CaptureStats,
    backoff: Backoff,
    wait_timeout: Duration,
    report_every: u64,
}

impl CaptureContext {
    pub fn new(backoff: Backoff, wait_timeout: Duration, report_every: u64) -> Self {
        Self {
            stop: AtomicBool::new(false),
            producer_done: AtomicBool::new(false),
            stats: CaptureStats::new(),
            backoff,
            wait_timeout,
            report_every,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            Backoff::new(config.backoff()),
            config.wait_timeout(),
            config.report_every,
        )
    }

    /// Minta producer berhenti; consumer tetap men-drain sisa record.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    #[inline(always)]
    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub fn producer_done(&self) -> bool {
        self.producer_done.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }
}

/// Tandai producer selesai saat keluar, termasuk saat panic, supaya
/// consumer tidak menunggu selamanya.
struct DoneGuard<'a>(&'a AtomicBool);

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

/// Loop producer: backpressure → reserve → fill → publish → notify.
///
/// Returns jumlah record yang di-publish.
pub fn run_producer<S>(
    ctx: &CaptureContext,
    producer: &mut Producer,
    source: &mut S,
    notifier: &Notifier,
    records: u64,
) -> u64
where
    S: RecordSource + ?Sized,
{
    let _done = DoneGuard(&ctx.producer_done);
    let mut produced = 0u64;
    let mut notify_failed = false;

    while produced < records {
        if ctx.stop_requested() {
            debug!(produced, "producer stop requested");
            break;
        }

        let Some(len) = producer.try_push_with(|buf| source.fill(buf)) else {
            ctx.stats.record_backoff();
            ctx.backoff.pause();
            continue;
        };

        produced += 1;
        ctx.stats.record_produced(len);
        ctx.stats.observe_resident(producer.resident_bytes());

        if let Err(e) = notifier.notify() {
            // Consumer tetap polling dengan timeout, jadi cukup log sekali
            if !notify_failed {
                warn!(error = %e, "wake notify failed, consumer falls back to polling");
                notify_failed = true;
            }
        }
    }

    produced
}

/// Loop consumer: wait (timeout) → drain semua record → ulangi sampai
/// producer selesai dan queue kosong.
///
/// Returns jumlah record yang dikonsumsi.
pub fn run_consumer(
    ctx: &CaptureContext,
    consumer: &mut Consumer,
    waiter: &mut Waiter,
    validator: &mut SequenceValidator,
) -> Result<u64> {
    let mut meter = ThroughputMeter::new(ctx.report_every);
    let mut consumed = 0u64;

    loop {
        if waiter.wait(ctx.wait_timeout).map_err(QueueError::WakeSignal)? {
            ctx.stats.record_wakeup();
        }

        // Dibaca sebelum drain: semua record yang di-publish sebelum flag
        // ini naik pasti ikut ter-drain di bawah.
        let done = ctx.producer_done();

        let batch = consumer.drain(|payload| {
            if !validator.validate(payload) {
                ctx.stats.record_mismatch();
                warn!(
                    record = validator.records(),
                    len = payload.len(),
                    "running byte sequence mismatch"
                );
            }
            ctx.stats.record_consumed(payload.len());
        });

        consumed += batch as u64;
        meter.observe(consumed, batch, consumer.resident_bytes());

        if done && consumer.is_empty() {
            break;
        }
    }

    Ok(consumed)
}

/// Jalankan satu run lengkap sesuai config.
pub fn run(config: &HarnessConfig) -> Result<RunReport> {
    let queue = RecordQueue::new(&config.queue)?;
    let limits = *queue.limits();
    info!(
        slots = limits.slot_count,
        arena_bytes = limits.arena_bytes,
        slack_bytes = limits.slack_bytes(),
        byte_budget = limits.byte_budget,
        max_record_bytes = limits.max_record_bytes,
        "record queue ready"
    );

    if config.source.max_size > limits.max_record_bytes + 1 {
        warn!(
            source_max = config.source.max_size,
            max_record_bytes = limits.max_record_bytes,
            "source can produce records larger than the queue accepts; they will be truncated"
        );
    }

    let (mut producer, mut consumer) = queue.split();
    let (notifier, mut waiter) = wake_signal()?;
    let ctx = CaptureContext::from_config(config);
    let mut source = SyntheticSource::new(&config.source);
    let mut validator = SequenceValidator::new();
    let seed = source.seed();
    let records = config.records;

    info!(records, seed, "capture run starting");
    let start = Instant::now();

    let (produced, consumed) = thread::scope(|scope| -> Result<(u64, u64)> {
        let producer_thread = thread::Builder::new()
            .name("capring-producer".into())
            .spawn_scoped(scope, || {
                run_producer(&ctx, &mut producer, &mut source, &notifier, records)
            })
            .map_err(QueueError::ThreadSpawn)?;

        let consumed = run_consumer(&ctx, &mut consumer, &mut waiter, &mut validator);
        if consumed.is_err() {
            ctx.request_stop();
        }

        let produced = match producer_thread.join() {
            Ok(produced) => produced,
            Err(payload) => panic::resume_unwind(payload),
        };
        Ok((produced, consumed?))
    })?;

    let elapsed = start.elapsed();
    let stats = ctx.stats();

    Ok(RunReport {
        records_produced: produced,
        records_consumed: consumed,
        bytes_consumed: validator.bytes(),
        mismatches: validator.mismatches(),
        checksum: validator.checksum(),
        backoffs: stats.backoffs(),
        wakeups: stats.wakeups(),
        max_resident_bytes: stats.max_resident_bytes(),
        seed,
        elapsed,
    })
}
