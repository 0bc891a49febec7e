//! Wake signal antara producer dan consumer
//!
//! Menggunakan mio `Waker` (eventfd/kqueue/IOCP) yang didaftarkan ke `Poll`
//! milik consumer. Producer memanggil `notify()` setelah publish; consumer
//! menunggu di `wait(timeout)` lalu men-drain queue. Beberapa notify sebelum
//! consumer bangun digabung menjadi satu wake.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use mio::{Events, Poll, Token, Waker};

use crate::error::{QueueError, Result};

const WAKE_TOKEN: Token = Token(0);
const EVENTS_CAPACITY: usize = 8;

/// Buat pasangan notifier (producer) dan waiter (consumer).
pub fn wake_signal() -> Result<(Notifier, Waiter)> {
    let poll = Poll::new().map_err(QueueError::WakeSignal)?;
    let waker = Waker::new(poll.registry(), WAKE_TOKEN).map_err(QueueError::WakeSignal)?;
    let waker = Arc::new(waker);

    Ok((
        Notifier {
            waker: Arc::clone(&waker),
        },
        Waiter {
            poll,
            events: Events::with_capacity(EVENTS_CAPACITY),
            _waker: waker,
        },
    ))
}

/// Sisi producer
#[derive(Clone)]
pub struct Notifier {
    waker: Arc<Waker>,
}

impl Notifier {
    #[inline]
    pub fn notify(&self) -> io::Result<()> {
        self.waker.wake()
    }
}

/// Sisi consumer
pub struct Waiter {
    poll: Poll,
    events: Events,
    // Waker harus hidup selama Poll; kalau fd-nya ditutup, wake yang sudah
    // dikirim ikut hilang
    _waker: Arc<Waker>,
}

impl Waiter {
    /// Tunggu notify paling lama `timeout`.
    ///
    /// Returns `true` jika dibangunkan, `false` jika timeout atau interrupted.
    pub fn wait(&mut self, timeout: Duration) -> io::Result<bool> {
        match self.poll.poll(&mut self.events, Some(timeout)) {
            Ok(()) => {}
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => return Ok(false),
            Err(e) => return Err(e),
        }

        Ok(self.events.iter().any(|event| event.token() == WAKE_TOKEN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_wait_times_out() {
        let (_notifier, mut waiter) = wake_signal().unwrap();

        let start = Instant::now();
        assert!(!waiter.wait(Duration::from_millis(5)).unwrap());
        assert!(start.elapsed() >= Duration::from_millis(4));
    }

    #[test]
    fn test_notify_wakes_waiter() {
        let (notifier, mut waiter) = wake_signal().unwrap();

        notifier.notify().unwrap();
        assert!(waiter.wait(Duration::from_secs(1)).unwrap());
    }

    #[test]
    fn test_wake_survives_dropped_notifier() {
        let (notifier, mut waiter) = wake_signal().unwrap();

        notifier.notify().unwrap();
        drop(notifier);
        assert!(waiter.wait(Duration::from_millis(200)).unwrap());
    }

    #[test]
    fn test_notify_from_other_thread() {
        let (notifier, mut waiter) = wake_signal().unwrap();

        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            notifier.notify().unwrap();
        });

        let start = Instant::now();
        let mut woken = false;
        while !woken && start.elapsed() < Duration::from_secs(5) {
            woken = waiter.wait(Duration::from_millis(100)).unwrap();
        }
        assert!(woken);
        handle.join().unwrap();
    }
}
