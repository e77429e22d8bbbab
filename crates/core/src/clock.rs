//! Clock abstraction.
//!
//! All time reads in the consensus core go through a [`Clock`] handle:
//! `now()` for the current time and `sleep(duration)` for a completion
//! signal. Production uses [`SystemClock`] (wall clock + tokio timer); tests
//! use [`FakeClock`], which only moves when advanced and wakes registered
//! sleepers deterministically. The state machine never reads wall time
//! directly.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;

/// A boxed completion signal returned by [`Clock::sleep`].
pub type SleepFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Time capability: monotonic-enough `now()` plus scheduled wakeups.
///
/// Times are durations since the UNIX epoch, the common currency between
/// event timestamps and block header timestamps.
pub trait Clock: Send + Sync + 'static {
    /// Current time as a duration since the UNIX epoch.
    fn now(&self) -> Duration;

    /// A future that completes after `duration` has elapsed on this clock.
    fn sleep(&self, duration: Duration) -> SleepFuture;
}

/// Production clock: wall time and the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX epoch")
    }

    fn sleep(&self, duration: Duration) -> SleepFuture {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// A controllable clock for tests.
///
/// `now()` returns the last value set; `sleep` registers a sleeper that is
/// woken when [`FakeClock::advance`] moves time past its deadline.
#[derive(Debug)]
pub struct FakeClock {
    inner: Mutex<FakeClockInner>,
}

#[derive(Debug)]
struct FakeClockInner {
    now: Duration,
    sleepers: Vec<Sleeper>,
}

#[derive(Debug)]
struct Sleeper {
    deadline: Duration,
    waker: oneshot::Sender<()>,
}

impl FakeClock {
    /// Create a fake clock starting at `start`.
    pub fn new(start: Duration) -> Self {
        Self {
            inner: Mutex::new(FakeClockInner {
                now: start,
                sleepers: Vec::new(),
            }),
        }
    }

    /// Advance the clock, waking every sleeper whose deadline has passed.
    pub fn advance(&self, duration: Duration) {
        let due = {
            let mut inner = self.inner.lock().expect("fake clock lock poisoned");
            inner.now += duration;
            let now = inner.now;
            let (due, pending): (Vec<_>, Vec<_>) = inner
                .sleepers
                .drain(..)
                .partition(|s| s.deadline <= now);
            inner.sleepers = pending;
            due
        };
        for sleeper in due {
            // The sleeping task may have been dropped; that's fine.
            let _ = sleeper.waker.send(());
        }
    }

    /// Number of sleepers currently waiting, for test assertions.
    pub fn sleeper_count(&self) -> usize {
        self.inner.lock().expect("fake clock lock poisoned").sleepers.len()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        self.inner.lock().expect("fake clock lock poisoned").now
    }

    fn sleep(&self, duration: Duration) -> SleepFuture {
        let (tx, rx) = oneshot::channel();
        {
            let mut inner = self.inner.lock().expect("fake clock lock poisoned");
            if duration.is_zero() {
                let _ = tx.send(());
            } else {
                let deadline = inner.now + duration;
                inner.sleepers.push(Sleeper {
                    deadline,
                    waker: tx,
                });
            }
        }
        Box::pin(async move {
            // Sender dropped means the clock went away; resolve either way.
            let _ = rx.await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_clock_advances() {
        let clock = FakeClock::new(Duration::from_secs(100));
        assert_eq!(clock.now(), Duration::from_secs(100));
        clock.advance(Duration::from_secs(5));
        assert_eq!(clock.now(), Duration::from_secs(105));
    }

    #[tokio::test]
    async fn test_fake_clock_wakes_due_sleepers() {
        let clock = FakeClock::new(Duration::from_secs(100));
        let sleep = clock.sleep(Duration::from_secs(10));
        assert_eq!(clock.sleeper_count(), 1);

        clock.advance(Duration::from_secs(9));
        assert_eq!(clock.sleeper_count(), 1);

        clock.advance(Duration::from_secs(1));
        assert_eq!(clock.sleeper_count(), 0);
        sleep.await;
    }

    #[tokio::test]
    async fn test_fake_clock_zero_sleep_is_immediate() {
        let clock = FakeClock::new(Duration::from_secs(100));
        clock.sleep(Duration::ZERO).await;
    }

    #[tokio::test]
    async fn test_system_clock_now_is_nonzero() {
        assert!(SystemClock.now() > Duration::ZERO);
    }
}
