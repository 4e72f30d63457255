use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Time source for a `Game`.
pub trait Clock {
    /// Monotonic milliseconds since an arbitrary fixed origin.
    fn now_ms(&self) -> u64;
    /// Wall-clock time, read once per session start.
    fn wall(&self) -> DateTime<Utc>;
}

/// Real time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    fn wall(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Virtual time advanced by hand. Clones share the same counter, so a test
/// (or the simulator) can keep a handle while the `Game` owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    ms: Arc<AtomicU64>,
    wall: DateTime<Utc>,
}

impl ManualClock {
    pub fn new(wall: DateTime<Utc>) -> Self {
        Self {
            ms: Arc::new(AtomicU64::new(0)),
            wall,
        }
    }

    pub fn set(&self, ms: u64) {
        self.ms.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::SeqCst)
    }

    /// The fixed origin plus the virtual time elapsed so far.
    fn wall(&self) -> DateTime<Utc> {
        crate::session::offset_ms(self.wall, self.now_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_clones_share_time() {
        let wall = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let a = ManualClock::new(wall);
        let b = a.clone();
        a.advance(250);
        assert_eq!(b.now_ms(), 250);
        b.set(1000);
        assert_eq!(a.now_ms(), 1000);
        assert_eq!(a.wall(), wall + chrono::Duration::seconds(1));
    }

    #[test]
    fn system_clock_is_monotonic() {
        let c = SystemClock::new();
        let t0 = c.now_ms();
        let t1 = c.now_ms();
        assert!(t1 >= t0);
    }
}
