use std::sync::atomic::{AtomicI64, Ordering};

use time::OffsetDateTime;

///Clock is the only source of "now" for the exchange.
///
///Anything that depends on the current time, the VWAP window most obviously, asks the clock
///rather than reading the system time directly. The server runs on [SystemClock] while tests
///use [FixedClock] so that windows can be positioned exactly. Times are unix seconds, UTC.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        OffsetDateTime::now_utc().unix_timestamp()
    }
}

///Clock that only moves when told to. Interior mutability means a shared reference held by an
///exchange can still be moved forward by the test that built it.
#[derive(Debug)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn tick(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Clock, FixedClock, SystemClock};

    #[test]
    fn test_that_fixed_clock_only_moves_when_ticked() {
        let clock = FixedClock::new(100);
        assert!(clock.now() == 100);
        clock.tick(5);
        assert!(clock.now() == 105);
        clock.set(1);
        assert!(clock.now() == 1);
    }

    #[test]
    fn test_that_shared_clock_sees_ticks_from_owner() {
        let clock = Arc::new(FixedClock::new(0));
        let shared: Arc<dyn Clock> = clock.clone();
        clock.tick(300);
        assert!(shared.now() == 300);
    }

    #[test]
    fn test_that_system_clock_is_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
