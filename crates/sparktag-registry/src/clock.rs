//! Timestamp sources for bulk reads

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use sparktag_core::Timestamp;

/// Supplies the tick stamped on each bulk read
pub trait TimestampSource {
    fn now(&mut self) -> Timestamp;
}

impl<F> TimestampSource for F
where
    F: FnMut() -> u64,
{
    fn now(&mut self) -> Timestamp {
        Timestamp::from_millis(self())
    }
}

/// Wall clock in epoch milliseconds
/// INVARIANT: never moves backwards, even if the system clock is stepped
#[derive(Debug, Default)]
pub struct SystemClock {
    last: Timestamp,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock::default()
    }
}

impl TimestampSource for SystemClock {
    fn now(&mut self) -> Timestamp {
        self.last = self.last.max(Timestamp::now());
        self.last
    }
}

/// Externally driven clock, shared between a test and the registry
#[derive(Clone, Debug, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        ManualClock(Rc::new(Cell::new(start_ms)))
    }

    pub fn set(&self, ms: u64) {
        self.0.set(ms);
    }

    pub fn advance(&self, dt: Duration) {
        self.0.set(self.get().saturating_add(dt).as_millis());
    }

    pub fn get(&self) -> Timestamp {
        Timestamp::from_millis(self.0.get())
    }
}

impl TimestampSource for ManualClock {
    fn now(&mut self) -> Timestamp {
        self.get()
    }
}
