use crate::Error;
use std::cell::Cell;
use std::rc::Rc;

/// Something which knows the current logical simulation time.
///
/// Readings must never decrease over the life of a run.  Time-weighted
/// statistics read the clock themselves, so they can't be fed a
/// timestamp which disagrees with the simulator's.
pub trait ClockSource {
    fn now(&self) -> i64;
}

/// The simulation clock.
///
/// Cloning gives another handle onto the same clock: the simulator keeps
/// one to advance time, and every time-weighted statistic keeps one to
/// read it.
#[derive(Clone, Debug, Default)]
pub struct SimClock {
    now: Rc<Cell<i64>>,
}

impl SimClock {
    pub fn new() -> SimClock {
        SimClock::starting_at(0)
    }

    pub fn starting_at(t: i64) -> SimClock {
        SimClock {
            now: Rc::new(Cell::new(t)),
        }
    }

    /// Moves the clock forward to `t`.  Moving it backwards is refused.
    pub fn advance_to(&self, t: i64) -> Result<(), Error> {
        let last = self.now.get();
        if t < last {
            return Err(Error::NonMonotonicTime { last, now: t });
        }
        self.now.set(t);
        Ok(())
    }
}

impl ClockSource for SimClock {
    fn now(&self) -> i64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_share_time() {
        let clock = SimClock::new();
        let reader = clock.clone();
        clock.advance_to(42).unwrap();
        assert_eq!(reader.now(), 42);
        clock.advance_to(42).unwrap();
        assert_eq!(reader.now(), 42);
    }

    #[test]
    fn refuses_to_rewind() {
        let clock = SimClock::starting_at(100);
        let e = clock.advance_to(99).unwrap_err();
        assert!(matches!(e, Error::NonMonotonicTime { last: 100, now: 99 }));
        assert_eq!(clock.now(), 100);
    }
}
