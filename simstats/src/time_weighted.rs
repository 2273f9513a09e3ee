use crate::statistic::{Field, Statistic};
use crate::{Accumulator, ClockSource, Error};
use std::fmt;

/// A counter for quantities which hold their value between events, such
/// as queue length or server occupancy.
///
/// Each call to [`count`](TimeWeightedCounter::count) marks the moment the
/// quantity changes.  The previously held value is integrated over the
/// simulation time elapsed since the previous call, so the mean and
/// variance are those of a right-continuous step function over
/// `[first_sample_time, last_sample_time]`.
pub struct TimeWeightedCounter {
    label: String,
    moments: Accumulator,
    clock: Box<dyn ClockSource>,
    first_sample_time: i64,
    last_sample_time: i64,
    /// The value held on `[last_sample_time, now)`
    last_sample_value: f64,
}

impl TimeWeightedCounter {
    /// The counter starts empty, anchored at the clock's current reading.
    pub fn new(label: impl Into<String>, clock: impl ClockSource + 'static) -> TimeWeightedCounter {
        let now = clock.now();
        TimeWeightedCounter {
            label: label.into(),
            moments: Accumulator::default(),
            clock: Box::new(clock),
            first_sample_time: now,
            last_sample_time: now,
            last_sample_value: 0.,
        }
    }

    /// Records that the quantity changed to `x` at the current clock time.
    pub fn count(&mut self, x: f64) -> Result<(), Error> {
        self.hold(x).map(|_| ())
    }

    /// Like `count`, but returns the previously held value and how long it
    /// was held for.
    pub(crate) fn hold(&mut self, x: f64) -> Result<(f64, i64), Error> {
        let now = self.clock.now();
        if now < self.last_sample_time {
            return Err(Error::NonMonotonicTime {
                last: self.last_sample_time,
                now,
            });
        }
        let held = self.last_sample_value;
        let elapsed = now - self.last_sample_time;
        self.moments.integrate(held, elapsed as f64);
        self.last_sample_value = x;
        self.last_sample_time = now;
        Ok((held, elapsed))
    }

    /// Empties the counter and re-anchors it at the current clock time.
    pub fn reset(&mut self) {
        let now = self.clock.now();
        self.moments.reset();
        self.first_sample_time = now;
        self.last_sample_time = now;
        self.last_sample_value = 0.;
    }

    pub fn sample_count(&self) -> u64 {
        self.moments.sample_count()
    }

    /// The simulation time covered so far
    pub fn interval(&self) -> i64 {
        self.last_sample_time - self.first_sample_time
    }

    pub fn first_sample_time(&self) -> i64 {
        self.first_sample_time
    }

    pub fn last_sample_time(&self) -> i64 {
        self.last_sample_time
    }

    pub fn last_sample_value(&self) -> f64 {
        self.last_sample_value
    }

    /// ∫x dt
    pub fn integral(&self) -> f64 {
        self.moments.sum_pow1()
    }

    pub fn mean(&self) -> f64 {
        let interval = self.interval();
        if interval > 0 {
            self.moments.sum_pow1() / interval as f64
        } else {
            0.
        }
    }

    pub fn variance(&self) -> f64 {
        let interval = self.interval();
        if interval > 0 {
            let mean = self.mean();
            self.moments.sum_pow2() / interval as f64 - mean * mean
        } else {
            0.
        }
    }
}

impl fmt::Debug for TimeWeightedCounter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TimeWeightedCounter")
            .field("label", &self.label)
            .field("moments", &self.moments)
            .field("first_sample_time", &self.first_sample_time)
            .field("last_sample_time", &self.last_sample_time)
            .field("last_sample_value", &self.last_sample_value)
            .finish()
    }
}

impl Statistic for TimeWeightedCounter {
    fn label(&self) -> &str {
        &self.label
    }
    fn kind(&self) -> &'static str {
        "continuous counter"
    }
    fn observe(&mut self, x: f64) -> Result<(), Error> {
        self.count(x)
    }
    fn reset(&mut self) {
        TimeWeightedCounter::reset(self)
    }
    fn sample_count(&self) -> u64 {
        TimeWeightedCounter::sample_count(self)
    }
    fn mean(&self) -> f64 {
        TimeWeightedCounter::mean(self)
    }
    fn variance(&self) -> f64 {
        TimeWeightedCounter::variance(self)
    }
    fn summary(&self) -> Vec<(&'static str, Field)> {
        let mut fields = self.moment_fields();
        fields.push(("interval", Field::Count(self.interval() as u64)));
        fields
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// A clock the test can set to anything, including the past
    #[derive(Clone, Default)]
    pub(crate) struct ManualClock(pub(crate) Rc<Cell<i64>>);
    impl ManualClock {
        pub(crate) fn set(&self, t: i64) {
            self.0.set(t)
        }
    }
    impl ClockSource for ManualClock {
        fn now(&self) -> i64 {
            self.0.get()
        }
    }

    #[test]
    fn step_function() {
        let clock = ManualClock::default();
        let mut counter = TimeWeightedCounter::new("queue occupancy", clock.clone());
        clock.set(10);
        counter.count(5.).unwrap();
        // Nothing was held before the first sample
        assert_eq!(counter.integral(), 0.);
        clock.set(15);
        counter.count(3.).unwrap();
        assert_eq!(counter.integral(), 25.);
        assert_eq!(counter.sample_count(), 2);
        assert_eq!(counter.interval(), 15);
        assert_relative_eq!(counter.mean(), 25. / 15.);
        // Σx²dt = 25·5 = 125
        assert_relative_eq!(counter.variance(), 125. / 15. - (25. / 15.) * (25. / 15.));
        assert_eq!(counter.last_sample_value(), 3.);
    }

    #[test]
    fn server_utilization() {
        // Busy on [2, 6) and [9, 10): utilization 5/10
        let clock = ManualClock::default();
        let mut busy = TimeWeightedCounter::new("server utilization", clock.clone());
        for &(t, x) in &[(2, 1.), (6, 0.), (9, 1.), (10, 0.)] {
            clock.set(t);
            busy.count(x).unwrap();
        }
        assert_relative_eq!(busy.mean(), 0.5);
        assert_relative_eq!(busy.variance(), 0.25);
    }

    #[test]
    fn reset_reanchors() {
        let clock = ManualClock::default();
        let mut counter = TimeWeightedCounter::new("queue occupancy", clock.clone());
        clock.set(5);
        counter.count(4.).unwrap();
        clock.set(20);
        counter.reset();
        assert_eq!(counter.sample_count(), 0);
        assert_eq!(counter.mean(), 0.);
        assert_eq!(counter.variance(), 0.);
        assert_eq!(counter.first_sample_time(), 20);
        assert_eq!(counter.last_sample_time(), 20);
        assert_eq!(counter.last_sample_value(), 0.);

        // Warm-up history is gone; the held value restarts at zero
        clock.set(30);
        counter.count(2.).unwrap();
        clock.set(40);
        counter.count(0.).unwrap();
        assert_relative_eq!(counter.mean(), 1.);
    }

    #[test]
    fn zero_elapsed_time() {
        let clock = ManualClock::default();
        let mut counter = TimeWeightedCounter::new("queue occupancy", clock.clone());
        counter.count(7.).unwrap();
        counter.count(8.).unwrap();
        assert_eq!(counter.sample_count(), 2);
        assert_eq!(counter.mean(), 0.);
        assert_eq!(counter.variance(), 0.);
    }

    #[test]
    fn rejects_time_going_backwards() {
        let clock = ManualClock::default();
        let mut counter = TimeWeightedCounter::new("queue occupancy", clock.clone());
        clock.set(10);
        counter.count(1.).unwrap();
        clock.set(5);
        let e = counter.count(2.).unwrap_err();
        assert!(matches!(e, Error::NonMonotonicTime { last: 10, now: 5 }));
        // The rejected call left no trace
        assert_eq!(counter.sample_count(), 1);
        assert_eq!(counter.last_sample_time(), 10);
        assert_eq!(counter.last_sample_value(), 1.);
    }
}
