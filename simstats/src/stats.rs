use crate::statistic::{Field, Statistic};
use crate::Error;

/// Raw first and second moments of a stream of observations.
///
/// On its own every observation has weight one.  Time-weighted counters use
/// [`Accumulator::integrate`] to weight each value by how long it was held.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Accumulator {
    /// Σx (or Σx·w)
    sum_pow1: f64,
    /// Σx² (or Σx²·w)
    sum_pow2: f64,
    /// the number of samples seen so far
    sample_count: u64,
}

impl Accumulator {
    pub fn count(&mut self, x: f64) {
        self.integrate(x, 1.);
    }

    pub(crate) fn integrate(&mut self, x: f64, weight: f64) {
        self.sum_pow1 += x * weight;
        self.sum_pow2 += x * x * weight;
        self.sample_count += 1;
    }

    pub fn reset(&mut self) {
        *self = Accumulator::default();
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn sum_pow1(&self) -> f64 {
        self.sum_pow1
    }

    pub fn sum_pow2(&self) -> f64 {
        self.sum_pow2
    }

    /// Zero when empty, so reports can be produced at any point in a run.
    pub fn mean(&self) -> f64 {
        if self.sample_count > 0 {
            self.sum_pow1 / self.sample_count as f64
        } else {
            0.
        }
    }

    /// The population variance, Σx²/n - mean².  Zero when empty.
    pub fn variance(&self) -> f64 {
        if self.sample_count > 0 {
            let mean = self.mean();
            self.sum_pow2 / self.sample_count as f64 - mean * mean
        } else {
            0.
        }
    }
}

impl Extend<f64> for Accumulator {
    fn extend<T: IntoIterator<Item = f64>>(&mut self, iter: T) {
        for x in iter {
            self.count(x);
        }
    }
}

/// Mean and spread of unweighted samples, by Welford's online algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct RunningMoments {
    count: u64,
    mean: f64,
    /// Σ(x - mean)²
    m2: f64,
}

impl RunningMoments {
    pub fn update(&mut self, x: f64) {
        self.count += 1;
        let delta1 = x - self.mean; // diff from the old mean
        self.mean += delta1 / self.count as f64;
        let delta2 = x - self.mean; // diff from the new mean
        self.m2 += delta1 * delta2;
    }

    pub fn reset(&mut self) {
        *self = RunningMoments::default();
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Zero when empty
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// The population variance.  Zero when empty.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.
        } else {
            self.m2 / self.count as f64
        }
    }

    /// With Bessel's correction; `None` with fewer than two samples
    pub fn sample_variance(&self) -> Option<f64> {
        if self.count < 2 {
            None
        } else {
            Some(self.m2 / (self.count - 1) as f64)
        }
    }
}

/// A counter where each observation is one unweighted sample, eg. the
/// waiting time of one customer.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleCounter {
    label: String,
    /// Raw sums
    moments: Accumulator,
    /// Mean and variance come from here
    spread: RunningMoments,
    min: f64,
    max: f64,
}

impl SampleCounter {
    pub fn new(label: impl Into<String>) -> SampleCounter {
        SampleCounter {
            label: label.into(),
            moments: Accumulator::default(),
            spread: RunningMoments::default(),
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    pub fn count(&mut self, x: f64) {
        self.moments.count(x);
        self.spread.update(x);
        self.min = self.min.min(x);
        self.max = self.max.max(x);
    }

    pub fn reset(&mut self) {
        self.moments.reset();
        self.spread.reset();
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
    }

    pub fn moments(&self) -> &Accumulator {
        &self.moments
    }

    pub fn sample_count(&self) -> u64 {
        self.moments.sample_count()
    }

    pub fn mean(&self) -> f64 {
        self.spread.mean()
    }

    pub fn variance(&self) -> f64 {
        self.spread.variance()
    }

    /// The unbiased estimate of the population variance, with Bessel's
    /// correction.  `None` with fewer than two samples.
    pub fn sample_variance(&self) -> Option<f64> {
        self.spread.sample_variance()
    }

    /// `None` when empty
    pub fn min(&self) -> Option<f64> {
        if self.sample_count() == 0 {
            None
        } else {
            Some(self.min)
        }
    }

    /// `None` when empty
    pub fn max(&self) -> Option<f64> {
        if self.sample_count() == 0 {
            None
        } else {
            Some(self.max)
        }
    }
}

impl Statistic for SampleCounter {
    fn label(&self) -> &str {
        &self.label
    }
    fn kind(&self) -> &'static str {
        "discrete counter"
    }
    fn observe(&mut self, x: f64) -> Result<(), Error> {
        self.count(x);
        Ok(())
    }
    fn reset(&mut self) {
        SampleCounter::reset(self)
    }
    fn sample_count(&self) -> u64 {
        SampleCounter::sample_count(self)
    }
    fn mean(&self) -> f64 {
        SampleCounter::mean(self)
    }
    fn variance(&self) -> f64 {
        SampleCounter::variance(self)
    }
    fn summary(&self) -> Vec<(&'static str, Field)> {
        let mut fields = self.moment_fields();
        fields.push(("min", self.min().into()));
        fields.push(("max", self.max().into()));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::*;

    #[test]
    fn moments() {
        let mut acc = Accumulator::default();
        acc.extend(vec![1.0_f64, 2., 3.]);
        assert_eq!(acc.sample_count(), 3);
        assert_eq!(acc.mean(), 2.);
        assert_relative_eq!(acc.variance(), 2. / 3., max_relative = 1e-12);

        let mut acc = Accumulator::default();
        acc.extend(vec![0.0_f64, -2., 2.]);
        assert_eq!(acc.mean(), 0.);
        assert_relative_eq!(acc.variance(), 8. / 3., max_relative = 1e-12);

        let mut acc = Accumulator::default();
        acc.extend((0..=100).map(f64::from));
        assert_eq!(acc.sample_count(), 101);
        assert_relative_eq!(acc.mean(), 50.);
        assert_relative_eq!(acc.variance(), 850., max_relative = 1e-12);
    }

    #[test]
    fn empty_is_zero() {
        let acc = Accumulator::default();
        assert_eq!(acc.sample_count(), 0);
        assert_eq!(acc.mean(), 0.);
        assert_eq!(acc.variance(), 0.);
    }

    #[test]
    fn reset() {
        let mut acc = Accumulator::default();
        acc.extend(vec![3.0_f64, 7., 11.]);
        acc.reset();
        assert_eq!(acc, Accumulator::default());

        let mut counter = SampleCounter::new("waiting time");
        counter.count(4.);
        counter.count(9.);
        counter.reset();
        assert_eq!(counter.sample_count(), 0);
        assert_eq!(counter.mean(), 0.);
        assert_eq!(counter.variance(), 0.);
        assert_eq!(counter.min(), None);
        assert_eq!(counter.max(), None);
    }

    #[test]
    fn sample_counter() {
        let mut counter = SampleCounter::new("service time");
        assert_eq!(counter.sample_variance(), None);
        for x in &[2., 4., 4., 4., 5., 5., 7., 9.] {
            counter.count(*x);
        }
        assert_eq!(counter.sample_count(), 8);
        assert_relative_eq!(counter.mean(), 5., max_relative = 1e-12);
        assert_relative_eq!(counter.variance(), 4., max_relative = 1e-12);
        assert_relative_eq!(counter.sample_variance().unwrap(), 32. / 7., max_relative = 1e-12);
        assert_eq!(counter.min(), Some(2.));
        assert_eq!(counter.max(), Some(9.));
    }

    #[test]
    fn large_offset() {
        // Batch means of a long run: big values, small spread
        let xs = [1e9 + 4., 1e9 + 7., 1e9 + 13., 1e9 + 16.];
        let mut counter = SampleCounter::new("batch means");
        for x in &xs {
            counter.count(*x);
        }
        assert_eq!(counter.mean(), 1e9 + 10.);
        assert_relative_eq!(counter.variance(), 22.5, max_relative = 1e-9);
        assert_relative_eq!(counter.sample_variance().unwrap(), 30., max_relative = 1e-9);

        // The raw sums can't resolve a spread this small
        let mut acc = Accumulator::default();
        acc.extend(xs.iter().copied());
        assert!((acc.variance() - 22.5).abs() > 1e-3);
    }

    #[test]
    fn report() {
        let mut counter = SampleCounter::new("service time");
        counter.count(1.);
        counter.count(3.);
        assert_eq!(
            counter.report(),
            "service time (discrete counter)\n\
             \tcount: 2\n\
             \tmean: 2\n\
             \tvariance: 1\n\
             \tmin: 1\n\
             \tmax: 3\n"
        );
        assert_eq!(counter.report(), counter.report());
    }
}
