use crate::statistic::{Field, Statistic};
use crate::{ClockSource, Error, SampleCounter, TimeWeightedCounter};

/// One histogram bin: observations `x` with `lower <= x < upper` (the last
/// in-range bin also includes its upper edge).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    /// A number of observations, or a length of simulation time
    pub weight: f64,
}

#[derive(Debug)]
enum Weighting {
    /// Every observation weighs the same
    PerSample(SampleCounter),
    /// Each value weighs as long as it was held
    TimeWeighted(TimeWeightedCounter),
}

/// A histogram with equal-width bins between `lower_bound` and
/// `upper_bound`, plus buckets for values falling either side.
///
/// The time-weighted flavour treats its observations like a
/// [`TimeWeightedCounter`] does: the bins accumulate how much simulation
/// time was spent at each value.
#[derive(Debug)]
pub struct Histogram {
    label: String,
    lower_bound: f64,
    upper_bound: f64,
    bins: Vec<f64>,
    underflow: f64,
    overflow: f64,
    weighting: Weighting,
}

impl Histogram {
    /// A histogram of discrete samples
    pub fn per_sample(
        label: impl Into<String>,
        bin_count: usize,
        lower_bound: f64,
        upper_bound: f64,
    ) -> Result<Histogram, Error> {
        let label = label.into();
        let weighting = Weighting::PerSample(SampleCounter::new(label.clone()));
        Histogram::new(label, bin_count, lower_bound, upper_bound, weighting)
    }

    /// A histogram of a quantity held between events, weighted by time
    pub fn time_weighted(
        label: impl Into<String>,
        bin_count: usize,
        lower_bound: f64,
        upper_bound: f64,
        clock: impl ClockSource + 'static,
    ) -> Result<Histogram, Error> {
        let label = label.into();
        let weighting = Weighting::TimeWeighted(TimeWeightedCounter::new(label.clone(), clock));
        Histogram::new(label, bin_count, lower_bound, upper_bound, weighting)
    }

    fn new(
        label: String,
        bin_count: usize,
        lower_bound: f64,
        upper_bound: f64,
        weighting: Weighting,
    ) -> Result<Histogram, Error> {
        if bin_count == 0 {
            return Err(Error::InvalidParameter {
                name: "bin_count",
                value: 0.,
            });
        }
        if !lower_bound.is_finite() {
            return Err(Error::InvalidParameter {
                name: "lower_bound",
                value: lower_bound,
            });
        }
        if !upper_bound.is_finite() || upper_bound <= lower_bound {
            return Err(Error::InvalidParameter {
                name: "upper_bound",
                value: upper_bound,
            });
        }
        Ok(Histogram {
            label,
            lower_bound,
            upper_bound,
            bins: vec![0.; bin_count],
            underflow: 0.,
            overflow: 0.,
            weighting,
        })
    }

    pub fn is_time_weighted(&self) -> bool {
        matches!(self.weighting, Weighting::TimeWeighted(_))
    }

    pub fn bin_width(&self) -> f64 {
        (self.upper_bound - self.lower_bound) / self.bins.len() as f64
    }

    /// Records an observation.  Per-sample histograms give it weight one;
    /// time-weighted ones credit the previously held value with the time
    /// elapsed since the last observation.
    pub fn observe(&mut self, x: f64) -> Result<(), Error> {
        let (x, weight) = match &mut self.weighting {
            Weighting::PerSample(counter) => {
                counter.count(x);
                (x, 1.)
            }
            Weighting::TimeWeighted(counter) => {
                let (held, elapsed) = counter.hold(x)?;
                (held, elapsed as f64)
            }
        };
        self.add(x, weight);
        Ok(())
    }

    /// Adds `weight` to the bucket `x` belongs in, bypassing the moments.
    pub fn observe_weighted(&mut self, x: f64, weight: f64) {
        self.add(x, weight);
    }

    fn add(&mut self, x: f64, weight: f64) {
        if x < self.lower_bound {
            self.underflow += weight;
        } else if x <= self.upper_bound {
            let idx = ((x - self.lower_bound) / self.bin_width()).floor() as usize;
            let idx = idx.min(self.bins.len() - 1);
            self.bins[idx] += weight;
        } else {
            // x > upper_bound, or NaN
            self.overflow += weight;
        }
    }

    pub fn reset(&mut self) {
        self.bins.iter_mut().for_each(|w| *w = 0.);
        self.underflow = 0.;
        self.overflow = 0.;
        match &mut self.weighting {
            Weighting::PerSample(counter) => counter.reset(),
            Weighting::TimeWeighted(counter) => counter.reset(),
        }
    }

    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    pub fn bin(&self, idx: usize) -> Option<Bin> {
        let width = self.bin_width();
        let weight = *self.bins.get(idx)?;
        Some(Bin {
            lower: self.lower_bound + idx as f64 * width,
            upper: self.lower_bound + (idx + 1) as f64 * width,
            weight,
        })
    }

    pub fn underflow(&self) -> f64 {
        self.underflow
    }

    pub fn overflow(&self) -> f64 {
        self.overflow
    }

    /// The weight of everything observed, in range or not
    pub fn total_weight(&self) -> f64 {
        self.bins.iter().sum::<f64>() + self.underflow + self.overflow
    }

    fn moments(&self) -> &dyn Statistic {
        match &self.weighting {
            Weighting::PerSample(counter) => counter,
            Weighting::TimeWeighted(counter) => counter,
        }
    }
}

impl Statistic for Histogram {
    fn label(&self) -> &str {
        &self.label
    }
    fn kind(&self) -> &'static str {
        if self.is_time_weighted() {
            "continuous histogram"
        } else {
            "discrete histogram"
        }
    }
    fn observe(&mut self, x: f64) -> Result<(), Error> {
        Histogram::observe(self, x)
    }
    fn reset(&mut self) {
        Histogram::reset(self)
    }
    fn sample_count(&self) -> u64 {
        self.moments().sample_count()
    }
    fn mean(&self) -> f64 {
        self.moments().mean()
    }
    fn variance(&self) -> f64 {
        self.moments().variance()
    }
    fn summary(&self) -> Vec<(&'static str, Field)> {
        let mut fields = self.moment_fields();
        fields.push(("underflow", Field::Value(self.underflow)));
        fields.push(("overflow", Field::Value(self.overflow)));
        fields
    }
    fn bins(&self) -> Option<Vec<Bin>> {
        Some((0..self.bin_count()).filter_map(|idx| self.bin(idx)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_weighted::tests::ManualClock;
    use approx::*;

    #[test]
    fn bins_and_overflow() {
        let mut hist = Histogram::per_sample("waiting time", 4, 0., 80.).unwrap();
        for &x in &[10., 10., 79., 81.] {
            hist.observe(x).unwrap();
        }
        let weights = hist.bins().unwrap().iter().map(|b| b.weight).collect::<Vec<_>>();
        assert_eq!(weights, vec![2., 0., 0., 1.]);
        assert_eq!(hist.overflow(), 1.);
        assert_eq!(hist.underflow(), 0.);
        assert_eq!(hist.sample_count(), 4);
        assert_relative_eq!(hist.mean(), 45., max_relative = 1e-12);
    }

    #[test]
    fn edges() {
        let mut hist = Histogram::per_sample("service time", 4, 0., 80.).unwrap();
        hist.observe(-0.5).unwrap();
        hist.observe(0.).unwrap();
        hist.observe(20.).unwrap();
        hist.observe(80.).unwrap();
        hist.observe(f64::NAN).unwrap();
        assert_eq!(hist.underflow(), 1.);
        assert_eq!(hist.bin(0).unwrap().weight, 1.);
        assert_eq!(hist.bin(1).unwrap().weight, 1.);
        // The upper bound itself belongs to the last bin
        assert_eq!(hist.bin(3).unwrap().weight, 1.);
        assert_eq!(hist.overflow(), 1.);
        assert_eq!(hist.total_weight(), 5.);
        assert_eq!(
            hist.bin(1),
            Some(Bin {
                lower: 20.,
                upper: 40.,
                weight: 1.
            })
        );
        assert_eq!(hist.bin(4), None);
    }

    #[test]
    fn bad_range() {
        assert!(matches!(
            Histogram::per_sample("x", 4, 10., 10.),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            Histogram::per_sample("x", 0, 0., 10.),
            Err(Error::InvalidParameter { .. })
        ));
        assert!(matches!(
            Histogram::per_sample("x", 4, f64::NAN, 10.),
            Err(Error::InvalidParameter { name: "lower_bound", .. })
        ));
        assert!(matches!(
            Histogram::per_sample("x", 4, f64::NEG_INFINITY, 10.),
            Err(Error::InvalidParameter { name: "lower_bound", value }) if value == f64::NEG_INFINITY
        ));
        assert!(matches!(
            Histogram::per_sample("x", 4, 0., f64::INFINITY),
            Err(Error::InvalidParameter { name: "upper_bound", .. })
        ));
        assert!(matches!(
            Histogram::per_sample("x", 4, 10., 5.),
            Err(Error::InvalidParameter { name: "upper_bound", value }) if value == 5.
        ));
    }

    #[test]
    fn time_weighted() {
        let clock = ManualClock::default();
        let mut hist = Histogram::time_weighted("queue occupancy", 4, 0., 4., clock.clone()).unwrap();
        clock.set(10);
        hist.observe(2.).unwrap(); // 0 held on [0, 10)
        clock.set(15);
        hist.observe(1.).unwrap(); // 2 held on [10, 15)
        clock.set(18);
        hist.observe(9.).unwrap(); // 1 held on [15, 18)
        let weights = hist.bins().unwrap().iter().map(|b| b.weight).collect::<Vec<_>>();
        assert_eq!(weights, vec![10., 3., 5., 0.]);
        // 9 is still being held, so it hasn't been credited yet
        assert_eq!(hist.overflow(), 0.);
        assert_relative_eq!(hist.mean(), 13. / 18.);
        assert_eq!(hist.kind(), "continuous histogram");

        clock.set(16);
        assert!(matches!(
            hist.observe(0.),
            Err(Error::NonMonotonicTime { last: 18, now: 16 })
        ));
        assert_eq!(hist.total_weight(), 18.);
    }

    #[test]
    fn reset() {
        let clock = ManualClock::default();
        let mut hist = Histogram::time_weighted("server utilization", 2, 0., 2., clock.clone()).unwrap();
        clock.set(3);
        hist.observe(1.).unwrap();
        clock.set(7);
        hist.reset();
        assert_eq!(hist.total_weight(), 0.);
        assert_eq!(hist.sample_count(), 0);
        assert_eq!(hist.mean(), 0.);
        assert_eq!(hist.variance(), 0.);
        clock.set(9);
        hist.observe(1.).unwrap();
        // Only [7, 9) counts, at the post-reset value of zero
        assert_eq!(hist.bin(0).unwrap().weight, 2.);
    }

    #[test]
    fn observe_weighted() {
        let mut hist = Histogram::per_sample("x", 2, 0., 2.).unwrap();
        hist.observe_weighted(1.5, 2.5);
        assert_eq!(hist.bin(1).unwrap().weight, 2.5);
        assert_eq!(hist.sample_count(), 0);
    }
}
