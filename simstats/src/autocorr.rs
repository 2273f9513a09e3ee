use crate::statistic::{Field, Statistic};
use crate::{Accumulator, Error};
use std::collections::VecDeque;

/// Lag-k autocorrelation of a sequence of batch means.
///
/// Confidence intervals from batch means assume the batches are
/// independent.  A large |ρ| at the configured lag says the batches are
/// too short for that to hold.
///
/// The estimate covers every observation since the last reset, but memory
/// is bounded by the lag: besides running sums we keep only the first and
/// the most recent `lag` values, which is enough to correct the lagged
/// cross-products for the ends of the sequence.
#[derive(Clone, Debug)]
pub struct AutocorrelationEstimator {
    label: String,
    lag: usize,
    /// The first observation; all sums are taken around it
    shift: f64,
    /// Σy, Σy² for y = x - shift
    moments: Accumulator,
    /// `lagged[d - 1]` is Σ y_i·y_(i+d)
    lagged: Vec<f64>,
    /// The first `lag` values of y
    head: Vec<f64>,
    /// The last `lag` values of y, oldest first
    window: VecDeque<f64>,
}

impl AutocorrelationEstimator {
    pub fn new(label: impl Into<String>, lag: usize) -> Result<Self, Error> {
        if lag == 0 {
            return Err(Error::InvalidParameter {
                name: "lag",
                value: 0.,
            });
        }
        Ok(AutocorrelationEstimator {
            label: label.into(),
            lag,
            shift: 0.,
            moments: Accumulator::default(),
            lagged: vec![0.; lag],
            head: Vec::with_capacity(lag),
            window: VecDeque::with_capacity(lag),
        })
    }

    pub fn lag(&self) -> usize {
        self.lag
    }

    pub fn observe(&mut self, batch_mean: f64) {
        if self.moments.sample_count() == 0 {
            self.shift = batch_mean;
        }
        let y = batch_mean - self.shift;
        for (d, prev) in self.window.iter().rev().enumerate() {
            self.lagged[d] += y * prev;
        }
        self.moments.count(y);
        if self.head.len() < self.lag {
            self.head.push(y);
        }
        if self.window.len() == self.lag {
            self.window.pop_front();
        }
        self.window.push_back(y);
    }

    pub fn reset(&mut self) {
        self.shift = 0.;
        self.moments.reset();
        self.lagged.iter_mut().for_each(|x| *x = 0.);
        self.head.clear();
        self.window.clear();
    }

    pub fn sample_count(&self) -> u64 {
        self.moments.sample_count()
    }

    pub fn mean(&self) -> f64 {
        if self.sample_count() == 0 {
            0.
        } else {
            self.shift + self.moments.mean()
        }
    }

    pub fn variance(&self) -> f64 {
        self.moments.variance()
    }

    /// The sample autocorrelation at lag `k`:
    ///
    /// ρ_k = Σ_{i=1}^{n-k} (x_i - x̄)(x_{i+k} - x̄) / Σ_{i=1}^{n} (x_i - x̄)²
    pub fn autocorrelation(&self, k: usize) -> Result<f64, Error> {
        if k > self.lag {
            return Err(Error::LagOutOfRange {
                lag: k,
                max: self.lag,
            });
        }
        let n = self.sample_count();
        if n <= k as u64 {
            return Err(Error::InsufficientSamples {
                needed: k as u64 + 1,
                got: n,
            });
        }
        let nf = n as f64;
        let sum = self.moments.sum_pow1();
        let mean = sum / nf;
        let denom = self.moments.sum_pow2() - nf * mean * mean;
        if denom <= 1e-12 * self.moments.sum_pow2() {
            return Err(Error::ZeroVariance);
        }
        if k == 0 {
            return Ok(1.);
        }
        let head: f64 = self.head[..k].iter().sum();
        let tail: f64 = self.window.iter().rev().take(k).sum();
        let numer = self.lagged[k - 1] - mean * (2. * sum - head - tail) + (nf - k as f64) * mean * mean;
        Ok(numer / denom)
    }
}

impl Statistic for AutocorrelationEstimator {
    fn label(&self) -> &str {
        &self.label
    }
    fn kind(&self) -> &'static str {
        "batch means autocorrelation counter"
    }
    fn observe(&mut self, x: f64) -> Result<(), Error> {
        AutocorrelationEstimator::observe(self, x);
        Ok(())
    }
    fn reset(&mut self) {
        AutocorrelationEstimator::reset(self)
    }
    fn sample_count(&self) -> u64 {
        AutocorrelationEstimator::sample_count(self)
    }
    fn mean(&self) -> f64 {
        AutocorrelationEstimator::mean(self)
    }
    fn variance(&self) -> f64 {
        AutocorrelationEstimator::variance(self)
    }
    fn summary(&self) -> Vec<(&'static str, Field)> {
        let mut fields = self.moment_fields();
        fields.push(("lag", Field::Count(self.lag as u64)));
        fields.push(("autocorrelation_lag_1", self.autocorrelation(1).into()));
        fields.push(("autocorrelation", self.autocorrelation(self.lag).into()));
        fields
    }
}
