use crate::statistic::{Field, Statistic};
use crate::{student_t, Error, SampleCounter};
use std::fmt;

#[derive(Clone, PartialEq, Debug, Copy)]
pub struct ConfidenceInterval {
    pub center: f64,
    pub radius: f64,
}

impl fmt::Display for ConfidenceInterval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(p) = f.precision() {
            write!(f, "{:.*} ± {:.*}", p, self.center, p, self.radius)
        } else {
            write!(f, "{} ± {}", self.center, self.radius)
        }
    }
}

fn check_level(level: f64) -> Result<(), Error> {
    if level > 0. && level < 1. {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name: "confidence_level",
            value: level,
        })
    }
}

/// Confidence intervals for the mean of a simulated quantity, by the
/// method of batch means.
///
/// Each observation is the mean of one batch.  The batch means are
/// assumed to be independent and approximately normal, so the interval
/// for their mean comes from Student's t-distribution with `n - 1`
/// degrees of freedom.
#[derive(Clone, Debug)]
pub struct BatchConfidenceEstimator {
    batches: SampleCounter,
    /// The level used by `report`
    confidence_level: f64,
}

impl BatchConfidenceEstimator {
    pub fn new(label: impl Into<String>, confidence_level: f64) -> Result<Self, Error> {
        check_level(confidence_level)?;
        Ok(BatchConfidenceEstimator {
            batches: SampleCounter::new(label),
            confidence_level,
        })
    }

    pub fn observe(&mut self, batch_mean: f64) {
        self.batches.count(batch_mean);
    }

    pub fn reset(&mut self) {
        self.batches.reset();
    }

    pub fn confidence_level(&self) -> f64 {
        self.confidence_level
    }

    pub fn batch_count(&self) -> u64 {
        self.batches.sample_count()
    }

    pub fn mean(&self) -> f64 {
        self.batches.mean()
    }

    pub fn variance(&self) -> f64 {
        self.batches.variance()
    }

    /// An estimate of the standard deviation of `mean`: s/√n.
    pub fn std_error(&self) -> Result<f64, Error> {
        let n = self.batch_count();
        let var = self
            .batches
            .sample_variance()
            .ok_or(Error::InsufficientSamples { needed: 2, got: n })?;
        Ok((var / n as f64).sqrt())
    }

    /// The half-width of the two-sided confidence interval at `level`
    /// (eg. 0.95), ie. the `r` in `mean ± r`.
    pub fn confidence_half_width(&self, level: f64) -> Result<f64, Error> {
        let std_error = self.std_error()?;
        check_level(level)?;
        let dof = (self.batch_count() - 1) as f64;
        Ok(student_t::critical_value(level, dof) * std_error)
    }

    pub fn confidence_interval(&self, level: f64) -> Result<ConfidenceInterval, Error> {
        Ok(ConfidenceInterval {
            center: self.mean(),
            radius: self.confidence_half_width(level)?,
        })
    }

    /// The half-width relative to the magnitude of the mean.
    pub fn relative_error(&self, level: f64) -> Result<f64, Error> {
        let half_width = self.confidence_half_width(level)?;
        let mean = self.mean();
        if mean == 0. {
            return Err(Error::UndefinedRelativeError);
        }
        Ok(half_width / mean.abs())
    }

    fn interval_fields(&self) -> Vec<(&'static str, Field)> {
        let level = self.confidence_level;
        vec![
            ("confidence_level", Field::Value(level)),
            ("half_width", self.confidence_half_width(level).into()),
            ("relative_error", self.relative_error(level).into()),
        ]
    }
}

impl Statistic for BatchConfidenceEstimator {
    fn label(&self) -> &str {
        self.batches.label()
    }
    fn kind(&self) -> &'static str {
        "batch means confidence counter"
    }
    fn observe(&mut self, x: f64) -> Result<(), Error> {
        BatchConfidenceEstimator::observe(self, x);
        Ok(())
    }
    fn reset(&mut self) {
        BatchConfidenceEstimator::reset(self)
    }
    fn sample_count(&self) -> u64 {
        self.batch_count()
    }
    fn mean(&self) -> f64 {
        BatchConfidenceEstimator::mean(self)
    }
    fn variance(&self) -> f64 {
        BatchConfidenceEstimator::variance(self)
    }
    fn summary(&self) -> Vec<(&'static str, Field)> {
        let mut fields = self.moment_fields();
        fields.extend(self.interval_fields());
        fields
    }
}

/// A [`BatchConfidenceEstimator`] which knows when the interval has become
/// narrow enough: the stopping rule for a simulation run.
#[derive(Clone, Debug)]
pub struct RelativeErrorStoppingEstimator {
    estimator: BatchConfidenceEstimator,
    threshold: f64,
}

impl RelativeErrorStoppingEstimator {
    pub fn new(label: impl Into<String>, confidence_level: f64, threshold: f64) -> Result<Self, Error> {
        if !(threshold > 0. && threshold.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "threshold",
                value: threshold,
            });
        }
        Ok(RelativeErrorStoppingEstimator {
            estimator: BatchConfidenceEstimator::new(label, confidence_level)?,
            threshold,
        })
    }

    pub fn observe(&mut self, batch_mean: f64) {
        self.estimator.observe(batch_mean);
    }

    pub fn reset(&mut self) {
        self.estimator.reset();
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn estimator(&self) -> &BatchConfidenceEstimator {
        &self.estimator
    }

    /// Whether the relative error at `level` is within the threshold.
    /// Until it can be computed at all, the answer is no.
    pub fn has_converged(&self, level: f64) -> bool {
        self.estimator
            .relative_error(level)
            .map_or(false, |e| e <= self.threshold)
    }

    /// `has_converged` at the configured confidence level
    pub fn converged(&self) -> bool {
        self.has_converged(self.estimator.confidence_level())
    }
}

impl Statistic for RelativeErrorStoppingEstimator {
    fn label(&self) -> &str {
        self.estimator.label()
    }
    fn kind(&self) -> &'static str {
        "batch means confidence counter with relative error"
    }
    fn observe(&mut self, x: f64) -> Result<(), Error> {
        RelativeErrorStoppingEstimator::observe(self, x);
        Ok(())
    }
    fn reset(&mut self) {
        RelativeErrorStoppingEstimator::reset(self)
    }
    fn sample_count(&self) -> u64 {
        self.estimator.batch_count()
    }
    fn mean(&self) -> f64 {
        self.estimator.mean()
    }
    fn variance(&self) -> f64 {
        self.estimator.variance()
    }
    fn summary(&self) -> Vec<(&'static str, Field)> {
        let mut fields = self.estimator.summary();
        fields.push(("threshold", Field::Value(self.threshold)));
        fields.push(("converged", Field::Flag(self.converged())));
        fields
    }
}
