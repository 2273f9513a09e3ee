use crate::*;
use std::fmt;
use std::fmt::Write;

/// The capability shared by every kind of statistic object, so that a
/// study can hold them all in one [`Registry`] and report on them
/// uniformly.
pub trait Statistic {
    /// A human-readable description of what is being measured
    fn label(&self) -> &str;
    /// What sort of statistic this is, eg. "discrete counter"
    fn kind(&self) -> &'static str;
    /// Feed one observation
    fn observe(&mut self, x: f64) -> Result<(), Error>;
    fn reset(&mut self);
    fn sample_count(&self) -> u64;
    fn mean(&self) -> f64;
    fn variance(&self) -> f64;

    /// Named values describing the current state, in report order.
    fn summary(&self) -> Vec<(&'static str, Field)> {
        self.moment_fields()
    }

    /// The fields every statistic reports
    fn moment_fields(&self) -> Vec<(&'static str, Field)> {
        vec![
            ("count", Field::Count(self.sample_count())),
            ("mean", Field::Value(self.mean())),
            ("variance", Field::Value(self.variance())),
        ]
    }

    /// Only histograms have bins
    fn bins(&self) -> Option<Vec<Bin>> {
        None
    }

    fn report(&self) -> String {
        let mut out = format!("{} ({})\n", self.label(), self.kind());
        for (name, value) in self.summary() {
            // Writing to a String can't fail
            let _ = writeln!(out, "\t{}: {}", name, value);
        }
        out
    }
}

/// One value in a statistic's summary.
#[derive(Clone, Debug, PartialEq)]
pub enum Field {
    Count(u64),
    Value(f64),
    Flag(bool),
    /// The value can't be computed yet; the reason is attached
    Unavailable(&'static str),
}

impl Field {
    pub fn is_available(&self) -> bool {
        !matches!(self, Field::Unavailable(_))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Field::Count(x) => write!(f, "{}", x),
            Field::Value(x) => write!(f, "{}", x),
            Field::Flag(x) => write!(f, "{}", x),
            Field::Unavailable(reason) => f.write_str(reason),
        }
    }
}

impl From<u64> for Field {
    fn from(x: u64) -> Field {
        Field::Count(x)
    }
}

impl From<f64> for Field {
    fn from(x: f64) -> Field {
        Field::Value(x)
    }
}

impl From<bool> for Field {
    fn from(x: bool) -> Field {
        Field::Flag(x)
    }
}

impl From<Option<f64>> for Field {
    fn from(x: Option<f64>) -> Field {
        x.map_or(Field::Unavailable("no samples"), Field::Value)
    }
}

impl From<Result<f64, Error>> for Field {
    fn from(x: Result<f64, Error>) -> Field {
        match x {
            Ok(x) => Field::Value(x),
            Err(Error::InsufficientSamples { .. }) => Field::Unavailable("insufficient data"),
            Err(Error::UndefinedRelativeError) => Field::Unavailable("undefined"),
            Err(Error::ZeroVariance) => Field::Unavailable("zero variance"),
            Err(_) => Field::Unavailable("error"),
        }
    }
}

/// Any of the statistic objects this crate provides.
#[derive(Debug)]
pub enum Stat {
    Samples(SampleCounter),
    TimeWeighted(TimeWeightedCounter),
    Histogram(Histogram),
    Confidence(BatchConfidenceEstimator),
    RelativeError(RelativeErrorStoppingEstimator),
    Autocorrelation(AutocorrelationEstimator),
}

macro_rules! stat_from {
    ($variant:ident, $t:ty) => {
        impl From<$t> for Stat {
            fn from(x: $t) -> Stat {
                Stat::$variant(x)
            }
        }
    };
}
stat_from!(Samples, SampleCounter);
stat_from!(TimeWeighted, TimeWeightedCounter);
stat_from!(Histogram, Histogram);
stat_from!(Confidence, BatchConfidenceEstimator);
stat_from!(RelativeError, RelativeErrorStoppingEstimator);
stat_from!(Autocorrelation, AutocorrelationEstimator);

impl Stat {
    fn inner(&self) -> &dyn Statistic {
        match self {
            Stat::Samples(x) => x,
            Stat::TimeWeighted(x) => x,
            Stat::Histogram(x) => x,
            Stat::Confidence(x) => x,
            Stat::RelativeError(x) => x,
            Stat::Autocorrelation(x) => x,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Statistic {
        match self {
            Stat::Samples(x) => x,
            Stat::TimeWeighted(x) => x,
            Stat::Histogram(x) => x,
            Stat::Confidence(x) => x,
            Stat::RelativeError(x) => x,
            Stat::Autocorrelation(x) => x,
        }
    }
}

impl Statistic for Stat {
    fn label(&self) -> &str {
        self.inner().label()
    }
    fn kind(&self) -> &'static str {
        self.inner().kind()
    }
    fn observe(&mut self, x: f64) -> Result<(), Error> {
        self.inner_mut().observe(x)
    }
    fn reset(&mut self) {
        self.inner_mut().reset()
    }
    fn sample_count(&self) -> u64 {
        self.inner().sample_count()
    }
    fn mean(&self) -> f64 {
        self.inner().mean()
    }
    fn variance(&self) -> f64 {
        self.inner().variance()
    }
    fn summary(&self) -> Vec<(&'static str, Field)> {
        self.inner().summary()
    }
    fn bins(&self) -> Option<Vec<Bin>> {
        self.inner().bins()
    }
    fn report(&self) -> String {
        self.inner().report()
    }
}
