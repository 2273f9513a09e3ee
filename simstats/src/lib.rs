/*! Statistic accumulators for discrete-event simulation studies.

Counters are fed one observation at a time by the simulation's event loop
and read once the run is over.  Discrete quantities (waiting time per
customer) go into a [`SampleCounter`]; quantities which hold a value between
events (queue length, server busy/idle) go into a [`TimeWeightedCounter`],
which integrates against the logical simulation clock.  Batch means are fed
to a [`BatchConfidenceEstimator`] to decide when the run is long enough.

## Example

```
# use simstats::*;
let clock = SimClock::new();
let mut queue_len = TimeWeightedCounter::new("queue length", clock.clone());

clock.advance_to(10)?;
queue_len.count(5.)?; // the queue was empty on [0, 10)
clock.advance_to(15)?;
queue_len.count(3.)?; // and held 5 customers on [10, 15)
assert_eq!(format!("{:.3}", queue_len.mean()), "1.667");

let mut waiting = BatchConfidenceEstimator::new("waiting time", 0.95)?;
for batch_mean in [4.1, 3.9, 4.3, 4.0, 3.7] {
    waiting.observe(batch_mean);
}
let ci = waiting.confidence_interval(0.95)?;
assert_eq!(format!("{:.2}", ci), "4.00 ± 0.28");
# Ok::<(), simstats::Error>(())
```

*/

mod autocorr;
mod clock;
mod confidence;
mod histogram;
mod registry;
mod statistic;
mod stats;
pub mod student_t;
mod time_weighted;

pub use autocorr::*;
pub use clock::*;
pub use confidence::*;
pub use histogram::*;
pub use registry::*;
pub use statistic::*;
pub use stats::*;
pub use time_weighted::*;

#[derive(Debug)]
pub enum Error {
    /// A derived statistic was requested before enough observations exist
    InsufficientSamples { needed: u64, got: u64 },
    /// The mean is zero, so an error relative to it means nothing
    UndefinedRelativeError,
    /// All observations are identical
    ZeroVariance,
    LagOutOfRange { lag: usize, max: usize },
    /// The clock reads earlier than a time-weighted counter's last sample.
    /// This is a bug in the caller's event loop.
    NonMonotonicTime { last: i64, now: i64 },
    InvalidParameter { name: &'static str, value: f64 },
    UnknownStatistic(String),
    /// Two statistics' names sanitize to the same file name
    FileNameClash { name: String, stem: String },
    Io(std::io::Error),
    Csv(csv::Error),
}

use std::fmt;
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InsufficientSamples { needed, got } => write!(
                f,
                "Insufficient data: need at least {} samples, have {}",
                needed, got
            ),
            Error::UndefinedRelativeError => {
                f.write_str("Relative error is undefined when the mean is zero")
            }
            Error::ZeroVariance => f.write_str("The variance of the samples is zero"),
            Error::LagOutOfRange { lag, max } => {
                write!(f, "Lag {} is beyond the configured maximum of {}", lag, max)
            }
            Error::NonMonotonicTime { last, now } => write!(
                f,
                "Simulation time went backwards: last sample at {}, clock reads {}",
                last, now
            ),
            Error::InvalidParameter { name, value } => {
                write!(f, "Invalid value for {}: {}", name, value)
            }
            Error::UnknownStatistic(name) => write!(f, "No statistic named {:?}", name),
            Error::FileNameClash { name, stem } => write!(
                f,
                "Can't export {:?}: another statistic was already written as {}",
                name, stem
            ),
            Error::Io(e) => write!(f, "{}", e),
            Error::Csv(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Csv(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(x: std::io::Error) -> Error {
        Error::Io(x)
    }
}

impl From<csv::Error> for Error {
    fn from(x: csv::Error) -> Error {
        Error::Csv(x)
    }
}
