use crate::sim::{Event, Simulator};
use crate::variates::Variate;
use anyhow::*;
use log::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::*;
use simstats::*;
use std::collections::VecDeque;

// The names statistics are registered under
pub const WAITING_TIME: &str = "waiting_time";
pub const WAITING_TIME_HISTOGRAM: &str = "waiting_time_histogram";
pub const SERVICE_TIME: &str = "service_time";
pub const SERVICE_TIME_HISTOGRAM: &str = "service_time_histogram";
pub const QUEUE_OCCUPANCY: &str = "queue_occupancy";
pub const QUEUE_OCCUPANCY_HISTOGRAM: &str = "queue_occupancy_histogram";
pub const SERVER_UTILIZATION: &str = "server_utilization";
pub const SERVER_UTILIZATION_HISTOGRAM: &str = "server_utilization_histogram";
pub const BATCH_WAITING_TIME: &str = "batch_waiting_time";
pub const BATCH_MEANS: &str = "batch_means_relative_error";
pub const BATCH_AUTOCORRELATION: &str = "batch_means_autocorrelation";
pub const NAIVE_WAITING_TIME: &str = "waiting_time_relative_error";
pub const EXCESS_WAITING_TIME: &str = "excess_waiting_time";

/// Parameters of a study.  Times are in simulation time units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    /// Customers served before statistics are collected
    pub warmup_customers: u64,
    /// Customers per batch
    pub batch_length: u64,
    /// Don't stop before this many batches, whatever the relative error
    pub min_batches: u64,
    /// Stop after this many batches even if not converged
    pub max_batches: u64,
    pub mean_service_time: f64,
    /// Target server utilization ρ; the mean inter-arrival time is
    /// `mean_service_time / ρ`
    pub utilization: f64,
    /// Coefficient of variation of the inter-arrival times
    pub interarrival_cvar: f64,
    pub confidence_level: f64,
    pub relative_error_threshold: f64,
    /// The lag at which batch means are checked for independence
    pub autocorrelation_lag: usize,
    /// A customer's wait is "excessive" beyond this many mean service times
    pub excess_factor: f64,
    pub histogram_bins: usize,
    pub histogram_upper: f64,
    /// Clock ticks per simulation time unit
    pub ticks_per_unit: u32,
    pub arrival_seed: Option<u64>,
    pub service_seed: Option<u64>,
}

impl Default for StudyConfig {
    fn default() -> StudyConfig {
        StudyConfig {
            warmup_customers: 1000,
            batch_length: 100,
            min_batches: 2,
            max_batches: 10_000,
            mean_service_time: 1.,
            utilization: 0.8,
            interarrival_cvar: 1.,
            confidence_level: 0.95,
            relative_error_threshold: 0.05,
            autocorrelation_lag: 10,
            excess_factor: 5.,
            histogram_bins: 80,
            histogram_upper: 80.,
            ticks_per_unit: 1000,
            arrival_seed: None,
            service_seed: None,
        }
    }
}

impl StudyConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.utilization > 0. && self.utilization < 1.,
            "utilization must be strictly between 0 and 1 (got {})",
            self.utilization
        );
        ensure!(
            self.mean_service_time > 0.,
            "mean_service_time must be positive"
        );
        ensure!(self.interarrival_cvar > 0., "interarrival_cvar must be positive");
        ensure!(self.batch_length > 0, "batch_length must be positive");
        ensure!(
            self.min_batches >= 2,
            "min_batches must be at least 2 for a confidence interval"
        );
        ensure!(
            self.max_batches >= self.min_batches,
            "max_batches must be at least min_batches"
        );
        ensure!(self.ticks_per_unit > 0, "ticks_per_unit must be positive");
        Ok(())
    }

    pub fn mean_interarrival_time(&self) -> f64 {
        self.mean_service_time / self.utilization
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Outcome {
    pub batches: u64,
    pub converged: bool,
    /// Customers served after the warm-up
    pub customers: u64,
    pub end_time: i64,
}

/// A single-server FIFO queue, instrumented with the statistics of a
/// batch-means study.
pub struct Study {
    config: StudyConfig,
    sim: Simulator,
    registry: Registry,
    interarrival: Variate,
    service: Variate,
    arrival_rng: StdRng,
    service_rng: StdRng,
    /// Arrival times of the customers waiting for the server
    queue: VecDeque<i64>,
    server_busy: bool,
    in_warmup: bool,
    /// Customers who have started service (since the warm-up ended)
    customers: u64,
    batches: u64,
    max_queue_len: usize,
}

impl Study {
    pub fn new(config: StudyConfig) -> Result<Study> {
        config.validate()?;
        let arrival_seed = config.arrival_seed.context("No arrival seed")?;
        let service_seed = config.service_seed.context("No service seed")?;
        let clock = SimClock::new();
        let registry = init_statistics(&config, &clock)?;
        let mut study = Study {
            interarrival: Variate::for_cvar(config.mean_interarrival_time(), config.interarrival_cvar),
            service: Variate::Exponential {
                mean: config.mean_service_time,
            },
            arrival_rng: StdRng::seed_from_u64(arrival_seed),
            service_rng: StdRng::seed_from_u64(service_seed),
            sim: Simulator::new(clock),
            registry,
            queue: VecDeque::new(),
            server_busy: false,
            in_warmup: config.warmup_customers > 0,
            customers: 0,
            batches: 0,
            max_queue_len: 0,
            config,
        };
        info!(
            "Inter-arrival times: {:?} (mean {}, cvar {})",
            study.interarrival,
            study.interarrival.mean(),
            study.interarrival.cvar()
        );
        info!("Service times: {:?}", study.service);
        let first = study.interarrival.sample(&mut study.arrival_rng);
        let first = study.ticks(first);
        study.sim.schedule(first, Event::Arrival);
        Ok(study)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs until the batch means converge or the batch limit is reached
    pub fn run(&mut self) -> Result<Outcome> {
        while !self.finished() {
            match self.sim.next_event()? {
                Some(Event::Arrival) => self.on_arrival()?,
                Some(Event::ServiceCompletion) => self.on_service_completion()?,
                None => bail!("Ran out of events"),
            }
        }
        let outcome = Outcome {
            batches: self.batches,
            converged: self.converged(),
            customers: self.customers,
            end_time: self.sim.now(),
        };
        if outcome.converged {
            info!("Converged after {} batches", outcome.batches);
        } else {
            warn!(
                "Stopped after {} batches without reaching a relative error of {}",
                outcome.batches, self.config.relative_error_threshold
            );
        }
        debug!("Longest queue: {}", self.max_queue_len);
        Ok(outcome)
    }

    fn finished(&self) -> bool {
        self.batches >= self.config.max_batches
            || (self.batches >= self.config.min_batches && self.converged())
    }

    pub fn converged(&self) -> bool {
        match self.registry.get(BATCH_MEANS) {
            Some(Stat::RelativeError(est)) => est.converged(),
            _ => false,
        }
    }

    /// The confidence interval of the mean waiting time, from batch means
    pub fn waiting_time_interval(&self) -> Option<std::result::Result<ConfidenceInterval, simstats::Error>> {
        match self.registry.get(BATCH_MEANS) {
            Some(Stat::RelativeError(est)) => Some(
                est.estimator()
                    .confidence_interval(self.config.confidence_level),
            ),
            _ => None,
        }
    }

    fn ticks(&self, units: f64) -> i64 {
        (units * f64::from(self.config.ticks_per_unit)).round() as i64
    }

    fn units(&self, ticks: i64) -> f64 {
        ticks as f64 / f64::from(self.config.ticks_per_unit)
    }

    fn on_arrival(&mut self) -> Result<()> {
        let now = self.sim.now();
        let next = self.interarrival.sample(&mut self.arrival_rng);
        let next = self.ticks(next);
        self.sim.schedule(next, Event::Arrival);
        if self.server_busy {
            self.queue.push_back(now);
            self.max_queue_len = self.max_queue_len.max(self.queue.len());
            self.observe_queue()?;
        } else {
            self.set_server_busy(true)?;
            self.start_service(now)?;
        }
        Ok(())
    }

    fn on_service_completion(&mut self) -> Result<()> {
        if let Some(arrival) = self.queue.pop_front() {
            self.observe_queue()?;
            self.start_service(arrival)?;
        } else {
            self.set_server_busy(false)?;
        }
        Ok(())
    }

    fn start_service(&mut self, arrival: i64) -> Result<()> {
        let waiting = self.units(self.sim.now() - arrival);
        let service = self.service.sample(&mut self.service_rng);
        let service = self.ticks(service);
        self.sim.schedule(service, Event::ServiceCompletion);
        self.record_customer(waiting, self.units(service))
    }

    fn set_server_busy(&mut self, busy: bool) -> Result<()> {
        self.server_busy = busy;
        let x = if busy { 1. } else { 0. };
        self.registry.observe(SERVER_UTILIZATION, x)?;
        self.registry.observe(SERVER_UTILIZATION_HISTOGRAM, x)?;
        Ok(())
    }

    fn observe_queue(&mut self) -> Result<()> {
        let x = self.queue.len() as f64;
        self.registry.observe(QUEUE_OCCUPANCY, x)?;
        self.registry.observe(QUEUE_OCCUPANCY_HISTOGRAM, x)?;
        Ok(())
    }

    fn record_customer(&mut self, waiting: f64, service: f64) -> Result<()> {
        self.customers += 1;
        if self.in_warmup {
            if self.customers >= self.config.warmup_customers {
                self.end_warmup()?;
            }
            return Ok(());
        }

        let reg = &mut self.registry;
        reg.observe(WAITING_TIME, waiting)?;
        reg.observe(WAITING_TIME_HISTOGRAM, waiting)?;
        reg.observe(NAIVE_WAITING_TIME, waiting)?;
        reg.observe(SERVICE_TIME, service)?;
        reg.observe(SERVICE_TIME_HISTOGRAM, service)?;
        let excessive = waiting > self.config.excess_factor * self.config.mean_service_time;
        reg.observe(EXCESS_WAITING_TIME, if excessive { 1. } else { 0. })?;
        reg.observe(BATCH_WAITING_TIME, waiting)?;

        let batch = reg
            .get(BATCH_WAITING_TIME)
            .context("Batch counter missing")?;
        if batch.sample_count() >= self.config.batch_length {
            let batch_mean = batch.mean();
            reg.observe(BATCH_MEANS, batch_mean)?;
            reg.observe(BATCH_AUTOCORRELATION, batch_mean)?;
            reg.reset(BATCH_WAITING_TIME)?;
            self.batches += 1;
            debug!("Batch {}: mean waiting time {}", self.batches, batch_mean);
        }
        Ok(())
    }

    /// Throws away everything observed so far
    fn end_warmup(&mut self) -> Result<()> {
        info!(
            "Warm-up over after {} customers at t={}",
            self.customers,
            self.sim.now()
        );
        self.registry.reset_all();
        self.in_warmup = false;
        self.customers = 0;
        // A reset counter assumes the quantity starts at zero, which the
        // queue and server needn't be
        self.set_server_busy(self.server_busy)?;
        self.observe_queue()
    }
}

/// Creates the study's statistic objects
fn init_statistics(config: &StudyConfig, clock: &SimClock) -> Result<Registry> {
    let bins = config.histogram_bins;
    let upper = config.histogram_upper;
    let level = config.confidence_level;
    let threshold = config.relative_error_threshold;

    let mut reg = Registry::new();
    reg.insert(WAITING_TIME, SampleCounter::new("waiting time/customer"));
    reg.insert(
        WAITING_TIME_HISTOGRAM,
        Histogram::per_sample("waiting time/customer", bins, 0., upper)?,
    );
    reg.insert(SERVICE_TIME, SampleCounter::new("service time/customer"));
    reg.insert(
        SERVICE_TIME_HISTOGRAM,
        Histogram::per_sample("service time/customer", bins, 0., upper)?,
    );
    reg.insert(
        QUEUE_OCCUPANCY,
        TimeWeightedCounter::new("queue occupancy/time", clock.clone()),
    );
    reg.insert(
        QUEUE_OCCUPANCY_HISTOGRAM,
        Histogram::time_weighted("queue occupancy/time", bins, 0., upper, clock.clone())?,
    );
    reg.insert(
        SERVER_UTILIZATION,
        TimeWeightedCounter::new("server utilization/time", clock.clone()),
    );
    reg.insert(
        SERVER_UTILIZATION_HISTOGRAM,
        Histogram::time_weighted("server utilization/time", 2, 0., 2., clock.clone())?,
    );
    reg.insert(BATCH_WAITING_TIME, SampleCounter::new("waiting time/customer in current batch"));
    reg.insert(
        BATCH_MEANS,
        RelativeErrorStoppingEstimator::new("batch means of waiting time", level, threshold)?,
    );
    reg.insert(
        BATCH_AUTOCORRELATION,
        AutocorrelationEstimator::new("batch means of waiting time", config.autocorrelation_lag)?,
    );
    reg.insert(
        NAIVE_WAITING_TIME,
        RelativeErrorStoppingEstimator::new("waiting time/customer, unbatched", level, threshold)?,
    );
    reg.insert(EXCESS_WAITING_TIME, SampleCounter::new("waiting time above the excess limit"));
    Ok(reg)
}
