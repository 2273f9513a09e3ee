use crate::statistic::{Stat, Statistic};
use crate::Error;
use log::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::{Path, PathBuf};

/// All the statistic objects of one simulation study, by name.
///
/// Names are kept in order, so reports and exports come out the same way
/// every time.
#[derive(Debug, Default)]
pub struct Registry {
    stats: BTreeMap<String, Stat>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry::default()
    }

    /// Adds a statistic, replacing (and returning) any with the same name
    pub fn insert(&mut self, name: impl Into<String>, stat: impl Into<Stat>) -> Option<Stat> {
        self.stats.insert(name.into(), stat.into())
    }

    pub fn get(&self, name: &str) -> Option<&Stat> {
        self.stats.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Stat> {
        self.stats.get_mut(name)
    }

    fn lookup(&mut self, name: &str) -> Result<&mut Stat, Error> {
        self.stats
            .get_mut(name)
            .ok_or_else(|| Error::UnknownStatistic(name.to_string()))
    }

    /// Feeds `x` to the statistic called `name`
    pub fn observe(&mut self, name: &str, x: f64) -> Result<(), Error> {
        self.lookup(name)?.observe(x)
    }

    pub fn reset(&mut self, name: &str) -> Result<(), Error> {
        self.lookup(name)?.reset();
        debug!("Reset {}", name);
        Ok(())
    }

    /// Empties every statistic, eg. at the end of the warm-up period
    pub fn reset_all(&mut self) {
        for stat in self.stats.values_mut() {
            stat.reset();
        }
        debug!("Reset all {} statistics", self.stats.len());
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Stat)> {
        self.stats.iter().map(|(name, stat)| (name.as_str(), stat))
    }

    /// The reports of every statistic, in name order
    pub fn report(&self) -> String {
        let mut out = String::new();
        for stat in self.stats.values() {
            out.push_str(&stat.report());
            out.push('\n');
        }
        out
    }

    /// Writes one CSV file per statistic into `dir`, creating it if need
    /// be.  See [`export_to_dir`].
    pub fn export_to_dir(&self, dir: impl AsRef<Path>) -> Result<ExportSummary, Error> {
        export_to_dir(self, dir.as_ref())
    }
}

/// The outcome of an export.  Statistics are written independently, so
/// some may have failed while the rest were written.
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(String, Error)>,
}

impl ExportSummary {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Makes a name safe to use as a file name: anything other than ASCII
/// letters, digits, `-` and `_` becomes `_`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// For each statistic, writes `<name>.csv`: a header of summary field names
/// and a single row of values.  Histograms also get `<name>.bins.csv`, with
/// one `lower_edge,upper_edge,weight` row per bin followed by the underflow
/// and overflow buckets.
///
/// Only failing to create `dir` is an error; a statistic which can't be
/// written is logged and listed in the summary.  So is one whose sanitized
/// name was already taken by another statistic: its files aren't written.
pub fn export_to_dir(registry: &Registry, dir: &Path) -> Result<ExportSummary, Error> {
    std::fs::create_dir_all(dir)?;
    let mut summary = ExportSummary::default();
    let mut stems = BTreeSet::new();
    for (name, stat) in registry.iter() {
        let stem = sanitize(name);
        let result = if stems.insert(stem.clone()) {
            export_one(stat, dir, &stem)
        } else {
            Err(Error::FileNameClash {
                name: name.to_string(),
                stem,
            })
        };
        match result {
            Ok(paths) => summary.written.extend(paths),
            Err(e) => {
                warn!("Couldn't export {}: {}", name, e);
                summary.failed.push((name.to_string(), e));
            }
        }
    }
    info!(
        "Wrote {} files to {}",
        summary.written.len(),
        dir.display()
    );
    Ok(summary)
}

fn export_one(stat: &Stat, dir: &Path, stem: &str) -> Result<Vec<PathBuf>, Error> {
    let mut paths = vec![];

    let path = dir.join(format!("{}.csv", stem));
    let mut wtr = csv::Writer::from_writer(File::create(&path)?);
    let fields = stat.summary();
    wtr.write_record(fields.iter().map(|(name, _)| *name))?;
    wtr.write_record(fields.iter().map(|(_, value)| value.to_string()))?;
    wtr.flush()?;
    paths.push(path);

    if let Stat::Histogram(hist) = stat {
        let bins = hist.bins().unwrap_or_default();
        let path = dir.join(format!("{}.bins.csv", stem));
        let mut wtr = csv::Writer::from_writer(File::create(&path)?);
        wtr.write_record(&["lower_edge", "upper_edge", "weight"])?;
        let lower = bins.first().map_or(0., |b| b.lower);
        let upper = bins.last().map_or(0., |b| b.upper);
        let rows = bins
            .iter()
            .map(|b| (b.lower, b.upper, b.weight))
            .chain(Some((f64::NEG_INFINITY, lower, hist.underflow())))
            .chain(Some((upper, f64::INFINITY, hist.overflow())));
        for (lo, hi, weight) in rows {
            wtr.write_record(&[lo.to_string(), hi.to_string(), weight.to_string()])?;
        }
        wtr.flush()?;
        paths.push(path);
    }
    Ok(paths)
}
