use crate::pretty;
use crate::study::*;
use anyhow::{bail, Context, Result};
use bpaf::Bpaf;
use log::*;
use std::path::PathBuf;
use std::time::*;

/// Simulates the queue until the mean waiting time is known precisely enough
#[derive(Bpaf, Clone, Debug)]
pub struct Options {
    /// A JSON file of study parameters (see `default-config`)
    #[bpaf(long, argument("FILE"))]
    config: Option<PathBuf>,
    /// Export every statistic as CSV into this directory
    #[bpaf(long, short, argument("DIR"))]
    out: Option<PathBuf>,
    /// Seeds both random streams (the service stream gets SEED+1)
    #[bpaf(long, argument("SEED"))]
    seed: Option<u64>,
    /// The target relative error of the mean waiting time
    #[bpaf(long, argument("X"))]
    threshold: Option<f64>,
    /// Give up after this many batches
    #[bpaf(long, argument("N"))]
    max_batches: Option<u64>,
    /// Don't colour the report
    no_color: bool,
}

pub fn load_config(opts: &Options) -> Result<StudyConfig> {
    let mut config = match &opts.config {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("Couldn't open {}", path.display()))?;
            serde_json::from_reader(std::io::BufReader::new(file))
                .with_context(|| format!("Couldn't parse {}", path.display()))?
        }
        None => StudyConfig::default(),
    };
    if let Some(seed) = opts.seed {
        config.arrival_seed = Some(seed);
        config.service_seed = Some(seed.wrapping_add(1));
    }
    if let Some(threshold) = opts.threshold {
        config.relative_error_threshold = threshold;
    }
    if let Some(max_batches) = opts.max_batches {
        config.max_batches = max_batches;
    }
    Ok(config)
}

/// Fills in any seeds the config leaves open from the wall clock, so that
/// the run can be repeated from the log
fn resolve_seeds(config: &mut StudyConfig) -> Result<()> {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos() as u64;
    if config.arrival_seed.is_none() {
        config.arrival_seed = Some(nanos);
    }
    if config.service_seed.is_none() {
        config.service_seed = Some(nanos.rotate_left(32));
    }
    info!(
        "Seeds: arrival={}, service={}",
        config.arrival_seed.unwrap_or_default(),
        config.service_seed.unwrap_or_default()
    );
    Ok(())
}

pub fn run(opts: Options) -> Result<()> {
    let mut config = load_config(&opts)?;
    config.validate()?;
    resolve_seeds(&mut config)?;
    let color = !opts.no_color;

    let start_time = Instant::now();
    let mut study = Study::new(config.clone())?;
    let outcome = study.run()?;
    info!(
        "Simulated {} customers ({} ticks) in {}",
        outcome.customers,
        outcome.end_time,
        humantime::format_duration(Duration::from_millis(
            start_time.elapsed().as_millis() as u64
        ))
    );

    print!("{}", pretty::render(study.registry(), color)?);
    if let Some(ci) = study.waiting_time_interval() {
        println!(
            "\nMean waiting time after {} batches: {}",
            outcome.batches,
            pretty::PrettyCI {
                ci,
                level: config.confidence_level,
                converged: outcome.converged,
                color,
            }
        );
    }

    if let Some(dir) = &opts.out {
        let summary = study
            .registry()
            .export_to_dir(dir)
            .with_context(|| format!("Couldn't export to {}", dir.display()))?;
        if !summary.is_complete() {
            let names = summary
                .failed
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>();
            bail!("Couldn't export {}", names.join(", "));
        }
    }
    Ok(())
}

pub fn default_config() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&StudyConfig::default())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bpaf::Parser;

    fn opts() -> Options {
        Options {
            config: None,
            out: None,
            seed: None,
            threshold: None,
            max_batches: None,
            no_color: true,
        }
    }

    #[test]
    fn overrides() {
        let config = load_config(&Options {
            seed: Some(10),
            threshold: Some(0.1),
            max_batches: Some(50),
            ..opts()
        })
        .unwrap();
        assert_eq!(config.arrival_seed, Some(10));
        assert_eq!(config.service_seed, Some(11));
        assert_eq!(config.relative_error_threshold, 0.1);
        assert_eq!(config.max_batches, 50);
        assert_eq!(config.batch_length, StudyConfig::default().batch_length);
    }

    #[test]
    fn config_file() {
        let path = std::env::temp_dir().join(format!("qstudy-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "batch_length": 250, "service_seed": 3 }"#).unwrap();
        let config = load_config(&Options {
            config: Some(path.clone()),
            ..opts()
        })
        .unwrap();
        assert_eq!(config.batch_length, 250);
        assert_eq!(config.service_seed, Some(3));
        assert_eq!(config.arrival_seed, None);
        std::fs::remove_file(&path).unwrap();

        let missing = load_config(&Options {
            config: Some(path),
            ..opts()
        });
        assert!(missing.is_err());
    }

    #[test]
    fn seeds_are_filled_in() {
        let mut config = StudyConfig {
            arrival_seed: Some(5),
            ..StudyConfig::default()
        };
        resolve_seeds(&mut config).unwrap();
        assert_eq!(config.arrival_seed, Some(5));
        assert!(config.service_seed.is_some());
    }

    #[test]
    fn parses_arguments() {
        let parsed = options()
            .to_options()
            .run_inner(&["--seed", "4", "--out", "results", "--no-color"][..])
            .unwrap();
        assert_eq!(parsed.seed, Some(4));
        assert_eq!(parsed.out, Some(PathBuf::from("results")));
        assert!(parsed.no_color);
        assert_eq!(parsed.config, None);
    }
}
