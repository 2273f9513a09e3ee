use ansi_term::{Color, Style};
use anyhow::Result;
use simstats::*;
use std::fmt;
use std::io::Write;

/// Renders every statistic in the registry as an aligned table
pub fn render(registry: &Registry, color: bool) -> Result<String> {
    let mut buf = vec![];
    let mut out = tabwriter::TabWriter::new(&mut buf);
    for (name, stat) in registry.iter() {
        writeln!(out, "{}: {} ({})", name, stat.label(), stat.kind())?;
        for (field, value) in stat.summary() {
            writeln!(out, "\t{}:\t{}", field, PrettyField { value, color })?;
        }
    }
    out.flush()?;
    drop(out);
    Ok(String::from_utf8(buf)?)
}

pub struct PrettyField {
    pub value: Field,
    pub color: bool,
}

impl fmt::Display for PrettyField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.color {
            return write!(f, "{}", self.value);
        }
        match self.value {
            Field::Flag(true) => write!(f, "{}", Color::Green.paint("true")),
            Field::Flag(false) => write!(f, "{}", Color::Yellow.paint("false")),
            Field::Unavailable(why) => write!(f, "{}", Style::new().dimmed().paint(why)),
            ref x => write!(f, "{}", x),
        }
    }
}

/// The headline result: the mean waiting time with its confidence interval
pub struct PrettyCI {
    pub ci: std::result::Result<ConfidenceInterval, simstats::Error>,
    pub level: f64,
    pub converged: bool,
    pub color: bool,
}

impl fmt::Display for PrettyCI {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.ci {
            Ok(ci) => {
                let text = format!("{:.4} ({:.0}%)", ci, self.level * 100.);
                if !self.color {
                    write!(f, "{}", text)
                } else if self.converged {
                    write!(f, "{}", Color::Green.paint(text))
                } else {
                    write!(f, "{}", Color::Yellow.paint(text))
                }
            }
            Err(e) if self.color => {
                write!(f, "{}", Style::new().dimmed().paint(e.to_string()))
            }
            Err(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        let mut reg = Registry::new();
        reg.insert("waiting_time", SampleCounter::new("waiting time/customer"));
        reg.insert(
            "batch_means",
            RelativeErrorStoppingEstimator::new("batch means", 0.95, 0.05).unwrap(),
        );
        reg.observe("waiting_time", 2.).unwrap();
        reg.observe("waiting_time", 4.).unwrap();
        reg
    }

    #[test]
    fn plain_table() {
        let text = render(&registry(), false).unwrap();
        assert!(text.starts_with("batch_means: batch means ("));
        assert!(text.contains("waiting_time: waiting time/customer (discrete counter)\n"));
        assert!(text.contains("insufficient data"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn colored_fields() {
        let shown = PrettyField {
            value: Field::Flag(true),
            color: true,
        }
        .to_string();
        assert_eq!(shown, Color::Green.paint("true").to_string());
        let shown = PrettyField {
            value: Field::Unavailable("insufficient data"),
            color: true,
        }
        .to_string();
        assert!(shown.contains("insufficient data"));
        assert!(shown.contains('\x1b'));
        let shown = PrettyField {
            value: Field::Count(3),
            color: true,
        }
        .to_string();
        assert_eq!(shown, "3");
    }

    #[test]
    fn headline() {
        let ci = PrettyCI {
            ci: Ok(ConfidenceInterval {
                center: 4.,
                radius: 0.125,
            }),
            level: 0.95,
            converged: true,
            color: false,
        };
        assert_eq!(ci.to_string(), "4.0000 ± 0.1250 (95%)");
    }
}
