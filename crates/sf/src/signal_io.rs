//! Signal loading from CSV files.
//!
//! Two layouts are accepted: `tick,value` rows with explicit integer
//! ticks (fragments keep their absolute positions this way), or one
//! bare sample per line with ticks counted from zero. A non-numeric
//! first line is treated as a header and skipped.

use std::path::Path;

use anyhow::{Context, Result, bail};

use sigform_core::signal::Signal;

pub fn load_csv(path: &Path, hz: u32) -> Result<Signal> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read signal file: {}", path.display()))?;
    let signal = parse_csv(&text, hz)
        .with_context(|| format!("failed to parse signal file: {}", path.display()))?;
    Ok(signal)
}

fn parse_csv(text: &str, hz: u32) -> Result<Signal> {
    let mut ticks: Vec<i64> = Vec::new();
    let mut samples: Vec<f64> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let parsed = parse_line(line);
        match parsed {
            Some((tick, value)) => {
                let tick = match tick {
                    Some(t) => t,
                    None => ticks.last().map_or(0, |t| t + 1),
                };
                ticks.push(tick);
                samples.push(value);
            }
            None if samples.is_empty() && index == 0 => {
                // Header row.
                continue;
            }
            None => bail!("line {}: expected a sample, got {line:?}", index + 1),
        }
    }

    if samples.is_empty() {
        bail!("no samples found");
    }
    Ok(Signal::new(ticks, samples, hz)?)
}

fn parse_line(line: &str) -> Option<(Option<i64>, f64)> {
    match line.split_once(',') {
        Some((tick, value)) => {
            let tick = tick.trim().parse::<i64>().ok()?;
            let value = value.trim().parse::<f64>().ok()?;
            Some((Some(tick), value))
        }
        None => line.parse::<f64>().ok().map(|value| (None, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_samples() {
        let signal = parse_csv("0.0\n0.5\n1.0\n", 500).unwrap();
        assert_eq!(signal.len(), 3);
        assert_eq!(signal.ticks(), &[0, 1, 2]);
        assert_eq!(signal.start_time(), 0.0);
    }

    #[test]
    fn tick_value_rows_keep_absolute_ticks() {
        let signal = parse_csv("100,0.1\n101,0.2\n102,0.3\n", 500).unwrap();
        assert_eq!(signal.ticks(), &[100, 101, 102]);
        assert_eq!(signal.start_time(), 0.2);
    }

    #[test]
    fn header_row_is_skipped() {
        let signal = parse_csv("tick,value\n0,1.5\n1,2.5\n", 500).unwrap();
        assert_eq!(signal.len(), 2);
    }

    #[test]
    fn garbage_mid_file_is_an_error() {
        let err = parse_csv("0,1.0\nwat\n", 500).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn empty_file_is_an_error() {
        assert!(parse_csv("", 500).is_err());
        assert!(parse_csv("tick,value\n", 500).is_err());
    }

    #[test]
    fn non_monotonic_ticks_are_refused() {
        assert!(parse_csv("5,1.0\n3,2.0\n", 500).is_err());
    }
}
