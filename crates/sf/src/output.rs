//! Output formatting helpers shared by command handlers.

use anyhow::Result;
use serde::Serialize;

use sigform_engine::{ExecutionReport, Outcome};

/// Prints a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Renders an execution report for human eyes.
pub fn format_report(report: &ExecutionReport) -> String {
    let mut out = String::new();

    if !report.placed_points.is_empty() {
        out.push_str("Points:\n");
        for (name, time) in &report.placed_points {
            out.push_str(&format!("  {name} = {time:.6} s\n"));
        }
    }
    if !report.parameters.is_empty() {
        out.push_str("Parameters:\n");
        for (name, value) in &report.parameters {
            out.push_str(&format!("  {name} = {value}\n"));
        }
    }
    if !report.verdicts.is_empty() {
        out.push_str("Conditions:\n");
        for (label, verdict) in &report.verdicts {
            let mark = if *verdict { "pass" } else { "FAIL" };
            out.push_str(&format!("  {label}: {mark}\n"));
        }
    }
    for (label, error) in &report.condition_errors {
        out.push_str(&format!("  {label}: error: {error}\n"));
    }

    match &report.outcome {
        Outcome::Ok => out.push_str("Outcome: ok\n"),
        Outcome::Failed {
            failure,
            partial_points,
        } => {
            out.push_str(&format!("Outcome: FAILED: {failure}\n"));
            if !partial_points.is_empty() {
                out.push_str("Partial points:\n");
                for (name, time) in partial_points {
                    out.push_str(&format!("  {name} = {time:.6} s\n"));
                }
            }
        }
    }
    out
}
