//! Clap CLI definitions for the `sf` command.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// sf -- form-based signal annotation workbench.
///
/// Forms describe how to place named points on a signal and derive
/// parameters from them; `sf` stores forms, validates them, and runs
/// them against signals.
#[derive(Parser, Debug)]
#[command(
    name = "sf",
    about = "Form-based signal annotation workbench",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Global flags available to all subcommands.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Form database path (default: ./sigform.db).
    #[arg(long, global = true, env = "SF_DB")]
    pub db: Option<PathBuf>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug output.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output (errors only).
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,
}

/// All available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the form database.
    Init,

    /// Import a form from a JSON file.
    Import(ImportArgs),

    /// Export a form as JSON.
    Export(ExportArgs),

    /// List stored forms.
    List,

    /// Check whether a form is runnable, reporting every violation.
    Validate(ValidateArgs),

    /// Run a form against a signal and print the execution report.
    Run(RunArgs),

    /// Delete a form and everything it owns.
    Delete(DeleteArgs),
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Path to the form JSON file.
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Name of the form to export.
    pub name: String,

    /// Write to a file instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Name of the form to validate.
    pub name: String,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Name of the form to run.
    pub name: String,

    /// Signal CSV file: `tick,value` rows, or one bare sample per line.
    #[arg(long)]
    pub signal: PathBuf,

    /// Sampling frequency in Hz.
    #[arg(long, default_value_t = 500)]
    pub hz: u32,

    /// Per-step deadline in milliseconds.
    #[arg(long)]
    pub step_deadline_ms: Option<u64>,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Name of the form to delete.
    pub name: String,
}
