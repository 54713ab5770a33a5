//! Runtime context for command execution.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use sigform_storage::SqliteStore;

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Database path from `--db` / `SF_DB`, if given.
    pub db_path: Option<PathBuf>,

    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// Quiet mode: suppress non-essential output.
    pub quiet: bool,
}

impl RuntimeContext {
    pub fn from_global_args(global: &GlobalArgs) -> Self {
        Self {
            db_path: global.db.clone(),
            json: global.json,
            verbose: global.verbose,
            quiet: global.quiet,
        }
    }

    /// The database path, defaulting to `sigform.db` in the working
    /// directory.
    pub fn database_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("sigform.db"))
    }

    /// Opens an existing form database.
    pub fn open_store(&self) -> Result<SqliteStore> {
        let path = self.database_path();
        if !path.exists() {
            bail!(
                "no form database at {}\nHint: run 'sf init' to create one",
                path.display()
            );
        }
        SqliteStore::open(&path)
            .with_context(|| format!("failed to open database: {}", path.display()))
    }

    /// Opens the database, creating it if needed.
    pub fn create_store(&self) -> Result<SqliteStore> {
        let path = self.database_path();
        SqliteStore::open(&path)
            .with_context(|| format!("failed to create database: {}", path.display()))
    }
}
