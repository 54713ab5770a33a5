//! `sf run` -- execute a form against a signal.

use std::time::Duration;

use anyhow::{Result, bail};
use tracing::info;

use sigform_core::builtins;
use sigform_engine::{CancelToken, RunOptions, run_form};
use sigform_storage::FormStore;

use crate::cli::RunArgs;
use crate::context::RuntimeContext;
use crate::output::{format_report, print_json};
use crate::signal_io;

pub fn run(ctx: &RuntimeContext, args: &RunArgs, cancel: &CancelToken) -> Result<()> {
    let store = ctx.open_store()?;
    let registry = builtins::standard_registry();
    let form = store.load_form_by_name(&args.name, &registry)?;

    let signal = signal_io::load_csv(&args.signal, args.hz)?;
    info!(
        form = %form.name,
        samples = signal.len(),
        hz = args.hz,
        "running form"
    );

    let options = RunOptions {
        cancel: cancel.clone(),
        step_deadline: args.step_deadline_ms.map(Duration::from_millis),
    };
    let report = run_form(&registry, &form, &signal, &options);

    if ctx.json {
        print_json(&report)?;
    } else {
        print!("{}", format_report(&report));
    }

    if let Some(failure) = report.failure() {
        bail!("run failed: {failure}");
    }
    Ok(())
}
