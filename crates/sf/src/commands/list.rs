//! `sf list` -- list stored forms.

use anyhow::Result;

use sigform_storage::FormStore;

use crate::context::RuntimeContext;
use crate::output::print_json;

pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let store = ctx.open_store()?;
    let summaries = store.list_forms()?;

    if ctx.json {
        return print_json(&summaries);
    }

    if summaries.is_empty() {
        if !ctx.quiet {
            println!("No forms stored.");
        }
        return Ok(());
    }

    println!("{:>5}  {:<24} {:>6} {:>7} {:>5}  UPDATED", "ID", "NAME", "POINTS", "PARAMS", "STEPS");
    for summary in &summaries {
        println!(
            "{:>5}  {:<24} {:>6} {:>7} {:>5}  {}",
            summary.id,
            summary.name,
            summary.points,
            summary.parameters,
            summary.steps,
            summary.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }
    Ok(())
}
