//! `sf delete` -- remove a form and everything it owns.

use anyhow::{Result, anyhow};

use sigform_storage::FormStore;

use crate::cli::DeleteArgs;
use crate::context::RuntimeContext;
use crate::output::print_json;

pub fn run(ctx: &RuntimeContext, args: &DeleteArgs) -> Result<()> {
    let store = ctx.open_store()?;

    let summary = store
        .list_forms()?
        .into_iter()
        .find(|s| s.name == args.name)
        .ok_or_else(|| anyhow!("form not found: {}", args.name))?;
    store.delete_form(summary.id)?;

    if ctx.json {
        print_json(&serde_json::json!({ "id": summary.id, "name": args.name }))?;
    } else if !ctx.quiet {
        println!("Deleted form {:?} (id {})", args.name, summary.id);
    }
    Ok(())
}
