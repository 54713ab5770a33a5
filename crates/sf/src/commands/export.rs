//! `sf export` -- write a stored form as JSON.

use anyhow::{Context, Result};

use sigform_core::builtins;
use sigform_storage::FormStore;

use crate::cli::ExportArgs;
use crate::context::RuntimeContext;

pub fn run(ctx: &RuntimeContext, args: &ExportArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let registry = builtins::standard_registry();

    let form = store.load_form_by_name(&args.name, &registry)?;
    let json = serde_json::to_string_pretty(&form)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            if !ctx.quiet {
                println!("Exported form {:?} to {}", args.name, path.display());
            }
        }
        None => println!("{json}"),
    }
    Ok(())
}
