//! `sf import` -- load a form from JSON and store it.

use anyhow::{Context, Result};

use sigform_core::builtins;
use sigform_core::form::Form;
use sigform_core::validation;
use sigform_storage::FormStore;

use crate::cli::ImportArgs;
use crate::context::RuntimeContext;
use crate::output::print_json;

pub fn run(ctx: &RuntimeContext, args: &ImportArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let registry = builtins::standard_registry();

    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let mut form: Form = serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid form", args.file.display()))?;
    // Imported forms are always new; any carried id belongs to another
    // database.
    form.id = None;

    let violations = match validation::validate(&form) {
        Ok(()) => Vec::new(),
        Err(violations) => violations,
    };

    let id = store
        .save_form(&form, &registry)
        .with_context(|| format!("failed to import form {:?}", form.name))?;

    if ctx.json {
        print_json(&serde_json::json!({
            "id": id,
            "name": form.name,
            "runnable": violations.is_empty(),
            "violations": violations,
        }))?;
    } else if !ctx.quiet {
        println!("Imported form {:?} (id {id})", form.name);
        if !violations.is_empty() {
            println!("Warning: the form is not runnable yet:");
            for violation in &violations {
                println!("  - {violation}");
            }
        }
    }
    Ok(())
}
