//! `sf validate` -- report every violation that keeps a form from
//! running.

use anyhow::{Result, bail};

use sigform_core::builtins;
use sigform_core::validation;
use sigform_storage::FormStore;

use crate::cli::ValidateArgs;
use crate::context::RuntimeContext;
use crate::output::print_json;

pub fn run(ctx: &RuntimeContext, args: &ValidateArgs) -> Result<()> {
    let store = ctx.open_store()?;
    let registry = builtins::standard_registry();
    let form = store.load_form_by_name(&args.name, &registry)?;

    match validation::validate(&form) {
        Ok(()) => {
            if ctx.json {
                print_json(&serde_json::json!({
                    "name": form.name,
                    "runnable": true,
                    "violations": [],
                }))?;
            } else if !ctx.quiet {
                println!("Form {:?} is runnable.", form.name);
            }
            Ok(())
        }
        Err(violations) => {
            if ctx.json {
                print_json(&serde_json::json!({
                    "name": form.name,
                    "runnable": false,
                    "violations": violations,
                }))?;
            } else {
                println!("Form {:?} is not runnable:", form.name);
                for violation in &violations {
                    println!("  - {violation}");
                }
            }
            bail!("{} violation(s) found", violations.len());
        }
    }
}
