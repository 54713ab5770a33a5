//! `sf init` -- create the form database.

use anyhow::Result;

use crate::context::RuntimeContext;
use crate::output::print_json;

pub fn run(ctx: &RuntimeContext) -> Result<()> {
    let path = ctx.database_path();
    let existed = path.exists();
    ctx.create_store()?;

    if ctx.json {
        print_json(&serde_json::json!({
            "db": path.display().to_string(),
            "created": !existed,
        }))?;
    } else if !ctx.quiet {
        if existed {
            println!("Form database already exists at {}", path.display());
        } else {
            println!("Initialized form database at {}", path.display());
        }
    }
    Ok(())
}
