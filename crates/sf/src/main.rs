//! `sf` -- form-based signal annotation workbench CLI.
//!
//! Parses CLI arguments with clap, builds the runtime context, and
//! dispatches to command handlers. Ctrl+C requests cooperative
//! cancellation of a running form; a second Ctrl+C force-exits.

mod cli;
mod commands;
mod context;
mod output;
mod signal_io;

use clap::Parser;

use sigform_engine::CancelToken;

use cli::{Cli, Commands};
use context::RuntimeContext;

fn main() {
    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    let _ = ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            // Second signal: force exit.
            std::process::exit(130);
        }
        handler_token.cancel();
    });

    let cli = Cli::parse();
    let ctx = RuntimeContext::from_global_args(&cli.global);

    if ctx.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("sf=debug,sigform_storage=debug,sigform_engine=debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Some(Commands::Init) => commands::init::run(&ctx),
        Some(Commands::Import(args)) => commands::import::run(&ctx, &args),
        Some(Commands::Export(args)) => commands::export::run(&ctx, &args),
        Some(Commands::List) => commands::list::run(&ctx),
        Some(Commands::Validate(args)) => commands::validate::run(&ctx, &args),
        Some(Commands::Run(args)) => commands::run::run(&ctx, &args, &cancel),
        Some(Commands::Delete(args)) => commands::delete::run(&ctx, &args),
        None => {
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        if cli.global.json {
            let err_json = serde_json::json!({ "error": format!("{e:#}") });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{s}");
            }
        } else {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(1);
    }
}
