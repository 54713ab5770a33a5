//! Command handlers, one module per subcommand.

pub mod delete;
pub mod export;
pub mod import;
pub mod init;
pub mod list;
pub mod run;
pub mod validate;
