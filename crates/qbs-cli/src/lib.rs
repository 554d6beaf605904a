mod args;
mod commands;
pub mod context;
mod handlers;
pub mod output;
pub mod types;

pub use args::{Cli, Commands, ConfigCommand, OperationArgs};
pub use commands::run;
