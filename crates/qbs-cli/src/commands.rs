use anyhow::Result;
use tracing_subscriber::EnvFilter;

use super::args::{Cli, Commands, ConfigCommand};
use super::handlers::{self, operation::Step};
use crate::context::ExecutionContext;
use crate::output::Printer;
use crate::types::LogLevel;

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.log_level);

    let ctx = ExecutionContext::new(&cli)?;
    let printer = Printer::new(cli.format);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(dispatch(cli.command, &ctx, &printer))
}

async fn dispatch(command: Commands, ctx: &ExecutionContext, printer: &Printer) -> Result<()> {
    use handlers::operation;

    match command {
        Commands::Projects => handlers::workspace::projects(ctx, printer),
        Commands::Profiles => handlers::workspace::profiles(ctx, printer).await,
        Commands::Configurations => handlers::workspace::configurations(printer),

        Commands::Resolve { tool_log_level } => {
            operation::resolve(ctx, printer, tool_log_level).await
        }
        Commands::Build { args } => operation::run(ctx, printer, Step::Build, &args).await,
        Commands::Clean { args } => operation::run(ctx, printer, Step::Clean, &args).await,
        Commands::Install { args } => operation::run(ctx, printer, Step::Install, &args).await,
        Commands::Products => operation::products(ctx, printer).await,
        Commands::RunEnv { product } => operation::run_environment(ctx, printer, &product).await,
        Commands::CodeModel { file } => operation::code_model(ctx, printer, &file).await,

        Commands::Config { command } => match command {
            ConfigCommand::Path => handlers::config::path(ctx),
            ConfigCommand::Show => handlers::config::show(ctx, printer),
            ConfigCommand::Init { force } => handlers::config::init(ctx, force),
        },
    }
}

/// Diagnostics go to stderr; `RUST_LOG` wins over `--log-level`.
fn init_logging(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
