use anyhow::{Result, anyhow, bail};
use futures::stream::StreamExt;
use qbs_sdk::{Client, OperationOptions, OperationReport};
use std::path::Path;
use tokio::task::JoinHandle;

use crate::args::OperationArgs;
use crate::context::ExecutionContext;
use crate::output::Printer;
use crate::types::ToolLogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Build,
    Clean,
    Install,
}

impl Step {
    fn as_str(&self) -> &'static str {
        match self {
            Step::Build => "build",
            Step::Clean => "clean",
            Step::Install => "install",
        }
    }
}

impl From<&OperationArgs> for OperationOptions {
    fn from(args: &OperationArgs) -> Self {
        let mut options = OperationOptions::new().products(args.products.iter().cloned());
        if let Some(jobs) = args.jobs {
            options = options.max_jobs(jobs);
        }
        if args.keep_going {
            options = options.keep_going(true);
        }
        if let Some(level) = args.tool_log_level {
            options = options.log_level(level.into());
        }
        options
    }
}

/// Started client plus the background task echoing its events.
struct Attached {
    client: Client,
    echo: JoinHandle<()>,
}

impl Attached {
    async fn open(ctx: &ExecutionContext, printer: &Printer) -> Result<Self> {
        let client = ctx.connect().await?;

        let mut events = client.events();
        let echo_printer = *printer;
        let echo = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                echo_printer.event(&event);
            }
        });

        install_cancel_handler(&client);
        Ok(Self { client, echo })
    }

    /// Resolve, printing the report only when it failed.
    async fn resolve(&self, printer: &Printer, options: &OperationOptions) -> Result<()> {
        let report = self.client.resolve(options).await;
        if !report.is_success() {
            printer.report(&report)?;
            bail!("resolve failed");
        }
        Ok(())
    }

    async fn close(self) {
        if let Err(err) = self.client.stop().await {
            tracing::warn!("stopping session: {}", err);
        }
        self.echo.abort();
    }
}

fn install_cancel_handler(client: &Client) {
    let client = client.clone();
    let result = ctrlc::set_handler(move || {
        eprintln!("Canceling...");
        client.cancel();
    });
    if let Err(err) = result {
        tracing::debug!("interrupt handler not installed: {}", err);
    }
}

fn ensure_success(report: &OperationReport, what: &str) -> Result<()> {
    if report.is_success() {
        Ok(())
    } else {
        Err(anyhow!("{} failed", what))
    }
}

pub async fn resolve(
    ctx: &ExecutionContext,
    printer: &Printer,
    tool_log_level: Option<ToolLogLevel>,
) -> Result<()> {
    let attached = Attached::open(ctx, printer).await?;

    let mut options = OperationOptions::new();
    if let Some(level) = tool_log_level {
        options = options.log_level(level.into());
    }
    let report = attached.client.resolve(&options).await;
    printer.report(&report)?;

    attached.close().await;
    ensure_success(&report, "resolve")
}

pub async fn run(
    ctx: &ExecutionContext,
    printer: &Printer,
    step: Step,
    args: &OperationArgs,
) -> Result<()> {
    let attached = Attached::open(ctx, printer).await?;
    let options = OperationOptions::from(args);

    let outcome = async {
        attached.resolve(printer, &OperationOptions::new()).await?;
        let report = match step {
            Step::Build => attached.client.build(&options).await,
            Step::Clean => attached.client.clean(&options).await,
            Step::Install => attached.client.install(&options).await,
        };
        printer.report(&report)?;
        Ok::<_, anyhow::Error>(report)
    }
    .await;

    attached.close().await;
    let report = outcome?;
    ensure_success(&report, step.as_str())
}

pub async fn products(ctx: &ExecutionContext, printer: &Printer) -> Result<()> {
    let attached = Attached::open(ctx, printer).await?;
    let outcome = attached.resolve(printer, &OperationOptions::new()).await;
    let products = attached.client.runnable_products();
    attached.close().await;

    outcome?;
    printer.products(&products)
}

pub async fn run_environment(
    ctx: &ExecutionContext,
    printer: &Printer,
    product: &str,
) -> Result<()> {
    let attached = Attached::open(ctx, printer).await?;

    let outcome = async {
        attached.resolve(printer, &OperationOptions::new()).await?;
        let known = attached
            .client
            .runnable_products()
            .iter()
            .any(|p| p.full_display_name == product);
        if !known {
            bail!("no enabled product named '{}'", product);
        }
        Ok::<_, anyhow::Error>(attached.client.run_environment(product).await)
    }
    .await;

    attached.close().await;
    let report = outcome?;
    match &report.environment {
        Some(environment) if report.is_success() => printer.environment(environment),
        _ => {
            printer.report(&report)?;
            Err(anyhow!("run-environment failed"))
        }
    }
}

pub async fn code_model(ctx: &ExecutionContext, printer: &Printer, file: &Path) -> Result<()> {
    let file = if file.is_absolute() {
        file.to_path_buf()
    } else {
        std::env::current_dir()?.join(file)
    };

    let attached = Attached::open(ctx, printer).await?;
    let outcome = attached.resolve(printer, &OperationOptions::new()).await;
    let config = attached.client.source_configuration(&file);
    attached.close().await;

    outcome?;
    match config {
        Some(config) => printer.source_configuration(&config),
        None => bail!("{} is not part of any product", file.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_args_become_options() {
        let args = OperationArgs {
            products: vec!["app".to_string()],
            jobs: Some(4),
            keep_going: true,
            tool_log_level: Some(ToolLogLevel::Debug),
        };
        let options = OperationOptions::from(&args);

        assert_eq!(options.products, vec!["app"]);
        assert_eq!(options.max_jobs, Some(4));
        assert_eq!(options.keep_going, Some(true));
        assert_eq!(options.log_level, Some(qbs_sdk::LogLevel::Debug));
    }

    #[test]
    fn test_defaults_leave_settings_in_charge() {
        let options = OperationOptions::from(&OperationArgs::default());
        assert_eq!(options, OperationOptions::new());
    }
}
