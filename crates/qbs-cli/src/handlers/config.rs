use anyhow::{Result, bail};
use qbs_sdk::Settings;

use crate::context::ExecutionContext;
use crate::output::Printer;
use crate::types::OutputFormat;

pub fn path(ctx: &ExecutionContext) -> Result<()> {
    println!("{}", ctx.config_path().display());
    Ok(())
}

/// Effective settings: the file's values with command-line overrides applied.
pub fn show(ctx: &ExecutionContext, printer: &Printer) -> Result<()> {
    let settings = ctx.settings();
    match printer.format() {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(settings)?),
        OutputFormat::Plain => print!("{}", toml::to_string_pretty(settings)?),
    }
    Ok(())
}

pub fn init(ctx: &ExecutionContext, force: bool) -> Result<()> {
    let path = ctx.config_path();
    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let settings = Settings {
        qbs_path: ctx.settings().qbs_path.clone(),
        ..Default::default()
    };
    settings.save_to(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
