use anyhow::Result;
use qbs_runtime::{
    ProjectLocator, WorkspaceScanner, enumerate_configurations, enumerate_profiles,
    locate_executable,
};

use crate::context::ExecutionContext;
use crate::output::Printer;
use crate::types::OutputFormat;

pub fn projects(ctx: &ExecutionContext, printer: &Printer) -> Result<()> {
    let scanner =
        WorkspaceScanner::new(ctx.workspace()).with_max_depth(ctx.settings().project_scan_depth);
    let projects = scanner.find_projects()?;

    if projects.is_empty() && printer.format() == OutputFormat::Plain {
        eprintln!("No project files found in {}", ctx.workspace().display());
        return Ok(());
    }
    printer.paths(&projects)
}

pub async fn profiles(ctx: &ExecutionContext, printer: &Printer) -> Result<()> {
    let settings = ctx.settings();
    let qbs = locate_executable(&settings.qbs_path)?;
    let profiles = enumerate_profiles(&qbs, Some(settings.settings_directory.as_str())).await?;
    printer.lines(&profiles)
}

pub fn configurations(printer: &Printer) -> Result<()> {
    printer.lines(&enumerate_configurations())
}
