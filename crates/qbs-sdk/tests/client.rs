//! Integration tests for the operation facade.
//!
//! Every test drives a scripted in-memory build tool, so no `qbs` installation
//! is needed.

use anyhow::Result;
use futures::stream::StreamExt;
use qbs_sdk::{
    Client, IntelliSenseMode, LogLevel, OperationOptions, OperationStatus, OperationType,
    SessionEvent, SessionStatus, Settings,
};
use qbs_testing::fixtures::{self, standard_script};
use qbs_testing::{FakeBuildTool, Reply};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

const TIMEOUT: Duration = Duration::from_secs(5);

struct Fixture {
    _workspace: TempDir,
    client: Client,
    tool: FakeBuildTool,
}

fn fixture_with(tool: FakeBuildTool, settings: Settings) -> Result<Fixture> {
    let workspace = TempDir::new()?;
    std::fs::write(workspace.path().join("demo.qbs"), "Project {}\n")?;
    std::fs::write(workspace.path().join("other.qbs"), "Project {}\n")?;

    let client = Client::builder(workspace.path())
        .settings(settings)
        .launcher(tool.clone())
        .build()?;
    Ok(Fixture {
        _workspace: workspace,
        client,
        tool,
    })
}

async fn started(tool: FakeBuildTool) -> Result<Fixture> {
    let fixture = fixture_with(tool, Settings::default())?;
    tokio::time::timeout(TIMEOUT, fixture.client.start()).await??;
    Ok(fixture)
}

#[tokio::test]
async fn test_resolve_selects_first_project() -> Result<()> {
    let fx = started(FakeBuildTool::standard()).await?;
    fx.client.select_profile("gcc");

    let report = fx.client.resolve(&OperationOptions::new()).await;

    assert!(report.is_success(), "resolve failed: {}", report.messages);
    assert_eq!(report.operation().map(|op| op.kind), Some(OperationType::Resolve));
    assert_eq!(report.project.as_ref().map(|p| p.root().name()), Some("demo"));

    let expected = fx.client.workspace().join("demo.qbs");
    assert_eq!(fx.client.session().active_project(), Some(expected.clone()));

    let sent = &fx.tool.requests()[0];
    assert_eq!(sent["project-file-path"], expected.to_string_lossy().to_string());
    assert_eq!(sent["top-level-profile"], "gcc");
    assert_eq!(sent["configuration-name"], "debug");
    let build_root = sent["build-root"].as_str().unwrap_or_default();
    assert!(build_root.ends_with("/build/gcc_debug"), "{}", build_root);
    Ok(())
}

#[tokio::test]
async fn test_resolve_uses_selected_project_and_overrides() -> Result<()> {
    let fx = started(FakeBuildTool::standard()).await?;
    fx.client.select_project("other.qbs");
    fx.client.select_configuration("release");

    let options = OperationOptions::new().log_level(LogLevel::Debug);
    let report = fx.client.resolve(&options).await;
    assert!(report.is_success());

    let sent = &fx.tool.requests()[0];
    let expected = fx.client.workspace().join("other.qbs");
    assert_eq!(sent["project-file-path"], expected.to_string_lossy().to_string());
    assert_eq!(sent["configuration-name"], "release");
    assert_eq!(sent["log-level"], "debug");
    Ok(())
}

#[tokio::test]
async fn test_resolve_without_projects_fails() -> Result<()> {
    let tool = FakeBuildTool::standard();
    let workspace = TempDir::new()?;
    let client = Client::builder(workspace.path())
        .settings(Settings::default())
        .launcher(tool.clone())
        .build()?;
    client.start().await?;

    let report = client.resolve(&OperationOptions::new()).await;
    assert_eq!(report.status, OperationStatus::Failed);
    assert!(report.messages.to_string().contains("no project file found"));
    assert!(tool.requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_build_applies_options_over_settings() -> Result<()> {
    let settings = Settings {
        max_jobs: 2,
        keep_going: false,
        show_command_lines: true,
        ..Default::default()
    };
    let fx = fixture_with(FakeBuildTool::standard(), settings)?;
    fx.client.start().await?;

    let options = OperationOptions::new()
        .product("app")
        .max_jobs(6)
        .keep_going(true);
    let report = fx.client.build(&options).await;
    assert!(report.is_success());

    let sent = &fx.tool.requests()[0];
    assert_eq!(sent["type"], "build-project");
    assert_eq!(sent["products"], serde_json::json!(["app"]));
    assert_eq!(sent["max-job-count"], 6);
    assert_eq!(sent["keep-going"], true);
    assert_eq!(sent["command-echo-mode"], "command-line");

    let clean = fx.client.clean(&OperationOptions::new()).await;
    assert!(clean.is_success());
    let sent = &fx.tool.requests()[1];
    assert_eq!(sent["type"], "clean-project");
    assert!(sent.get("products").is_none());

    let install = fx.client.install(&OperationOptions::new()).await;
    assert_eq!(install.operation().map(|op| op.kind), Some(OperationType::Install));
    Ok(())
}

#[tokio::test]
async fn test_operations_before_start_report_failure() -> Result<()> {
    let fx = fixture_with(FakeBuildTool::standard(), Settings::default())?;

    let report = fx.client.build(&OperationOptions::new()).await;

    assert_eq!(report.status, OperationStatus::Failed);
    assert!(report.messages.to_string().contains("not ready"));
    assert_eq!(fx.tool.launches(), 0);
    Ok(())
}

#[tokio::test]
async fn test_tool_failure_is_reported_not_raised() -> Result<()> {
    let tool = FakeBuildTool::new(|request| match request["type"].as_str() {
        Some("build-project") => vec![Reply::Send(fixtures::operation_done(
            "project-built",
            Some("main.cpp:3: error: expected ';'"),
        ))],
        _ => standard_script(request),
    });
    let fx = started(tool).await?;

    let report = fx.client.build(&OperationOptions::new()).await;
    assert_eq!(report.status, OperationStatus::Failed);
    assert_eq!(report.messages.len(), 1);
    assert_eq!(fx.client.session().status(), SessionStatus::Started);
    Ok(())
}

#[tokio::test]
async fn test_runnable_products_and_run_environment() -> Result<()> {
    let fx = started(FakeBuildTool::standard()).await?;
    assert!(fx.client.runnable_products().is_empty());

    fx.client.resolve(&OperationOptions::new()).await;
    let products = fx.client.runnable_products();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].full_display_name, "app");

    let report = fx.client.run_environment(&products[0].full_display_name).await;
    assert!(report.is_success());
    let env = report.environment.expect("environment expected");
    assert_eq!(env.get("QBS_RUN_PRODUCT").map(String::as_str), Some("app"));
    Ok(())
}

#[tokio::test]
async fn test_source_configuration_after_resolve() -> Result<()> {
    let fx = started(FakeBuildTool::standard()).await?;
    let main = Path::new("/work/demo/app/main.cpp");
    assert!(fx.client.source_configuration(main).is_none());

    fx.client.resolve(&OperationOptions::new()).await;

    let config = fx
        .client
        .source_configuration(main)
        .expect("main.cpp belongs to app");
    assert_eq!(config.compiler_path, "/usr/bin/g++");
    assert_eq!(config.intellisense_mode, IntelliSenseMode::GccX64);
    assert!(
        fx.client
            .source_configuration(Path::new("/elsewhere/x.cpp"))
            .is_none()
    );
    Ok(())
}

#[tokio::test]
async fn test_cancel_reports_failure() -> Result<()> {
    let tool = FakeBuildTool::new(|request| match request["type"].as_str() {
        Some("build-project") => vec![
            Reply::UntilCanceled,
            Reply::Send(fixtures::operation_done("project-built", None)),
        ],
        _ => Vec::new(),
    });
    let fx = started(tool).await?;

    let client = fx.client.clone();
    let build = tokio::spawn(async move { client.build(&OperationOptions::new()).await });
    tokio::time::timeout(TIMEOUT, async {
        while fx.tool.requests().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await?;
    fx.client.cancel();

    let report = tokio::time::timeout(TIMEOUT, build).await??;
    assert_eq!(report.status, OperationStatus::Failed);
    assert_eq!(report.messages.to_string(), "Operation canceled");
    Ok(())
}

#[tokio::test]
async fn test_event_stream_reports_operation_lifecycle() -> Result<()> {
    let fx = started(FakeBuildTool::standard()).await?;
    let mut events = fx.client.events();

    let report = fx.client.clean(&OperationOptions::new()).await;
    assert!(report.is_success());

    let mut seen = Vec::new();
    while seen.len() < 2 {
        let event = tokio::time::timeout(TIMEOUT, events.next()).await?;
        if let Some(SessionEvent::Operation(op)) = event {
            seen.push(op.status);
        }
    }
    assert_eq!(seen, vec![OperationStatus::Started, OperationStatus::Completed]);
    Ok(())
}

#[tokio::test]
async fn test_find_projects_honors_scan_depth() -> Result<()> {
    let settings = Settings {
        project_scan_depth: 2,
        ..Default::default()
    };
    let fx = fixture_with(FakeBuildTool::standard(), settings)?;
    let nested = fx.client.workspace().join("sub");
    std::fs::create_dir(&nested)?;
    std::fs::write(nested.join("nested.qbs"), "")?;

    assert_eq!(fx.client.find_projects()?.len(), 3);

    let mut shallow = fx.client.settings();
    shallow.project_scan_depth = 1;
    fx.client.set_settings(shallow);
    assert_eq!(fx.client.find_projects()?.len(), 2);
    assert_eq!(fx.client.configurations(), vec!["debug", "release"]);
    Ok(())
}
