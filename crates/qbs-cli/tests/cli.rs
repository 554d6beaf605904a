//! End-to-end tests of the `qbs-session` binary.
//!
//! No real `qbs` is needed: commands that talk to the build tool either run
//! against a stub script or check the failure path.

use anyhow::Result;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use qbs_testing::TestWorld;

#[test]
fn test_help_lists_commands() -> Result<()> {
    let world = TestWorld::new();
    let result = world.run(&["--help"])?;

    assert!(result.success());
    for command in ["projects", "resolve", "build", "run-env", "code-model"] {
        assert!(result.stdout().contains(command), "missing {}", command);
    }
    Ok(())
}

#[test]
fn test_projects_lists_sorted_project_files() -> Result<()> {
    let world = TestWorld::new()
        .with_project("zeta.qbs")
        .with_project("alpha.qbs")
        .with_project("nested/deep.qbs");

    let result = world.run(&["projects"])?;
    assert!(result.success(), "stderr: {}", result.stderr());

    let lines: Vec<&str> = result.stdout().lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("alpha.qbs"));
    assert!(lines[1].ends_with("zeta.qbs"));
    Ok(())
}

#[test]
fn test_projects_scan_depth_from_settings() -> Result<()> {
    let world = TestWorld::new()
        .with_project("top.qbs")
        .with_project("nested/deep.qbs")
        .with_settings(|s| s.project_scan_depth = 2);

    let result = world.run(&["--format", "json", "projects"])?;
    assert!(result.success());

    let projects = result.json()?;
    assert_eq!(projects.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[test]
fn test_projects_reports_empty_workspace() -> Result<()> {
    let world = TestWorld::new();
    let result = world.run(&["projects"])?;

    assert!(result.success());
    assert!(result.stdout().is_empty());
    assert!(result.stderr().contains("No project files found"));
    Ok(())
}

#[test]
fn test_configurations() -> Result<()> {
    let world = TestWorld::new();
    let result = world.run(&["configurations"])?;

    assert!(result.success());
    assert_eq!(result.stdout(), "debug\nrelease\n");
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_profiles_from_build_tool_listing() -> Result<()> {
    let listing = "\
defaultProfile: \"gcc\"
profiles.gcc.qbs.toolchainType: \"gcc\"
profiles.gcc.qbs.architecture: \"x86_64\"
profiles.arm-none.qbs.toolchainType: \"gcc\"
";
    let world = TestWorld::new().with_fake_qbs(listing);

    let result = world.run(&["--format", "json", "profiles"])?;
    assert!(result.success(), "stderr: {}", result.stderr());
    assert_eq!(result.json()?, serde_json::json!(["gcc", "arm-none"]));
    Ok(())
}

#[test]
fn test_profiles_without_build_tool_fails() -> Result<()> {
    let world = TestWorld::new();
    let result = world.run(&["profiles"])?;

    assert!(!result.success());
    assert!(result.stderr().contains("Executable not found"));
    Ok(())
}

#[test]
fn test_config_path_and_show() -> Result<()> {
    let world = TestWorld::new().with_settings(|s| s.max_jobs = 3);

    let result = world.run(&["config", "path"])?;
    assert!(result.success());
    assert_eq!(result.stdout().trim(), world.config_path().display().to_string());

    let result = world.run(&["--format", "json", "--qbs", "/opt/qbs/bin/qbs", "config", "show"])?;
    assert!(result.success());
    let settings = result.json()?;
    assert_eq!(settings["max_jobs"], 3);
    assert_eq!(settings["qbs_path"], "/opt/qbs/bin/qbs");
    Ok(())
}

#[test]
fn test_config_init_refuses_to_overwrite() -> Result<()> {
    let world = TestWorld::new().with_settings(|s| s.max_jobs = 5);

    let mut cmd = cargo_bin_cmd!("qbs-session");
    world.configure_command(&mut cmd)?.args(["config", "init"]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    let mut cmd = cargo_bin_cmd!("qbs-session");
    world
        .configure_command(&mut cmd)?
        .args(["--qbs", "/usr/local/bin/qbs", "config", "init", "--force"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("Wrote"));

    let written = std::fs::read_to_string(world.config_path())?;
    assert!(written.contains("/usr/local/bin/qbs"));
    assert!(!written.contains("max_jobs = 5"));
    Ok(())
}

#[test]
fn test_resolve_without_build_tool_fails() -> Result<()> {
    let world = TestWorld::new().with_project("demo.qbs");

    let mut cmd = cargo_bin_cmd!("qbs-session");
    world.configure_command(&mut cmd)?.arg("resolve");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Executable not found"));
    Ok(())
}

#[test]
fn test_run_env_requires_product() -> Result<()> {
    let world = TestWorld::new();
    let result = world.run(&["run-env"])?;

    assert!(!result.success());
    assert!(result.stderr().contains("<PRODUCT>"));
    Ok(())
}

#[test]
fn test_invalid_format_is_rejected() -> Result<()> {
    let world = TestWorld::new();
    let result = world.run(&["--format", "yaml", "projects"])?;

    assert!(!result.success());
    assert!(result.stderr().contains("yaml"));
    Ok(())
}
