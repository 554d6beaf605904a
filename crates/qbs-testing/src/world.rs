//! TestWorld pattern for CLI integration tests.
//!
//! Provides a fluent interface for:
//! - Creating an isolated workspace with project files
//! - Writing a settings file the CLI is pointed at
//! - Installing a stub `qbs` executable
//! - Executing CLI commands with proper context

use anyhow::Result;
use assert_cmd::Command;
use qbs_runtime::Settings;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Declarative test environment builder.
///
/// # Example
/// ```no_run
/// use qbs_testing::TestWorld;
///
/// let world = TestWorld::new().with_project("demo.qbs");
///
/// let result = world.run(&["projects"]).unwrap();
/// assert!(result.success());
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    workspace: PathBuf,
    config_path: PathBuf,
    settings: Settings,
    env_vars: HashMap<String, String>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// Create a new isolated test environment.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let workspace = temp_dir.path().join("workspace");
        std::fs::create_dir_all(&workspace).expect("Failed to create workspace dir");
        let config_path = temp_dir.path().join("config").join("settings.toml");

        Self {
            workspace,
            config_path,
            temp_dir,
            settings: Settings {
                qbs_path: "qbs-session-test-missing-tool".to_string(),
                ..Default::default()
            },
            env_vars: HashMap::new(),
        }
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Create an empty project file relative to the workspace root.
    pub fn with_project(self, relative: &str) -> Self {
        let path = self.workspace.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create project dir");
        }
        std::fs::write(&path, "Project {}\n").expect("Failed to write project file");
        self
    }

    /// Adjust the settings written before each run.
    pub fn with_settings(mut self, update: impl FnOnce(&mut Settings)) -> Self {
        update(&mut self.settings);
        self
    }

    /// Set an environment variable for CLI execution.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Install a shell script standing in for `qbs` whose `config --list`
    /// prints `listing`, and point the settings at it.
    #[cfg(unix)]
    pub fn with_fake_qbs(mut self, listing: &str) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let bin_dir = self.temp_dir.path().join("bin");
        std::fs::create_dir_all(&bin_dir).expect("Failed to create bin dir");
        let listing_path = bin_dir.join("config-list.txt");
        std::fs::write(&listing_path, listing).expect("Failed to write listing");

        let script = bin_dir.join("qbs");
        let body = format!(
            "#!/bin/sh\nif [ \"$1\" = \"config\" ] && [ \"$2\" = \"--list\" ]; then\n  cat '{}'\n  exit 0\nfi\necho \"unsupported: $*\" >&2\nexit 2\n",
            listing_path.display()
        );
        std::fs::write(&script, body).expect("Failed to write fake qbs");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("Failed to make fake qbs executable");

        self.settings.qbs_path = script.to_string_lossy().into_owned();
        self
    }

    /// Configure a CLI command with this test environment's settings.
    ///
    /// Writes the settings file first, so changes made through
    /// [`TestWorld::with_settings`] are visible to the command.
    pub fn configure_command<'a>(&self, cmd: &'a mut Command) -> Result<&'a mut Command> {
        self.settings.save_to(&self.config_path)?;

        cmd.arg("--config")
            .arg(&self.config_path)
            .arg("--workspace")
            .arg(&self.workspace);

        cmd.current_dir(&self.workspace);
        cmd.env_remove(qbs_runtime::CONFIG_ENV);
        cmd.env("RUST_LOG", "off");

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        Ok(cmd)
    }

    /// Execute a command using the project's binary and return the result.
    ///
    /// # Note
    /// This method uses `Command::cargo_bin()` which requires the binary to be
    /// built and the `CARGO_BIN_EXE_` environment variable to be set (which
    /// cargo test does automatically).
    #[allow(deprecated)]
    pub fn run(&self, args: &[&str]) -> Result<CliResult> {
        let mut cmd = Command::cargo_bin("qbs-session")
            .map_err(|e| anyhow::anyhow!("Failed to find qbs-session binary: {}", e))?;

        self.configure_command(&mut cmd)?;
        cmd.args(args);

        let output = cmd.output()?;

        Ok(CliResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Result of a CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    /// Check if the command succeeded.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Parse stdout as JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.stdout)?)
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}
