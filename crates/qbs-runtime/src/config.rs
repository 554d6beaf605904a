use qbs_types::{ErrorHandlingMode, LogLevel, SettingsProvider};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{Error, Result};

pub const CONFIG_ENV: &str = "QBS_SESSION_CONFIG";

const DEFAULT_BUILD_DIRECTORY: &str = "${workspaceFolder}/build/${profileName}_${configurationName}";

/// Expand tilde (~) in paths to the user's home directory
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(stripped);
    }
    PathBuf::from(path)
}

/// User settings, stored as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Build tool executable: a bare name looked up on PATH, or a path
    pub qbs_path: String,
    /// Build root template, see [`Settings::expand_build_directory`]
    pub build_directory: String,
    pub settings_directory: String,
    pub max_jobs: u32,
    pub keep_going: bool,
    pub log_level: LogLevel,
    pub show_command_lines: bool,
    pub force_probes: bool,
    pub error_handling_mode: ErrorHandlingMode,
    pub clean_install_root: bool,
    /// How deep below the workspace root project files are searched for
    pub project_scan_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            qbs_path: "qbs".to_string(),
            build_directory: DEFAULT_BUILD_DIRECTORY.to_string(),
            settings_directory: String::new(),
            max_jobs: 0,
            keep_going: false,
            log_level: LogLevel::Info,
            show_command_lines: false,
            force_probes: false,
            error_handling_mode: ErrorHandlingMode::Relaxed,
            clean_install_root: false,
            project_scan_depth: 1,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Settings file location:
    /// 1. QBS_SESSION_CONFIG environment variable (with tilde expansion)
    /// 2. `<config dir>/qbs-session/settings.toml`
    pub fn default_path() -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            return Ok(expand_tilde(&env_path));
        }

        dirs::config_dir()
            .map(|dir| dir.join("qbs-session").join("settings.toml"))
            .ok_or_else(|| {
                Error::Config("Could not determine configuration directory".to_string())
            })
    }

    /// Substitute `${workspaceFolder}`, `${profileName}` and `${configurationName}`
    /// in the build directory template. Backslashes become forward slashes.
    pub fn expand_build_directory(
        &self,
        workspace: &Path,
        profile: &str,
        configuration: &str,
    ) -> String {
        expand_variables(&self.build_directory, workspace, profile, configuration)
    }

    /// Snapshot usable as a request settings provider for one profile/configuration.
    pub fn resolved(
        &self,
        workspace: &Path,
        profile: &str,
        configuration: &str,
    ) -> ResolvedSettings {
        ResolvedSettings {
            build_directory: self.expand_build_directory(workspace, profile, configuration),
            settings_directory: expand_variables(
                &self.settings_directory,
                workspace,
                profile,
                configuration,
            ),
            settings: self.clone(),
        }
    }
}

fn expand_variables(template: &str, workspace: &Path, profile: &str, configuration: &str) -> String {
    let expanded = template
        .replace("${workspaceFolder}", &workspace.to_string_lossy())
        .replace("${profileName}", profile)
        .replace("${configurationName}", configuration);
    expand_tilde(&expanded)
        .to_string_lossy()
        .replace('\\', "/")
}

/// [`Settings`] with the path templates expanded.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    settings: Settings,
    build_directory: String,
    settings_directory: String,
}

impl SettingsProvider for ResolvedSettings {
    fn build_directory(&self) -> String {
        self.build_directory.clone()
    }

    fn settings_directory(&self) -> String {
        self.settings_directory.clone()
    }

    fn max_jobs(&self) -> u32 {
        self.settings.max_jobs
    }

    fn keep_going(&self) -> bool {
        self.settings.keep_going
    }

    fn log_level(&self) -> LogLevel {
        self.settings.log_level
    }

    fn show_command_lines(&self) -> bool {
        self.settings.show_command_lines
    }

    fn force_probes(&self) -> bool {
        self.settings.force_probes
    }

    fn error_handling_mode(&self) -> ErrorHandlingMode {
        self.settings.error_handling_mode
    }

    fn clean_install_root(&self) -> bool {
        self.settings.clean_install_root
    }
}
