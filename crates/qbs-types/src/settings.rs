use serde::{Deserialize, Serialize};
use std::fmt;

/// Verbosity requested from the build tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorHandlingMode {
    Strict,
    #[default]
    Relaxed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandEchoMode {
    #[default]
    Summary,
    CommandLine,
    CommandLineWithEnvironment,
}

impl CommandEchoMode {
    pub fn from_preference(show_command_lines: bool) -> Self {
        if show_command_lines {
            CommandEchoMode::CommandLine
        } else {
            CommandEchoMode::Summary
        }
    }
}

/// Source of the user-facing knobs that requests are built from.
///
/// Values are read once when a request is constructed; later changes only
/// affect requests built afterwards.
pub trait SettingsProvider {
    /// Fully expanded build root for the active profile and configuration
    fn build_directory(&self) -> String;
    /// Qbs settings directory, empty when the tool default is wanted
    fn settings_directory(&self) -> String;
    /// Parallel job limit, 0 lets the tool decide
    fn max_jobs(&self) -> u32;
    fn keep_going(&self) -> bool;
    fn log_level(&self) -> LogLevel;
    fn show_command_lines(&self) -> bool;
    fn force_probes(&self) -> bool;
    fn error_handling_mode(&self) -> ErrorHandlingMode;
    fn clean_install_root(&self) -> bool;
}

/// Settings used when no provider is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSettings;

impl SettingsProvider for DefaultSettings {
    fn build_directory(&self) -> String {
        String::new()
    }

    fn settings_directory(&self) -> String {
        String::new()
    }

    fn max_jobs(&self) -> u32 {
        0
    }

    fn keep_going(&self) -> bool {
        false
    }

    fn log_level(&self) -> LogLevel {
        LogLevel::Info
    }

    fn show_command_lines(&self) -> bool {
        false
    }

    fn force_probes(&self) -> bool {
        false
    }

    fn error_handling_mode(&self) -> ErrorHandlingMode {
        ErrorHandlingMode::Relaxed
    }

    fn clean_install_root(&self) -> bool {
        false
    }
}
