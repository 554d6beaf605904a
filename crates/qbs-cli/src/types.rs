use clap::ValueEnum;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Plain => write!(f, "plain"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Verbosity of this program's own diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

/// Verbosity requested from the build tool for one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum ToolLogLevel {
    Error,
    Warning,
    Info,
    Debug,
    Trace,
}

impl fmt::Display for ToolLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(qbs_sdk::LogLevel::from(*self).as_str())
    }
}

impl From<ToolLogLevel> for qbs_sdk::LogLevel {
    fn from(level: ToolLogLevel) -> Self {
        match level {
            ToolLogLevel::Error => qbs_sdk::LogLevel::Error,
            ToolLogLevel::Warning => qbs_sdk::LogLevel::Warning,
            ToolLogLevel::Info => qbs_sdk::LogLevel::Info,
            ToolLogLevel::Debug => qbs_sdk::LogLevel::Debug,
            ToolLogLevel::Trace => qbs_sdk::LogLevel::Trace,
        }
    }
}
