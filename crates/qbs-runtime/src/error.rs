use std::fmt;

use crate::events::SessionStatus;

/// Result type for qbs-runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur in the runtime layer
#[derive(Debug)]
pub enum Error {
    /// Packet encoding or decoding failed
    Types(qbs_types::Error),

    /// IO operation failed
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Request submitted while the session was not started
    NotReady(SessionStatus),

    /// Request that callers may not submit directly
    InvalidRequest(String),

    /// Build tool could not be launched or exited during the handshake
    Startup(String),

    /// Build tool speaks a protocol this client cannot talk to
    IncompatibleProtocol { api_level: i64, api_compat_level: i64 },

    /// No hello arrived within the handshake timeout
    HandshakeTimeout,

    /// Configured build tool executable could not be found
    ExecutableNotFound(String),

    /// External command ran but reported failure
    Command(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Types(err) => write!(f, "Protocol error: {}", err),
            Error::Io(err) => write!(f, "IO error: {}", err),
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::NotReady(status) => write!(f, "Session not ready (status: {})", status),
            Error::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            Error::Startup(msg) => write!(f, "Failed to start build tool session: {}", msg),
            Error::IncompatibleProtocol {
                api_level,
                api_compat_level,
            } => write!(
                f,
                "Incompatible build tool protocol: api level {}, compatibility level {}",
                api_level, api_compat_level
            ),
            Error::HandshakeTimeout => write!(f, "Timed out waiting for the build tool handshake"),
            Error::ExecutableNotFound(msg) => write!(f, "Executable not found: {}", msg),
            Error::Command(msg) => write!(f, "Command failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Types(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<qbs_types::Error> for Error {
    fn from(err: qbs_types::Error) -> Self {
        Error::Types(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<which::Error> for Error {
    fn from(err: which::Error) -> Self {
        Error::ExecutableNotFound(err.to_string())
    }
}
