use std::fmt;

/// Result type for qbs-types operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while encoding or decoding packets
#[derive(Debug)]
pub enum Error {
    /// Payload was not valid JSON, or a request could not be serialized
    Json(serde_json::Error),

    /// Payload was not valid base64
    Base64(base64::DecodeError),

    /// Packet header was malformed or stray bytes were skipped
    Framing(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Json(err) => write!(f, "JSON error: {}", err),
            Error::Base64(err) => write!(f, "Base64 error: {}", err),
            Error::Framing(msg) => write!(f, "Framing error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(err) => Some(err),
            Error::Base64(err) => Some(err),
            Error::Framing(_) => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Base64(err)
    }
}
