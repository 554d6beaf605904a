use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    InvalidInput(String),
    Runtime(qbs_runtime::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            Error::Runtime(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Runtime(err) => Some(err),
            Error::InvalidInput(_) => None,
        }
    }
}

impl From<qbs_runtime::Error> for Error {
    fn from(err: qbs_runtime::Error) -> Self {
        Error::Runtime(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_runtime_errors_keep_their_message_and_source() {
        let err: Error = qbs_runtime::Error::HandshakeTimeout.into();
        assert!(matches!(err, Error::Runtime(qbs_runtime::Error::HandshakeTimeout)));
        assert_eq!(
            err.to_string(),
            "Timed out waiting for the build tool handshake"
        );
        assert!(err.source().is_some());

        let err = Error::InvalidInput("no project".to_string());
        assert_eq!(err.to_string(), "Invalid input: no project");
        assert!(err.source().is_none());
    }
}
