use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};

use crate::{Error, Result};

/// Byte channel to a running build tool.
///
/// `child` is `None` for in-process transports; the session then treats the
/// end of `reader` as process exit.
pub struct Connection {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub writer: Box<dyn AsyncWrite + Send + Unpin>,
    pub child: Option<Child>,
}

/// Creates the build tool process for a session.
///
/// Called from inside the tokio runtime, once per successful `start()` claim.
pub trait Launcher: Send + Sync {
    fn launch(&self) -> Result<Connection>;
}

impl<L: Launcher + ?Sized> Launcher for Box<L> {
    fn launch(&self) -> Result<Connection> {
        (**self).launch()
    }
}

/// Spawns `<qbs> session` with piped stdio.
#[derive(Debug, Clone)]
pub struct QbsLauncher {
    executable: PathBuf,
    working_directory: Option<PathBuf>,
}

impl QbsLauncher {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            working_directory: None,
        }
    }

    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }
}

impl Launcher for QbsLauncher {
    fn launch(&self) -> Result<Connection> {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("session")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_directory {
            cmd.current_dir(dir);
        }

        tracing::info!("Starting build tool session: {}", self.executable.display());
        let mut child = cmd.spawn().map_err(|e| {
            Error::Startup(format!(
                "failed to spawn {}: {}",
                self.executable.display(),
                e
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Startup("build tool stdin is not piped".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Startup("build tool stdout is not piped".to_string()))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!(target: "qbs", "{}", line);
                }
            });
        }

        Ok(Connection {
            reader: Box::new(stdout),
            writer: Box::new(stdin),
            child: Some(child),
        })
    }
}

/// Resolve the configured build tool path to an existing executable.
///
/// A bare name is looked up on `PATH`; anything with a separator must exist.
pub fn locate_executable(configured: &str) -> Result<PathBuf> {
    let configured = configured.trim();
    if configured.is_empty() {
        return Err(Error::ExecutableNotFound(
            "build tool executable is not set in configuration".to_string(),
        ));
    }

    if !configured.contains(['/', '\\']) && !configured.starts_with('~') {
        return which::which(configured).map_err(|e| {
            Error::ExecutableNotFound(format!("{} not found on PATH: {}", configured, e))
        });
    }

    let path = crate::config::expand_tilde(configured);
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::ExecutableNotFound(format!(
            "{} does not exist",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_path_is_not_set() {
        let err = locate_executable("  ").unwrap_err();
        assert!(matches!(err, Error::ExecutableNotFound(_)));
        assert!(err.to_string().contains("not set"));
    }

    #[test]
    fn test_explicit_path_must_exist() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let qbs = temp_dir.path().join("qbs");
        std::fs::write(&qbs, "")?;

        assert_eq!(locate_executable(qbs.to_str().unwrap())?, qbs);

        let missing = temp_dir.path().join("missing").join("qbs");
        assert!(locate_executable(missing.to_str().unwrap()).is_err());
        Ok(())
    }

    #[test]
    fn test_unknown_bare_name() {
        assert!(locate_executable("qbs-session-no-such-tool").is_err());
    }
}
