use qbs_engine::ProjectModel;
use qbs_types::{Message, Operation, ProcessOutput};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Stopped,
    Starting,
    Started,
    Stopping,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Stopped => "stopped",
            SessionStatus::Starting => "starting",
            SessionStatus::Started => "started",
            SessionStatus::Stopping => "stopping",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of the task the build tool is currently running.
///
/// Values are whatever the tool sent; -1 means the field was missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskProgress {
    pub description: String,
    pub progress: i64,
    pub max_progress: i64,
}

impl fmt::Display for TaskProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.description, self.progress, self.max_progress)
    }
}

/// Notification broadcast to every session subscriber.
///
/// State changes are only sent when the value actually changed.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StatusChanged(SessionStatus),
    ActiveProjectChanged(Option<PathBuf>),
    ProfileChanged(String),
    ConfigurationChanged(String),
    Progress(TaskProgress),
    Message(Message),
    ProcessOutput(ProcessOutput),
    Operation(Operation),
    ProjectUpdated(Arc<ProjectModel>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_display() {
        let progress = TaskProgress {
            description: "Building".to_string(),
            progress: 3,
            max_progress: 10,
        };
        assert_eq!(progress.to_string(), "Building 3/10");

        let unknown = TaskProgress {
            max_progress: -1,
            ..progress
        };
        assert_eq!(unknown.to_string(), "Building 3/-1");
    }
}
