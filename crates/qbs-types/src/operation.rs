use std::fmt;
use std::time::Duration;

/// Build-tool operations that report a terminal outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Resolve,
    Build,
    Clean,
    Install,
}

impl OperationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Resolve => "resolve",
            OperationType::Build => "build",
            OperationType::Clean => "clean",
            OperationType::Install => "install",
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    Started,
    Completed,
    Failed,
}

/// Snapshot of one operation at a point in its lifecycle.
///
/// A new value is published for every transition; values are never updated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub kind: OperationType,
    pub status: OperationStatus,
    pub elapsed: Duration,
}

impl Operation {
    pub fn started(kind: OperationType) -> Self {
        Self {
            kind,
            status: OperationStatus::Started,
            elapsed: Duration::ZERO,
        }
    }

    pub fn finished(kind: OperationType, success: bool, elapsed: Duration) -> Self {
        Self {
            kind,
            status: if success {
                OperationStatus::Completed
            } else {
                OperationStatus::Failed
            },
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finished_maps_success_to_status() {
        let ok = Operation::finished(OperationType::Build, true, Duration::from_secs(2));
        assert_eq!(ok.status, OperationStatus::Completed);
        assert!(ok.is_success());

        let failed = Operation::finished(OperationType::Clean, false, Duration::ZERO);
        assert_eq!(failed.status, OperationStatus::Failed);
        assert_eq!(
            Operation::started(OperationType::Install).status,
            OperationStatus::Started
        );
    }
}
