use qbs_engine::ProjectModel;
use qbs_runtime::{Completion, CompletionPayload};
use qbs_types::{
    ErrorHandlingMode, LogLevel, MessageItem, MessageList, Operation, OperationStatus,
    RequestKind, SettingsProvider,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Per-call overrides on top of the configured settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationOptions {
    /// Restrict the operation to these products; empty means all
    pub products: Vec<String>,
    pub max_jobs: Option<u32>,
    pub keep_going: Option<bool>,
    pub log_level: Option<LogLevel>,
}

impl OperationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn product(mut self, name: impl Into<String>) -> Self {
        self.products.push(name.into());
        self
    }

    pub fn products<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.products.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn max_jobs(mut self, jobs: u32) -> Self {
        self.max_jobs = Some(jobs);
        self
    }

    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = Some(keep_going);
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }
}

/// Settings provider with `options` layered over `base`.
pub(crate) struct WithOverrides<'a> {
    pub base: &'a dyn SettingsProvider,
    pub options: &'a OperationOptions,
}

impl SettingsProvider for WithOverrides<'_> {
    fn build_directory(&self) -> String {
        self.base.build_directory()
    }

    fn settings_directory(&self) -> String {
        self.base.settings_directory()
    }

    fn max_jobs(&self) -> u32 {
        self.options.max_jobs.unwrap_or_else(|| self.base.max_jobs())
    }

    fn keep_going(&self) -> bool {
        self.options
            .keep_going
            .unwrap_or_else(|| self.base.keep_going())
    }

    fn log_level(&self) -> LogLevel {
        self.options.log_level.unwrap_or_else(|| self.base.log_level())
    }

    fn show_command_lines(&self) -> bool {
        self.base.show_command_lines()
    }

    fn force_probes(&self) -> bool {
        self.base.force_probes()
    }

    fn error_handling_mode(&self) -> ErrorHandlingMode {
        self.base.error_handling_mode()
    }

    fn clean_install_root(&self) -> bool {
        self.base.clean_install_root()
    }
}

/// Outcome of one facade call.
///
/// Failures to submit, tool-reported errors and cancellation all end up here
/// as a `Failed` status with explanatory messages.
#[derive(Debug, Clone)]
pub struct OperationReport {
    pub kind: RequestKind,
    pub status: OperationStatus,
    pub elapsed: Duration,
    pub messages: MessageList,
    /// Freshly resolved project, for successful resolves
    pub project: Option<Arc<ProjectModel>>,
    /// Environment for running a product, for run environment queries
    pub environment: Option<BTreeMap<String, String>>,
}

impl OperationReport {
    pub fn failed(kind: RequestKind, message: impl Into<String>) -> Self {
        let mut messages = MessageList::default();
        messages.push(MessageItem::new(message));
        Self {
            kind,
            status: OperationStatus::Failed,
            elapsed: Duration::ZERO,
            messages,
            project: None,
            environment: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OperationStatus::Completed
    }

    pub fn operation(&self) -> Option<Operation> {
        self.kind.operation_type().map(|kind| Operation {
            kind,
            status: self.status,
            elapsed: self.elapsed,
        })
    }
}

impl From<Completion> for OperationReport {
    fn from(completion: Completion) -> Self {
        let (project, environment) = match completion.payload {
            CompletionPayload::None => (None, None),
            CompletionPayload::Project(model) => (Some(model), None),
            CompletionPayload::RunEnvironment(env) => (None, Some(env)),
        };
        Self {
            kind: completion.kind,
            status: completion.status,
            elapsed: completion.elapsed,
            messages: completion.messages,
            project,
            environment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qbs_types::DefaultSettings;

    #[test]
    fn test_overrides_take_precedence() {
        let options = OperationOptions::new()
            .max_jobs(8)
            .keep_going(true)
            .log_level(LogLevel::Debug);
        let provider = WithOverrides {
            base: &DefaultSettings,
            options: &options,
        };

        assert_eq!(provider.max_jobs(), 8);
        assert!(provider.keep_going());
        assert_eq!(provider.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_unset_options_fall_through() {
        let options = OperationOptions::new().products(["app", "lib"]);
        let provider = WithOverrides {
            base: &DefaultSettings,
            options: &options,
        };

        assert_eq!(options.products, vec!["app", "lib"]);
        assert_eq!(provider.max_jobs(), DefaultSettings.max_jobs());
        assert_eq!(provider.log_level(), DefaultSettings.log_level());
    }

    #[test]
    fn test_failed_report() {
        let report = OperationReport::failed(RequestKind::Build, "not ready");
        assert!(!report.is_success());
        assert_eq!(report.messages.to_string(), "not ready");
        assert_eq!(
            report.operation().map(|op| op.status),
            Some(OperationStatus::Failed)
        );

        let env = OperationReport::failed(RequestKind::GetRunEnvironment, "no product");
        assert!(env.operation().is_none());
    }
}
