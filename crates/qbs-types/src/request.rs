use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::operation::OperationType;
use crate::settings::{CommandEchoMode, ErrorHandlingMode, LogLevel, SettingsProvider};

/// Module properties requested with every resolve; toolchain inference and
/// the code model read from exactly these keys.
pub const MODULE_PROPERTIES: &[&str] = &[
    "cpp.compilerVersionMajor",
    "cpp.compilerVersionMinor",
    "cpp.compilerVersionPatch",
    "cpp.compilerIncludePaths",
    "cpp.distributionIncludePaths",
    "cpp.systemIncludePaths",
    "cpp.includePaths",
    "cpp.frameworkPaths",
    "cpp.systemFrameworkPaths",
    "cpp.compilerDefinesByLanguage",
    "cpp.defines",
    "cpp.compilerName",
    "cpp.compilerPath",
    "cpp.compilerPathByLanguage",
    "cpp.cLanguageVersion",
    "cpp.cxxLanguageVersion",
    "cpp.prefixHeaders",
    "qbs.architecture",
    "qbs.toolchain",
];

const DATA_MODE_ONLY_IF_CHANGED: &str = "only-if-changed";

/// Outbound session request.
///
/// The variant is the wire `type` tag and cannot change once the value exists;
/// only the payload fields are adjustable before submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Request {
    #[serde(rename = "resolve-project")]
    Resolve(ResolveRequest),
    #[serde(rename = "build-project")]
    Build(BuildRequest),
    #[serde(rename = "clean-project")]
    Clean(CleanRequest),
    #[serde(rename = "install-project")]
    Install(InstallRequest),
    #[serde(rename = "cancel-job")]
    Cancel,
    #[serde(rename = "get-run-environment")]
    GetRunEnvironment(RunEnvironmentRequest),
    #[serde(rename = "quit")]
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Resolve,
    Build,
    Clean,
    Install,
    Cancel,
    GetRunEnvironment,
    Quit,
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::Resolve(_) => RequestKind::Resolve,
            Request::Build(_) => RequestKind::Build,
            Request::Clean(_) => RequestKind::Clean,
            Request::Install(_) => RequestKind::Install,
            Request::Cancel => RequestKind::Cancel,
            Request::GetRunEnvironment(_) => RequestKind::GetRunEnvironment,
            Request::Quit => RequestKind::Quit,
        }
    }

    /// Wire name of the request type
    pub fn type_name(&self) -> &'static str {
        match self.kind() {
            RequestKind::Resolve => "resolve-project",
            RequestKind::Build => "build-project",
            RequestKind::Clean => "clean-project",
            RequestKind::Install => "install-project",
            RequestKind::Cancel => "cancel-job",
            RequestKind::GetRunEnvironment => "get-run-environment",
            RequestKind::Quit => "quit",
        }
    }
}

impl RequestKind {
    /// Operation reported to observers for this request, if it is one
    pub fn operation_type(&self) -> Option<OperationType> {
        match self {
            RequestKind::Resolve => Some(OperationType::Resolve),
            RequestKind::Build => Some(OperationType::Build),
            RequestKind::Clean => Some(OperationType::Clean),
            RequestKind::Install => Some(OperationType::Install),
            RequestKind::Cancel | RequestKind::GetRunEnvironment | RequestKind::Quit => None,
        }
    }

    /// Whether the request occupies the single in-flight slot until the tool answers
    pub fn awaits_completion(&self) -> bool {
        !matches!(self, RequestKind::Cancel | RequestKind::Quit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolveRequest {
    pub environment: BTreeMap<String, String>,
    pub data_mode: String,
    pub module_properties: Vec<String>,
    pub build_root: String,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_directory: Option<String>,
    pub force_probe_execution: bool,
    pub error_handling_mode: ErrorHandlingMode,
    pub log_level: LogLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configuration_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_level_profile: Option<String>,
}

impl ResolveRequest {
    pub fn new(settings: &dyn SettingsProvider) -> Self {
        let build_root = settings.build_directory();
        Self {
            environment: process_environment(),
            data_mode: DATA_MODE_ONLY_IF_CHANGED.to_string(),
            module_properties: MODULE_PROPERTIES.iter().map(|p| p.to_string()).collect(),
            // The build graph is only stored once the build directory exists.
            dry_run: !Path::new(&build_root).exists(),
            build_root,
            settings_directory: non_empty(settings.settings_directory()),
            force_probe_execution: settings.force_probes(),
            error_handling_mode: settings.error_handling_mode(),
            log_level: settings.log_level(),
            project_file_path: None,
            configuration_name: None,
            top_level_profile: None,
        }
    }

    pub fn with_project_file_path(mut self, path: impl Into<String>) -> Self {
        self.project_file_path = Some(path.into());
        self
    }

    pub fn with_configuration_name(mut self, name: impl Into<String>) -> Self {
        self.configuration_name = non_empty(name.into());
        self
    }

    pub fn with_top_level_profile(mut self, profile: impl Into<String>) -> Self {
        self.top_level_profile = non_empty(profile.into());
        self
    }

    /// Override the build root; `dry-run` follows the new directory's existence.
    pub fn with_build_root(mut self, build_root: impl Into<String>) -> Self {
        self.build_root = build_root.into();
        self.dry_run = !Path::new(&self.build_root).exists();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildRequest {
    pub data_mode: String,
    pub install: bool,
    pub max_job_count: u32,
    pub keep_going: bool,
    pub command_echo_mode: CommandEchoMode,
    pub log_level: LogLevel,
    pub clean_install_root: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<String>,
}

impl BuildRequest {
    pub fn new(settings: &dyn SettingsProvider) -> Self {
        Self {
            data_mode: DATA_MODE_ONLY_IF_CHANGED.to_string(),
            install: true,
            max_job_count: settings.max_jobs(),
            keep_going: settings.keep_going(),
            command_echo_mode: CommandEchoMode::from_preference(settings.show_command_lines()),
            log_level: settings.log_level(),
            clean_install_root: settings.clean_install_root(),
            products: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct CleanRequest {
    pub keep_going: bool,
    pub log_level: LogLevel,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<String>,
}

impl CleanRequest {
    pub fn new(settings: &dyn SettingsProvider) -> Self {
        Self {
            keep_going: settings.keep_going(),
            log_level: settings.log_level(),
            products: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstallRequest {
    pub keep_going: bool,
    pub log_level: LogLevel,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<String>,
}

impl InstallRequest {
    pub fn new(settings: &dyn SettingsProvider) -> Self {
        Self {
            keep_going: settings.keep_going(),
            log_level: settings.log_level(),
            products: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunEnvironmentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

impl RunEnvironmentRequest {
    pub fn for_product(product: impl Into<String>) -> Self {
        Self {
            product: Some(product.into()),
        }
    }
}

fn process_environment() -> BTreeMap<String, String> {
    std::env::vars_os()
        .map(|(k, v)| {
            (
                k.to_string_lossy().into_owned(),
                v.to_string_lossy().into_owned(),
            )
        })
        .collect()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
