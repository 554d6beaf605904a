use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use qbs_engine::{ProjectModel, RunnableProduct, SourceConfiguration, enumerate_products};
use qbs_runtime::{
    Launcher, ProjectLocator, QbsLauncher, ResolvedSettings, Session, SessionConfig, Settings,
    WorkspaceScanner, enumerate_configurations, enumerate_profiles, locate_executable,
};
use qbs_types::{
    BuildRequest, CleanRequest, InstallRequest, Request, RequestKind, ResolveRequest,
    RunEnvironmentRequest,
};

use crate::error::{Error, Result};
use crate::events::EventStream;
use crate::types::{OperationOptions, OperationReport, WithOverrides};

const DEFAULT_CONFIGURATION: &str = "debug";

pub struct ClientBuilder {
    workspace: PathBuf,
    settings: Option<Settings>,
    session_config: SessionConfig,
    launcher: Option<Box<dyn Launcher>>,
}

impl ClientBuilder {
    /// Use these settings instead of loading the settings file.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Replace the default `qbs session` launcher.
    pub fn launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Some(Box::new(launcher));
        self
    }

    pub fn build(self) -> Result<Client> {
        let settings = match self.settings {
            Some(settings) => settings,
            None => Settings::load()?,
        };

        let launcher: Box<dyn Launcher> = match self.launcher {
            Some(launcher) => launcher,
            None => {
                let executable = locate_executable(&settings.qbs_path)?;
                Box::new(QbsLauncher::new(executable).with_working_directory(&self.workspace))
            }
        };

        let session = Session::with_config(launcher, self.session_config);
        session.set_configuration(DEFAULT_CONFIGURATION);

        Ok(Client {
            session,
            workspace: Arc::new(self.workspace),
            settings: Arc::new(RwLock::new(settings)),
        })
    }
}

/// Operation facade over one build tool session.
///
/// Every operation builds its request from the current settings, the
/// session's selected project/profile/configuration and the caller's
/// [`OperationOptions`], then waits for the tool's verdict. Operations never
/// return raw errors; see [`OperationReport`].
#[derive(Clone)]
pub struct Client {
    session: Session,
    workspace: Arc<PathBuf>,
    settings: Arc<RwLock<Settings>>,
}

impl Client {
    pub fn builder(workspace: impl Into<PathBuf>) -> ClientBuilder {
        ClientBuilder {
            workspace: workspace.into(),
            settings: None,
            session_config: SessionConfig::default(),
            launcher: None,
        }
    }

    /// Client for `workspace` using the settings file and the configured `qbs`.
    pub fn connect(workspace: impl Into<PathBuf>) -> Result<Self> {
        Self::builder(workspace).build()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn settings(&self) -> Settings {
        self.read_settings().clone()
    }

    /// Replace the settings; affects requests built afterwards.
    pub fn set_settings(&self, settings: Settings) {
        match self.settings.write() {
            Ok(mut guard) => *guard = settings,
            Err(poisoned) => *poisoned.into_inner() = settings,
        }
    }

    pub async fn start(&self) -> Result<()> {
        Ok(self.session.start().await?)
    }

    pub async fn stop(&self) -> Result<()> {
        Ok(self.session.stop().await?)
    }

    /// Select the project file; relative paths are taken from the workspace root.
    pub fn select_project(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        };
        self.session.set_active_project(Some(path));
    }

    pub fn select_profile(&self, profile: impl Into<String>) {
        self.session.set_profile(profile);
    }

    pub fn select_configuration(&self, configuration: impl Into<String>) {
        self.session.set_configuration(configuration);
    }

    /// Project files in the workspace, up to the configured scan depth.
    pub fn find_projects(&self) -> Result<Vec<PathBuf>> {
        let depth = self.read_settings().project_scan_depth;
        let scanner = WorkspaceScanner::new(self.workspace.as_path()).with_max_depth(depth);
        Ok(scanner.find_projects()?)
    }

    /// Profiles known to the configured build tool.
    pub async fn profiles(&self) -> Result<Vec<String>> {
        let (qbs, settings_directory) = {
            let settings = self.read_settings();
            (settings.qbs_path.clone(), settings.settings_directory.clone())
        };
        let executable = locate_executable(&qbs)?;
        Ok(enumerate_profiles(&executable, Some(settings_directory.as_str())).await?)
    }

    pub fn configurations(&self) -> Vec<String> {
        enumerate_configurations()
    }

    /// Resolve the selected project.
    ///
    /// Selects the first project file in the workspace when none is selected.
    pub async fn resolve(&self, options: &OperationOptions) -> OperationReport {
        let project = match self.session.active_project() {
            Some(project) => project,
            None => match self.default_project() {
                Ok(project) => {
                    tracing::info!("selected project {}", project.display());
                    self.session.set_active_project(Some(project.clone()));
                    project
                }
                Err(err) => return OperationReport::failed(RequestKind::Resolve, err.to_string()),
            },
        };

        let request = {
            let base = self.resolved_settings();
            let provider = WithOverrides {
                base: &base,
                options,
            };
            ResolveRequest::new(&provider)
                .with_project_file_path(project.to_string_lossy())
                .with_configuration_name(self.session.configuration())
                .with_top_level_profile(self.session.profile())
        };
        self.run(Request::Resolve(request)).await
    }

    pub async fn build(&self, options: &OperationOptions) -> OperationReport {
        let mut request = BuildRequest::new(&WithOverrides {
            base: &self.resolved_settings(),
            options,
        });
        request.products = options.products.clone();
        self.run(Request::Build(request)).await
    }

    pub async fn clean(&self, options: &OperationOptions) -> OperationReport {
        let mut request = CleanRequest::new(&WithOverrides {
            base: &self.resolved_settings(),
            options,
        });
        request.products = options.products.clone();
        self.run(Request::Clean(request)).await
    }

    pub async fn install(&self, options: &OperationOptions) -> OperationReport {
        let mut request = InstallRequest::new(&WithOverrides {
            base: &self.resolved_settings(),
            options,
        });
        request.products = options.products.clone();
        self.run(Request::Install(request)).await
    }

    /// Environment the tool would run `product` in (its full display name).
    pub async fn run_environment(&self, product: &str) -> OperationReport {
        let request = RunEnvironmentRequest::for_product(product);
        self.run(Request::GetRunEnvironment(request)).await
    }

    /// Ask the tool to abort the running operation.
    pub fn cancel(&self) {
        self.session.cancel();
    }

    /// Latest successfully resolved project
    pub fn project(&self) -> Option<Arc<ProjectModel>> {
        self.session.project()
    }

    /// Enabled products of the resolved project; empty before the first resolve.
    pub fn runnable_products(&self) -> Vec<RunnableProduct> {
        self.project()
            .map(|model| enumerate_products(model.root()))
            .unwrap_or_default()
    }

    /// Compiler configuration for `file` from the resolved project.
    pub fn source_configuration(&self, file: &Path) -> Option<SourceConfiguration> {
        let model = self.project()?;
        qbs_engine::source_configuration(&model, file)
    }

    /// Stream of session notifications from now on.
    pub fn events(&self) -> EventStream {
        EventStream::forward(self.session.subscribe())
    }

    async fn run(&self, request: Request) -> OperationReport {
        let kind = request.kind();
        let name = request.type_name();

        let pending = match self.session.submit(request) {
            Ok(pending) => pending,
            Err(err) => {
                tracing::warn!("{} not submitted: {}", name, err);
                return OperationReport::failed(kind, err.to_string());
            }
        };

        let report = OperationReport::from(pending.wait().await);
        if report.is_success() {
            tracing::info!("{} completed in {:?}", name, report.elapsed);
        } else {
            tracing::warn!("{} failed: {}", name, report.messages);
        }
        report
    }

    fn default_project(&self) -> Result<PathBuf> {
        self.find_projects()?.into_iter().next().ok_or_else(|| {
            Error::InvalidInput(format!(
                "no project file found in {}",
                self.workspace.display()
            ))
        })
    }

    fn resolved_settings(&self) -> ResolvedSettings {
        self.read_settings().resolved(
            &self.workspace,
            &self.session.profile(),
            &self.session.configuration(),
        )
    }

    fn read_settings(&self) -> std::sync::RwLockReadGuard<'_, Settings> {
        match self.settings.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
