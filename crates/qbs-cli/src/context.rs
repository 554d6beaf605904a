use anyhow::Result;
use qbs_sdk::{Client, Settings};
use std::path::{Path, PathBuf};

use crate::args::Cli;

/// Everything a command needs from the global flags.
pub struct ExecutionContext {
    config_path: PathBuf,
    settings: Settings,
    workspace: PathBuf,
    project: Option<PathBuf>,
    profile: Option<String>,
    configuration: String,
}

impl ExecutionContext {
    pub fn new(cli: &Cli) -> Result<Self> {
        let config_path = match &cli.config {
            Some(path) => path.clone(),
            None => Settings::default_path()?,
        };

        let mut settings = Settings::load_from(&config_path)?;
        if let Some(qbs) = &cli.qbs {
            settings.qbs_path = qbs.clone();
        }

        let workspace = match &cli.workspace {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        Ok(Self {
            config_path,
            settings,
            workspace,
            project: cli.project.clone(),
            profile: cli.profile.clone(),
            configuration: cli.configuration.clone(),
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    /// Client with the flag selections applied, not yet started.
    pub fn client(&self) -> Result<Client> {
        let client = Client::builder(&self.workspace)
            .settings(self.settings.clone())
            .build()?;

        if let Some(project) = &self.project {
            client.select_project(project);
        }
        if let Some(profile) = &self.profile {
            client.select_profile(profile);
        }
        client.select_configuration(&self.configuration);
        Ok(client)
    }

    /// Started client.
    pub async fn connect(&self) -> Result<Client> {
        let client = self.client()?;
        tracing::debug!("starting session in {}", self.workspace.display());
        client.start().await?;
        Ok(client)
    }
}
