use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::process::Command;
use walkdir::WalkDir;

use crate::{Error, Result};

const PROJECT_EXTENSION: &str = "qbs";

static PROFILE_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^profiles\.([^.\s:]+)\.").unwrap());

/// Source of candidate project files for a workspace
pub trait ProjectLocator: Send + Sync {
    fn find_projects(&self) -> Result<Vec<PathBuf>>;
}

/// Finds `*.qbs` files below a root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceScanner {
    root: PathBuf,
    max_depth: usize,
}

impl WorkspaceScanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_depth: 1,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ProjectLocator for WorkspaceScanner {
    fn find_projects(&self) -> Result<Vec<PathBuf>> {
        let mut projects = Vec::new();
        for entry in WalkDir::new(&self.root)
            .max_depth(self.max_depth)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!("skipping unreadable entry: {}", err);
                    continue;
                }
            };
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|e| e.to_str()) == Some(PROJECT_EXTENSION)
            {
                projects.push(entry.into_path());
            }
        }
        if projects.is_empty() && !self.root.is_dir() {
            return Err(Error::Config(format!(
                "workspace root {} is not a directory",
                self.root.display()
            )));
        }
        projects.sort();
        Ok(projects)
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

/// Build configurations offered for selection
pub fn enumerate_configurations() -> Vec<String> {
    vec!["debug".to_string(), "release".to_string()]
}

/// Profiles known to the build tool, from `qbs config --list`.
pub async fn enumerate_profiles(qbs: &Path, settings_directory: Option<&str>) -> Result<Vec<String>> {
    let mut cmd = Command::new(qbs);
    cmd.args(["config", "--list"]);
    if let Some(dir) = settings_directory.filter(|d| !d.is_empty()) {
        cmd.args(["--settings-dir", dir]);
    }

    let output = cmd.output().await?;
    if !output.status.success() {
        return Err(Error::Command(format!(
            "{} config --list exited with {}: {}",
            qbs.display(),
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(parse_profiles(&String::from_utf8_lossy(&output.stdout)))
}

/// Unique profile names from `profiles.<name>.<key>: <value>` lines, in first-seen order.
pub fn parse_profiles(listing: &str) -> Vec<String> {
    let mut profiles: Vec<String> = Vec::new();
    for caps in listing.lines().filter_map(|line| PROFILE_KEY.captures(line.trim_start())) {
        let name = &caps[1];
        if !profiles.iter().any(|p| p == name) {
            profiles.push(name.to_string());
        }
    }
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_profiles() {
        let listing = "\
defaultProfile: \"gcc\"
profiles.gcc.cpp.toolchainInstallPath: \"/usr/bin\"
profiles.gcc.qbs.toolchainType: \"gcc\"
profiles.clang-15.qbs.toolchainType: \"clang\"
profiles.noDot
preferences.jobs: 4
";
        assert_eq!(parse_profiles(listing), vec!["gcc", "clang-15"]);
        assert!(parse_profiles("").is_empty());
    }

    #[test]
    fn test_configurations() {
        assert_eq!(enumerate_configurations(), vec!["debug", "release"]);
    }

    #[test]
    fn test_scanner_finds_top_level_projects() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        std::fs::write(root.join("b.qbs"), "")?;
        std::fs::write(root.join("a.qbs"), "")?;
        std::fs::write(root.join("readme.md"), "")?;
        std::fs::create_dir(root.join("sub"))?;
        std::fs::write(root.join("sub").join("nested.qbs"), "")?;

        let found = WorkspaceScanner::new(root).find_projects()?;
        assert_eq!(found, vec![root.join("a.qbs"), root.join("b.qbs")]);

        let deep = WorkspaceScanner::new(root).with_max_depth(2).find_projects()?;
        assert_eq!(deep.len(), 3);
        Ok(())
    }

    #[test]
    fn test_scanner_skips_hidden_directories() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        std::fs::create_dir(root.join(".git"))?;
        std::fs::write(root.join(".git").join("x.qbs"), "")?;

        let found = WorkspaceScanner::new(root).with_max_depth(3).find_projects()?;
        assert!(found.is_empty());
        Ok(())
    }

    #[test]
    fn test_scanner_missing_root() {
        let scanner = WorkspaceScanner::new("/definitely/not/a/workspace");
        assert!(matches!(scanner.find_projects(), Err(Error::Config(_))));
    }
}
