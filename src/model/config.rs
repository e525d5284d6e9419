use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SetupError};
use crate::model::policy::FailurePolicy;

const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct SetupConfig {
    pub vendor: VendorConfig,
    pub package_manager: PackageManagerConfig,
    pub install: InstallConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VendorConfig {
    /// Relative to the repository root.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackageManagerConfig {
    pub repository: String,
    pub checkout: String,
    pub program: String,
    pub bootstrap_windows: String,
    pub bootstrap_unix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallConfig {
    pub triple: String,
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub strict: bool,
}

impl SetupConfig {
    /// Load configuration with layering: defaults → explicit file, or the
    /// user config when no file is given.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::defaults()?;

        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => user_config_path().filter(|path| path.exists()),
        };

        if let Some(path) = path {
            tracing::info!("loading config from {}", path.display());
            config = Self::from_file(&path)?; // full replace, not a merge
        }

        Ok(config)
    }

    pub fn defaults() -> Result<Self> {
        Self::parse(DEFAULTS, Path::new("<defaults>"))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| SetupError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw, path)
    }

    fn parse(raw: &str, origin: &Path) -> Result<Self> {
        toml::from_str(raw).map_err(|source| SetupError::Config {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn policy(&self) -> FailurePolicy {
        if self.run.strict {
            FailurePolicy::Halt
        } else {
            FailurePolicy::Continue
        }
    }

    /// Bootstrap executable for the platform this binary was built for.
    pub fn bootstrap_program(&self) -> &str {
        if cfg!(windows) {
            &self.package_manager.bootstrap_windows
        } else {
            &self.package_manager.bootstrap_unix
        }
    }

    /// `<package>:<triple>` argument for a single install.
    pub fn package_spec(&self, package: &str) -> String {
        format!("{package}:{}", self.install.triple)
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "vendor-setup")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
