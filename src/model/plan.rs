use std::fmt;
use std::path::{Path, PathBuf};

use crate::model::config::SetupConfig;

/// A single external command together with the directory it runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I, cwd: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.into(),
        }
    }

    /// Program followed by its arguments, as a shell would see them.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv().join(" "))
    }
}

/// The steps run against the package manager, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Clone,
    Bootstrap,
    Integrate,
    Install(String),
}

impl Step {
    /// Everything that runs inside the checkout, after the clone.
    pub fn checkout_sequence(config: &SetupConfig) -> Vec<Step> {
        let mut steps = vec![Step::Bootstrap, Step::Integrate];
        steps.extend(
            config
                .install
                .packages
                .iter()
                .map(|package| Step::Install(package.clone())),
        );
        steps.push(Step::Integrate);
        steps
    }

    pub fn label(&self) -> String {
        match self {
            Step::Clone => "clone".to_string(),
            Step::Bootstrap => "bootstrap".to_string(),
            Step::Integrate => "integrate".to_string(),
            Step::Install(package) => format!("install {package}"),
        }
    }

    pub fn invocation(&self, config: &SetupConfig, cwd: &Path) -> Invocation {
        let pm = &config.package_manager;
        match self {
            Step::Clone => Invocation::new("git", ["clone", pm.repository.as_str()], cwd),
            Step::Bootstrap => {
                Invocation::new(config.bootstrap_program(), Vec::<String>::new(), cwd)
            }
            Step::Integrate => Invocation::new(pm.program.as_str(), ["integrate", "install"], cwd),
            Step::Install(package) => Invocation::new(
                pm.program.as_str(),
                ["install".to_string(), config.package_spec(package)],
                cwd,
            ),
        }
    }
}
