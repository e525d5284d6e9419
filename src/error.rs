use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::plan::Invocation;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("cannot locate the running executable: {0}")]
    SelfPath(#[source] io::Error),

    #[error("repository root not found above {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Could not create folder! ({}: {source})", path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot enter {}: {source}", path.display())]
    EnterDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to spawn `{invocation}`: {source}")]
    Spawn {
        invocation: Invocation,
        #[source]
        source: io::Error,
    },

    #[error("`{invocation}` exited with {status}")]
    CommandFailed {
        invocation: Invocation,
        status: String,
    },

    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, SetupError>;
