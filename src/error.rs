use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MtagError>;

#[derive(Error, Debug)]
pub enum MtagError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("invalid catalogue: {0}")]
    Catalogue(#[from] CatalogueError),

    #[error("clipboard unavailable: {0}")]
    Clipboard(String),

    #[error("could not locate the home directory")]
    NoHomeDir,

    #[error("failed to install logger: {0}")]
    Logger(#[from] tracing_subscriber::util::TryInitError),
}

impl MtagError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Problems found while checking a merge-tag tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogueError {
    #[error("tag `{key}` has a malformed token `{value}`")]
    MalformedToken { key: String, value: String },

    #[error("rule `{key}` has a malformed statement `{statement}`")]
    MalformedRule { key: String, statement: String },

    #[error("node `{key}` has an empty name")]
    EmptyName { key: String },

    #[error("tag key `{key}` is used more than once")]
    DuplicateKey { key: String },

    #[error("token `{value}` is used by both `{first}` and `{second}`")]
    DuplicateToken {
        value: String,
        first: String,
        second: String,
    },
}
