//! Error types for Quill

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuillError {
    #[error("Attempt to modify protected table '{table}' (key {key})")]
    ProtectedWrite { table: String, key: String },

    #[error("Capability '{0}' is not available in the configuration sandbox")]
    CapabilityNotFound(String),

    #[error("Invalid provider '{name}': expected a function, got {found}")]
    InvalidProvider { name: String, found: String },

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Feature '{name}' must return a table or nil, got {found}")]
    InvalidFeatureModule { name: String, found: String },

    #[error("Feature '{name}' has an invalid entry: expected a function, got {found}")]
    InvalidFeatureEntry { name: String, found: String },

    #[error("Feature '{name}' has an invalid store: expected a table, got {found}")]
    InvalidFeatureStore { name: String, found: String },

    #[error("Feature library directory not found: {0}")]
    LibraryDirectoryMissing(PathBuf),

    #[error("Failed to load feature '{name}': {source}")]
    FeatureLoad {
        name: String,
        #[source]
        source: mlua::Error,
    },

    #[error("Feature '{name}' failed: {source}")]
    FeatureFailed {
        name: String,
        #[source]
        source: mlua::Error,
    },

    #[error("Feature '{0}' does not provide an entry point")]
    MissingEntry(String),

    #[error("Failed to load configuration {}: {source}", file.display())]
    ConfigurationLoad {
        file: PathBuf,
        #[source]
        source: mlua::Error,
    },

    #[error("Failed to evaluate configuration {}: {source}", file.display())]
    ConfigurationEval {
        file: PathBuf,
        #[source]
        source: mlua::Error,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Lua error: {0}")]
    Lua(#[from] mlua::Error),
}

impl QuillError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        QuillError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, QuillError>;
