//! Error type for topology and state files.

use std::path::PathBuf;

use multiroom_core::GraphError;
use thiserror::Error;

/// Errors raised while loading, saving, or building from configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file could not be read.
    #[error("cannot read '{path}': {source}")]
    ReadFile {
        /// File that was opened.
        path: PathBuf,
        /// I/O cause.
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written.
    #[error("cannot write '{path}': {source}")]
    WriteFile {
        /// File that was written.
        path: PathBuf,
        /// I/O cause.
        #[source]
        source: std::io::Error,
    },

    /// A parent directory could not be created.
    #[error("cannot create directory '{path}': {source}")]
    CreateDir {
        /// Directory that was created.
        path: PathBuf,
        /// I/O cause.
        #[source]
        source: std::io::Error,
    },

    /// File contents are not valid TOML for the expected shape.
    #[error("malformed TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value could not be rendered as TOML.
    #[error("cannot render TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// The configured links do not form a valid routing graph.
    #[error("invalid topology: {0}")]
    Graph(#[from] GraphError),
}

impl ConfigError {
    /// Wraps a read failure on `path`.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Wraps a write failure on `path`.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Wraps a directory creation failure on `path`.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }
}
