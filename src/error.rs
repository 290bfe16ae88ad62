// Error Types
// Failures surfaced by inventory scans, repair actions and locator parsing

use std::path::PathBuf;

use thiserror::Error;

/// A locator string that cannot be turned into a local or remote root
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Nothing to parse
    #[error("empty locator")]
    EmptyLocator,

    /// `host:path` with one of the halves missing
    #[error("invalid remote address {0:?}: expected host:path")]
    InvalidRemote(String),
}

/// A tree could not be enumerated
///
/// Any per-file failure aborts the whole inventory, so callers never see a
/// truncated file list.
#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// The shell transport could not be started or the remote command failed
    #[error("remote listing on {host} failed: {message}")]
    Transport { host: String, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A single-file copy failed
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("failed to prepare {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("cannot copy between two remote roots ({source_root} -> {destination_root})")]
    Unsupported {
        source_root: String,
        destination_root: String,
    },

    /// The copy ran but the source could not be re-hashed afterwards
    #[error("failed to re-read source hash: {0}")]
    Rehash(#[from] InventoryError),

    #[error("source file {0} no longer exists")]
    SourceVanished(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
