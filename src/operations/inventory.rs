// Inventory Producers
// Enumerate a tree and hash every regular file, locally or over a remote shell

use async_trait::async_trait;
use md5::{Digest, Md5};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::core::Locator;
use crate::error::InventoryError;
use crate::utilities::paths::{join_remote, normalize_relative, shell_quote, to_slash_path};
use super::diff::FileRecord;

/// Produces the file inventory of one root
#[async_trait]
pub trait InventoryProducer: Send + Sync {
    /// Every regular file under the root with its content hash
    ///
    /// Fails as a whole if any file cannot be read.
    async fn list(&self) -> Result<Vec<FileRecord>, InventoryError>;

    /// Hash of a single file, or `None` when it is not a regular file
    async fn hash_file(&self, path: &str) -> Result<Option<String>, InventoryError>;
}

/// Picks the producer for a locator
pub trait Inventories: Send + Sync {
    fn open(&self, locator: &Locator) -> Box<dyn InventoryProducer>;
}

/// Local roots are walked directly, remote roots go through the configured shell
#[derive(Debug, Clone)]
pub struct TransportInventories {
    shell: String,
}

impl TransportInventories {
    pub fn new(shell: impl Into<String>) -> Self {
        Self { shell: shell.into() }
    }
}

impl Inventories for TransportInventories {
    fn open(&self, locator: &Locator) -> Box<dyn InventoryProducer> {
        match locator {
            Locator::Local(root) => Box::new(LocalInventory::new(root.clone())),
            Locator::Remote { host, root } => {
                Box::new(RemoteInventory::new(self.shell.clone(), host.clone(), root.clone()))
            }
        }
    }
}

// ============================================================================
// Local traversal
// ============================================================================

/// Inventory of a directory on this machine
#[derive(Debug, Clone)]
pub struct LocalInventory {
    root: PathBuf,
}

impl LocalInventory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walk and hash the tree, blocking the current thread
    ///
    /// Symlinks are not followed and directories are not listed, matching
    /// `find . -type f`.
    pub fn scan(root: &Path) -> Result<Vec<FileRecord>, InventoryError> {
        let mut records = Vec::new();

        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|source| InventoryError::Walk {
                root: root.to_path_buf(),
                source,
            })?;

            if entry.depth() == 0 && !entry.file_type().is_dir() {
                return Err(InventoryError::Io {
                    path: root.to_path_buf(),
                    source: io::Error::new(io::ErrorKind::Other, "root is not a directory"),
                });
            }
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let hash = md5_file(entry.path()).map_err(|source| InventoryError::Io {
                path: entry.path().to_path_buf(),
                source,
            })?;
            trace!(path = %entry.path().display(), %hash, "hashed");
            records.push(FileRecord::new(to_slash_path(relative), hash));
        }

        debug!(root = %root.display(), files = records.len(), "local inventory complete");
        Ok(records)
    }

    fn hash_one(path: &Path) -> Result<Option<String>, InventoryError> {
        let io_error = |source| InventoryError::Io {
            path: path.to_path_buf(),
            source,
        };
        match fs::symlink_metadata(path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(e)),
            Ok(meta) if !meta.is_file() => Ok(None),
            Ok(_) => md5_file(path).map(Some).map_err(io_error),
        }
    }
}

#[async_trait]
impl InventoryProducer for LocalInventory {
    async fn list(&self) -> Result<Vec<FileRecord>, InventoryError> {
        let root = self.root.clone();
        run_blocking(&self.root, move || Self::scan(&root)).await
    }

    async fn hash_file(&self, path: &str) -> Result<Option<String>, InventoryError> {
        let full = self.root.join(normalize_relative(path));
        run_blocking(&self.root, move || Self::hash_one(&full)).await
    }
}

async fn run_blocking<T, F>(root: &Path, job: F) -> Result<T, InventoryError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, InventoryError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| InventoryError::Io {
            path: root.to_path_buf(),
            source: io::Error::new(io::ErrorKind::Other, e),
        })?
}

/// Lowercase hex MD5 of a file's full contents
pub fn md5_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Md5::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Remote traversal
// ============================================================================

/// Inventory of a directory reached through a remote shell
#[derive(Debug, Clone)]
pub struct RemoteInventory {
    shell: String,
    host: String,
    root: String,
}

impl RemoteInventory {
    pub fn new(shell: impl Into<String>, host: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            host: host.into(),
            root: root.into(),
        }
    }

    /// Run a script on the remote host and return its stdout
    async fn run(&self, script: &str) -> Result<String, InventoryError> {
        debug!(shell = %self.shell, host = %self.host, script, "remote command");
        let output = Command::new(&self.shell)
            .arg(&self.host)
            .arg(script)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| InventoryError::Transport {
                host: self.host.clone(),
                message: format!("failed to start {}: {}", self.shell, e),
            })?;

        if !output.status.success() {
            return Err(InventoryError::Transport {
                host: self.host.clone(),
                message: format!(
                    "{} ({})",
                    String::from_utf8_lossy(&output.stderr).trim(),
                    output.status
                ),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl InventoryProducer for RemoteInventory {
    async fn list(&self) -> Result<Vec<FileRecord>, InventoryError> {
        let script = format!(
            "cd {} && find . -type f -exec md5sum {{}} +",
            shell_quote(&self.root)
        );
        let stdout = self.run(&script).await?;
        let records = parse_md5sum_output(&stdout);
        debug!(host = %self.host, root = %self.root, files = records.len(), "remote inventory complete");
        Ok(records)
    }

    async fn hash_file(&self, path: &str) -> Result<Option<String>, InventoryError> {
        let target = shell_quote(&join_remote(&self.root, path));
        let script = format!("if [ -f {0} ]; then md5sum {0}; fi", target);
        let stdout = self.run(&script).await?;
        Ok(parse_md5sum_output(&stdout).into_iter().next().map(|record| record.hash))
    }
}

/// Parse `md5sum` output into records
///
/// Lines look like `<32 hex digits><space><space or *><name>`. Names containing
/// a backslash or newline are escaped and the line starts with `\`. Lines that
/// do not carry a digest (login banners and the like) are skipped.
pub fn parse_md5sum_output(output: &str) -> Vec<FileRecord> {
    output.lines().filter_map(parse_md5sum_line).collect()
}

fn parse_md5sum_line(line: &str) -> Option<FileRecord> {
    let (escaped, line) = match line.strip_prefix('\\') {
        Some(rest) => (true, rest),
        None => (false, line),
    };
    let (hash, rest) = line.split_once(' ')?;
    if hash.len() != 32 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let name = rest
        .strip_prefix(' ')
        .or_else(|| rest.strip_prefix('*'))
        .unwrap_or(rest);
    let name = if escaped { unescape_name(name) } else { name.to_string() };
    let path = normalize_relative(&name);
    if path.is_empty() {
        return None;
    }
    Some(FileRecord::new(path, hash.to_ascii_lowercase()))
}

fn unescape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
