// Sync Engine
// Per-file repair actions and the coordinator that runs them off the event loop

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::{AppEvent, DirectoryPair, Locator, SessionEvent, TransportSettings};
use crate::error::RepairError;
use crate::utilities::paths::{join_remote, normalize_relative, remote_parent, shell_quote};
use super::diff::DiffRecord;
use super::inventory::Inventories;

/// Copies one file from the source of a pair to its destination
#[async_trait]
pub trait RepairAction: Send + Sync {
    /// Copy `path` and create any missing destination parent directories first
    async fn copy(&self, pair: &DirectoryPair, path: &str) -> Result<(), RepairError>;
}

/// Repair action backed by `rsync`
#[derive(Debug, Clone)]
pub struct RsyncRepair {
    settings: TransportSettings,
}

impl RsyncRepair {
    pub fn new(settings: TransportSettings) -> Self {
        Self { settings }
    }

    /// Argument naming `path` under a root, in rsync's `host:path` form for remote roots
    fn endpoint(locator: &Locator, path: &str) -> String {
        match locator {
            Locator::Local(root) => root.join(path).to_string_lossy().into_owned(),
            Locator::Remote { host, root } => format!("{}:{}", host, join_remote(root, path)),
        }
    }

    async fn ensure_parent(&self, destination: &Locator, path: &str) -> Result<(), RepairError> {
        match destination {
            Locator::Local(root) => {
                let target = root.join(path);
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|source| RepairError::Io {
                            path: parent.to_path_buf(),
                            source,
                        })?;
                }
                Ok(())
            }
            Locator::Remote { host, root } => {
                let target = join_remote(root, path);
                let Some(parent) = remote_parent(&target) else {
                    return Ok(());
                };
                let script = format!("mkdir -p {}", shell_quote(parent));
                run_command(&self.settings.shell, &[host.as_str(), script.as_str()]).await
            }
        }
    }
}

#[async_trait]
impl RepairAction for RsyncRepair {
    async fn copy(&self, pair: &DirectoryPair, path: &str) -> Result<(), RepairError> {
        let source = Locator::parse(&pair.source)?;
        let destination = Locator::parse(&pair.destination)?;
        if source.is_remote() && destination.is_remote() {
            return Err(RepairError::Unsupported {
                source_root: source.to_string(),
                destination_root: destination.to_string(),
            });
        }

        let path = normalize_relative(path);
        self.ensure_parent(&destination, &path).await?;

        let mut args: Vec<String> = self.settings.rsync_args.clone();
        args.push(Self::endpoint(&source, &path));
        args.push(Self::endpoint(&destination, &path));
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_command(&self.settings.rsync, &args).await
    }
}

/// Run an external program to completion, turning a non-zero exit into an error
async fn run_command(program: &str, args: &[&str]) -> Result<(), RepairError> {
    debug!(program, ?args, "running");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| RepairError::Spawn {
            program: program.to_string(),
            source,
        })?;

    if output.status.success() {
        Ok(())
    } else {
        Err(RepairError::CommandFailed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Paths a sync should copy: missing or different in the destination
pub fn select_repairable(records: &[DiffRecord]) -> Vec<String> {
    records
        .iter()
        .filter(|record| record.status.needs_repair())
        .map(|record| record.path.clone())
        .collect()
}

/// Issues per-file repairs and reports their progress as session events
#[derive(Clone)]
pub struct SyncCoordinator {
    inventories: Arc<dyn Inventories>,
    repair: Arc<dyn RepairAction>,
}

impl SyncCoordinator {
    pub fn new(inventories: Arc<dyn Inventories>, repair: Arc<dyn RepairAction>) -> Self {
        Self { inventories, repair }
    }

    /// Start repairing `paths` of one pair
    ///
    /// Every start event is queued before any repair task is spawned, so the
    /// session marks all paths in flight ahead of the first completion. Each
    /// path then runs as its own task and reports a done event.
    pub fn dispatch(
        &self,
        pair_index: usize,
        pair: &DirectoryPair,
        paths: Vec<String>,
        events: &UnboundedSender<AppEvent>,
    ) -> Vec<JoinHandle<()>> {
        for path in &paths {
            let started = SessionEvent::SyncStarted {
                pair_index,
                path: path.clone(),
            };
            if events.send(started.into()).is_err() {
                debug!(pair = pair_index + 1, %path, "event loop gone, start not delivered");
            }
        }
        info!(pair = pair_index + 1, files = paths.len(), "sync started");

        paths
            .into_iter()
            .map(|path| {
                let coordinator = self.clone();
                let pair = pair.clone();
                let events = events.clone();
                tokio::spawn(async move {
                    let outcome = coordinator.repair_one(&pair, &path).await;
                    match &outcome {
                        Ok(hash) => info!(pair = pair_index + 1, %path, %hash, "file synced"),
                        Err(e) => warn!(pair = pair_index + 1, %path, "sync failed: {}", e),
                    }
                    let finished = SessionEvent::SyncFinished {
                        pair_index,
                        path: path.clone(),
                        outcome,
                    };
                    if events.send(finished.into()).is_err() {
                        debug!(pair = pair_index + 1, %path, "event loop gone, completion dropped");
                    }
                })
            })
            .collect()
    }

    /// Copy one file, then re-read its hash from the source
    pub async fn repair_one(&self, pair: &DirectoryPair, path: &str) -> Result<String, RepairError> {
        self.repair.copy(pair, path).await?;

        let source = Locator::parse(&pair.source)?;
        self.inventories
            .open(&source)
            .hash_file(path)
            .await?
            .ok_or_else(|| RepairError::SourceVanished(path.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::operations::inventory::testing::MemoryInventories;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Copies between in-memory trees, failing for chosen paths
    pub struct MemoryRepair {
        inventories: MemoryInventories,
        failing: HashSet<String>,
        pub copied: Mutex<Vec<String>>,
    }

    impl MemoryRepair {
        pub fn new(inventories: MemoryInventories) -> Self {
            Self {
                inventories,
                failing: HashSet::new(),
                copied: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(mut self, path: &str) -> Self {
            self.failing.insert(path.to_string());
            self
        }
    }

    #[async_trait]
    impl RepairAction for MemoryRepair {
        async fn copy(&self, pair: &DirectoryPair, path: &str) -> Result<(), RepairError> {
            if self.failing.contains(path) {
                return Err(RepairError::CommandFailed {
                    program: "rsync".to_string(),
                    status: "exit status: 23".to_string(),
                    stderr: format!("failed to copy {}", path),
                });
            }
            let source = Locator::parse(&pair.source)?;
            let hash = self
                .inventories
                .open(&source)
                .hash_file(path)
                .await?
                .ok_or_else(|| RepairError::SourceVanished(path.to_string()))?;
            self.inventories.set_file(&pair.destination, path, &hash);
            self.copied.lock().unwrap().push(path.to_string());
            Ok(())
        }
    }
}
