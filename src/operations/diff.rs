// Diff Engine
// Computes per-path differences between two hash inventories

use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::{DirectoryPair, Locator};
use crate::error::InventoryError;
use super::inventory::Inventories;

/// A file and the digest of its full contents, relative to an inventory root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// `/`-separated path relative to the root
    pub path: String,
    /// Lowercase hex digest
    pub hash: String,
}

impl FileRecord {
    pub fn new(path: impl Into<String>, hash: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            hash: hash.into(),
        }
    }
}

/// Comparison outcome for one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffStatus {
    /// Present on both sides with equal hashes
    Match,
    /// Present only in the destination
    MissingSource,
    /// Present only in the source
    MissingDestination,
    /// Present on both sides with different hashes
    Mismatch,
}

impl DiffStatus {
    /// Label shown in the status column
    pub fn label(self) -> &'static str {
        match self {
            DiffStatus::Match => "Match",
            DiffStatus::MissingSource => "Missing source",
            DiffStatus::MissingDestination => "Missing destination",
            DiffStatus::Mismatch => "Mismatch",
        }
    }

    /// Whether a copy from source to destination would fix this path
    ///
    /// `MissingSource` has nothing to copy from and is never repaired.
    pub fn needs_repair(self) -> bool {
        matches!(self, DiffStatus::MissingDestination | DiffStatus::Mismatch)
    }
}

/// Comparison record for one path in the union of both inventories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRecord {
    pub path: String,
    pub source_hash: Option<String>,
    pub destination_hash: Option<String>,
    pub status: DiffStatus,
}

impl DiffRecord {
    /// Build a record whose status follows from hash presence and equality
    pub fn classify(
        path: impl Into<String>,
        source_hash: Option<String>,
        destination_hash: Option<String>,
    ) -> Self {
        let status = match (&source_hash, &destination_hash) {
            (None, _) => DiffStatus::MissingSource,
            (Some(_), None) => DiffStatus::MissingDestination,
            (Some(src), Some(dst)) if src != dst => DiffStatus::Mismatch,
            (Some(_), Some(_)) => DiffStatus::Match,
        };
        Self {
            path: path.into(),
            source_hash,
            destination_hash,
            status,
        }
    }

    /// Record a completed copy: both sides now carry the freshly read source hash
    pub fn mark_synced(&mut self, fresh_source_hash: String) {
        self.source_hash = Some(fresh_source_hash.clone());
        self.destination_hash = Some(fresh_source_hash);
        self.status = DiffStatus::Match;
    }

    pub fn source_hash_str(&self) -> &str {
        self.source_hash.as_deref().unwrap_or("")
    }

    pub fn destination_hash_str(&self) -> &str {
        self.destination_hash.as_deref().unwrap_or("")
    }
}

/// The diff slot kept for each directory pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairDiff {
    /// Not computed yet
    Pending,
    /// Sorted records from the last successful comparison
    Ready(Vec<DiffRecord>),
    /// One of the trees could not be enumerated
    Failed(String),
}

impl PairDiff {
    pub fn records(&self) -> Option<&[DiffRecord]> {
        match self {
            PairDiff::Ready(records) => Some(records),
            _ => None,
        }
    }

    pub fn records_mut(&mut self) -> Option<&mut Vec<DiffRecord>> {
        match self {
            PairDiff::Ready(records) => Some(records),
            _ => None,
        }
    }
}

/// Engine for computing directory differences
#[derive(Clone)]
pub struct DiffEngine {
    inventories: Arc<dyn Inventories>,
}

impl DiffEngine {
    /// Create an engine that reads trees through the given producers
    pub fn new(inventories: Arc<dyn Inventories>) -> Self {
        Self { inventories }
    }

    /// Compare two inventories
    ///
    /// Emits exactly one record per path in the union of both sides, sorted by
    /// path. The order of the inputs does not matter.
    pub fn compute(source: &[FileRecord], destination: &[FileRecord]) -> Vec<DiffRecord> {
        let source_map: BTreeMap<&str, &str> = source
            .iter()
            .map(|record| (record.path.as_str(), record.hash.as_str()))
            .collect();
        let destination_map: BTreeMap<&str, &str> = destination
            .iter()
            .map(|record| (record.path.as_str(), record.hash.as_str()))
            .collect();

        let paths: BTreeSet<&str> = source_map
            .keys()
            .chain(destination_map.keys())
            .copied()
            .collect();

        paths
            .into_iter()
            .map(|path| {
                DiffRecord::classify(
                    path,
                    source_map.get(path).map(|hash| hash.to_string()),
                    destination_map.get(path).map(|hash| hash.to_string()),
                )
            })
            .collect()
    }

    /// Scan both sides of a pair and compare them
    pub async fn diff_pair(&self, pair: &DirectoryPair) -> Result<Vec<DiffRecord>, InventoryError> {
        let source = Locator::parse(&pair.source)?;
        let destination = Locator::parse(&pair.destination)?;

        let source_producer = self.inventories.open(&source);
        let destination_producer = self.inventories.open(&destination);
        let (source_files, destination_files) =
            tokio::join!(source_producer.list(), destination_producer.list());
        let source_files = source_files?;
        let destination_files = destination_files?;

        let records = Self::compute(&source_files, &destination_files);
        debug!(
            source = %source,
            destination = %destination,
            records = records.len(),
            differing = records.iter().filter(|r| r.status != DiffStatus::Match).count(),
            "pair compared"
        );
        Ok(records)
    }

    /// Recompute every pair as one unit of work
    ///
    /// Failures stay local to their pair and come back as `PairDiff::Failed`.
    pub async fn compute_all(&self, pairs: &[DirectoryPair]) -> Vec<PairDiff> {
        let scans = pairs.iter().map(|pair| async move {
            match self.diff_pair(pair).await {
                Ok(records) => PairDiff::Ready(records),
                Err(e) => {
                    warn!(source = %pair.source, destination = %pair.destination, "diff failed: {}", e);
                    PairDiff::Failed(e.to_string())
                }
            }
        });
        join_all(scans).await
    }
}
