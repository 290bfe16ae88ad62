// Headless Report
// Plain-text rendering of every pair for `--no-tui`, with optional repair first

use anyhow::{bail, Result};
use futures::future::join_all;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::{Config, DirectoryPair};
use crate::operations::{
    select_repairable, DiffEngine, DiffRecord, DiffStatus, PairDiff, RsyncRepair, SyncCoordinator,
    TransportInventories,
};

/// One padded table row: status, path, source hash, destination hash
pub fn format_row(status: &str, path: &str, source_hash: &str, destination_hash: &str) -> String {
    format!("{:<20} {:<45} {:<33} {:<33}", status, path, source_hash, destination_hash)
        .trim_end()
        .to_string()
}

fn format_record(record: &DiffRecord) -> String {
    format_row(
        record.status.label(),
        &record.path,
        record.source_hash_str(),
        record.destination_hash_str(),
    )
}

/// Write the report for every pair
pub fn write_report<W: Write>(out: &mut W, pairs: &[DirectoryPair], diffs: &[PairDiff]) -> std::io::Result<()> {
    for (idx, (pair, diff)) in pairs.iter().zip(diffs).enumerate() {
        writeln!(out, "Pair {}/{} {} -> {}", idx + 1, pairs.len(), pair.source, pair.destination)?;
        match diff {
            PairDiff::Ready(records) => {
                for record in records {
                    writeln!(out, "{}", format_record(record))?;
                }
                if records.iter().all(|r| r.status == DiffStatus::Match) {
                    writeln!(out, "All files in sync")?;
                }
            }
            PairDiff::Failed(message) => writeln!(out, "Error retrieving diff: {}", message)?,
            PairDiff::Pending => {}
        }
    }
    Ok(())
}

/// Files copied and files that failed during a headless sync
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub copied: usize,
    pub failed: usize,
}

/// Repair every differing file of every pair
///
/// Pairs whose trees cannot be listed are skipped; they show up as errors in
/// the report that follows.
pub async fn sync_all(engine: &DiffEngine, coordinator: &SyncCoordinator, pairs: &[DirectoryPair]) -> SyncSummary {
    let mut summary = SyncSummary::default();

    for (idx, (pair, diff)) in pairs.iter().zip(engine.compute_all(pairs).await).enumerate() {
        let Some(records) = diff.records() else {
            continue;
        };
        let paths = select_repairable(records);
        if paths.is_empty() {
            continue;
        }
        info!(pair = idx + 1, files = paths.len(), "syncing pair");

        let outcomes = join_all(paths.iter().map(|path| coordinator.repair_one(pair, path))).await;
        for (path, outcome) in paths.iter().zip(outcomes) {
            match outcome {
                Ok(_) => summary.copied += 1,
                Err(e) => {
                    warn!(pair = idx + 1, %path, "sync failed: {}", e);
                    summary.failed += 1;
                }
            }
        }
    }
    summary
}

/// Entry point for `--no-tui`
pub async fn run_headless(config: Config, sync: bool) -> Result<()> {
    let inventories = Arc::new(TransportInventories::new(config.transport.shell.clone()));
    let engine = DiffEngine::new(inventories.clone());
    let pairs = config.directory_pairs;

    let mut summary = SyncSummary::default();
    if sync {
        let coordinator = SyncCoordinator::new(inventories, Arc::new(RsyncRepair::new(config.transport)));
        summary = sync_all(&engine, &coordinator, &pairs).await;
        info!(copied = summary.copied, failed = summary.failed, "sync finished");
    }

    let diffs = engine.compute_all(&pairs).await;
    let stdout = std::io::stdout();
    write_report(&mut stdout.lock(), &pairs, &diffs)?;

    if summary.failed > 0 {
        bail!("{} file(s) failed to sync", summary.failed);
    }
    Ok(())
}
