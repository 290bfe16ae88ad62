// Session State
// The mutable aggregate behind the view, changed only by applying events

use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use super::{DirectoryPair, SessionEvent};
use crate::operations::{select_repairable, PairDiff};

/// Work the event loop must start after an event has been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Rescan every pair; the result must come back tagged with `generation`
    Recompute { generation: u64 },

    /// Repair `paths` of the pair at `pair_index`
    Sync {
        pair_index: usize,
        pair: DirectoryPair,
        paths: Vec<String>,
    },

    /// Leave the event loop
    Quit,
}

/// Session state for the directory pairs being compared
///
/// In-flight paths are tracked per pair, and start/done events always land on
/// the pair that issued them. Switching pairs while a sync runs therefore
/// never drops a completion or leaves a stale `Syncing` marker behind.
///
/// A sync request marks its paths in flight as part of the same `apply`, so a
/// second request queued behind it never re-issues them.
#[derive(Debug)]
pub struct Session {
    pairs: Vec<DirectoryPair>,
    current_index: usize,
    diffs: Vec<PairDiff>,
    loading: bool,
    in_flight: Vec<BTreeSet<String>>,
    generation: u64,
    scroll_offset: usize,
    should_quit: bool,
}

impl Session {
    /// Create a session with every pair pending its first comparison
    pub fn new(pairs: Vec<DirectoryPair>) -> Self {
        let count = pairs.len();
        Self {
            pairs,
            current_index: 0,
            diffs: vec![PairDiff::Pending; count],
            loading: false,
            in_flight: vec![BTreeSet::new(); count],
            generation: 0,
            scroll_offset: 0,
            should_quit: false,
        }
    }

    pub fn pairs(&self) -> &[DirectoryPair] {
        &self.pairs
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_pair(&self) -> Option<&DirectoryPair> {
        self.pairs.get(self.current_index)
    }

    pub fn diffs(&self) -> &[PairDiff] {
        &self.diffs
    }

    pub fn current_diff(&self) -> Option<&PairDiff> {
        self.diffs.get(self.current_index)
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Paths of a pair currently being repaired
    pub fn in_flight(&self, pair_index: usize) -> Option<&BTreeSet<String>> {
        self.in_flight.get(pair_index)
    }

    pub fn is_syncing(&self, pair_index: usize, path: &str) -> bool {
        self.in_flight
            .get(pair_index)
            .is_some_and(|paths| paths.contains(path))
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Apply one event and return the work it triggers
    pub fn apply(&mut self, event: SessionEvent) -> Vec<Effect> {
        match event {
            SessionEvent::NextPair => {
                self.next_pair();
                Vec::new()
            }
            SessionEvent::Refresh => vec![self.request_recompute()],
            SessionEvent::DiffsComputed { generation, diffs } => {
                self.replace_diffs(generation, diffs);
                Vec::new()
            }
            SessionEvent::SyncCurrentPair => self.request_sync().into_iter().collect(),
            // Usually already marked by the request; inserting again is a no-op
            SessionEvent::SyncStarted { pair_index, path } => {
                if let Some(paths) = self.in_flight.get_mut(pair_index) {
                    paths.insert(path);
                }
                Vec::new()
            }
            SessionEvent::SyncFinished { pair_index, path, outcome } => {
                self.finish_sync(pair_index, &path, outcome.map_err(|e| e.to_string()));
                Vec::new()
            }
            SessionEvent::ScrollUp(rows) => {
                self.scroll_offset = self.scroll_offset.saturating_sub(rows);
                Vec::new()
            }
            SessionEvent::ScrollDown(rows) => {
                let max = self.current_row_count().saturating_sub(1);
                self.scroll_offset = (self.scroll_offset + rows).min(max);
                Vec::new()
            }
            SessionEvent::Quit => {
                self.should_quit = true;
                vec![Effect::Quit]
            }
        }
    }

    /// Advance to the next pair, wrapping around
    fn next_pair(&mut self) {
        if self.pairs.is_empty() {
            return;
        }
        self.current_index = (self.current_index + 1) % self.pairs.len();
        self.scroll_offset = 0;
    }

    /// Start a recomputation; a newer request supersedes any running one
    fn request_recompute(&mut self) -> Effect {
        self.generation += 1;
        self.loading = true;
        debug!(generation = self.generation, "recompute requested");
        Effect::Recompute {
            generation: self.generation,
        }
    }

    fn replace_diffs(&mut self, generation: u64, mut diffs: Vec<PairDiff>) {
        if generation != self.generation {
            debug!(generation, latest = self.generation, "dropping stale diff results");
            return;
        }
        if diffs.len() != self.pairs.len() {
            warn!(got = diffs.len(), expected = self.pairs.len(), "diff result size mismatch");
            diffs.resize(self.pairs.len(), PairDiff::Pending);
        }

        self.diffs = diffs;
        self.loading = false;
        let max = self.current_row_count().saturating_sub(1);
        self.scroll_offset = self.scroll_offset.min(max);
        info!(generation, "diffs refreshed");
    }

    /// Build the sync effect for the current pair and mark its paths in flight
    ///
    /// Paths already in flight are skipped.
    fn request_sync(&mut self) -> Option<Effect> {
        if self.loading {
            debug!("sync ignored while recomputing");
            return None;
        }
        let pair_index = self.current_index;
        let pair = self.pairs.get(pair_index)?.clone();
        let records = self.diffs.get(pair_index)?.records()?;
        let in_flight = &mut self.in_flight[pair_index];

        let paths: Vec<String> = select_repairable(records)
            .into_iter()
            .filter(|path| !in_flight.contains(path))
            .collect();
        if paths.is_empty() {
            debug!(pair = pair_index + 1, "nothing to sync");
            return None;
        }
        in_flight.extend(paths.iter().cloned());

        Some(Effect::Sync {
            pair_index,
            pair,
            paths,
        })
    }

    fn finish_sync(&mut self, pair_index: usize, path: &str, outcome: Result<String, String>) {
        let Some(paths) = self.in_flight.get_mut(pair_index) else {
            return;
        };
        paths.remove(path);

        match outcome {
            Ok(fresh_hash) => {
                let record = self.diffs[pair_index]
                    .records_mut()
                    .and_then(|records| {
                        let idx = records
                            .binary_search_by(|record| record.path.as_str().cmp(path))
                            .ok()?;
                        records.get_mut(idx)
                    });
                match record {
                    Some(record) => record.mark_synced(fresh_hash),
                    None => debug!(pair = pair_index + 1, path, "synced path no longer listed"),
                }
            }
            Err(e) => warn!(pair = pair_index + 1, path, "sync failed: {}", e),
        }
    }

    fn current_row_count(&self) -> usize {
        self.current_diff()
            .and_then(PairDiff::records)
            .map_or(0, <[_]>::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepairError;
    use crate::operations::{DiffRecord, DiffStatus};

    fn pairs(count: usize) -> Vec<DirectoryPair> {
        (0..count)
            .map(|i| DirectoryPair::new(format!("src{}", i), format!("dst{}", i)))
            .collect()
    }

    fn sample_records() -> Vec<DiffRecord> {
        vec![
            DiffRecord::classify("a.txt", Some("h1".into()), None),
            DiffRecord::classify("b.txt", Some("h2".into()), Some("h2".into())),
            DiffRecord::classify("c.txt", Some("h3".into()), Some("old".into())),
            DiffRecord::classify("d.txt", None, Some("h4".into())),
        ]
    }

    /// Session with every pair loaded with `sample_records`
    fn loaded(count: usize) -> Session {
        let mut session = Session::new(pairs(count));
        let effects = session.apply(SessionEvent::Refresh);
        assert_eq!(effects, vec![Effect::Recompute { generation: 1 }]);
        session.apply(SessionEvent::DiffsComputed {
            generation: 1,
            diffs: vec![PairDiff::Ready(sample_records()); count],
        });
        session
    }

    fn failure() -> RepairError {
        RepairError::CommandFailed {
            program: "rsync".into(),
            status: "exit status: 23".into(),
            stderr: "partial transfer".into(),
        }
    }

    #[test]
    fn test_new_session_is_pending() {
        let session = Session::new(pairs(2));
        assert_eq!(session.diffs(), &[PairDiff::Pending, PairDiff::Pending]);
        assert!(!session.is_loading());
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn test_next_pair_cycles() {
        let mut session = Session::new(pairs(3));
        for expected in [1, 2, 0, 1] {
            session.apply(SessionEvent::NextPair);
            assert_eq!(session.current_index(), expected);
        }

        let mut session = Session::new(pairs(4));
        for _ in 0..4 {
            session.apply(SessionEvent::NextPair);
        }
        assert_eq!(session.current_index(), 0);
    }

    #[test]
    fn test_next_pair_without_pairs() {
        let mut session = Session::new(Vec::new());
        assert!(session.apply(SessionEvent::NextPair).is_empty());
        assert_eq!(session.current_index(), 0);
        assert!(session.current_pair().is_none());
        assert!(session.apply(SessionEvent::SyncCurrentPair).is_empty());
    }

    #[test]
    fn test_refresh_keeps_previous_lists_visible() {
        let mut session = loaded(1);
        session.apply(SessionEvent::Refresh);
        assert!(session.is_loading());
        assert_eq!(session.current_diff().unwrap().records().unwrap().len(), 4);

        session.apply(SessionEvent::DiffsComputed {
            generation: 2,
            diffs: vec![PairDiff::Ready(Vec::new())],
        });
        assert!(!session.is_loading());
        assert!(session.current_diff().unwrap().records().unwrap().is_empty());
    }

    #[test]
    fn test_overlapping_refreshes_keep_latest() {
        let mut session = Session::new(pairs(1));
        session.apply(SessionEvent::Refresh);
        session.apply(SessionEvent::Refresh);

        // The first scan finishes last-but-one: ignored, still loading
        session.apply(SessionEvent::DiffsComputed {
            generation: 1,
            diffs: vec![PairDiff::Failed("old".into())],
        });
        assert!(session.is_loading());
        assert_eq!(session.diffs(), &[PairDiff::Pending]);

        session.apply(SessionEvent::DiffsComputed {
            generation: 2,
            diffs: vec![PairDiff::Ready(sample_records())],
        });
        assert!(!session.is_loading());

        // A late result from the first scan must not overwrite the newer one
        session.apply(SessionEvent::DiffsComputed {
            generation: 1,
            diffs: vec![PairDiff::Failed("late".into())],
        });
        assert!(session.current_diff().unwrap().records().is_some());
    }

    #[test]
    fn test_failed_pair_has_no_records() {
        let mut session = Session::new(pairs(2));
        session.apply(SessionEvent::Refresh);
        session.apply(SessionEvent::DiffsComputed {
            generation: 1,
            diffs: vec![PairDiff::Failed("ssh error".into()), PairDiff::Ready(sample_records())],
        });
        assert!(session.current_diff().unwrap().records().is_none());
        assert!(session.apply(SessionEvent::SyncCurrentPair).is_empty());
    }

    #[test]
    fn test_sync_selects_missing_and_mismatched() {
        let mut session = loaded(2);
        session.apply(SessionEvent::NextPair);
        let effects = session.apply(SessionEvent::SyncCurrentPair);
        assert_eq!(
            effects,
            vec![Effect::Sync {
                pair_index: 1,
                pair: DirectoryPair::new("src1", "dst1"),
                paths: vec!["a.txt".to_string(), "c.txt".to_string()],
            }]
        );
        assert!(!session.is_loading());
    }

    #[test]
    fn test_sync_request_marks_paths_in_flight() {
        let mut session = loaded(1);
        assert_eq!(session.apply(SessionEvent::SyncCurrentPair).len(), 1);
        assert!(session.is_syncing(0, "a.txt"));
        assert!(session.is_syncing(0, "c.txt"));

        // A repeated request before any start event has been applied issues nothing
        assert!(session.apply(SessionEvent::SyncCurrentPair).is_empty());

        session.apply(SessionEvent::SyncStarted { pair_index: 0, path: "a.txt".into() });
        assert_eq!(session.in_flight(0).unwrap().len(), 2);
        session.apply(SessionEvent::SyncFinished {
            pair_index: 0,
            path: "a.txt".into(),
            outcome: Err(failure()),
        });

        // Only the failed path is eligible again
        let effects = session.apply(SessionEvent::SyncCurrentPair);
        assert!(matches!(&effects[..], [Effect::Sync { paths, .. }] if paths == &vec!["a.txt".to_string()]));
    }

    #[test]
    fn test_sync_ignored_while_loading() {
        let mut session = loaded(1);
        session.apply(SessionEvent::Refresh);
        assert!(session.apply(SessionEvent::SyncCurrentPair).is_empty());
    }

    #[test]
    fn test_sync_skips_paths_in_flight() {
        let mut session = loaded(1);
        session.apply(SessionEvent::SyncStarted { pair_index: 0, path: "a.txt".into() });
        let effects = session.apply(SessionEvent::SyncCurrentPair);
        assert!(matches!(&effects[..], [Effect::Sync { paths, .. }] if paths == &vec!["c.txt".to_string()]));

        session.apply(SessionEvent::SyncStarted { pair_index: 0, path: "c.txt".into() });
        assert!(session.apply(SessionEvent::SyncCurrentPair).is_empty());
    }

    #[test]
    fn test_successful_sync_patches_record() {
        let mut session = loaded(1);
        session.apply(SessionEvent::SyncStarted { pair_index: 0, path: "c.txt".into() });
        assert!(session.is_syncing(0, "c.txt"));

        session.apply(SessionEvent::SyncFinished {
            pair_index: 0,
            path: "c.txt".into(),
            outcome: Ok("h3".into()),
        });
        assert!(!session.is_syncing(0, "c.txt"));
        assert!(session.in_flight(0).unwrap().is_empty());

        let records = session.current_diff().unwrap().records().unwrap();
        let record = &records[2];
        assert_eq!(record.path, "c.txt");
        assert_eq!(record.status, DiffStatus::Match);
        assert_eq!(record.destination_hash, record.source_hash);
        assert_eq!(record.destination_hash.as_deref(), Some("h3"));
        // Other records untouched
        assert_eq!(records[0], sample_records()[0]);
        assert_eq!(records[3], sample_records()[3]);
    }

    #[test]
    fn test_failed_sync_leaves_record_unchanged() {
        let mut session = loaded(1);
        session.apply(SessionEvent::SyncStarted { pair_index: 0, path: "a.txt".into() });
        session.apply(SessionEvent::SyncFinished {
            pair_index: 0,
            path: "a.txt".into(),
            outcome: Err(failure()),
        });

        assert!(!session.is_syncing(0, "a.txt"));
        assert_eq!(session.current_diff().unwrap().records().unwrap(), &sample_records()[..]);
    }

    #[test]
    fn test_other_pair_events_do_not_touch_current_pair() {
        let mut session = loaded(2);
        session.apply(SessionEvent::SyncStarted { pair_index: 0, path: "a.txt".into() });

        session.apply(SessionEvent::SyncStarted { pair_index: 1, path: "a.txt".into() });
        session.apply(SessionEvent::SyncFinished {
            pair_index: 1,
            path: "a.txt".into(),
            outcome: Ok("h1".into()),
        });

        // Current pair (0): list and in-flight set unchanged
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.current_diff().unwrap().records().unwrap(), &sample_records()[..]);
        assert!(session.is_syncing(0, "a.txt"));

        // Pair 1 received its own patch
        let other = session.diffs()[1].records().unwrap();
        assert_eq!(other[0].status, DiffStatus::Match);
        assert!(session.in_flight(1).unwrap().is_empty());
    }

    #[test]
    fn test_switching_pairs_mid_sync_clears_markers() {
        let mut session = loaded(2);
        session.apply(SessionEvent::SyncStarted { pair_index: 0, path: "c.txt".into() });
        session.apply(SessionEvent::NextPair);
        session.apply(SessionEvent::SyncFinished {
            pair_index: 0,
            path: "c.txt".into(),
            outcome: Ok("h3".into()),
        });
        session.apply(SessionEvent::NextPair);

        assert_eq!(session.current_index(), 0);
        assert!(!session.is_syncing(0, "c.txt"));
        assert_eq!(session.current_diff().unwrap().records().unwrap()[2].status, DiffStatus::Match);
    }

    #[test]
    fn test_completion_removes_in_flight_once() {
        let mut session = loaded(1);
        session.apply(SessionEvent::SyncStarted { pair_index: 0, path: "a.txt".into() });
        session.apply(SessionEvent::SyncStarted { pair_index: 0, path: "c.txt".into() });
        session.apply(SessionEvent::SyncFinished {
            pair_index: 0,
            path: "a.txt".into(),
            outcome: Ok("h1".into()),
        });
        let remaining: Vec<&String> = session.in_flight(0).unwrap().iter().collect();
        assert_eq!(remaining, vec!["c.txt"]);
    }

    #[test]
    fn test_out_of_range_pair_index_ignored() {
        let mut session = loaded(1);
        session.apply(SessionEvent::SyncStarted { pair_index: 7, path: "a.txt".into() });
        session.apply(SessionEvent::SyncFinished {
            pair_index: 7,
            path: "a.txt".into(),
            outcome: Ok("x".into()),
        });
        assert_eq!(session.current_diff().unwrap().records().unwrap(), &sample_records()[..]);
    }

    #[test]
    fn test_completion_after_recompute_patches_new_list() {
        let mut session = loaded(1);
        session.apply(SessionEvent::SyncStarted { pair_index: 0, path: "a.txt".into() });
        session.apply(SessionEvent::Refresh);
        session.apply(SessionEvent::DiffsComputed {
            generation: 2,
            diffs: vec![PairDiff::Ready(sample_records())],
        });
        assert!(session.is_syncing(0, "a.txt"));

        session.apply(SessionEvent::SyncFinished {
            pair_index: 0,
            path: "a.txt".into(),
            outcome: Ok("h1".into()),
        });
        assert_eq!(session.current_diff().unwrap().records().unwrap()[0].status, DiffStatus::Match);
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut session = loaded(2);
        session.apply(SessionEvent::ScrollDown(10));
        assert_eq!(session.scroll_offset(), 3);
        session.apply(SessionEvent::ScrollUp(1));
        assert_eq!(session.scroll_offset(), 2);
        session.apply(SessionEvent::ScrollUp(10));
        assert_eq!(session.scroll_offset(), 0);

        session.apply(SessionEvent::ScrollDown(2));
        session.apply(SessionEvent::NextPair);
        assert_eq!(session.scroll_offset(), 0);
    }

    #[test]
    fn test_quit() {
        let mut session = Session::new(pairs(1));
        assert_eq!(session.apply(SessionEvent::Quit), vec![Effect::Quit]);
        assert!(session.should_quit());
    }
}
