// Event Loop
// Owns the session and turns the effects it returns into background work

use anyhow::Result;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::debug;

use super::{AppEvent, DirectoryPair, Effect, Session, SessionEvent};
use crate::operations::{DiffEngine, SyncCoordinator};

/// Single consumer of the application event channel
///
/// Every state change goes through `Session::apply` on this loop. Background
/// tasks only ever talk back by sending events.
pub struct EventLoop {
    session: Session,
    engine: DiffEngine,
    coordinator: SyncCoordinator,
    tx: UnboundedSender<AppEvent>,
    rx: UnboundedReceiver<AppEvent>,
}

impl EventLoop {
    pub fn new(pairs: Vec<DirectoryPair>, engine: DiffEngine, coordinator: SyncCoordinator) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(pairs),
            engine,
            coordinator,
            tx,
            rx,
        }
    }

    /// Sender for producers outside the loop, such as the terminal input task
    pub fn sender(&self) -> UnboundedSender<AppEvent> {
        self.tx.clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Apply an event and start the work it asks for
    ///
    /// Returns `false` once the session wants to quit.
    pub fn dispatch(&mut self, event: SessionEvent) -> bool {
        for effect in self.session.apply(event) {
            match effect {
                Effect::Recompute { generation } => self.spawn_recompute(generation),
                Effect::Sync { pair_index, pair, paths } => {
                    self.coordinator.dispatch(pair_index, &pair, paths, &self.tx);
                }
                Effect::Quit => return false,
            }
        }
        !self.session.should_quit()
    }

    fn spawn_recompute(&self, generation: u64) {
        let engine = self.engine.clone();
        let pairs = self.session.pairs().to_vec();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let diffs = engine.compute_all(&pairs).await;
            if tx.send(SessionEvent::DiffsComputed { generation, diffs }.into()).is_err() {
                debug!(generation, "event loop gone, diff results dropped");
            }
        });
    }

    /// Wait for the next event and handle it
    ///
    /// Returns `false` when the loop should stop.
    pub async fn step(&mut self) -> bool {
        match self.rx.recv().await {
            Some(AppEvent::Session(event)) => self.dispatch(event),
            Some(AppEvent::Resize(width, height)) => {
                debug!(width, height, "terminal resized");
                true
            }
            None => false,
        }
    }

    /// Run until quit, redrawing after every handled event
    ///
    /// An initial refresh is issued before the first event is read.
    pub async fn run<F>(&mut self, mut draw: F) -> Result<()>
    where
        F: FnMut(&Session) -> Result<()>,
    {
        draw(&self.session)?;
        if !self.dispatch(SessionEvent::Refresh) {
            return Ok(());
        }

        loop {
            draw(&self.session)?;
            if !self.step().await {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::inventory::testing::MemoryInventories;
    use crate::operations::sync::testing::MemoryRepair;
    use crate::operations::DiffStatus;
    use std::sync::Arc;

    fn event_loop(inventories: &MemoryInventories, repair: MemoryRepair, pairs: Vec<DirectoryPair>) -> EventLoop {
        let engine = DiffEngine::new(Arc::new(inventories.clone()));
        let coordinator = SyncCoordinator::new(Arc::new(inventories.clone()), Arc::new(repair));
        EventLoop::new(pairs, engine, coordinator)
    }

    /// Step until the session is no longer loading
    async fn settle_refresh(event_loop: &mut EventLoop) {
        while event_loop.session().is_loading() {
            assert!(event_loop.step().await);
        }
    }

    #[tokio::test]
    async fn test_refresh_then_sync() {
        let inventories = MemoryInventories::new()
            .with_tree("src", &[("a.txt", "1"), ("b.txt", "2")])
            .with_tree("dst", &[("a.txt", "1")]);
        let repair = MemoryRepair::new(inventories.clone());
        let mut event_loop = event_loop(&inventories, repair, vec![DirectoryPair::new("src", "dst")]);

        assert!(event_loop.dispatch(SessionEvent::Refresh));
        settle_refresh(&mut event_loop).await;
        let records = event_loop.session().current_diff().unwrap().records().unwrap().to_vec();
        assert_eq!(records[1].status, DiffStatus::MissingDestination);

        assert!(event_loop.dispatch(SessionEvent::SyncCurrentPair));
        // One start and one finish event
        assert!(event_loop.step().await);
        assert!(event_loop.session().is_syncing(0, "b.txt"));
        assert!(event_loop.step().await);
        assert!(!event_loop.session().is_syncing(0, "b.txt"));

        let records = event_loop.session().current_diff().unwrap().records().unwrap();
        assert!(records.iter().all(|r| r.status == DiffStatus::Match));
    }

    #[tokio::test]
    async fn test_queued_sync_requests_copy_once() {
        let inventories = MemoryInventories::new()
            .with_tree("src", &[("a.txt", "1"), ("b.txt", "2")])
            .with_tree("dst", &[("a.txt", "1")]);
        let repair = Arc::new(MemoryRepair::new(inventories.clone()));
        let engine = DiffEngine::new(Arc::new(inventories.clone()));
        let coordinator = SyncCoordinator::new(Arc::new(inventories.clone()), repair.clone());
        let mut event_loop = EventLoop::new(vec![DirectoryPair::new("src", "dst")], engine, coordinator);

        assert!(event_loop.dispatch(SessionEvent::Refresh));
        settle_refresh(&mut event_loop).await;

        // Two key presses already queued before the loop handles either
        let tx = event_loop.sender();
        tx.send(SessionEvent::SyncCurrentPair.into()).unwrap();
        tx.send(SessionEvent::SyncCurrentPair.into()).unwrap();
        assert!(event_loop.step().await);
        assert!(event_loop.session().is_syncing(0, "b.txt"));
        assert!(event_loop.step().await);

        while !event_loop.session().in_flight(0).unwrap().is_empty() {
            assert!(event_loop.step().await);
        }
        assert_eq!(*repair.copied.lock().unwrap(), vec!["b.txt".to_string()]);
        let records = event_loop.session().current_diff().unwrap().records().unwrap();
        assert!(records.iter().all(|r| r.status == DiffStatus::Match));
    }

    #[tokio::test]
    async fn test_quit_stops_loop() {
        let inventories = MemoryInventories::new();
        let mut event_loop = event_loop(&inventories, MemoryRepair::new(inventories.clone()), Vec::new());
        event_loop.sender().send(SessionEvent::Quit.into()).unwrap();
        assert!(!event_loop.step().await);
    }

    #[tokio::test]
    async fn test_resize_keeps_running() {
        let inventories = MemoryInventories::new();
        let mut event_loop = event_loop(&inventories, MemoryRepair::new(inventories.clone()), Vec::new());
        event_loop.sender().send(AppEvent::Resize(100, 40)).unwrap();
        assert!(event_loop.step().await);
    }

    #[tokio::test]
    async fn test_run_draws_and_refreshes() {
        let inventories = MemoryInventories::new()
            .with_tree("src", &[("a.txt", "1")])
            .with_tree("dst", &[]);
        let mut event_loop = event_loop(
            &inventories,
            MemoryRepair::new(inventories.clone()),
            vec![DirectoryPair::new("src", "dst")],
        );

        let tx = event_loop.sender();
        let mut frames = 0;
        event_loop
            .run(|session| {
                frames += 1;
                // Quit once the first scan has landed
                if !session.is_loading() && session.current_diff().and_then(|d| d.records()).is_some() {
                    let _ = tx.send(SessionEvent::Quit.into());
                }
                Ok(())
            })
            .await
            .unwrap();

        assert!(frames >= 3);
        assert!(event_loop.session().should_quit());
    }
}
