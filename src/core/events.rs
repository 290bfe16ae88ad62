// Event Handling
// Application event types, key mapping and the terminal input task

use crossterm::event::{
    Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEvent, MouseEventKind,
};
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::RepairError;
use crate::operations::PairDiff;

/// Everything the event loop receives over its channel
#[derive(Debug)]
pub enum AppEvent {
    /// Input for the session state machine
    Session(SessionEvent),
    /// Terminal was resized; only a redraw is needed
    Resize(u16, u16),
}

impl From<SessionEvent> for AppEvent {
    fn from(event: SessionEvent) -> Self {
        AppEvent::Session(event)
    }
}

/// Events applied to the session, one at a time
#[derive(Debug)]
pub enum SessionEvent {
    /// Advance to the next directory pair, wrapping around
    NextPair,

    /// Rescan and rediff every pair
    Refresh,

    /// Repair every differing file of the current pair
    SyncCurrentPair,

    /// End the session
    Quit,

    /// Scroll the table up by rows
    ScrollUp(usize),

    /// Scroll the table down by rows
    ScrollDown(usize),

    /// A recomputation finished; one slot per configured pair
    DiffsComputed {
        generation: u64,
        diffs: Vec<PairDiff>,
    },

    /// A repair for `path` of pair `pair_index` is about to start
    SyncStarted { pair_index: usize, path: String },

    /// A repair finished, carrying the freshly read source hash on success
    SyncFinished {
        pair_index: usize,
        path: String,
        outcome: Result<String, RepairError>,
    },
}

/// Converts terminal events into session events
pub struct EventHandler;

impl EventHandler {
    /// Convert a crossterm event to an application event
    pub fn handle(event: Event) -> Option<AppEvent> {
        match event {
            Event::Key(key) => Self::handle_key(key).map(AppEvent::Session),
            Event::Mouse(mouse) => Self::handle_mouse(mouse).map(AppEvent::Session),
            Event::Resize(width, height) => Some(AppEvent::Resize(width, height)),
            _ => None,
        }
    }

    /// Handle keyboard events
    fn handle_key(key: KeyEvent) -> Option<SessionEvent> {
        // Windows reports both press and release
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Char('q') => Some(SessionEvent::Quit),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(SessionEvent::Quit)
            }
            KeyCode::Tab => Some(SessionEvent::NextPair),
            KeyCode::Char('r') => Some(SessionEvent::Refresh),
            KeyCode::Char('s') => Some(SessionEvent::SyncCurrentPair),
            KeyCode::Up | KeyCode::Char('k') => Some(SessionEvent::ScrollUp(1)),
            KeyCode::Down | KeyCode::Char('j') => Some(SessionEvent::ScrollDown(1)),
            KeyCode::PageUp => Some(SessionEvent::ScrollUp(10)),
            KeyCode::PageDown => Some(SessionEvent::ScrollDown(10)),
            _ => None,
        }
    }

    /// Handle mouse events
    fn handle_mouse(mouse: MouseEvent) -> Option<SessionEvent> {
        match mouse.kind {
            MouseEventKind::ScrollUp => Some(SessionEvent::ScrollUp(3)),
            MouseEventKind::ScrollDown => Some(SessionEvent::ScrollDown(3)),
            _ => None,
        }
    }
}

/// Forward terminal input into the event channel until the loop goes away
pub fn spawn_input_task(tx: UnboundedSender<AppEvent>) {
    tokio::spawn(async move {
        let mut reader = EventStream::new();
        while let Some(event) = reader.next().await {
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("terminal input error: {}", e);
                    break;
                }
            };
            if let Some(app_event) = EventHandler::handle(event) {
                if tx.send(app_event).is_err() {
                    break;
                }
            }
        }
    });
}
