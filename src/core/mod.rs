// Core infrastructure module
// Configuration, session state and the event loop that drives it

pub mod config;
pub mod events;
pub mod locator;
pub mod runtime;
pub mod session;

pub use config::{Config, DirectoryPair, TransportSettings, DEFAULT_CONFIG_PATH};
pub use events::{spawn_input_task, AppEvent, EventHandler, SessionEvent};
pub use locator::Locator;
pub use runtime::EventLoop;
pub use session::{Effect, Session};
