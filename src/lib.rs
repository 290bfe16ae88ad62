// tree-sync Library
// Content-hash comparison of directory pairs and per-file repair, with a TUI on top

// Core infrastructure - configuration, session state, event loop
pub mod core;

// Operations - inventories, diffing and repair
pub mod operations;

// UI - TUI components and views
pub mod ui;

// Utilities - path helpers
pub mod utilities;

// Error types shared across layers
pub mod error;

// Tracing subscriber setup
pub mod logging;

// Plain-text output for --no-tui
pub mod report;

// Re-export commonly used items for convenience
pub use core::{Config, DirectoryPair, EventLoop, Session};
pub use error::{ConfigError, InventoryError, RepairError};
pub use operations::{DiffEngine, SyncCoordinator};
