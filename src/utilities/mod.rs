// Utilities module
// Helper functions and tools

pub mod paths;

pub use paths::{normalize_relative, to_slash_path};
