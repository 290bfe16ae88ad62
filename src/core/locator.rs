// Locators
// Parsing of the opaque root identifiers found in directory pairs

use std::fmt;
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::utilities::paths::trim_root;

/// A filesystem root, either on this machine or behind a shell transport
///
/// Any string containing `:` is read as `host:path`; everything else is a
/// local path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Local(PathBuf),
    Remote { host: String, root: String },
}

impl Locator {
    /// Parse a locator string from configuration
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ConfigError::EmptyLocator);
        }

        match raw.split_once(':') {
            Some((host, root)) => {
                let root = trim_root(root);
                if host.is_empty() || root.is_empty() {
                    return Err(ConfigError::InvalidRemote(raw.to_string()));
                }
                Ok(Locator::Remote {
                    host: host.to_string(),
                    root: root.to_string(),
                })
            }
            None => Ok(Locator::Local(PathBuf::from(trim_root(raw)))),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Locator::Remote { .. })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Local(path) => write!(f, "{}", path.display()),
            Locator::Remote { host, root } => write!(f, "{}:{}", host, root),
        }
    }
}
