// Configuration
// Directory pairs and transport settings loaded from config.yaml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::Locator;

/// Default location of the configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// A source tree and the destination tree it should be mirrored into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryPair {
    /// Locator of the tree files are copied from
    pub source: String,

    /// Locator of the tree files are copied to
    pub destination: String,
}

impl DirectoryPair {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
        }
    }
}

/// External programs used to reach remote roots and copy files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Remote shell used for listings, hashing and `mkdir -p`
    #[serde(default = "default_shell")]
    pub shell: String,

    /// File synchronization program
    #[serde(default = "default_rsync")]
    pub rsync: String,

    /// Arguments passed to the synchronization program before source and destination
    #[serde(default = "default_rsync_args")]
    pub rsync_args: Vec<String>,
}

fn default_shell() -> String { "ssh".to_string() }
fn default_rsync() -> String { "rsync".to_string() }
fn default_rsync_args() -> Vec<String> { vec!["-avz".to_string()] }

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            rsync: default_rsync(),
            rsync_args: default_rsync_args(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Pairs to compare, in display order
    #[serde(default)]
    pub directory_pairs: Vec<DirectoryPair>,

    /// Shell and copy programs
    #[serde(default)]
    pub transport: TransportSettings,

    /// Where interactive mode writes its log
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)
            .context("Failed to parse config YAML")?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Locator problems, one message per malformed side
    ///
    /// These are not fatal: a pair with a bad locator simply fails its
    /// inventory and shows up as an error in the view.
    pub fn locator_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (idx, pair) in self.directory_pairs.iter().enumerate() {
            for (side, raw) in [("source", &pair.source), ("destination", &pair.destination)] {
                if let Err(e) = Locator::parse(raw) {
                    problems.push(format!("pair {} {}: {}", idx + 1, side, e));
                }
            }
        }
        problems
    }

    /// Log every malformed locator as a warning
    ///
    /// Called once logging is up, since the log destination itself comes from
    /// the configuration.
    pub fn report_problems(&self) -> usize {
        let problems = self.locator_problems();
        for problem in &problems {
            warn!("{}", problem);
        }
        debug!(pairs = self.directory_pairs.len(), "configuration loaded");
        problems.len()
    }
}
