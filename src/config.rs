//! Application configuration.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config PATH`, or `config.toml` in the platform config
//!    directory)
//! 3. `TWINFIND_*` environment variables (e.g. `TWINFIND_MIN_SIZE=4096`)
//! 4. Command-line flags, applied by [`Config::merge_cli`]
//!
//! A missing file is not an error. An unreadable or invalid one is logged
//! and the defaults are used instead.
//!
//! ```toml
//! min_size = 4096
//! ignore_dir = "node_modules"
//! match_by_name = false
//! worker_count = 8
//! queue_capacity = 256
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::duplicates::{FinderConfig, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKER_COUNT};
use crate::scanner::{WalkerConfig, DEFAULT_IGNORE_DIR, DEFAULT_MIN_SIZE};

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "TWINFIND_";

/// Scan settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Files smaller than this many bytes are ignored.
    pub min_size: u64,
    /// Directory name whose subtrees are skipped; empty disables.
    pub ignore_dir: String,
    /// Require equal names for candidate pairs.
    pub match_by_name: bool,
    /// Number of hashing workers.
    pub worker_count: usize,
    /// Capacity of each bounded stage queue.
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            ignore_dir: DEFAULT_IGNORE_DIR.to_string(),
            match_by_name: true,
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl Config {
    /// Load from the default platform config file and the environment.
    #[must_use]
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from_path(path),
            None => {
                log::debug!("No platform config directory, using defaults and environment");
                Self::extract(Self::base_figment())
            }
        }
    }

    /// Load from `path` and the environment.
    #[must_use]
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            log::debug!("Loading config from {}", path.display());
        } else {
            log::debug!("Config file {} not found", path.display());
        }
        Self::extract(
            Figment::from(Serialized::defaults(Config::default()))
                .merge(Toml::file(path))
                .merge(Env::prefixed(ENV_PREFIX)),
        )
    }

    /// Load the config for a CLI invocation and apply its flags.
    #[must_use]
    pub fn for_cli(cli: &Cli) -> Self {
        let mut config = match cli.config {
            Some(ref path) => Self::load_from_path(path),
            None => Self::load(),
        };
        config.merge_cli(cli);
        config
    }

    fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed(ENV_PREFIX))
    }

    fn extract(figment: Figment) -> Self {
        match figment.extract() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Invalid configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Location of the default config file, if the platform has one.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "twinfind").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Override settings with flags given on the command line.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(min_size) = cli.min_size {
            self.min_size = min_size;
        }
        if let Some(ref ignore_dir) = cli.ignore_dir {
            self.ignore_dir.clone_from(ignore_dir);
        }
        if cli.no_name {
            self.match_by_name = false;
        }
        if let Some(workers) = cli.workers {
            self.worker_count = workers;
        }
        if let Some(capacity) = cli.queue_capacity {
            self.queue_capacity = capacity;
        }
    }

    /// Walker settings derived from this config.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::new(self.min_size, self.ignore_dir.as_str())
    }

    /// Finder settings derived from this config.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_worker_count(self.worker_count)
            .with_queue_capacity(self.queue_capacity)
            .with_match_by_name(self.match_by_name)
            .with_walker_config(self.walker_config())
    }
}
