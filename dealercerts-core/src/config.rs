use crate::classify::JsonDealerStore;
use crate::error::{DiscoveryError, Result};
use crate::registry::JsonHostStore;
use dealercerts_scanner::fetcher::{BROWSER_USER_AGENT, DEFAULT_TIMEOUT_SECS};
use std::path::{Path, PathBuf};

pub const SEED_FILE: &str = "dealerurls.txt";
pub const HOSTS_FILE: &str = "hosts.json";
pub const CLASSIFIED_FILE: &str = "classified-dealers.json";

/// Kept low so third-party dealer sites don't see us as a bot.
pub const DEFAULT_FETCH_WORKERS: usize = 3;
pub const DEFAULT_EXTRACT_WORKERS: usize = 10;

/// Settings for a single discovery run
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub data_dir: PathBuf,
    pub fetch_workers: usize,
    pub extract_workers: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            fetch_workers: DEFAULT_FETCH_WORKERS,
            extract_workers: DEFAULT_EXTRACT_WORKERS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl DiscoveryConfig {
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_fetch_workers(mut self, workers: usize) -> Self {
        self.fetch_workers = workers;
        self
    }

    pub fn with_extract_workers(mut self, workers: usize) -> Self {
        self.extract_workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn seed_path(&self) -> PathBuf {
        self.data_dir.join(SEED_FILE)
    }

    pub fn hosts_path(&self) -> PathBuf {
        self.data_dir.join(HOSTS_FILE)
    }

    pub fn classified_path(&self) -> PathBuf {
        self.data_dir.join(CLASSIFIED_FILE)
    }

    pub fn host_store(&self) -> JsonHostStore {
        JsonHostStore::new(self.hosts_path(), self.seed_path())
    }

    pub fn dealer_store(&self) -> JsonDealerStore {
        JsonDealerStore::new(self.classified_path())
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_workers == 0 {
            return Err(DiscoveryError::Config(
                "fetch workers must be at least 1".to_string(),
            ));
        }
        if self.extract_workers == 0 {
            return Err(DiscoveryError::Config(
                "extract workers must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(DiscoveryError::Config(
                "timeout must be at least 1 second".to_string(),
            ));
        }
        Ok(())
    }
}
