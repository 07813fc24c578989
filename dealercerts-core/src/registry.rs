//! Persisted registry of dealer hosts.
//!
//! The registry is loaded once per run and written once when every result has
//! been aggregated. On the very first run there is no `hosts.json` yet, so the
//! registry is bootstrapped from the newline-delimited seed list.

use crate::error::{DiscoveryError, Result};
use dealercerts_scanner::normalize::normalize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealerHost {
    pub hostname: String,
    pub visited: bool,
}

impl DealerHost {
    pub fn new(hostname: impl Into<String>, visited: bool) -> Self {
        Self {
            hostname: hostname.into(),
            visited,
        }
    }

    pub fn unvisited(hostname: impl Into<String>) -> Self {
        Self::new(hostname, false)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HostStats {
    pub visited: usize,
    pub unvisited: usize,
    pub total: usize,
}

impl fmt::Display for HostStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} visited, {} need visiting, {} total",
            self.visited, self.unvisited, self.total
        )
    }
}

pub fn host_stats(hosts: &[DealerHost]) -> HostStats {
    let visited = hosts.iter().filter(|h| h.visited).count();
    HostStats {
        visited,
        unvisited: hosts.len() - visited,
        total: hosts.len(),
    }
}

/// Sort by hostname and collapse duplicates. A visited entry beats an unvisited one.
pub fn sort_hosts(mut hosts: Vec<DealerHost>) -> Vec<DealerHost> {
    hosts.sort_by(|a, b| {
        a.hostname
            .cmp(&b.hostname)
            .then_with(|| b.visited.cmp(&a.visited))
    });
    hosts.dedup_by(|later, earlier| later.hostname == earlier.hostname);
    hosts
}

pub fn known_hostnames(hosts: &[DealerHost]) -> HashSet<String> {
    hosts.iter().map(|h| h.hostname.clone()).collect()
}

/// Turn the seed list into unvisited hosts. Lines that aren't hostnames are skipped.
pub fn parse_seed_list(content: &str) -> Vec<DealerHost> {
    let hosts = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match normalize(line) {
            Ok(hostname) => Some(DealerHost::unvisited(hostname)),
            Err(e) => {
                warn!("Skipping seed entry '{}': {}", line, e);
                None
            }
        })
        .collect();

    sort_hosts(hosts)
}

/// Where the host registry lives between runs.
pub trait HostStore: Send + Sync + 'static {
    fn load(&self) -> Result<Vec<DealerHost>>;
    fn save(&self, hosts: &[DealerHost]) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct JsonHostStore {
    registry_path: PathBuf,
    seed_path: PathBuf,
}

impl JsonHostStore {
    pub fn new(registry_path: impl Into<PathBuf>, seed_path: impl Into<PathBuf>) -> Self {
        Self {
            registry_path: registry_path.into(),
            seed_path: seed_path.into(),
        }
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    pub fn seed_path(&self) -> &Path {
        &self.seed_path
    }

    fn load_registry(&self) -> Result<Vec<DealerHost>> {
        let bytes = fs::read(&self.registry_path)
            .map_err(|e| DiscoveryError::io(&self.registry_path, e))?;
        let hosts: Vec<DealerHost> = serde_json::from_slice(&bytes)
            .map_err(|e| DiscoveryError::json(&self.registry_path, e))?;

        debug!(
            "Loaded {} hosts from {}",
            hosts.len(),
            self.registry_path.display()
        );
        Ok(sort_hosts(hosts))
    }

    fn load_seed(&self) -> Result<Vec<DealerHost>> {
        let content = fs::read_to_string(&self.seed_path)
            .map_err(|e| DiscoveryError::io(&self.seed_path, e))?;
        let hosts = parse_seed_list(&content);

        info!(
            "No registry at {}, bootstrapped {} hosts from {}",
            self.registry_path.display(),
            hosts.len(),
            self.seed_path.display()
        );
        Ok(hosts)
    }
}

impl HostStore for JsonHostStore {
    fn load(&self) -> Result<Vec<DealerHost>> {
        if self.registry_path.exists() {
            self.load_registry()
        } else {
            self.load_seed()
        }
    }

    fn save(&self, hosts: &[DealerHost]) -> Result<()> {
        let hosts = sort_hosts(hosts.to_vec());
        info!("Saving host registry: {}", host_stats(&hosts));

        let json = serde_json::to_vec_pretty(&hosts)
            .map_err(|e| DiscoveryError::json(&self.registry_path, e))?;
        fs::write(&self.registry_path, json)
            .map_err(|e| DiscoveryError::io(&self.registry_path, e))
    }
}
