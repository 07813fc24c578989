//! Manufacturer classification of extracted dealer records.

use crate::error::{DiscoveryError, Result};
use dealercerts_scanner::manufacturer::{Manufacturer, matching_patterns};
use dealercerts_scanner::result::DealerRecord;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Dealer records bucketed by manufacturer. Every manufacturer has an entry.
pub type Classification = BTreeMap<Manufacturer, Vec<DealerRecord>>;

pub fn sort_dealers(mut dealers: Vec<DealerRecord>) -> Vec<DealerRecord> {
    dealers.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.site_url.cmp(&b.site_url)));
    dealers
}

/// Keep the first record seen for each site URL, preserving order.
pub fn dedup_dealers(dealers: Vec<DealerRecord>) -> Vec<DealerRecord> {
    let mut seen = HashSet::new();
    dealers
        .into_iter()
        .filter(|d| seen.insert(d.site_url.clone()))
        .collect()
}

/// Union of two record lists by site URL; the first occurrence wins.
pub fn merge_dealers(first: Vec<DealerRecord>, second: Vec<DealerRecord>) -> Vec<DealerRecord> {
    let merged = dedup_dealers(first.into_iter().chain(second).collect());
    sort_dealers(merged)
}

pub fn classify(records: Vec<DealerRecord>) -> Classification {
    let mut out: Classification = Manufacturer::ALL
        .iter()
        .map(|make| (*make, Vec::new()))
        .collect();
    let mut legacy_vw = Vec::new();

    for record in dedup_dealers(records) {
        let patterns = matching_patterns(&record.site_url);

        if patterns.is_empty() {
            debug!("No manufacturer matches {}", record.site_url);
            out.entry(Manufacturer::Unclassified)
                .or_default()
                .push(record);
            continue;
        }

        for pattern in patterns {
            if pattern.alias {
                legacy_vw.push(record.clone());
            } else {
                out.entry(pattern.make).or_default().push(record.clone());
            }
        }
    }

    let volkswagen = out.remove(&Manufacturer::Volkswagen).unwrap_or_default();
    out.insert(Manufacturer::Volkswagen, merge_dealers(volkswagen, legacy_vw));

    out.into_iter()
        .map(|(make, dealers)| (make, sort_dealers(dealers)))
        .collect()
}

/// Every record across all buckets, once per site URL, sorted by name.
pub fn flatten(classification: &Classification) -> Vec<DealerRecord> {
    let all = classification.values().flatten().cloned().collect();
    sort_dealers(dedup_dealers(all))
}

pub fn bucket_counts(classification: &Classification) -> BTreeMap<Manufacturer, usize> {
    classification
        .iter()
        .map(|(make, dealers)| (*make, dealers.len()))
        .collect()
}

/// Where classified dealers live between runs.
pub trait DealerStore: Send + Sync + 'static {
    /// Previously classified records, flattened.
    fn load(&self) -> Result<Vec<DealerRecord>>;
    fn save(&self, classification: &Classification) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct JsonDealerStore {
    path: PathBuf,
}

impl JsonDealerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DealerStore for JsonDealerStore {
    fn load(&self) -> Result<Vec<DealerRecord>> {
        if !self.path.exists() {
            debug!("No classified dealers at {}", self.path.display());
            return Ok(Vec::new());
        }

        let bytes = fs::read(&self.path).map_err(|e| DiscoveryError::io(&self.path, e))?;

        // Keyed by plain strings so files with retired buckets (e.g. "vw") still load.
        let buckets: BTreeMap<String, Vec<DealerRecord>> =
            serde_json::from_slice(&bytes).map_err(|e| DiscoveryError::json(&self.path, e))?;

        let all = buckets.into_values().flatten().collect();
        let dealers = sort_dealers(dedup_dealers(all));
        debug!(
            "Loaded {} classified dealers from {}",
            dealers.len(),
            self.path.display()
        );
        Ok(dealers)
    }

    fn save(&self, classification: &Classification) -> Result<()> {
        let total: usize = classification.values().map(Vec::len).sum();
        info!(
            "Saving {} classified dealers to {}",
            total,
            self.path.display()
        );

        let json = serde_json::to_vec_pretty(classification)
            .map_err(|e| DiscoveryError::json(&self.path, e))?;
        fs::write(&self.path, json).map_err(|e| DiscoveryError::io(&self.path, e))
    }
}
