use serde::{Deserialize, Serialize};

/// Postal address scraped from a dealer landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    pub street: String,
    pub street2: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
}

/// A dealership identity. Two records with the same `site_url` are the same dealer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DealerRecord {
    pub name: String,
    pub site_url: String,
    pub address: Address,
}

impl DealerRecord {
    pub fn new(name: impl Into<String>, site_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            site_url: site_url.into(),
            address: Address::default(),
        }
    }

    pub fn with_address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }
}

/// What a single certificate-backed fetch produced.
#[derive(Debug, Clone, Default)]
pub struct FetchedSite {
    pub hostname: String,
    pub url: String,
    pub status_code: u16,
    /// Normalized SAN names that survived filtering.
    pub discovered: std::collections::BTreeSet<String>,
    pub body: Vec<u8>,
}
