pub mod classify;
pub mod config;
pub mod crawl;
pub mod error;
pub mod pool;
pub mod registry;
pub mod report;

pub use classify::{Classification, DealerStore, JsonDealerStore, classify};
pub use config::DiscoveryConfig;
pub use crawl::{CrawlOptions, CrawlProgressCallback, CrawlSummary, DiscoveryCrawl};
pub use error::DiscoveryError;
pub use registry::{DealerHost, HostStats, HostStore, JsonHostStore};
