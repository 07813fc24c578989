pub mod error;
pub mod extract;
pub mod fetcher;
pub mod manufacturer;
pub mod normalize;
pub mod result;

pub use error::ScanError;
pub use extract::{DataLayerExtractor, Extract};
pub use fetcher::{CertFetcher, Fetch};
pub use manufacturer::Manufacturer;
pub use result::{Address, DealerRecord, FetchedSite};
