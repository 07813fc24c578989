//! Discovery crawl orchestration.
//!
//! A run fans unvisited hosts out to a small fetch pool. Each successful fetch
//! hands its page body to a larger extraction pool and its certificate SANs to
//! the discovery stream. Three aggregator tasks own the results:
//!
//! - discovery: the only writer of the newly-found host set; forwards new hosts
//!   to the visited stream as unvisited entries
//! - visited: collects the registry and saves it once the stream closes
//! - dealers: collects extracted records on top of the prior classification and
//!   saves the reclassified result once the stream closes
//!
//! Hosts found this run are not fetched until the next run.

use crate::classify::{Classification, DealerStore, bucket_counts, classify};
use crate::config::{DEFAULT_EXTRACT_WORKERS, DEFAULT_FETCH_WORKERS, DiscoveryConfig};
use crate::error::{DiscoveryError, Result};
use crate::pool::WorkerPool;
use crate::registry::{DealerHost, HostStats, HostStore, host_stats, known_hostnames, sort_hosts};
use dealercerts_scanner::extract::Extract;
use dealercerts_scanner::fetcher::Fetch;
use dealercerts_scanner::manufacturer::{Manufacturer, is_interesting};
use dealercerts_scanner::normalize::normalize;
use dealercerts_scanner::result::DealerRecord;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Smallest buffer tokio allows; a busy aggregator holds producers back.
const STREAM_CAPACITY: usize = 1;

/// Callback for reporting crawl progress
pub type CrawlProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Options for configuring a crawl operation
#[derive(Clone)]
pub struct CrawlOptions {
    pub fetch_workers: usize,
    pub extract_workers: usize,
    pub progress_callback: Option<CrawlProgressCallback>,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            fetch_workers: DEFAULT_FETCH_WORKERS,
            extract_workers: DEFAULT_EXTRACT_WORKERS,
            progress_callback: None,
        }
    }
}

impl From<&DiscoveryConfig> for CrawlOptions {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            fetch_workers: config.fetch_workers,
            extract_workers: config.extract_workers,
            progress_callback: None,
        }
    }
}

/// What happened during a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlSummary {
    /// Registry as saved at the end of the run.
    pub hosts: HostStats,
    pub fetched: usize,
    pub fetch_failures: usize,
    /// Unvisited hosts left alone because no manufacturer matched.
    pub skipped: usize,
    pub discovered: Vec<String>,
    pub extracted: usize,
    pub extraction_failures: usize,
    pub classified: BTreeMap<Manufacturer, usize>,
}

#[derive(Default)]
struct CrawlCounters {
    submitted: AtomicUsize,
    completed: AtomicUsize,
    fetched: AtomicUsize,
    fetch_failures: AtomicUsize,
    skipped: AtomicUsize,
    extracted: AtomicUsize,
    extraction_failures: AtomicUsize,
}

impl CrawlCounters {
    fn bump(counter: &AtomicUsize) -> usize {
        counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::Relaxed)
    }
}

/// Everything a fetch job needs, shared across all of them.
struct FetchContext<F, E> {
    fetcher: Arc<F>,
    extractor: Arc<E>,
    extract_pool: Arc<WorkerPool>,
    visited_tx: mpsc::Sender<DealerHost>,
    discovery_tx: mpsc::Sender<BTreeSet<String>>,
    record_tx: mpsc::Sender<DealerRecord>,
    counters: Arc<CrawlCounters>,
    progress_callback: Option<CrawlProgressCallback>,
}

impl<F, E> Clone for FetchContext<F, E> {
    fn clone(&self) -> Self {
        Self {
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            extract_pool: self.extract_pool.clone(),
            visited_tx: self.visited_tx.clone(),
            discovery_tx: self.discovery_tx.clone(),
            record_tx: self.record_tx.clone(),
            counters: self.counters.clone(),
            progress_callback: self.progress_callback.clone(),
        }
    }
}

pub struct DiscoveryCrawl<F, E, H, D> {
    fetcher: Arc<F>,
    extractor: Arc<E>,
    host_store: Arc<H>,
    dealer_store: Arc<D>,
    options: CrawlOptions,
}

impl<F, E, H, D> DiscoveryCrawl<F, E, H, D>
where
    F: Fetch,
    E: Extract,
    H: HostStore,
    D: DealerStore,
{
    pub fn new(fetcher: F, extractor: E, host_store: H, dealer_store: D) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            host_store: Arc::new(host_store),
            dealer_store: Arc::new(dealer_store),
            options: CrawlOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CrawlOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_progress_callback(mut self, callback: CrawlProgressCallback) -> Self {
        self.options.progress_callback = Some(callback);
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn host_store(&self) -> &H {
        &self.host_store
    }

    pub fn dealer_store(&self) -> &D {
        &self.dealer_store
    }

    /// Run one discovery pass: fetch every unvisited host of interest, then
    /// persist the registry and the classification.
    pub async fn run(&self) -> Result<CrawlSummary> {
        let fetch_pool = WorkerPool::new("fetch", self.options.fetch_workers)?;
        let extract_pool = Arc::new(WorkerPool::new("extract", self.options.extract_workers)?);

        let hosts = self.host_store.load()?;
        let previous_dealers = self.dealer_store.load()?;
        info!("Loaded host registry: {}", host_stats(&hosts));
        info!("Loaded {} previously classified dealers", previous_dealers.len());

        let known = known_hostnames(&hosts);
        let counters = Arc::new(CrawlCounters::default());

        let (visited_tx, visited_rx) = mpsc::channel(STREAM_CAPACITY);
        let (discovery_tx, discovery_rx) = mpsc::channel(STREAM_CAPACITY);
        let (record_tx, record_rx) = mpsc::channel(STREAM_CAPACITY);

        let discovery_handle =
            tokio::spawn(aggregate_discoveries(discovery_rx, known, visited_tx.clone()));
        let visited_handle = tokio::spawn(aggregate_visited(visited_rx, self.host_store.clone()));
        let dealer_handle = tokio::spawn(aggregate_dealers(
            record_rx,
            previous_dealers,
            self.dealer_store.clone(),
        ));

        let context = FetchContext {
            fetcher: self.fetcher.clone(),
            extractor: self.extractor.clone(),
            extract_pool: extract_pool.clone(),
            visited_tx,
            discovery_tx,
            record_tx,
            counters: counters.clone(),
            progress_callback: self.options.progress_callback.clone(),
        };

        let drained = dispatch_and_drain(hosts, &fetch_pool, &extract_pool, &context).await;
        if let Err(e) = drained {
            // Abort before the senders drop so no aggregator persists a partial run.
            discovery_handle.abort();
            visited_handle.abort();
            dealer_handle.abort();
            return Err(e);
        }

        // Both pools are idle, so the only live senders are ours and the one
        // held by the discovery aggregator.
        drop(context);

        // Every aggregator finishes before the first failure is reported.
        let discovered = join_aggregator(discovery_handle).await;
        let saved_hosts = join_aggregator(visited_handle).await;
        let classification = join_aggregator(dealer_handle).await;
        let discovered = discovered?;
        let saved_hosts = saved_hosts?;
        let classification = classification?;

        let summary = CrawlSummary {
            hosts: host_stats(&saved_hosts),
            fetched: CrawlCounters::get(&counters.fetched),
            fetch_failures: CrawlCounters::get(&counters.fetch_failures),
            skipped: CrawlCounters::get(&counters.skipped),
            discovered,
            extracted: CrawlCounters::get(&counters.extracted),
            extraction_failures: CrawlCounters::get(&counters.extraction_failures),
            classified: bucket_counts(&classification),
        };

        info!(
            "Crawl complete: {} fetched, {} failed, {} new hosts, {} dealers extracted",
            summary.fetched,
            summary.fetch_failures,
            summary.discovered.len(),
            summary.extracted
        );
        Ok(summary)
    }
}

/// Feed the fetch pool, then wait for the fetch pool and the extraction pool to
/// drain, in that order.
async fn dispatch_and_drain<F: Fetch, E: Extract>(
    hosts: Vec<DealerHost>,
    fetch_pool: &WorkerPool,
    extract_pool: &WorkerPool,
    context: &FetchContext<F, E>,
) -> Result<()> {
    for host in hosts {
        if host.visited {
            send(&context.visited_tx, host, "visited").await?;
            continue;
        }

        if !is_interesting(&host.hostname) {
            debug!("Skipping {}: not an interested make", host.hostname);
            CrawlCounters::bump(&context.counters.skipped);
            send(&context.visited_tx, host, "visited").await?;
            continue;
        }

        CrawlCounters::bump(&context.counters.submitted);
        fetch_pool.submit(fetch_host(host, context.clone())).await;
    }

    info!(
        "Submitted {} hosts to {} {} workers",
        CrawlCounters::get(&context.counters.submitted),
        fetch_pool.size(),
        fetch_pool.name()
    );

    fetch_pool.stop_wait().await?;
    extract_pool.stop_wait().await
}

async fn fetch_host<F: Fetch, E: Extract>(mut host: DealerHost, context: FetchContext<F, E>) {
    let counters = &context.counters;

    // A panicking fetch only fails its own host.
    let fetcher = context.fetcher.clone();
    let target = host.hostname.clone();
    let fetched = match tokio::spawn(async move { fetcher.fetch(&target).await }).await {
        Ok(fetched) => fetched.map_err(|e| e.to_string()),
        Err(e) => Err(format!("fetch task did not finish: {}", e)),
    };

    match fetched {
        Err(reason) => {
            warn!("Skipping: {} Error: {}", host.hostname, reason);
            CrawlCounters::bump(&counters.fetch_failures);
            host.visited = false;
            log_send_failure(context.visited_tx.send(host).await.is_err(), "visited");
        }
        Ok(site) => {
            CrawlCounters::bump(&counters.fetched);
            let hostname = host.hostname.clone();
            host.visited = true;

            log_send_failure(context.visited_tx.send(host).await.is_err(), "visited");
            log_send_failure(
                context.discovery_tx.send(site.discovered).await.is_err(),
                "discovery",
            );

            context
                .extract_pool
                .submit(extract_dealer(
                    hostname,
                    site.body,
                    context.extractor.clone(),
                    context.record_tx.clone(),
                    counters.clone(),
                ))
                .await;
        }
    }

    let completed = CrawlCounters::bump(&counters.completed);
    if let Some(ref callback) = context.progress_callback {
        callback(format!(
            "Fetched {}/{} hosts",
            completed,
            CrawlCounters::get(&counters.submitted)
        ));
    }
}

async fn extract_dealer<E: Extract>(
    hostname: String,
    body: Vec<u8>,
    extractor: Arc<E>,
    record_tx: mpsc::Sender<DealerRecord>,
    counters: Arc<CrawlCounters>,
) {
    let start = Instant::now();
    let host = hostname.clone();

    // Parsing is CPU-bound; keep it off the async workers.
    let extracted = tokio::task::spawn_blocking(move || extractor.extract(&host, &body)).await;
    debug!("Content extraction for {} took: {:?}", hostname, start.elapsed());

    match extracted {
        Ok(Ok(record)) => {
            CrawlCounters::bump(&counters.extracted);
            log_send_failure(record_tx.send(record).await.is_err(), "dealer");
        }
        Ok(Err(e)) => {
            warn!("Skipping extraction for: {} ({})", hostname, e);
            CrawlCounters::bump(&counters.extraction_failures);
        }
        Err(e) => {
            error!("Extraction for {} did not finish: {}", hostname, e);
            CrawlCounters::bump(&counters.extraction_failures);
        }
    }
}

/// Single writer of the newly-discovered set.
async fn aggregate_discoveries(
    mut discovery_rx: mpsc::Receiver<BTreeSet<String>>,
    known: HashSet<String>,
    visited_tx: mpsc::Sender<DealerHost>,
) -> Result<Vec<String>> {
    let mut found = BTreeSet::new();

    while let Some(candidates) = discovery_rx.recv().await {
        for candidate in candidates {
            let hostname = match normalize(&candidate) {
                Ok(hostname) => hostname,
                Err(e) => {
                    debug!("Ignoring discovered name {}: {}", candidate, e);
                    continue;
                }
            };

            if known.contains(&hostname) || found.contains(&hostname) {
                continue;
            }

            if !is_interesting(&hostname) {
                debug!("Skipping new host: {} Not interested make.", hostname);
                continue;
            }

            info!("Found new host: {}", hostname);
            found.insert(hostname.clone());
            send(&visited_tx, DealerHost::unvisited(hostname), "visited").await?;
        }
    }

    // Returning drops visited_tx, which lets the visited stream close.
    Ok(found.into_iter().collect())
}

async fn aggregate_visited<H: HostStore>(
    mut visited_rx: mpsc::Receiver<DealerHost>,
    store: Arc<H>,
) -> Result<Vec<DealerHost>> {
    let mut hosts = Vec::new();
    while let Some(host) = visited_rx.recv().await {
        hosts.push(host);
    }

    let hosts = sort_hosts(hosts);
    store.save(&hosts)?;
    Ok(hosts)
}

async fn aggregate_dealers<D: DealerStore>(
    mut record_rx: mpsc::Receiver<DealerRecord>,
    mut dealers: Vec<DealerRecord>,
    store: Arc<D>,
) -> Result<Classification> {
    while let Some(record) = record_rx.recv().await {
        debug!("Recording dealer {} ({})", record.name, record.site_url);
        dealers.push(record);
    }

    let classification = classify(dealers);
    store.save(&classification)?;
    Ok(classification)
}

async fn join_aggregator<T>(handle: JoinHandle<Result<T>>) -> Result<T> {
    handle.await?
}

async fn send<T>(tx: &mpsc::Sender<T>, value: T, stream: &'static str) -> Result<()> {
    tx.send(value)
        .await
        .map_err(|_| DiscoveryError::StreamClosed(stream))
}

fn log_send_failure(failed: bool, stream: &'static str) {
    if failed {
        error!("The {} stream closed while the crawl was running", stream);
    }
}
