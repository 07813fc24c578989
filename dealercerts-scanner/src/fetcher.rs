use crate::error::{Result, ScanError};
use crate::manufacturer::is_interesting;
use crate::normalize::{canonical_url, normalize};
use crate::result::FetchedSite;
use reqwest::Client;
use reqwest::tls::TlsInfo;
use std::collections::BTreeSet;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use x509_parser::prelude::*;

/// Some dealer platforms refuse requests that don't look like a browser.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.55 Safari/537.36";

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Hosting networks whose certificates list thousands of unrelated customers.
pub const AGGREGATOR_MARKERS: [&str; 2] = ["dealer.com", "cloudflare.com"];

/// Anything that can turn a hostname into a fetched page plus discovered hosts.
pub trait Fetch: Send + Sync + 'static {
    fn fetch(&self, hostname: &str) -> impl Future<Output = Result<FetchedSite>> + Send;
}

pub struct CertFetcher {
    client: Client,
}

impl CertFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> Result<Self> {
        Self::with_user_agent(timeout_secs, BROWSER_USER_AGENT)
    }

    pub fn with_user_agent(timeout_secs: u64, user_agent: &str) -> Result<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .tls_info(true) // Needed to read the peer certificate off the response
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client })
    }

    /// Fetch an explicit URL on behalf of `hostname`.
    ///
    /// Only the leaf certificate is read for SANs; reqwest does not expose the
    /// rest of the presented chain.
    pub async fn fetch_url(&self, hostname: &str, url: &str) -> Result<FetchedSite> {
        debug!("Fetching {}", url);

        let start = Instant::now();
        let response = self.client.get(url).send().await?;
        let status_code = response.status().as_u16();

        let peer_certificate = response
            .extensions()
            .get::<TlsInfo>()
            .and_then(|info| info.peer_certificate())
            .map(|der| der.to_vec());

        let body = response.bytes().await?.to_vec();
        debug!(
            "Fetched {} ({}, {} bytes) in {:?}",
            url,
            status_code,
            body.len(),
            start.elapsed()
        );

        let discovered = match peer_certificate {
            Some(der) => match certificate_dns_names(&der) {
                Ok(names) => discovered_hosts(hostname, names),
                Err(e) => {
                    warn!("Could not read certificate for {}: {}", url, e);
                    BTreeSet::new()
                }
            },
            None => {
                debug!("No TLS info for {}", url);
                BTreeSet::new()
            }
        };

        Ok(FetchedSite {
            hostname: hostname.to_string(),
            url: url.to_string(),
            status_code,
            discovered,
            body,
        })
    }
}

impl Fetch for CertFetcher {
    async fn fetch(&self, hostname: &str) -> Result<FetchedSite> {
        let url = canonical_url(hostname)?;
        self.fetch_url(hostname, &url).await
    }
}

/// DNS names from the subject-alternative-name extension of a DER certificate.
pub fn certificate_dns_names(der: &[u8]) -> Result<Vec<String>> {
    let (_, cert) =
        parse_x509_certificate(der).map_err(|e| ScanError::Certificate(e.to_string()))?;

    let san = cert
        .subject_alternative_name()
        .map_err(|e| ScanError::Certificate(e.to_string()))?;

    let Some(san) = san else {
        return Ok(Vec::new());
    };

    Ok(san
        .value
        .general_names
        .iter()
        .filter_map(|name| match name {
            GeneralName::DNSName(dns) => Some(dns.to_string()),
            _ => None,
        })
        .collect())
}

/// Normalize raw SAN names and keep the ones worth registering for `hostname`.
pub fn discovered_hosts(hostname: &str, raw_names: Vec<String>) -> BTreeSet<String> {
    let queried = normalize(hostname).unwrap_or_else(|_| hostname.to_lowercase());

    let normalized = raw_names.into_iter().filter_map(|name| match normalize(&name) {
        Ok(n) => Some(n),
        Err(e) => {
            debug!("Ignoring SAN entry {}: {}", name, e);
            None
        }
    });

    filter_dns_names(&queried, normalized)
}

/// Drop the queried host itself, aggregator networks and non-manufacturer names.
pub fn filter_dns_names<I, S>(queried: &str, names: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().to_string())
        .filter(|name| !is_filtered(name, queried))
        .collect()
}

fn is_filtered(name: &str, queried: &str) -> bool {
    name == queried
        || AGGREGATOR_MARKERS.iter().any(|marker| name.contains(marker))
        || !is_interesting(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    #[test]
    fn test_filter_dns_names_drops_aggregators_and_uninteresting() {
        let names = ["cdn.cloudflare.com", "sub.honda.com", "dealer.com"];
        let found = filter_dns_names("honda.com", names);

        assert_eq!(found.len(), 1);
        assert!(found.contains("sub.honda.com"));
    }

    #[test]
    fn test_filter_dns_names_drops_queried_host() {
        let found = filter_dns_names("hondaofanytown.com", ["hondaofanytown.com"]);
        assert!(found.is_empty());
    }

    #[test]
    fn test_discovered_hosts_normalizes_before_filtering() {
        let names = vec![
            "www.hondaofanytown.com".to_string(),
            "shop.toyotaofanytown.com".to_string(),
            "*.toyotaofanytown.com".to_string(),
            "images.dealer.com".to_string(),
            "hyundaiplace.dealer.com".to_string(),
            "localhost".to_string(),
        ];

        let found = discovered_hosts("hondaofanytown.com", names);
        let found: Vec<&str> = found.iter().map(String::as_str).collect();

        assert_eq!(found, vec!["toyotaofanytown.com"]);
    }

    #[test]
    fn test_certificate_dns_names_rejects_garbage() {
        let err = certificate_dns_names(b"not a certificate").unwrap_err();
        assert!(matches!(err, ScanError::Certificate(_)));
    }

    /// Plain HTTP carries no certificate, so nothing is discovered.
    #[tokio::test]
    async fn test_fetch_without_tls_discovers_nothing() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_bytes(b"<html><body>Anytown Honda</body></html>"),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = CertFetcher::new().unwrap();
        let site = fetcher
            .fetch_url("hondaofanytown.com", &mock_server.uri())
            .await
            .unwrap();

        assert_eq!(site.status_code, 200);
        assert_eq!(site.hostname, "hondaofanytown.com");
        assert!(site.discovered.is_empty());
        assert_eq!(site.body, b"<html><body>Anytown Honda</body></html>");

        let requests = mock_server.received_requests().await.unwrap();
        let user_agent = requests[0]
            .headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok());
        assert_eq!(user_agent, Some(BROWSER_USER_AGENT));
    }

    #[tokio::test]
    async fn test_fetch_error_status_still_returns_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(503).set_body_bytes(b"busy"))
            .mount(&mock_server)
            .await;

        let fetcher = CertFetcher::new().unwrap();
        let site = fetcher
            .fetch_url("subaruofanytown.com", &mock_server.uri())
            .await
            .unwrap();

        assert_eq!(site.status_code, 503);
        assert_eq!(site.body, b"busy");
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&mock_server)
            .await;

        let fetcher = CertFetcher::with_timeout(1).unwrap();
        let result = fetcher
            .fetch_url("nissanofanytown.com", &mock_server.uri())
            .await;

        assert!(matches!(result, Err(ScanError::HttpError(_))));
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_hostname() {
        let fetcher = CertFetcher::new().unwrap();
        let result = fetcher.fetch("localhost").await;
        assert!(matches!(result, Err(ScanError::InvalidHostname(_))));
    }
}
