//! Hostname canonicalization.
//!
//! Every hostname the crawler stores or compares is reduced to its last two
//! DNS labels, so `shop.foo.example.com` and `https://WWW.Example.com/` both
//! become `example.com`.

use crate::error::{Result, ScanError};
use url::Url;

/// Reduce a hostname or URL to its registrable `label.tld` form.
pub fn normalize(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let without_scheme = match trimmed.find("://") {
        Some(idx) => &trimmed[idx + 3..],
        None => trimmed,
    };

    // Drop any path, query or port that came along with a URL.
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host = host.split(':').next().unwrap_or_default();
    let host = host.trim_end_matches('.').to_lowercase();

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return Err(ScanError::InvalidHostname(raw.to_string()));
    }

    let top = &labels[labels.len() - 2..];
    if top.iter().any(|label| label.is_empty() || *label == "*") {
        return Err(ScanError::InvalidHostname(raw.to_string()));
    }

    Ok(top.join("."))
}

/// Build the `https://www.<domain>` address used for outbound requests.
pub fn canonical_url(hostname: &str) -> Result<String> {
    let domain = normalize(hostname)?;
    let url = Url::parse(&format!("https://www.{}", domain))
        .map_err(|e| ScanError::InvalidHostname(format!("{}: {}", hostname, e)))?;

    // Url always renders an empty path as "/"; the registry stores the bare origin.
    Ok(url.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_scheme_case_and_subdomains() {
        assert_eq!(
            normalize("https://WWW.Foo.Example.COM").unwrap(),
            "example.com"
        );
    }

    #[test]
    fn test_normalize_keeps_two_label_hosts() {
        assert_eq!(normalize("hondaofanytown.com").unwrap(), "hondaofanytown.com");
    }

    #[test]
    fn test_normalize_drops_path_and_port() {
        assert_eq!(
            normalize("http://www.subaruofsomewhere.com:8443/new-inventory?x=1").unwrap(),
            "subaruofsomewhere.com"
        );
    }

    #[test]
    fn test_normalize_wildcard_san() {
        assert_eq!(normalize("*.toyotaplace.com").unwrap(), "toyotaplace.com");
    }

    #[test]
    fn test_normalize_rejects_single_label() {
        let err = normalize("localhost").unwrap_err();
        assert!(matches!(err, ScanError::InvalidHostname(_)));
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(normalize("").is_err());
        assert!(normalize("https://").is_err());
    }

    #[test]
    fn test_canonical_url() {
        assert_eq!(canonical_url("example.com").unwrap(), "https://www.example.com");
    }

    #[test]
    fn test_canonical_url_normalizes_first() {
        assert_eq!(
            canonical_url("https://shop.Example.com").unwrap(),
            "https://www.example.com"
        );
    }
}
