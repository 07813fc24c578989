//! Dealer identity extraction from landing-page HTML.
//!
//! Dealer platform sites embed the dealership's identity in an inline script
//! that assigns `DDC.dataLayer['dealership']`. One field per line, JSON-quoted.

use crate::error::{Result, ScanError};
use crate::normalize::canonical_url;
use crate::result::{Address, DealerRecord};
use scraper::{Html, Selector};
use std::collections::HashMap;
use tracing::debug;

const DATA_LAYER_MARKER: &str = "DDC.dataLayer['dealership'] = {";

const FIELDS: [&str; 6] = [
    "address1",
    "address2",
    "city",
    "stateProvince",
    "postalCode",
    "dealershipName",
];

/// Turns a fetched page body into a dealer record.
pub trait Extract: Send + Sync + 'static {
    fn extract(&self, hostname: &str, body: &[u8]) -> Result<DealerRecord>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DataLayerExtractor;

impl DataLayerExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extract for DataLayerExtractor {
    fn extract(&self, hostname: &str, body: &[u8]) -> Result<DealerRecord> {
        let html = String::from_utf8_lossy(body);
        let script = find_data_layer_script(&html)
            .ok_or_else(|| extraction_failed(hostname, "no dealership data layer script"))?;

        let fields = parse_data_layer(&script);

        let name = fields
            .get("dealershipName")
            .filter(|name| !name.is_empty())
            .cloned()
            .ok_or_else(|| extraction_failed(hostname, "data layer has no dealershipName"))?;

        let field = |key: &str| fields.get(key).cloned().unwrap_or_default();

        Ok(DealerRecord::new(name, canonical_url(hostname)?).with_address(Address {
            street: field("address1"),
            street2: field("address2"),
            city: field("city"),
            state: field("stateProvince"),
            zipcode: field("postalCode"),
        }))
    }
}

fn extraction_failed(hostname: &str, reason: &str) -> ScanError {
    ScanError::ExtractionFailed {
        hostname: hostname.to_string(),
        reason: reason.to_string(),
    }
}

fn find_data_layer_script(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let script_selector = Selector::parse("script").ok()?;

    document
        .select(&script_selector)
        .map(|script| script.text().collect::<String>())
        .find(|text| text.contains(DATA_LAYER_MARKER))
}

/// Pull `"field": "value",` lines for the known fields out of the script body.
fn parse_data_layer(script: &str) -> HashMap<&'static str, String> {
    let mut extracted = HashMap::new();

    for line in script.lines().map(str::trim) {
        for field in FIELDS {
            let prefix = format!("\"{}\": ", field);
            let Some(raw) = line.strip_prefix(&prefix) else {
                continue;
            };

            let raw = raw.trim_end_matches(',');
            match serde_json::from_str::<String>(raw) {
                Ok(value) => {
                    extracted.insert(field, value);
                }
                Err(e) => debug!("Skipping unparseable {} value {}: {}", field, raw, e),
            }
        }
    }

    extracted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn landing_page(script_body: &str) -> String {
        format!(
            r#"<html><head>
                <script src="/static/app.js"></script>
                <script>window.analytics = {{}};</script>
                <script>
                {}
                </script>
            </head><body>Welcome</body></html>"#,
            script_body
        )
    }

    #[test]
    fn test_extract_full_record() {
        let page = landing_page(
            r#"DDC.dataLayer['dealership'] = {
                "address1": "100 Main St",
                "address2": "Suite 2",
                "city": "Anytown",
                "country": "US",
                "postalCode": "15001",
                "stateProvince": "PA",
                "dealershipName": "Anytown \"Best\" Subaru"
            };"#,
        );

        let record = DataLayerExtractor::new()
            .extract("anytownsubaru.com", page.as_bytes())
            .unwrap();

        assert_eq!(record.name, "Anytown \"Best\" Subaru");
        assert_eq!(record.site_url, "https://www.anytownsubaru.com");
        assert_eq!(record.address.street, "100 Main St");
        assert_eq!(record.address.street2, "Suite 2");
        assert_eq!(record.address.city, "Anytown");
        assert_eq!(record.address.state, "PA");
        assert_eq!(record.address.zipcode, "15001");
    }

    #[test]
    fn test_extract_missing_optional_fields() {
        let page = landing_page(
            r#"DDC.dataLayer['dealership'] = {
                "dealershipName": "Hometown Honda",
            };"#,
        );

        let record = DataLayerExtractor::new()
            .extract("www.hometownhonda.com", page.as_bytes())
            .unwrap();

        assert_eq!(record.name, "Hometown Honda");
        assert_eq!(record.site_url, "https://www.hometownhonda.com");
        assert_eq!(record.address, Address::default());
    }

    #[test]
    fn test_extract_without_data_layer_fails() {
        let page = landing_page("console.log('nothing here');");
        let err = DataLayerExtractor::new()
            .extract("hometownhonda.com", page.as_bytes())
            .unwrap_err();

        assert!(matches!(err, ScanError::ExtractionFailed { .. }));
    }

    #[test]
    fn test_extract_without_name_fails() {
        let page = landing_page(
            r#"DDC.dataLayer['dealership'] = {
                "city": "Anytown",
            };"#,
        );
        let result = DataLayerExtractor::new().extract("hometownhonda.com", page.as_bytes());

        assert!(matches!(result, Err(ScanError::ExtractionFailed { .. })));
    }

    #[test]
    fn test_parse_data_layer_skips_bad_values() {
        let fields = parse_data_layer("\"city\": not-quoted,\n\"postalCode\": \"15001\",");
        assert!(!fields.contains_key("city"));
        assert_eq!(fields.get("postalCode").map(String::as_str), Some("15001"));
    }
}
