use dealercerts_core::crawl::CrawlSummary;
use dealercerts_core::registry::HostStats;
use dealercerts_core::report::*;
use dealercerts_scanner::manufacturer::Manufacturer;

fn create_test_summary() -> CrawlSummary {
    let mut summary = CrawlSummary {
        hosts: HostStats {
            visited: 3,
            unvisited: 2,
            total: 5,
        },
        fetched: 3,
        fetch_failures: 1,
        skipped: 1,
        discovered: vec!["subaruofanytown.com".to_string()],
        extracted: 2,
        extraction_failures: 1,
        ..CrawlSummary::default()
    };
    for make in Manufacturer::ALL {
        summary.classified.insert(make, 0);
    }
    summary.classified.insert(Manufacturer::Honda, 2);
    summary
}

#[test]
fn test_report_format_from_str() {
    assert_eq!(ReportFormat::from_str("text"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("TXT"), Some(ReportFormat::Text));
    assert_eq!(ReportFormat::from_str("json"), Some(ReportFormat::Json));
    assert_eq!(ReportFormat::from_str("csv"), None);
}

#[test]
fn test_generate_crawl_report() {
    let report = generate_crawl_report(&create_test_summary());

    assert!(report.contains("# Hosts:"));
    assert!(report.contains("Visited: 3"));
    assert!(report.contains("Need visiting: 2"));
    assert!(report.contains("Total: 5"));
    assert!(report.contains("Fetch failures: 1"));
    assert!(report.contains("New hosts: 1"));
    assert!(report.contains("+ subaruofanytown.com"));
    assert!(report.contains("# Classified dealers:"));
    assert!(report.contains("honda"));
    assert!(report.contains("unclassified"));
}

#[test]
fn test_generate_json_report() {
    let json = generate_json_report(&create_test_summary()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["hosts"]["total"], 5);
    assert_eq!(value["fetched"], 3);
    assert_eq!(value["discovered"][0], "subaruofanytown.com");
    assert_eq!(value["classified"]["honda"], 2);
    assert_eq!(value["classified"]["volkswagen"], 0);
}

#[test]
fn test_generate_report_dispatches_on_format() {
    let summary = create_test_summary();

    let text = generate_report(&summary, ReportFormat::Text).unwrap();
    assert!(text.starts_with('━'));

    let json = generate_report(&summary, ReportFormat::Json).unwrap();
    assert!(json.starts_with('{'));
}
