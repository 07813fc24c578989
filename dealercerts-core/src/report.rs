//! Run summaries for the terminal or for other tools.

use crate::crawl::CrawlSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

pub fn generate_report(summary: &CrawlSummary, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_crawl_report(summary)),
        ReportFormat::Json => generate_json_report(summary),
    }
}

/// Plain-text summary block printed at the end of a run.
pub fn generate_crawl_report(summary: &CrawlSummary) -> String {
    let mut report = String::new();
    report.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");
    report.push_str("# Hosts:\n");
    report.push_str(&format!("  Visited: {}\n", summary.hosts.visited));
    report.push_str(&format!("  Need visiting: {}\n", summary.hosts.unvisited));
    report.push_str(&format!("  Total: {}\n", summary.hosts.total));

    report.push_str("\n# This run:\n");
    report.push_str(&format!("  Fetched: {}\n", summary.fetched));
    report.push_str(&format!("  Fetch failures: {}\n", summary.fetch_failures));
    report.push_str(&format!("  Skipped (not an interested make): {}\n", summary.skipped));
    report.push_str(&format!("  Dealers extracted: {}\n", summary.extracted));
    report.push_str(&format!(
        "  Extraction failures: {}\n",
        summary.extraction_failures
    ));
    report.push_str(&format!("  New hosts: {}\n", summary.discovered.len()));
    for host in &summary.discovered {
        report.push_str(&format!("    + {}\n", host));
    }

    report.push_str("\n# Classified dealers:\n");
    for (make, count) in &summary.classified {
        report.push_str(&format!("  {:<14}{}\n", make.as_str(), count));
    }

    report.push_str("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    report
}

pub fn generate_json_report(summary: &CrawlSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}
