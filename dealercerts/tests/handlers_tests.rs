use dealercerts::commands::command_argument_builder;
use dealercerts::handlers::*;
use dealercerts_core::report::ReportFormat;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn matches(args: &[&str]) -> clap::ArgMatches {
    let mut argv = vec!["dealercerts"];
    argv.extend_from_slice(args);
    command_argument_builder()
        .try_get_matches_from(argv)
        .expect("arguments should parse")
}

#[test]
fn test_config_defaults() {
    let config = config_from_matches(&matches(&[])).unwrap();

    assert_eq!(config.data_dir, PathBuf::from("."));
    assert_eq!(config.fetch_workers, 3);
    assert_eq!(config.extract_workers, 10);
    assert_eq!(config.timeout_secs, 10);
}

#[test]
fn test_config_from_flags() {
    let config = config_from_matches(&matches(&[
        "--data-dir",
        "/tmp/dealers",
        "--fetch-workers",
        "5",
        "--extract-workers",
        "20",
        "--timeout",
        "30",
    ]))
    .unwrap();

    assert_eq!(config.data_dir, PathBuf::from("/tmp/dealers"));
    assert_eq!(config.hosts_path(), PathBuf::from("/tmp/dealers/hosts.json"));
    assert_eq!(config.fetch_workers, 5);
    assert_eq!(config.extract_workers, 20);
    assert_eq!(config.timeout_secs, 30);
}

#[test]
fn test_config_rejects_zero_workers() {
    let result = config_from_matches(&matches(&["--fetch-workers", "0"]));
    assert!(result.is_err());

    let result = config_from_matches(&matches(&["--extract-workers", "0"]));
    assert!(result.is_err());
}

#[test]
fn test_invalid_worker_count_does_not_parse() {
    let result = command_argument_builder().try_get_matches_from(["dealercerts", "--fetch-workers", "many"]);
    assert!(result.is_err());
}

#[test]
fn test_report_format() {
    assert_eq!(report_format(&matches(&[])).unwrap(), ReportFormat::Text);
    assert_eq!(
        report_format(&matches(&["--format", "json"])).unwrap(),
        ReportFormat::Json
    );
    assert!(
        command_argument_builder()
            .try_get_matches_from(["dealercerts", "--format", "csv"])
            .is_err()
    );
}

// Seeds with no interested make never touch the network, so a whole run can
// be exercised against a temp directory.
#[tokio::test]
async fn test_handle_discover_bootstraps_from_seed() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("dealerurls.txt"),
        "fordofanytown.com\nhttps://www.chevyofanytown.com/\n\n",
    )
    .unwrap();

    let data_dir = dir.path().to_str().unwrap();
    handle_discover(&matches(&["-q", "--data-dir", data_dir]))
        .await
        .unwrap();

    let hosts: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("hosts.json")).unwrap()).unwrap();
    assert_eq!(
        hosts,
        serde_json::json!([
            {"hostname": "chevyofanytown.com", "visited": false},
            {"hostname": "fordofanytown.com", "visited": false}
        ])
    );

    let classified: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(dir.path().join("classified-dealers.json")).unwrap(),
    )
    .unwrap();
    for make in ["acura", "honda", "hyundai", "lexus", "nissan", "subaru", "toyota", "volkswagen", "unclassified"] {
        assert_eq!(classified[make], serde_json::json!([]), "bucket {}", make);
    }
}

#[tokio::test]
async fn test_handle_discover_without_seed_fails() {
    let dir = TempDir::new().unwrap();
    let data_dir = dir.path().to_str().unwrap();

    let result = handle_discover(&matches(&["-q", "--data-dir", data_dir])).await;

    assert!(result.is_err());
    assert!(!dir.path().join("hosts.json").exists());
    assert!(!dir.path().join("classified-dealers.json").exists());
}
