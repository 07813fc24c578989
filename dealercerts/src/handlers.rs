use anyhow::{Context, anyhow};
use clap::ArgMatches;
use colored::Colorize;
use dealercerts_core::config::DiscoveryConfig;
use dealercerts_core::crawl::{CrawlOptions, CrawlProgressCallback, CrawlSummary, DiscoveryCrawl};
use dealercerts_core::report::{ReportFormat, generate_report};
use dealercerts_scanner::extract::DataLayerExtractor;
use dealercerts_scanner::fetcher::CertFetcher;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Build the run configuration from the parsed command line.
pub fn config_from_matches(args: &ArgMatches) -> anyhow::Result<DiscoveryConfig> {
    let data_dir = args
        .get_one::<String>("data-dir")
        .map(String::as_str)
        .unwrap_or(".");
    let data_dir = shellexpand::tilde(data_dir);

    let mut config = DiscoveryConfig::default().with_data_dir(data_dir.into_owned());
    if let Some(workers) = args.get_one::<usize>("fetch-workers") {
        config = config.with_fetch_workers(*workers);
    }
    if let Some(workers) = args.get_one::<usize>("extract-workers") {
        config = config.with_extract_workers(*workers);
    }
    if let Some(timeout) = args.get_one::<u64>("timeout") {
        config = config.with_timeout(*timeout);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

pub fn report_format(args: &ArgMatches) -> anyhow::Result<ReportFormat> {
    let format = args
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");
    ReportFormat::from_str(format).ok_or_else(|| anyhow!("Unknown report format: {}", format))
}

/// `RUST_LOG` wins; otherwise `info`, or `warn` when quiet.
pub fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Keep whichever subscriber was installed first.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn print_banner() {
    println!("{}", "═".repeat(60).bright_blue().bold());
    println!(
        "{} {}",
        "  DEALERCERTS".bright_white().bold(),
        env!("CARGO_PKG_VERSION").bright_black()
    );
    println!("{}", "═".repeat(60).bright_blue().bold());
    println!();
}

fn progress_spinner() -> anyhow::Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .context("Invalid spinner template")?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message("Loading host registry...");
    Ok(spinner)
}

pub fn render_summary(summary: &CrawlSummary, format: ReportFormat) -> anyhow::Result<String> {
    generate_report(summary, format).context("Failed to render run summary")
}

/// One full discovery run against the files in `--data-dir`.
pub async fn handle_discover(args: &ArgMatches) -> anyhow::Result<()> {
    let quiet = args.get_flag("quiet");
    let config = config_from_matches(args)?;
    let format = report_format(args)?;

    info!(
        "Data directory: {} ({} fetch workers, {} extract workers, {}s timeout)",
        config.data_dir().display(),
        config.fetch_workers,
        config.extract_workers,
        config.timeout_secs
    );

    let fetcher = CertFetcher::with_user_agent(config.timeout_secs, &config.user_agent)
        .context("Failed to build HTTP client")?;

    let mut crawl = DiscoveryCrawl::new(
        fetcher,
        DataLayerExtractor::new(),
        config.host_store(),
        config.dealer_store(),
    )
    .with_options(CrawlOptions::from(&config));

    let spinner = if quiet { None } else { Some(progress_spinner()?) };
    if let Some(ref spinner) = spinner {
        let bar = spinner.clone();
        let callback: CrawlProgressCallback = Arc::new(move |msg: String| bar.set_message(msg));
        crawl = crawl.with_progress_callback(callback);
    }

    let outcome = crawl.run().await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let summary = outcome.with_context(|| {
        format!(
            "Discovery run failed for data directory {}",
            config.data_dir().display()
        )
    })?;

    if !quiet && format == ReportFormat::Text {
        println!("\n{} Discovery complete!\n", "✓".green().bold());
    }
    print!("{}", render_summary(&summary, format)?);
    if format == ReportFormat::Json {
        println!();
    }

    if summary.fetch_failures > 0 && !quiet {
        println!(
            "{} {} host(s) could not be fetched and stay unvisited",
            "⚠".yellow().bold(),
            summary.fetch_failures
        );
    }

    Ok(())
}
