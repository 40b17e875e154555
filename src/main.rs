//! Price-Sweep main entry point
//!
//! This is the command-line interface for the Price-Sweep branch price crawler.

use anyhow::Context;
use clap::Parser;
use price_sweep::config::{load_config_with_hash, Config};
use price_sweep::jobs::JobStatus;
use price_sweep::output::render_text_table;
use price_sweep::PriceService;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Price-Sweep: branch price aggregation
///
/// Price-Sweep fetches the price of a product at every configured store
/// branch and prints a ranked price list.
#[derive(Parser, Debug)]
#[command(name = "price-sweep")]
#[command(version = "1.0.0")]
#[command(about = "Compares a product's price across store branches", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Product page URL to crawl
    #[arg(value_name = "URL", required_unless_present = "dry_run")]
    url: Option<String>,

    /// Address notified when a queued job completes
    #[arg(long, requires = "serve_queue")]
    email: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "serve_queue")]
    dry_run: bool,

    /// Run the URL as a queued job through the background worker
    #[arg(long)]
    serve_queue: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    let url = cli.url.context("A product URL is required")?;
    let service = PriceService::with_defaults(&config)?;

    if cli.serve_queue {
        handle_queued(&service, &url, cli.email.as_deref()).await
    } else {
        handle_interactive(&service, &url).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("price_sweep=info,warn"),
            1 => EnvFilter::new("price_sweep=debug,info"),
            2 => EnvFilter::new("price_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Price-Sweep Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max parallel requests: {}",
        config.crawler.max_parallel_requests
    );
    println!("  Retries: {}", config.crawler.retries);
    println!("  Retry base delay: {}ms", config.crawler.retry_base_delay_ms);
    println!("  Max errors allowed: {}", config.crawler.max_errors_allowed);
    println!("  Disable after errors: {} minutes", config.crawler.disable_minutes);

    println!("\nSession:");
    println!("  User agent: {}", config.session.user_agent);
    println!("  Block sub-resources: {}", config.session.block_subresources);
    println!("  Page load timeout: {}ms", config.session.page_load_timeout_ms);

    println!("\nSite:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Branch parameter: {}", config.site.branch_query_param);
    println!("  Price selector: {}", config.site.selectors.price);

    println!("\nCache TTL: {} minutes", config.cache.ttl_minutes);
    println!(
        "Queue: {}s cooldown, {} completed jobs kept",
        config.queue.cooldown_seconds, config.queue.completed_capacity
    );
    if let Some(path) = &config.queue.snapshot_path {
        println!("  Snapshot: {}", path.display());
    }
    println!("Admission window: {}s", config.admission.window_seconds);

    println!("\nBranches ({}):", config.branches.len());
    for (id, name) in &config.branches {
        println!("  - {} ({})", name, id);
    }

    println!("\n✓ Configuration is valid");
}

/// Crawls the URL through the cache and prints the ranked prices
async fn handle_interactive(service: &PriceService, url: &str) -> anyhow::Result<()> {
    let result = service
        .collect_prices(url)
        .await
        .with_context(|| format!("Could not collect prices for {}", url))?;

    print!("{}", render_text_table(&result));
    if let Some(cheapest) = result.cheapest() {
        println!(
            "\nCheapest: {} at {} ({})",
            cheapest.price_label(),
            cheapest.branch_name,
            cheapest.url
        );
    }
    Ok(())
}

/// Submits the URL as a job, runs the worker and waits for the job
async fn handle_queued(
    service: &PriceService,
    url: &str,
    email: Option<&str>,
) -> anyhow::Result<()> {
    let worker = service.start_worker();
    let submission = service.submit(url, email, "cli")?;
    tracing::info!(
        "Job {} submitted, estimated wait {}s",
        submission.job_id,
        service.estimated_wait(Some(submission.job_id)).as_secs()
    );

    // A job is briefly in neither place while the worker picks it up
    let mut missing = 0;
    let job = loop {
        match service.job(submission.job_id) {
            Some(JobStatus::Completed(job)) => break job,
            Some(JobStatus::Running) => {
                missing = 0;
                if let Some(progress) = service.status(url) {
                    tracing::info!("{}", progress);
                }
            }
            Some(JobStatus::Pending { position }) => {
                tracing::debug!("Job waiting at position {}", position);
            }
            None if missing < 3 => missing += 1,
            None => anyhow::bail!("Job {} was lost", submission.job_id),
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    };

    service.shutdown();
    worker.await.context("Job worker panicked")?;

    println!("{}", job.display_name());
    println!("Success: {}", job.success);
    if let Some(body) = &job.result_body {
        println!("{}", body);
    }
    Ok(())
}
