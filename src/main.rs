//! # wind_intel
//!
//! A wind-power news intelligence pipeline. It scans a news listing page
//! for article links, sends each article page through an LLM to extract
//! structured fields, and writes a category-grouped report.
//!
//! ## Usage
//!
//! ```sh
//! OPENAI_API_KEY=sk-... wind_intel --start-url https://fd.bjx.com.cn/
//! ```
//!
//! ## Architecture
//!
//! 1. **Listing**: fetch the start page and score every hyperlink as a
//!    potential article
//! 2. **Detail**: fetch each candidate and extract its fields through the
//!    LLM (5 at a time by default), filling gaps locally
//! 3. **Output**: write `full_data.json` and `Wind_Analysis_Report.md` into
//!    a timestamped run folder

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod models;
mod outputs;
mod scrapers;
mod utils;

use api::ExtractionClient;
use cli::Cli;
use outputs::{json, markdown};
use scrapers::detail::DetailExtractor;
use scrapers::listing::scan_listing;
use scrapers::page::PageFetcher;
use utils::{ensure_writable_dir, run_folder_name};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("wind_intel starting up");

    let args = Cli::parse();
    debug!(start_url = %args.start_url, output_dir = %args.output_dir, "Parsed CLI arguments");

    let mut config = config::load_config(args.config.as_deref()).await?;
    if let Some(model) = &args.model {
        config.model = model.clone();
    }

    let Some(api_key) = args.api_key.clone() else {
        error!("OPENAI_API_KEY is not set; the detail stage cannot reach the LLM");
        return Err("OPENAI_API_KEY is not set".into());
    };

    // ---- Run folder ----
    let run_folder = Path::new(&args.output_dir).join(run_folder_name(Local::now()));
    if let Err(e) = ensure_writable_dir(&run_folder).await {
        error!(
            path = %run_folder.display(),
            error = %e,
            "Run folder is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Stage 1: listing ----
    info!(start_url = %args.start_url, "Scanning listing page");
    let listing_fetcher = PageFetcher::new(
        &config.user_agent,
        config.listing_timeout(),
        std::time::Duration::ZERO,
        config.remove_overlays,
    )?;
    let Some(mut extraction) = scan_listing(&listing_fetcher, &args.start_url).await else {
        error!("Listing page could not be fetched; aborting run");
        return Ok(());
    };
    if extraction.articles.is_empty() {
        warn!("No article links found; aborting run");
        return Ok(());
    }
    info!(count = extraction.articles.len(), "Found candidate articles");

    // ---- Stage 2: detail extraction ----
    let candidates = match args.limit {
        Some(limit) => extraction.articles.iter().take(limit).cloned().collect::<Vec<_>>(),
        None => extraction.articles.clone(),
    };
    let detail_fetcher = PageFetcher::new(
        &config.user_agent,
        config.detail_timeout(),
        config.settle_delay(),
        config.remove_overlays,
    )?;
    let llm = ExtractionClient::new(&args.api_base, api_key, &config.model, config.detail_timeout())?;
    info!(
        candidates = candidates.len(),
        concurrency = args.concurrency,
        model = %config.model,
        "Starting detail extraction"
    );
    let extractor = DetailExtractor::new(
        detail_fetcher,
        llm,
        args.concurrency,
        config.error_markers.clone(),
        config.max_input_chars,
    );
    let enriched = extractor.extract_all(&candidates).await;
    let failed = candidates.len() - enriched.len();
    extraction.articles = enriched;

    // ---- Stage 3: output ----
    if let Err(e) = json::write_full_data(&extraction, &run_folder).await {
        error!(error = %e, "Failed to write JSON data");
    }
    if let Err(e) = markdown::write_report(&extraction, &run_folder).await {
        error!(error = %e, "Failed to write Markdown report");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        analysed = extraction.articles.len(),
        failed,
        run_folder = %run_folder.display(),
        "Execution complete"
    );

    Ok(())
}
