//! Main entry point for the megacloud CLI

use anyhow::Context;
use clap::Parser;
use futures::stream::{self, StreamExt};
use megacloud::cli::{format_duration, Args, OutputFormatter, PatternArg};
use megacloud::{ExtractedData, Extractor, ScriptPattern};
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.log_level());
    debug!("Starting megacloud with args: {:?}", args);

    let formatter = OutputFormatter::new(args.verbosity_level(), args.pretty);

    let pattern = match args.pattern {
        PatternArg::UrlSearchParams => ScriptPattern::UrlSearchParams,
        PatternArg::ConstTable => ScriptPattern::ConstTable,
    };

    let mut extractor = Extractor::with_config(args.http_config())
        .context("Failed to build HTTP client")?
        .with_script_pattern(pattern);
    if let Some(ttl) = args.script_cache_duration() {
        extractor = extractor.with_script_cache(ttl);
    }

    formatter.info(&format!("Extracting {} URL(s)", args.urls.len()));
    let start_time = Instant::now();
    let results = run_extractions(&extractor, &args.urls, args.concurrency()).await;

    let mut extracted = Vec::with_capacity(results.len());
    let mut failures = 0usize;
    for (url, result) in args.urls.iter().zip(results) {
        match result {
            Ok(data) => {
                formatter.print_summary(url, &data);
                extracted.push(data);
            }
            Err(e) => {
                failures += 1;
                formatter.error(&format!("{} ({}): {}", url, e.status_code(), e));
            }
        }
    }

    if !extracted.is_empty() {
        println!("{}", formatter.render_json(&extracted, args.urls.len() > 1)?);
    }

    info!(
        "Extracted {}/{} URLs in {}",
        extracted.len(),
        args.urls.len(),
        format_duration(start_time.elapsed())
    );

    if failures > 0 {
        anyhow::bail!("{} of {} extractions failed", failures, args.urls.len());
    }

    formatter.success(&format!("{} extracted", extracted.len()));
    Ok(())
}

/// Extract every URL with bounded concurrency, results in input order
async fn run_extractions(
    extractor: &Extractor,
    urls: &[String],
    concurrency: usize,
) -> Vec<megacloud::Result<ExtractedData>> {
    stream::iter(urls)
        .map(|url| extractor.extract(url))
        .buffered(concurrency)
        .collect()
        .await
}

/// Initialize logging system
fn init_logging(default_level: &str) {
    // RUST_LOG wins over the verbosity flags
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}
