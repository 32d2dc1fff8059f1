use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use url::Url;

use jobwatch::{
    config::{DEFAULT_BASE_URL, ScrapeConfig},
    fetch::HttpSource,
    pipeline,
};

#[derive(Parser, Debug)]
#[command(version, about = "Scrape applyjobs.spac.gov.jo job postings into a JSON feed")]
struct Args {
    /// Where to write the JSON snapshot.
    #[arg(long, default_value = "data/jobs.json")]
    output: PathBuf,

    /// Listing root URL.
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: Url,

    /// Hard cap on listing pages per run.
    #[arg(long, default_value_t = 50)]
    max_pages: usize,

    /// Fetch attempts per page before giving up on it.
    #[arg(long, default_value_t = 3)]
    attempts: u32,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Seconds between scrapes; if set, runs forever.
    #[arg(long)]
    interval: Option<u64>,

    /// Skip the robots.txt check.
    #[arg(long)]
    no_robots: bool,

    /// Verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    let cfg = ScrapeConfig {
        base_url: args.base_url,
        max_pages: args.max_pages,
        attempts: args.attempts,
        timeout: Duration::from_secs(args.timeout_secs),
        respect_robots: !args.no_robots,
        output: args.output,
        ..ScrapeConfig::default()
    };
    let src = HttpSource::new(&cfg)?;

    loop {
        let now = OffsetDateTime::now_utc();
        let scraped_at = now
            .replace_nanosecond(0)
            .context("truncate scrape timestamp")?
            .format(&Rfc3339)
            .context("format scrape timestamp")?;

        let snap = pipeline::run(&src, &cfg, now.date(), &scraped_at).await?;
        tracing::info!(
            target: "run",
            "wrote {} jobs to {} at {}",
            snap.job_count,
            cfg.output.display(),
            snap.scraped_at
        );

        let Some(secs) = args.interval else { break };
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    Ok(())
}
