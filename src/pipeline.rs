use std::collections::{HashMap, HashSet};

use time::Date;

use crate::{
    config::ScrapeConfig,
    error::ScrapeError,
    fetch::{self, PageSource},
    parse::{self, DetailSelectors},
    record::JobRecord,
    snapshot::{self, Snapshot},
};

/// One full run: paginate the listing, pull each posting's detail page,
/// merge with the previous snapshot and atomically rewrite it.
pub async fn run<S: PageSource>(
    src: &S,
    cfg: &ScrapeConfig,
    today: Date,
    scraped_at: &str,
) -> Result<Snapshot, ScrapeError> {
    if cfg.respect_robots && !fetch::robots_allows(src, cfg).await {
        return Err(ScrapeError::RobotsDenied(cfg.base_url.to_string()));
    }

    let previous = match snapshot::load(&cfg.output) {
        Ok(prev) => prev,
        Err(e) => {
            tracing::warn!(target: "snapshot", "previous snapshot unreadable, starting fresh: {e}");
            None
        }
    };

    let scraped = scrape_once(src, cfg, today, scraped_at).await?;
    let jobs = snapshot::merge(previous.as_ref(), scraped);
    let snap = Snapshot::new(cfg.base_url.to_string(), scraped_at.to_string(), jobs);
    snapshot::write(&cfg.output, &snap)?;
    Ok(snap)
}

/// Scrape the live site into raw records, without touching the snapshot.
///
/// A failed page 1 aborts the whole run: overwriting a good snapshot with a
/// near-empty one would be worse than no update. Later pages and individual
/// detail pages are logged and skipped on failure.
pub async fn scrape_once<S: PageSource>(
    src: &S,
    cfg: &ScrapeConfig,
    today: Date,
    scraped_at: &str,
) -> Result<Vec<JobRecord>, ScrapeError> {
    let mut job_ids: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut experience: HashMap<String, String> = HashMap::new();
    let mut prev_page_ids: Option<Vec<String>> = None;
    let mut capped = true;

    for page in 1..=cfg.max_pages {
        let page_url = cfg.page_url(page);
        let html = match src.fetch(&page_url).await {
            Ok(html) => html,
            Err(e) if page == 1 => return Err(e),
            Err(e) => {
                tracing::warn!(target: "pager", "page {page} failed, skipping: {e}");
                continue;
            }
        };

        let listing = parse::parse_listing(&html);
        tracing::info!(target: "pager", "page {page}: {} postings", listing.job_ids.len());

        if listing.job_ids.is_empty() {
            capped = false;
            break;
        }
        if prev_page_ids.as_deref() == Some(listing.job_ids.as_slice()) {
            tracing::warn!(target: "pager", "page {page} repeats page {}, stopping", page - 1);
            capped = false;
            break;
        }

        for (id, raw) in listing.experience {
            experience.entry(id).or_insert(raw);
        }
        for id in &listing.job_ids {
            if seen.insert(id.clone()) {
                job_ids.push(id.clone());
            }
        }
        prev_page_ids = Some(listing.job_ids);

        if page < cfg.max_pages {
            fetch::polite_delay(cfg).await;
        }
    }
    if capped {
        tracing::warn!(target: "pager", "reached max_pages={}, stopping", cfg.max_pages);
    }

    let selectors = DetailSelectors::new();
    let mut records = Vec::with_capacity(job_ids.len());
    for (i, id) in job_ids.iter().enumerate() {
        if i > 0 {
            fetch::polite_delay(cfg).await;
        }
        let detail_url = cfg.detail_url(id)?;
        let html = match src.fetch(&detail_url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(target: "detail", "job {id}: fetch failed, skipping: {e}");
                continue;
            }
        };
        let mut job = match parse::parse_detail(
            id,
            &html,
            &selectors,
            &cfg.base_url,
            &detail_url,
            today,
            scraped_at,
        ) {
            Ok(job) => job,
            Err(e) => {
                tracing::warn!(target: "detail", "job {id}: {e}, skipping");
                continue;
            }
        };
        if let Some(raw) = experience.get(id) {
            if !raw.is_empty() {
                job.experience_text = raw.clone();
                job.experience_raw = raw.clone();
            }
        }
        records.push(job);
    }

    tracing::info!(target: "run", "scraped {} postings", records.len());
    Ok(records)
}
