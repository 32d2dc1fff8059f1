use std::{ops::Range, path::PathBuf, time::Duration};

use url::Url;

use crate::error::ScrapeError;

pub const DEFAULT_BASE_URL: &str = "https://applyjobs.spac.gov.jo/";

/// Settings passed into every stage of the pipeline, so no component reads
/// ambient globals and each can be driven from fixtures in tests.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Listing root. Pages are addressed as `<base_url>?page=N`.
    pub base_url: Url,
    pub user_agent: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Fetch attempts per page before the error surfaces to the caller.
    pub attempts: u32,
    /// Hard cap on listing pages regardless of what the pager claims.
    pub max_pages: usize,
    /// Politeness delay between successive requests, jittered (ms).
    pub delay_ms: Range<u64>,
    pub respect_robots: bool,
    /// Where the JSON snapshot lands.
    pub output: PathBuf,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).unwrap(),
            user_agent: concat!("jobwatch/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            attempts: 3,
            max_pages: 50,
            delay_ms: 900..2200,
            respect_robots: true,
            output: PathBuf::from("data/jobs.json"),
        }
    }
}

impl ScrapeConfig {
    /// Listing URL for one pager position, preserving any query the base
    /// carries and replacing its `page` parameter.
    pub fn page_url(&self, page: usize) -> Url {
        let mut u = self.base_url.clone();
        let qp: Vec<(String, String)> = u
            .query_pairs()
            .filter(|(k, _)| k != "page")
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        {
            let mut pairs = u.query_pairs_mut();
            pairs
                .clear()
                .extend_pairs(qp.iter().map(|(k, v)| (&**k, &**v)))
                .append_pair("page", &page.to_string());
        }
        u
    }

    pub fn detail_url(&self, job_id: &str) -> Result<Url, ScrapeError> {
        let mut u = self.base_url.join("JobDet.aspx")?;
        u.query_pairs_mut().append_pair("JobID", job_id);
        Ok(u)
    }

    pub fn robots_url(&self) -> Result<Url, ScrapeError> {
        Ok(self.base_url.join("/robots.txt")?)
    }
}
