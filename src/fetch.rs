use std::{future::Future, time::Duration};

use rand::{Rng, rng};
use reqwest::Client;
use robotstxt::DefaultMatcher;
use tokio::time::sleep;
use url::Url;

use crate::{config::ScrapeConfig, error::ScrapeError};

/// Where pages come from. The HTTP client is the production impl; tests
/// feed fixture HTML through the same seam.
pub trait PageSource {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String, ScrapeError>>;
}

pub struct HttpSource {
    client: Client,
    attempts: u32,
}

impl HttpSource {
    pub fn new(cfg: &ScrapeConfig) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .user_agent(&cfg.user_agent)
            .redirect(reqwest::redirect::Policy::limited(8))
            .timeout(cfg.timeout)
            .build()?;
        Ok(Self {
            client,
            attempts: cfg.attempts.max(1),
        })
    }

    async fn try_fetch(&self, url: &Url) -> Result<String, ScrapeError> {
        let rsp = self.client.get(url.as_str()).send().await?;
        let status = rsp.status();
        if !status.is_success() {
            return Err(ScrapeError::HttpStatus {
                status,
                url: url.to_string(),
            });
        }
        Ok(rsp.text().await?)
    }
}

impl PageSource for HttpSource {
    /// Fetch with a small fixed number of attempts and a jittered pause
    /// between them. The last error surfaces to the caller, which decides
    /// whether a failed page aborts the run or is skipped.
    async fn fetch(&self, url: &Url) -> Result<String, ScrapeError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_fetch(url).await {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.attempts => {
                    tracing::warn!(
                        target: "fetch",
                        "attempt {attempt}/{} for {url} failed: {e}",
                        self.attempts
                    );
                    sleep(Duration::from_millis(rng().random_range(600..1500))).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Courtesy gate: fetch the site's robots.txt and check our product token
/// against it. An unreachable robots.txt is not a veto.
pub async fn robots_allows<S: PageSource>(src: &S, cfg: &ScrapeConfig) -> bool {
    let Ok(robots_url) = cfg.robots_url() else {
        return true;
    };
    let robots_txt = match src.fetch(&robots_url).await {
        Ok(txt) => txt,
        Err(e) => {
            tracing::debug!(target: "robots", "robots.txt unavailable, proceeding: {e}");
            String::new()
        }
    };
    let mut matcher = DefaultMatcher::default();
    matcher.one_agent_allowed_by_robots(&robots_txt, "jobwatch", cfg.base_url.as_str())
}

/// Jittered delay between successive page requests.
pub async fn polite_delay(cfg: &ScrapeConfig) {
    sleep(Duration::from_millis(rng().random_range(cfg.delay_ms.clone()))).await;
}
