use reqwest::StatusCode;

/// Errors that can occur during a scrape run.
///
/// Transport and status failures are `Network`/`HttpStatus`; `Parse` means a
/// page was structurally unrecognizable (an individual missing field is
/// tolerated by the parser and never reaches here).
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("http error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    HttpStatus { status: StatusCode, url: String },

    #[error("page structure not recognized: {0}")]
    Parse(String),

    #[error("write error: {0}")]
    Write(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("robots.txt disallows {0}")]
    RobotsDenied(String),
}
