use std::hash::{BuildHasher, BuildHasherDefault, DefaultHasher};

use serde::{Deserialize, Serialize};
use time::Date;

pub const STATUS_OPEN: &str = "open";
pub const STATUS_CLOSED: &str = "closed";
pub const STATUS_UNKNOWN: &str = "unknown";

/// One normalized job posting. Field names are frozen: the snapshot file is
/// consumed by `site/index.html`, which binds to them directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRecord {
    pub job_id: String,
    pub title: String,
    pub organization: String,
    pub vacancy_spec: String,
    pub experience_text: String,
    /// Listing-page experience snippet kept verbatim for display.
    pub experience_raw: String,
    /// ISO 8601 (`YYYY-MM-DD`) or null when the source text didn't parse.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub qualification: String,
    pub location: String,
    pub gender: String,
    pub age: String,
    pub vacancies: Option<i64>,
    pub salary: Option<f64>,
    pub requirements: String,
    pub announcement_pdf: Option<String>,
    pub description_pdf: Option<String>,
    pub detail_url: String,
    pub status: String,
    pub scraped_at: String,
}

/// Stable fallback id for a posting without a usable detail link: a
/// 16-hex-digit hash over title, organization and posting date.
pub fn composite_id(title: &str, organization: &str, start_date: Option<&str>) -> String {
    let key = format!("{title}|{organization}|{}", start_date.unwrap_or(""));
    let hash = BuildHasherDefault::<DefaultHasher>::default().hash_one(&key);
    format!("{hash:016x}")
}

pub fn determine_status(end_date: Option<Date>, today: Date) -> &'static str {
    match end_date {
        None => STATUS_UNKNOWN,
        Some(deadline) if deadline >= today => STATUS_OPEN,
        Some(_) => STATUS_CLOSED,
    }
}
