//! Scrape the `applyjobs.spac.gov.jo` job board into a JSON feed.
//!
//! Pipeline: fetch paginated listing pages, pull each posting's detail page,
//! normalize into [`record::JobRecord`]s, merge with the previous snapshot
//! and atomically rewrite it. `site/index.html` renders the feed
//! client-side; it binds to the snapshot's field names, which are frozen.

pub mod config;
pub mod error;
pub mod fetch;
pub mod parse;
pub mod pipeline;
pub mod record;
pub mod snapshot;
