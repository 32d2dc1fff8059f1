use std::{
    collections::{HashMap, hash_map::Entry},
    fs,
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::ScrapeError,
    record::{JobRecord, STATUS_CLOSED},
};

/// Top-level document the static front end binds to. Field names are frozen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub source: String,
    pub scraped_at: String,
    pub job_count: usize,
    pub jobs: Vec<JobRecord>,
}

impl Snapshot {
    pub fn new(source: String, scraped_at: String, jobs: Vec<JobRecord>) -> Self {
        Self {
            source,
            scraped_at,
            job_count: jobs.len(),
            jobs,
        }
    }
}

pub fn load(path: &Path) -> Result<Option<Snapshot>, ScrapeError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Serialize fully in memory, write beside the target, then rename into
/// place, so a reader never observes a half-written snapshot and a failed
/// run leaves the previous file untouched.
pub fn write(path: &Path, snapshot: &Snapshot) -> Result<(), ScrapeError> {
    let json = serde_json::to_string_pretty(snapshot)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Merge freshly scraped records over the previous snapshot.
///
/// Postings that vanished from the listing are retained with their status
/// forced to "closed"; a posting seen twice keeps the later version. Output
/// order is `start_date` descending with undated records last, ties broken
/// by `job_id` ascending.
pub fn merge(previous: Option<&Snapshot>, scraped: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<JobRecord> = Vec::new();

    if let Some(prev) = previous {
        for job in &prev.jobs {
            let mut job = job.clone();
            job.status = STATUS_CLOSED.to_string();
            upsert(&mut merged, &mut slots, job);
        }
    }
    for job in scraped {
        upsert(&mut merged, &mut slots, job);
    }

    sort_records(&mut merged);
    merged
}

fn upsert(jobs: &mut Vec<JobRecord>, slots: &mut HashMap<String, usize>, job: JobRecord) {
    match slots.entry(job.job_id.clone()) {
        Entry::Occupied(slot) => jobs[*slot.get()] = job,
        Entry::Vacant(slot) => {
            slot.insert(jobs.len());
            jobs.push(job);
        }
    }
}

pub fn sort_records(jobs: &mut [JobRecord]) {
    jobs.sort_by(|a, b| {
        b.start_date
            .cmp(&a.start_date)
            .then_with(|| a.job_id.cmp(&b.job_id))
    });
}
