//! `comicdl status` – show cached issues and gaps.

use anyhow::{Context, Result};
use comicdl_core::cache::CacheReport;
use std::path::Path;

pub fn run_status(
    comic: &str,
    dir: &Path,
    from: Option<u64>,
    to: Option<u64>,
    json: bool,
) -> Result<()> {
    let report =
        CacheReport::scan(dir).with_context(|| format!("reading {}", dir.display()))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}: {} issue(s) in {}", comic, report.issues.len(), dir.display());
    let from = from.unwrap_or(1);
    if let Some(to) = to.or(report.last_issue()) {
        if from <= to {
            let missing = report.missing(from, to);
            if missing.is_empty() {
                println!("complete from {} to {}", from, to);
            } else {
                println!("missing: {}", format_ids(&missing));
            }
        }
    }
    for name in &report.temp_files {
        println!("stale temp file: {}", name);
    }
    if !report.other_files.is_empty() {
        println!("other files: {}", report.other_files.join(", "));
    }
    Ok(())
}

/// `[1, 2, 3, 7, 9, 10]` -> `1-3, 7, 9-10`.
pub(crate) fn format_ids(ids: &[u64]) -> String {
    let mut parts = Vec::new();
    let mut iter = ids.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        parts.push(if start == end {
            start.to_string()
        } else {
            format!("{}-{}", start, end)
        });
    }
    parts.join(", ")
}
