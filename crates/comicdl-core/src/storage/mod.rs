//! Output files and their lifecycle.
//!
//! Each issue is written to `{stem}.part` and renamed to `{stem}{ext}` once the
//! whole body is on disk, so the final name never refers to partial content.
//! File stems are zero-padded issue numbers so lexicographic order matches
//! issue order.

mod naming;
mod writer;

pub use naming::{width_for, IssueNaming, DEFAULT_WIDTH};
pub use writer::TempFile;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for a temp file: appends `.part` to `path` (e.g. `00012` → `00012.part`).
pub fn temp_path(path: &std::path::Path) -> std::path::PathBuf {
    let mut o = path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    std::path::PathBuf::from(o)
}

/// True if `name` is a temp file left by (or belonging to) a download.
pub fn is_temp_name(name: &str) -> bool {
    name.ends_with(TEMP_SUFFIX)
}
