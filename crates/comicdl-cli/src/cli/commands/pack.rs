//! `comicdl pack` – archive an existing directory.

use anyhow::{Context, Result};
use comicdl_core::archive;
use std::path::Path;

pub async fn run_pack(dir: &Path, dest: &Path) -> Result<()> {
    let summary = archive::build_archive(dir, dest)
        .await
        .with_context(|| format!("packing {} into {}", dir.display(), dest.display()))?;
    println!(
        "{}: {} file(s), {} bytes",
        dest.display(),
        summary.entries,
        summary.bytes
    );
    Ok(())
}
