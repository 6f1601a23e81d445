//! `comicdl download` – fetch a range of issues, optionally packing a CBZ.

use anyhow::{Context, Result};
use clap::Args;
use comicdl_core::config::{ComicdlConfig, EndOfRangePolicy};
use comicdl_core::retry::RetryPolicy;
use comicdl_core::scheduler::{DownloadPlan, Downloader, ProgressEvent, RunOptions};
use comicdl_core::source::AcomicsClient;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Archive name that expands to `<COMIC>.cbz`.
pub const AUTO_CBZ: &str = "@auto";

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Comic name as in the site URL (`~name`).
    pub comic: String,
    /// First issue to download.
    #[arg(long, default_value = "1", value_name = "N")]
    pub from: u64,
    /// Last issue to download (default: until the last published issue).
    #[arg(long, value_name = "N")]
    pub to: Option<u64>,
    /// Pack the issues into this CBZ after downloading (`@auto` = `<COMIC>.cbz`).
    #[arg(long, value_name = "PATH")]
    pub cbz: Option<String>,
    /// Directory for issue files (default: `{output_root}/{COMIC}`).
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Minimum delay between two issue fetches.
    #[arg(long, value_name = "MS")]
    pub throttle_ms: Option<u64>,
    /// Issues fetched at the same time.
    #[arg(long, value_name = "N")]
    pub tickets: Option<usize>,
    /// Abort the whole run after this many seconds (0 = no limit).
    #[arg(long, value_name = "S")]
    pub timeout_secs: Option<u64>,
    /// Proxy URL, e.g. socks5h://localhost:9050.
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,
    /// Fail when the range runs past the last published issue.
    #[arg(long)]
    pub strict_end: bool,
}

impl DownloadArgs {
    /// Apply flag overrides to a copy of the loaded config.
    pub fn apply(&self, cfg: &mut ComicdlConfig) {
        if let Some(ms) = self.throttle_ms {
            cfg.throttle_ms = ms;
        }
        if let Some(n) = self.tickets {
            cfg.tickets = n;
        }
        if let Some(secs) = self.timeout_secs {
            cfg.timeout_secs = (secs > 0).then_some(secs);
        }
        if let Some(proxy) = &self.proxy {
            cfg.http.proxy = Some(proxy.clone());
        }
        if self.strict_end {
            cfg.end_of_range = EndOfRangePolicy::Fail;
        }
    }

    pub fn archive_path(&self) -> Option<PathBuf> {
        self.cbz.as_deref().map(|cbz| {
            if cbz == AUTO_CBZ {
                PathBuf::from(format!("{}.cbz", self.comic))
            } else {
                PathBuf::from(cbz)
            }
        })
    }
}

pub async fn run_download(cfg: &ComicdlConfig, args: DownloadArgs) -> Result<()> {
    let mut cfg = cfg.clone();
    args.apply(&mut cfg);

    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => cfg.comic_dir(&args.comic)?,
    };
    let plan = DownloadPlan {
        from: args.from,
        to: args.to,
        output_dir,
        archive: args.archive_path(),
    };

    let retry = cfg
        .retry
        .as_ref()
        .map(RetryPolicy::from)
        .unwrap_or_default();
    let client = AcomicsClient::new(&args.comic, &cfg.http, retry)
        .with_context(|| format!("setting up client for {}", args.comic))?;

    let (progress_tx, progress_rx) = mpsc::channel::<ProgressEvent>(64);
    let downloader =
        Downloader::new(Arc::new(client), RunOptions::from_config(&cfg)).with_progress(progress_tx);
    let printer = tokio::spawn(print_progress(progress_rx));

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            interrupts(tokio::signal::ctrl_c, cancel).await;
            eprintln!("interrupted again, exiting without waiting");
            std::process::exit(130);
        })
    };

    println!(
        "Downloading {} into {}",
        args.comic,
        plan.output_dir.display()
    );
    let result = downloader.run(&plan, &cancel).await;
    ctrl_c.abort();
    drop(downloader);
    let _ = printer.await;

    let summary = result.with_context(|| format!("downloading {}", args.comic))?;
    println!(
        "Done: {} downloaded, {} already present, {:.1} MiB",
        summary.downloaded,
        summary.skipped,
        summary.bytes as f64 / 1_048_576.0
    );
    if let Some(end) = summary.end_of_range {
        println!("Last published issue is {}", end.saturating_sub(1));
    }
    if let Some(path) = &summary.archive {
        println!("Archive: {}", path.display());
    }
    Ok(())
}

/// First interrupt cancels the run; resolves on the second one.
/// Never resolves if interrupts cannot be received.
async fn interrupts<S, F>(mut next_signal: S, cancel: CancellationToken)
where
    S: FnMut() -> F,
    F: Future<Output = io::Result<()>>,
{
    if let Err(e) = next_signal().await {
        tracing::warn!("cannot listen for Ctrl-C: {}", e);
        return std::future::pending().await;
    }
    eprintln!("interrupted, stopping (Ctrl-C again to exit now)");
    cancel.cancel();
    if next_signal().await.is_err() {
        std::future::pending::<()>().await;
    }
}

async fn print_progress(mut rx: mpsc::Receiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            ProgressEvent::Downloaded { id, bytes } => {
                println!("  issue {}: {:.1} KiB", id, bytes as f64 / 1024.0)
            }
            ProgressEvent::Skipped { id } => println!("  issue {}: already present", id),
            ProgressEvent::Failed { id } => println!("  issue {}: failed", id),
            ProgressEvent::Admitted { .. }
            | ProgressEvent::EndOfRange { .. }
            | ProgressEvent::Cancelled { .. } => {}
        }
    }
}
