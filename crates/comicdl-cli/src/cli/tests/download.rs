//! Tests for `download` parsing and flag overrides.

use super::parse;
use crate::cli::commands::DownloadArgs;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use comicdl_core::config::{ComicdlConfig, EndOfRangePolicy};
use std::path::PathBuf;

fn download(args: &[&str]) -> DownloadArgs {
    match parse(args) {
        CliCommand::Download(args) => args,
        other => panic!("expected Download, got {:?}", other),
    }
}

#[test]
fn cli_parse_download_defaults() {
    let args = download(&["comicdl", "download", "hero"]);
    assert_eq!(args.comic, "hero");
    assert_eq!(args.from, 1);
    assert!(args.to.is_none());
    assert!(args.cbz.is_none());
    assert!(args.output_dir.is_none());
    assert!(!args.strict_end);
    assert!(args.archive_path().is_none());
}

#[test]
fn cli_parse_download_range_and_archive() {
    let args = download(&[
        "comicdl", "download", "hero", "--from", "10", "--to", "20", "--cbz", "out/hero.cbz",
        "--output-dir", "/tmp/hero",
    ]);
    assert_eq!(args.from, 10);
    assert_eq!(args.to, Some(20));
    assert_eq!(args.archive_path(), Some(PathBuf::from("out/hero.cbz")));
    assert_eq!(args.output_dir, Some(PathBuf::from("/tmp/hero")));
}

#[test]
fn auto_archive_is_named_after_comic() {
    let args = download(&["comicdl", "download", "hero", "--cbz", "@auto"]);
    assert_eq!(args.archive_path(), Some(PathBuf::from("hero.cbz")));
}

#[test]
fn flags_override_config() {
    let args = download(&[
        "comicdl",
        "download",
        "hero",
        "--throttle-ms",
        "1000",
        "--tickets",
        "4",
        "--timeout-secs",
        "0",
        "--proxy",
        "socks5h://localhost:9050",
        "--strict-end",
    ]);
    let mut cfg = ComicdlConfig::default();
    args.apply(&mut cfg);
    assert_eq!(cfg.throttle_ms, 1000);
    assert_eq!(cfg.tickets, 4);
    assert_eq!(cfg.timeout_secs, None);
    assert_eq!(cfg.http.proxy.as_deref(), Some("socks5h://localhost:9050"));
    assert_eq!(cfg.end_of_range, EndOfRangePolicy::Fail);
}

#[test]
fn no_flags_keep_config() {
    let args = download(&["comicdl", "download", "hero"]);
    let mut cfg = ComicdlConfig::default();
    args.apply(&mut cfg);
    assert_eq!(cfg.throttle_ms, 500);
    assert_eq!(cfg.tickets, 2);
    assert_eq!(cfg.timeout_secs, Some(3600));
    assert_eq!(cfg.end_of_range, EndOfRangePolicy::Stop);
}

#[test]
fn download_requires_comic() {
    assert!(Cli::try_parse_from(["comicdl", "download"]).is_err());
}
