//! Tests for pack, status, completions and the status formatter.

use super::parse;
use crate::cli::commands::status::format_ids;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use clap_complete::Shell;
use std::path::PathBuf;

#[test]
fn cli_parse_pack() {
    match parse(&["comicdl", "pack", "issues", "out.cbz"]) {
        CliCommand::Pack { dir, dest } => {
            assert_eq!(dir, PathBuf::from("issues"));
            assert_eq!(dest, PathBuf::from("out.cbz"));
        }
        _ => panic!("expected Pack"),
    }
}

#[test]
fn cli_parse_status() {
    match parse(&["comicdl", "status", "hero"]) {
        CliCommand::Status {
            comic,
            output_dir,
            from,
            to,
            json,
        } => {
            assert_eq!(comic, "hero");
            assert!(output_dir.is_none());
            assert!(from.is_none());
            assert!(to.is_none());
            assert!(!json);
        }
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_status_json_range() {
    match parse(&["comicdl", "status", "hero", "--from", "2", "--to", "9", "--json"]) {
        CliCommand::Status { from, to, json, .. } => {
            assert_eq!(from, Some(2));
            assert_eq!(to, Some(9));
            assert!(json);
        }
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_parse_completions() {
    match parse(&["comicdl", "completions", "bash"]) {
        CliCommand::Completions { shell } => assert_eq!(shell, Shell::Bash),
        _ => panic!("expected Completions"),
    }
}

#[test]
fn cli_rejects_unknown_command() {
    assert!(Cli::try_parse_from(["comicdl", "frobnicate"]).is_err());
}

#[test]
fn gaps_are_compressed() {
    assert_eq!(format_ids(&[1, 2, 3, 7, 9, 10]), "1-3, 7, 9-10");
    assert_eq!(format_ids(&[4]), "4");
    assert_eq!(format_ids(&[]), "");
}
