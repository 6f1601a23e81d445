//! CLI for the comicdl issue downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use comicdl_core::config;
use std::path::PathBuf;

use commands::{run_completions, run_download, run_pack, run_status, DownloadArgs};

/// Top-level CLI for comicdl.
#[derive(Debug, Parser)]
#[command(name = "comicdl")]
#[command(about = "comicdl: download comic issues from acomics.ru and pack them as CBZ", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a range of issues of a comic.
    Download(DownloadArgs),

    /// Pack an existing directory of issues into a CBZ archive.
    Pack {
        /// Directory holding the issue files.
        dir: PathBuf,
        /// Archive to write.
        dest: PathBuf,
    },

    /// Show which issues of a comic are cached locally.
    Status {
        /// Comic name as in the site URL (`~name`).
        comic: String,
        /// Directory holding the issues (default: `{output_root}/{comic}`).
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
        /// First issue when listing gaps.
        #[arg(long, value_name = "N")]
        from: Option<u64>,
        /// Last issue when listing gaps (default: highest cached issue).
        #[arg(long, value_name = "N")]
        to: Option<u64>,
        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print shell completions.
    Completions {
        shell: Shell,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        if let CliCommand::Completions { shell } = cli.command {
            run_completions(shell);
            return Ok(());
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Download(args) => run_download(&cfg, args).await?,
            CliCommand::Pack { dir, dest } => run_pack(&dir, &dest).await?,
            CliCommand::Status {
                comic,
                output_dir,
                from,
                to,
                json,
            } => {
                let dir = match output_dir {
                    Some(dir) => dir,
                    None => cfg.comic_dir(&comic)?,
                };
                run_status(&comic, &dir, from, to, json)?;
            }
            CliCommand::Completions { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
