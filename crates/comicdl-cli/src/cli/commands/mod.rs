//! CLI command handlers, one file per command.

mod completions;
mod download;
mod pack;
pub(crate) mod status;

pub use completions::run_completions;
pub use download::{run_download, DownloadArgs};
pub use pack::run_pack;
pub use status::run_status;
