pub mod archive;
pub mod cache;
pub mod config;
pub mod control;
pub mod error;
pub mod logging;
pub mod retry;
pub mod scheduler;
pub mod source;
pub mod storage;
