#![forbid(unsafe_code)]

pub mod analyze;
pub mod catalog;
pub mod cli;
pub mod content;
pub mod filename;
pub mod formats;
pub mod generate;
pub mod ingest;
pub mod levels;
pub mod logging;
pub mod store;
