//! I/O helpers: config, spec files, the generator process, tools and
//! persisted transcripts.

pub mod config;
pub mod generator;
pub mod process;
pub mod prompt;
pub mod spec_file;
pub mod tools;
pub mod transcript_store;
