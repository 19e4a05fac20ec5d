//! CLI subcommand implementations for the ward-scrape binary.

pub mod doctor;
pub mod gallery_cmd;
pub mod output;
pub mod weekly_cmd;
