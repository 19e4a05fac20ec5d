//! Ward website scrapers.
//!
//! Two single-run pipelines share this crate: the weekly lesson summary
//! (`weekly`) fetched over plain HTTP, and the unit history photo export
//! (`gallery`) driven through a headless Chromium via the `renderer` seam.

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod error;
pub mod gallery;
pub mod images;
pub mod renderer;
pub mod weekly;
