//! Per-story records and the run manifest.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One image of a story and whether it reached disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    /// 1-based position in the story.
    pub index: usize,
    pub url: String,
    pub file: String,
    pub downloaded: bool,
}

/// What was found and saved for one story. Also written as `story.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryRecord {
    pub final_url: String,
    pub title: String,
    pub date_text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped_existing_folder: bool,
    pub folder: String,
    pub image_count_found: usize,
    pub images: Vec<ImageRecord>,
    /// Title read off the grid card; set after the story is saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_title_guess: Option<String>,
}

impl StoryRecord {
    pub fn downloaded_count(&self) -> usize {
        self.images.iter().filter(|i| i.downloaded).count()
    }
}

/// Summary of a whole export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// UTC, `YYYY-MM-DD HH:MM:SS`. Set when the walk is finished.
    pub exported_at_utc: String,
    pub base: String,
    pub start_url: String,
    pub headless: bool,
    pub skip_existing_folders: bool,
    pub story_count_found_on_grid: usize,
    pub story_count_downloaded_new: usize,
    pub story_count_skipped_existing: usize,
    pub stories: Vec<StoryRecord>,
}

impl Manifest {
    pub fn new(base: &str, start_url: &str, headless: bool, skip_existing_folders: bool) -> Self {
        Self {
            exported_at_utc: String::new(),
            base: base.to_string(),
            start_url: start_url.to_string(),
            headless,
            skip_existing_folders,
            story_count_found_on_grid: 0,
            story_count_downloaded_new: 0,
            story_count_skipped_existing: 0,
            stories: Vec::new(),
        }
    }

    pub fn stamp(&mut self, at: DateTime<Utc>) {
        self.exported_at_utc = at.format("%Y-%m-%d %H:%M:%S").to_string();
    }

    /// Append a story and bump the matching counter.
    pub fn push_story(&mut self, story: StoryRecord) {
        if story.skipped_existing_folder {
            self.story_count_skipped_existing += 1;
        } else {
            self.story_count_downloaded_new += 1;
        }
        self.stories.push(story);
    }
}

/// Pretty-print `value` as JSON to `path`, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
