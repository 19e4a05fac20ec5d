//! `ward-scrape unit-history`: export every unit history story.

use crate::acquisition::http_client::HttpClient;
use crate::cli::doctor::find_chromium;
use crate::cli::output::{self, Styled};
use crate::config::{GalleryConfig, USER_AGENT};
use crate::gallery::{self, Manifest};
use crate::renderer::chromium::{ChromiumRenderer, LaunchOptions};
use anyhow::Result;
use std::path::PathBuf;
use std::time::Instant;

/// Command-line overrides layered on top of the environment configuration.
#[derive(Debug, Default, Clone)]
pub struct GalleryOverrides {
    pub out_dir: Option<PathBuf>,
    pub zip_name: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub storage_state: Option<PathBuf>,
    pub chromium: Option<PathBuf>,
    pub headed: bool,
    pub no_skip_existing: bool,
    pub no_zip: bool,
}

impl GalleryOverrides {
    pub fn apply(&self, config: &mut GalleryConfig) {
        if let Some(p) = &self.out_dir {
            config.out_dir = p.clone();
        }
        if let Some(p) = &self.zip_name {
            config.zip_name = p.clone();
        }
        if let Some(p) = &self.manifest {
            config.manifest_path = p.clone();
        }
        if let Some(p) = &self.storage_state {
            config.storage_state_path = p.clone();
        }
        if let Some(p) = &self.chromium {
            config.chromium_path = Some(p.clone());
        }
        if self.headed {
            config.headless = false;
        }
        if self.no_skip_existing {
            config.skip_existing_folders = false;
        }
        if self.no_zip {
            config.write_zip = false;
        }
    }
}

/// Run the unit history export.
pub async fn run(overrides: GalleryOverrides) -> Result<()> {
    let s = Styled::new();
    let start = Instant::now();

    let mut config = GalleryConfig::from_env();
    overrides.apply(&mut config);

    let options = LaunchOptions {
        headless: config.headless,
        executable: config.chromium_path.clone().or_else(find_chromium),
        no_sandbox: config.no_sandbox,
    };

    if !output::is_quiet() && !output::is_json() {
        output::print_header(&s);
        eprintln!("  Exporting {} into {}", config.start_url, config.out_dir.display());
        eprintln!();
    }

    let renderer = ChromiumRenderer::launch(&options).await?;
    let client = HttpClient::new(USER_AGENT)?;
    let manifest = gallery::export_unit_history(&renderer, &client, &config).await?;

    if output::is_json() {
        output::print_json(&summary_json(&manifest, &config));
    } else if !output::is_quiet() {
        print_summary(&s, &manifest, &config, start.elapsed().as_secs());
    }
    Ok(())
}

fn summary_json(manifest: &Manifest, config: &GalleryConfig) -> serde_json::Value {
    serde_json::json!({
        "stories_found": manifest.story_count_found_on_grid,
        "stories_downloaded": manifest.story_count_downloaded_new,
        "stories_skipped": manifest.story_count_skipped_existing,
        "images_downloaded": images_downloaded(manifest),
        "manifest": config.manifest_path.display().to_string(),
        "zip": config.write_zip.then(|| config.zip_name.display().to_string()),
    })
}

fn images_downloaded(manifest: &Manifest) -> usize {
    manifest.stories.iter().map(|st| st.downloaded_count()).sum()
}

fn print_summary(s: &Styled, manifest: &Manifest, config: &GalleryConfig, secs: u64) {
    eprintln!();
    output::print_section(s, "Export");
    output::print_check(
        s.ok_sym(),
        "Stories:",
        &format!(
            "{} found, {} new, {} skipped",
            manifest.story_count_found_on_grid,
            manifest.story_count_downloaded_new,
            manifest.story_count_skipped_existing
        ),
    );

    let failed: usize = manifest
        .stories
        .iter()
        .map(|st| st.images.len() - st.downloaded_count())
        .sum();
    let sym = if failed == 0 { s.ok_sym() } else { s.warn_sym() };
    output::print_check(
        sym,
        "Images:",
        &format!("{} saved, {failed} failed", images_downloaded(manifest)),
    );
    output::print_check(s.ok_sym(), "Manifest:", &config.manifest_path.display().to_string());

    if config.write_zip {
        let size = std::fs::metadata(&config.zip_name)
            .map(|m| output::format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        output::print_check(
            s.ok_sym(),
            "Zip:",
            &format!("{} ({size})", config.zip_name.display()),
        );
    }

    output::print_status(s, &s.green("done"), &output::format_duration(secs));
}
