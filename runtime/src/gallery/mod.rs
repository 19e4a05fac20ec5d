//! Unit history photo export.
//!
//! Walks every story card on the unit history grid, saves each story's
//! full-size images into a folder of its own, and writes a manifest plus an
//! optional zip of the whole export.

pub mod archive;
pub mod debug;
pub mod download;
pub mod grid;
pub mod lightbox;
pub mod manifest;
pub mod names;
pub mod story;

use crate::acquisition::auth::{is_login_page, open_authenticated_context};
use crate::acquisition::http_client::HttpClient;
use crate::acquisition::http_session::{AuthSource, HttpSession};
use crate::config::GalleryConfig;
use crate::error::ScrapeError;
use crate::renderer::{self, RenderContext, Renderer};
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

pub use manifest::{ImageRecord, Manifest, StoryRecord};

/// Run a full export.
///
/// The renderer is shut down before returning, whether or not the export
/// succeeded.
pub async fn export_unit_history(
    renderer: &dyn Renderer,
    client: &HttpClient,
    config: &GalleryConfig,
) -> Result<Manifest> {
    let result = run_export(renderer, client, config).await;
    if let Err(e) = renderer.shutdown().await {
        warn!("browser shutdown failed: {e:#}");
    }
    result
}

async fn run_export(
    renderer: &dyn Renderer,
    client: &HttpClient,
    config: &GalleryConfig,
) -> Result<Manifest> {
    std::fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("creating {}", config.out_dir.display()))?;

    let (mut context, auth_source) = open_authenticated_context(renderer, config).await?;
    info!(?auth_source, "browser session ready");

    let result = walk_stories(context.as_mut(), client, config, auth_source).await;
    if let Err(e) = context.close().await {
        warn!("closing browser context failed: {e:#}");
    }
    let mut manifest = result?;

    manifest.stamp(Utc::now());
    manifest::write_json(&config.manifest_path, &manifest)?;
    info!("wrote manifest: {}", config.manifest_path.display());

    if config.write_zip {
        archive::zip_folder(&config.out_dir, &config.zip_name)?;
    }

    Ok(manifest)
}

async fn walk_stories(
    context: &mut dyn RenderContext,
    client: &HttpClient,
    config: &GalleryConfig,
    auth_source: AuthSource,
) -> Result<Manifest> {
    grid::open_story_grid(context, config).await?;
    let total = grid::story_card_count(context).await?;
    info!("found {total} story cards using {}", grid::STORY_CARD_SELECTOR);

    if total == 0 {
        debug::save_debug(context, &config.debug_dir, "zero_cards").await;
        return Err(ScrapeError::NoStoryCards.into());
    }

    let mut manifest = Manifest::new(
        &config.base,
        &config.start_url,
        config.headless,
        config.skip_existing_folders,
    );
    manifest.story_count_found_on_grid = total;

    for i in 0..total {
        let n = i + 1;
        info!("=== [{n}/{total}] ===");

        grid::open_story_grid(context, config).await?;
        if i >= grid::story_card_count(context).await? {
            warn!("card count changed after reload; stopping");
            break;
        }

        let grid_url = context.get_url().await?;
        let card_title = grid::card_title(context, i).await;
        info!("clicking card: {card_title}");

        let click = grid::click_card(context, i, &grid_url).await?;
        if !click.clicked() {
            debug::save_debug(context, &config.debug_dir, &format!("cannot_click_card_{n}")).await;
            warn!("could not click card {n}; skipping");
            continue;
        }
        renderer::pause(1000).await;

        if is_login_page(&context.get_url().await?) {
            debug::save_debug(context, &config.debug_dir, &format!("login_bounce_story_{n}"))
                .await;
            return Err(ScrapeError::LoginBounce { story: n }.into());
        }

        let session = HttpSession::from_cookies(context.cookies().await?, auth_source.clone());
        let mut story = story::download_current_story(
            context,
            client,
            &session,
            &config.out_dir,
            config.skip_existing_folders,
            &config.base,
            &config.debug_dir,
        )
        .await?;
        story.grid_title_guess = Some(card_title);
        manifest.push_story(story);
    }

    Ok(manifest)
}
