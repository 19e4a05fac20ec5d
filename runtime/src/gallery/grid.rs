//! The story card grid on the gallery start page.

use crate::acquisition::auth::is_login_page;
use crate::config::GalleryConfig;
use crate::error::ScrapeError;
use crate::gallery::debug::save_debug;
use crate::gallery::names::{collapse_whitespace, truncate_chars};
use crate::renderer::{self, js_str, RenderContext};
use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, info};

/// CSS selector for one story card. Both classes sit on the same element.
pub const STORY_CARD_SELECTOR: &str = ".sc-1m4vew7-0.bYMucc";

/// How clicking a card went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardClick {
    Card,
    /// The card itself refused the click; its first link took it.
    Link,
    Missing,
    Failed,
}

impl CardClick {
    pub fn clicked(self) -> bool {
        matches!(self, CardClick::Card | CardClick::Link)
    }
}

/// Text candidates for naming a card, in the order they are tried.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CardTexts {
    #[serde(default)]
    headings: Vec<String>,
    #[serde(default)]
    emphasis: Vec<String>,
    #[serde(default)]
    aria: String,
    #[serde(default)]
    text: String,
}

/// Load the grid and wait for story cards to render.
pub async fn open_story_grid(context: &mut dyn RenderContext, config: &GalleryConfig) -> Result<()> {
    info!("opening {}", config.start_url);
    context.navigate(&config.start_url, 120_000).await?;
    renderer::pause(1200).await;

    if is_login_page(&context.get_url().await?) {
        save_debug(context, &config.debug_dir, "redirected_to_login").await;
        return Err(ScrapeError::RedirectedToLogin.into());
    }

    info!("waiting for story cards: {STORY_CARD_SELECTOR}");
    if !renderer::wait_for_selector(context, STORY_CARD_SELECTOR, 60_000).await {
        save_debug(context, &config.debug_dir, "story_cards_not_found").await;
        return Err(ScrapeError::SelectorNotFound {
            what: "story cards",
            selector: STORY_CARD_SELECTOR.to_string(),
        }
        .into());
    }

    renderer::pause(800).await;
    Ok(())
}

pub async fn story_card_count(context: &dyn RenderContext) -> Result<usize> {
    renderer::count(context, STORY_CARD_SELECTOR).await
}

/// Best-effort display title for card `index`.
pub async fn card_title(context: &dyn RenderContext, index: usize) -> String {
    let script = format!(
        r#"(() => {{
            const card = document.querySelectorAll({sel})[{index}];
            if (!card) return null;
            const first = s => {{
                const el = card.querySelector(s);
                return el ? (el.innerText || el.textContent || '').trim() : '';
            }};
            return {{
                headings: [first('h2'), first('h3'), first("[role='heading']")],
                emphasis: [first('strong'), first('b')],
                aria: card.getAttribute('aria-label') || '',
                text: card.innerText || card.textContent || ''
            }};
        }})()"#,
        sel = js_str(STORY_CARD_SELECTOR),
    );

    let texts = context
        .execute_js(&script)
        .await
        .ok()
        .and_then(|v| serde_json::from_value::<CardTexts>(v).ok())
        .unwrap_or_default();
    pick_card_title(&texts)
}

/// Headings, then bold text, then the aria label, then the card text.
pub(crate) fn pick_card_title(texts: &CardTexts) -> String {
    let direct = texts
        .headings
        .iter()
        .chain(texts.emphasis.iter())
        .map(|t| t.trim())
        .find(|t| !t.is_empty());
    if let Some(t) = direct {
        return t.to_string();
    }

    let aria = texts.aria.trim();
    if !aria.is_empty() {
        return aria.to_string();
    }

    let text = collapse_whitespace(texts.text.trim());
    if !text.is_empty() {
        return truncate_chars(&text, 80);
    }

    "Untitled".to_string()
}

/// How long a click gets to move the page off the grid.
const CLICK_NAVIGATION_MS: u64 = 10_000;

/// Click card `index` and wait for the page to leave `grid_url`.
///
/// A click that does not navigate is retried on the first link inside the
/// card. `Failed` means neither took the page anywhere.
pub async fn click_card(
    context: &dyn RenderContext,
    index: usize,
    grid_url: &str,
) -> Result<CardClick> {
    let sel = js_str(STORY_CARD_SELECTOR);
    let card_click = format!(
        r#"(() => {{
            const card = document.querySelectorAll({sel})[{index}];
            if (!card) return 'missing';
            card.scrollIntoView({{ block: 'center' }});
            card.click();
            return 'clicked';
        }})()"#
    );
    // A click that navigates can tear down the script before it returns.
    let outcome = context.execute_js(&card_click).await.ok();
    if outcome.as_ref().and_then(|v| v.as_str()) == Some("missing") {
        return Ok(CardClick::Missing);
    }
    if renderer::wait_for_url_change(context, grid_url, CLICK_NAVIGATION_MS)
        .await
        .is_some()
    {
        return Ok(CardClick::Card);
    }

    debug!("card {index} click stayed on the grid; trying its first link");
    let link_click = format!(
        r#"(() => {{
            const card = document.querySelectorAll({sel})[{index}];
            const link = card && card.querySelector('a');
            if (!link) return 'nolink';
            link.click();
            return 'clicked';
        }})()"#
    );
    let outcome = context.execute_js(&link_click).await.ok();
    if outcome.as_ref().and_then(|v| v.as_str()) == Some("nolink") {
        return Ok(CardClick::Failed);
    }
    if renderer::wait_for_url_change(context, grid_url, CLICK_NAVIGATION_MS)
        .await
        .is_some()
    {
        return Ok(CardClick::Link);
    }
    Ok(CardClick::Failed)
}

/// Scroll down repeatedly so lazy-loaded images render, then return to top.
pub async fn scroll_to_load(context: &dyn RenderContext, max_scrolls: usize, pause_ms: u64) {
    for _ in 0..max_scrolls {
        let _ = context.execute_js("window.scrollBy(0, 1800)").await;
        renderer::pause(pause_ms).await;
    }
    let _ = context.execute_js("window.scrollTo(0, 0)").await;
    renderer::pause(250).await;
}
