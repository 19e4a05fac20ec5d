//! Saving the story currently open in the browser.

use crate::acquisition::http_client::HttpClient;
use crate::acquisition::http_session::HttpSession;
use crate::gallery::debug::save_debug;
use crate::gallery::download::download_with_retry;
use crate::gallery::grid::scroll_to_load;
use crate::gallery::lightbox::{collect_fullsize_urls_via_lightbox, extract_image_urls_from_dom};
use crate::gallery::manifest::{write_json, ImageRecord, StoryRecord};
use crate::gallery::names::{safe_name, truncate_chars, MAX_NAME_LEN};
use crate::images::file_ext_from_url;
use crate::renderer::{self, RenderContext};
use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{info, warn};

fn month_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(Jan|January|Feb|February|Mar|March|Apr|April|May|Jun|June|Jul|July|Aug|August|Sep|Sept|September|Oct|October|Nov|November|Dec|December)\b",
        )
        .expect("month regex is valid")
    })
}

/// Title from the first `h1`, date from the first text mentioning a month.
pub async fn guess_story_title_date(context: &dyn RenderContext) -> (String, String) {
    let title = context
        .execute_js(
            "(() => { const h = document.querySelector('h1'); return h ? (h.innerText || h.textContent || '') : ''; })()",
        )
        .await
        .ok()
        .and_then(|v| v.as_str().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    // Text of every element that directly holds a text node, in document order.
    let texts: Vec<String> = context
        .execute_js(
            r#"(() => {
                const out = [];
                const walker = document.createTreeWalker(document.body, NodeFilter.SHOW_TEXT);
                let node;
                while ((node = walker.nextNode())) {
                    const el = node.parentElement;
                    if (!el || el.tagName === 'SCRIPT' || el.tagName === 'STYLE') continue;
                    if (!node.textContent.trim()) continue;
                    if (out.length && out[out.length - 1].el === el) continue;
                    out.push({ el, text: el.innerText || el.textContent || '' });
                }
                return out.map(o => o.text);
            })()"#,
        )
        .await
        .ok()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    (title, pick_date_text(&texts))
}

/// First text with a whole-word month name, capped at 40 characters.
pub(crate) fn pick_date_text(texts: &[String]) -> String {
    texts
        .iter()
        .find(|t| month_re().is_match(t))
        .map(|t| {
            let t = t.trim();
            if t.chars().count() > 40 {
                truncate_chars(t, 40).trim().to_string()
            } else {
                t.to_string()
            }
        })
        .unwrap_or_default()
}

/// Folder name for a story: the title, with the date appended when known.
pub fn story_folder_name(title: &str, date_text: &str) -> String {
    let base = safe_name(title, MAX_NAME_LEN);
    if date_text.is_empty() {
        base
    } else {
        safe_name(&format!("{base} - {date_text}"), MAX_NAME_LEN)
    }
}

/// Download every image of the open story into its own folder under `out_root`.
pub async fn download_current_story(
    context: &dyn RenderContext,
    client: &HttpClient,
    session: &HttpSession,
    out_root: &Path,
    skip_existing: bool,
    base: &str,
    debug_dir: &Path,
) -> Result<StoryRecord> {
    if !renderer::wait_for_selector(context, "h1", 45_000).await {
        save_debug(context, debug_dir, "story_no_h1").await;
    }

    scroll_to_load(context, 18, 350).await;

    let (title, date_text) = guess_story_title_date(context).await;
    let folder = out_root.join(story_folder_name(&title, &date_text));
    let final_url = context.get_url().await?;

    if skip_existing && folder.exists() {
        info!("skipping (folder already exists): {}", folder.display());
        return Ok(StoryRecord {
            final_url,
            title,
            date_text,
            skipped_existing_folder: true,
            folder: folder.display().to_string(),
            ..StoryRecord::default()
        });
    }

    std::fs::create_dir_all(&folder)
        .with_context(|| format!("creating {}", folder.display()))?;

    let mut image_urls = collect_fullsize_urls_via_lightbox(context, base).await?;
    if image_urls.is_empty() {
        image_urls = extract_image_urls_from_dom(context, base).await?;
    }

    info!("story: {title} ({} images)", image_urls.len());

    let mut record = StoryRecord {
        final_url,
        title,
        date_text,
        folder: folder.display().to_string(),
        image_count_found: image_urls.len(),
        ..StoryRecord::default()
    };

    for (i, url) in image_urls.iter().enumerate() {
        let index = i + 1;
        let fname = format!("{index:03}{}", file_ext_from_url(url));
        let dest = folder.join(&fname);

        let downloaded = download_with_retry(client, session, url, &dest).await;
        if downloaded {
            info!("  saved {fname}");
        } else {
            warn!("  FAILED {fname} ({url})");
        }

        record.images.push(ImageRecord {
            index,
            url: url.clone(),
            file: dest.display().to_string(),
            downloaded,
        });
    }

    write_json(&folder.join("story.json"), &record)?;
    Ok(record)
}
