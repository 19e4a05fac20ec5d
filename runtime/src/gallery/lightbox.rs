//! Full-size image discovery on a story page.
//!
//! Story pages show thumbnails; clicking one opens a lightbox holding the
//! full rendition. The primary strategy clicks through every sizeable
//! thumbnail and reads the lightbox image. When that yields nothing, every
//! image reference in the DOM is collected instead.

use crate::images::{
    dedupe_preserving_order, largest_from_srcset_lenient, normalize_img_url,
    strip_downscaling_params,
};
use crate::renderer::{self, js_str, RenderContext};
use anyhow::Result;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::debug;

/// Where thumbnails are looked for; the first selector with matches wins.
const THUMB_SELECTORS: &[&str] = &["main img", "article img", "img"];

/// Where the enlarged image shows up once a thumbnail is clicked.
const LIGHTBOX_IMG_SELECTORS: &[&str] = &[
    "[role='dialog'] img",
    ".modal img",
    ".lightbox img",
    "div[aria-modal='true'] img",
    "img[style*='max-width']",
    "img[style*='maxHeight']",
];

const CLOSE_SELECTORS: &[&str] = &[
    "button[aria-label*='Close']",
    "button[title*='Close']",
    "[role='button'][aria-label*='Close']",
];

/// Button captions that close the lightbox, matched case-insensitively.
const CLOSE_TEXTS: &[&str] = &["close", "×", "x"];

/// Thumbnails smaller than this are icons or avatars.
const MIN_THUMB_WIDTH: f64 = 120.0;
const MIN_THUMB_HEIGHT: f64 = 90.0;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ThumbBox {
    pub index: usize,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Default, Deserialize)]
struct ThumbScan {
    selector: String,
    #[serde(default)]
    boxes: Vec<ThumbBox>,
}

/// `srcset`/`src` of the first element of one lightbox selector.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ImgAttrs {
    #[serde(default)]
    pub srcset: String,
    #[serde(default)]
    pub src: String,
}

/// Click through thumbnails and collect full-size image URLs.
///
/// Results have downscaling parameters removed and keep first-seen order.
pub async fn collect_fullsize_urls_via_lightbox(
    context: &dyn RenderContext,
    base: &str,
) -> Result<Vec<String>> {
    let Some(scan) = scan_thumbnails(context).await? else {
        return Ok(Vec::new());
    };

    let mut full_urls = Vec::new();
    for index in candidate_indices(&scan.boxes) {
        if !click_thumbnail(context, &scan.selector, index).await {
            debug!(index, "thumbnail not clickable");
            continue;
        }
        renderer::pause(350).await;

        let mut best = read_lightbox_url(context, base).await;
        if best.is_empty() && click_thumbnail_parent(context, &scan.selector, index).await {
            debug!(index, "no lightbox from thumbnail; clicked its parent");
            renderer::pause(350).await;
            best = read_lightbox_url(context, base).await;
        }
        if !best.is_empty() {
            full_urls.push(best);
        }

        close_lightbox(context).await;
        renderer::pause(150).await;
    }

    Ok(dedupe_preserving_order(
        full_urls.iter().map(|u| strip_downscaling_params(u)),
    ))
}

/// Indices of thumbnails large enough to be photos, deduplicated in order.
pub(crate) fn candidate_indices(boxes: &[ThumbBox]) -> Vec<usize> {
    let mut seen = BTreeSet::new();
    boxes
        .iter()
        .filter(|b| b.width >= MIN_THUMB_WIDTH && b.height >= MIN_THUMB_HEIGHT)
        .map(|b| b.index)
        .filter(|i| seen.insert(*i))
        .collect()
}

/// First lightbox candidate that yields a URL: largest srcset entry, else src.
pub(crate) fn best_lightbox_url(base: &str, candidates: &[ImgAttrs]) -> String {
    for attrs in candidates {
        let mut best = String::new();
        if !attrs.srcset.trim().is_empty() {
            best = normalize_img_url(base, &largest_from_srcset_lenient(&attrs.srcset));
        }
        if best.is_empty() {
            best = normalize_img_url(base, &attrs.src);
        }
        if !best.is_empty() {
            return best;
        }
    }
    String::new()
}

async fn scan_thumbnails(context: &dyn RenderContext) -> Result<Option<ThumbScan>> {
    let selectors: Vec<String> = THUMB_SELECTORS.iter().map(|s| js_str(s)).collect();
    let script = format!(
        r#"(() => {{
            for (const sel of [{selectors}]) {{
                const nodes = Array.from(document.querySelectorAll(sel));
                if (nodes.length === 0) continue;
                return {{
                    selector: sel,
                    boxes: nodes.map((el, index) => {{
                        const r = el.getBoundingClientRect();
                        return {{ index, width: r.width, height: r.height }};
                    }})
                }};
            }}
            return null;
        }})()"#,
        selectors = selectors.join(", "),
    );

    let value = context.execute_js(&script).await?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

async fn click_thumbnail(context: &dyn RenderContext, selector: &str, index: usize) -> bool {
    let script = format!(
        r#"(() => {{
            const el = document.querySelectorAll({sel})[{index}];
            if (!el) return false;
            el.scrollIntoView({{ block: 'center' }});
            el.click();
            return true;
        }})()"#,
        sel = js_str(selector),
    );
    renderer::pause(150).await;
    run_click(context, &script).await
}

/// Some galleries put the click handler on the thumbnail's wrapper.
async fn click_thumbnail_parent(
    context: &dyn RenderContext,
    selector: &str,
    index: usize,
) -> bool {
    let script = format!(
        r#"(() => {{
            const el = document.querySelectorAll({sel})[{index}];
            const parent = el && el.parentElement;
            if (!parent) return false;
            parent.click();
            return true;
        }})()"#,
        sel = js_str(selector),
    );
    run_click(context, &script).await
}

async fn run_click(context: &dyn RenderContext, script: &str) -> bool {
    context
        .execute_js(script)
        .await
        .map(|v| v.as_bool().unwrap_or(false))
        .unwrap_or(false)
}

async fn read_lightbox_url(context: &dyn RenderContext, base: &str) -> String {
    match read_lightbox_attrs(context).await {
        Ok(attrs) => best_lightbox_url(base, &attrs),
        Err(_) => String::new(),
    }
}

async fn read_lightbox_attrs(context: &dyn RenderContext) -> Result<Vec<ImgAttrs>> {
    let selectors: Vec<String> = LIGHTBOX_IMG_SELECTORS.iter().map(|s| js_str(s)).collect();
    let script = format!(
        r#"(() => {{
            const found = [];
            for (const sel of [{selectors}]) {{
                const img = document.querySelector(sel);
                if (!img) continue;
                found.push({{
                    srcset: img.getAttribute('srcset') || '',
                    src: img.getAttribute('src') || ''
                }});
            }}
            return found;
        }})()"#,
        selectors = selectors.join(", "),
    );
    let value = context.execute_js(&script).await?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Escape first, then the first close control that exists.
async fn close_lightbox(context: &dyn RenderContext) {
    if context.press_key("Escape").await.is_ok() {
        renderer::pause(250).await;
    }

    if run_click(context, &close_script()).await {
        renderer::pause(250).await;
    }
}

fn close_script() -> String {
    let selectors: Vec<String> = CLOSE_SELECTORS.iter().map(|s| js_str(s)).collect();
    let texts: Vec<String> = CLOSE_TEXTS.iter().map(|s| js_str(s)).collect();
    format!(
        r#"(() => {{
            const press = el => el.dispatchEvent(new MouseEvent('click', {{ bubbles: true }}));
            for (const sel of [{selectors}]) {{
                const el = document.querySelector(sel);
                if (el) {{ press(el); return true; }}
            }}
            const buttons = Array.from(document.querySelectorAll('button'));
            for (const text of [{texts}]) {{
                const b = buttons.find(b =>
                    (b.innerText || b.textContent || '').toLowerCase().includes(text.toLowerCase()));
                if (b) {{ press(b); return true; }}
            }}
            const svg = document.querySelector("svg[aria-label*='Close']");
            if (svg) {{ press(svg); return true; }}
            return false;
        }})()"#,
        selectors = selectors.join(", "),
        texts = texts.join(", "),
    )
}

/// Every image reference in the DOM, as a fallback to the lightbox.
///
/// Returns unique URLs in sorted order with downscaling parameters removed.
pub async fn extract_image_urls_from_dom(
    context: &dyn RenderContext,
    base: &str,
) -> Result<Vec<String>> {
    let script = r#"(() => {
        const urls = new Set();
        for (const img of Array.from(document.querySelectorAll('img'))) {
            const src = img.getAttribute('src') || '';
            const dataSrc = img.getAttribute('data-src') || img.getAttribute('data-lazy-src') || '';
            const srcset = img.getAttribute('srcset') || '';
            if (src) urls.add(src);
            if (dataSrc) urls.add(dataSrc);
            if (srcset) urls.add(srcset);
        }
        for (const s of Array.from(document.querySelectorAll('picture source'))) {
            const srcset = s.getAttribute('srcset') || '';
            if (srcset) urls.add(srcset);
        }
        return Array.from(urls);
    })()"#;

    let value = context.execute_js(script).await?;
    let raw: Vec<String> = serde_json::from_value(value).unwrap_or_default();
    let cleaned = clean_dom_urls(base, &raw);
    Ok(dedupe_preserving_order(
        cleaned.iter().map(|u| strip_downscaling_params(u)),
    ))
}

/// Resolve srcsets, normalize, drop inline data, then sort unique.
pub(crate) fn clean_dom_urls(base: &str, raw: &[String]) -> Vec<String> {
    let mut out = BTreeSet::new();
    for item in raw {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        let looks_like_srcset = item.contains(',') && (item.contains('w') || item.contains('x'));
        let url = if looks_like_srcset {
            normalize_img_url(base, &largest_from_srcset_lenient(item))
        } else {
            normalize_img_url(base, item)
        };
        if !url.is_empty() {
            out.insert(url);
        }
    }

    out.into_iter()
        .filter(|u| {
            let low = u.to_lowercase();
            !low.starts_with("data:") && !low.starts_with("blob:")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::fake::ScriptedContext;
    use serde_json::json;

    const BASE: &str = "https://unithistory.churchofjesuschrist.org";

    fn tb(index: usize, width: f64, height: f64) -> ThumbBox {
        ThumbBox { index, width, height }
    }

    #[test]
    fn test_candidate_indices_filters_small_thumbnails() {
        let boxes = vec![tb(0, 32.0, 32.0), tb(1, 300.0, 200.0), tb(2, 120.0, 89.0), tb(3, 120.0, 90.0)];
        assert_eq!(candidate_indices(&boxes), vec![1, 3]);
    }

    #[test]
    fn test_best_lightbox_url_prefers_srcset_then_src_then_next_selector() {
        let attrs = vec![
            ImgAttrs::default(),
            ImgAttrs {
                srcset: "/a/small.jpg 200w, /a/big.jpg 1600w".into(),
                src: "/a/src.jpg".into(),
            },
        ];
        assert_eq!(
            best_lightbox_url(BASE, &attrs),
            "https://unithistory.churchofjesuschrist.org/a/big.jpg"
        );

        let attrs = vec![ImgAttrs {
            srcset: "  ".into(),
            src: "//cdn.example.com/p.png".into(),
        }];
        assert_eq!(best_lightbox_url(BASE, &attrs), "https://cdn.example.com/p.png");
        assert_eq!(best_lightbox_url(BASE, &[]), "");
    }

    #[test]
    fn test_clean_dom_urls() {
        let raw = vec![
            "/media/b.jpg".to_string(),
            "https://cdn.example.com/a.jpg 400w, https://cdn.example.com/a-big.jpg 1200w".into(),
            "data:image/gif;base64,R0lGOD".into(),
            "blob:https://unithistory.churchofjesuschrist.org/123".into(),
            "/media/b.jpg".into(),
            "  ".into(),
        ];
        assert_eq!(
            clean_dom_urls(BASE, &raw),
            vec![
                "https://cdn.example.com/a-big.jpg".to_string(),
                "https://unithistory.churchofjesuschrist.org/media/b.jpg".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_lightbox_click_through() {
        let ctx = ScriptedContext::new("https://unithistory.churchofjesuschrist.org/story/1");
        ctx.on(
            "getBoundingClientRect",
            json!({
                "selector": "main img",
                "boxes": [
                    { "index": 0, "width": 40, "height": 40 },
                    { "index": 1, "width": 320, "height": 240 },
                    { "index": 2, "width": 320, "height": 240 },
                    { "index": 3, "width": 320, "height": 240 }
                ]
            }),
        );
        ctx.on("el.scrollIntoView", json!(true));
        ctx.on_seq(
            "const found = []",
            vec![
                json!([{ "srcset": "", "src": "https://cdn.example.com/1.jpg?w=400&sig=a" }]),
                json!([{ "srcset": "/m/2-small.jpg 300w, /m/2.jpg 2000w", "src": "" }]),
                json!([{ "srcset": "", "src": "https://cdn.example.com/1.jpg?w=800&sig=a" }]),
            ],
        );
        ctx.on("MouseEvent('click'", json!(true));

        let urls = collect_fullsize_urls_via_lightbox(&ctx, BASE).await.unwrap();

        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/1.jpg?sig=a".to_string(),
                "https://unithistory.churchofjesuschrist.org/m/2.jpg".to_string(),
            ]
        );
        assert_eq!(ctx.keys(), vec!["Escape"; 3]);
        assert_eq!(ctx.scripts_matching("el.scrollIntoView").len(), 3);
        assert!(ctx.scripts_matching("parent.click()").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lightbox_falls_back_to_thumbnail_parent() {
        let ctx = ScriptedContext::new("https://unithistory.churchofjesuschrist.org/story/1");
        ctx.on(
            "getBoundingClientRect",
            json!({ "selector": "img", "boxes": [{ "index": 0, "width": 320, "height": 240 }] }),
        );
        ctx.on("el.scrollIntoView", json!(true));
        ctx.on("parent.click()", json!(true));
        ctx.on_seq(
            "const found = []",
            vec![json!([]), json!([{ "srcset": "", "src": "/m/7.jpg" }])],
        );

        let urls = collect_fullsize_urls_via_lightbox(&ctx, BASE).await.unwrap();

        assert_eq!(urls, vec!["https://unithistory.churchofjesuschrist.org/m/7.jpg".to_string()]);
        assert_eq!(ctx.scripts_matching("parent.click()").len(), 1);
        assert_eq!(ctx.scripts_matching("const found = []").len(), 2);
    }

    #[test]
    fn test_close_texts_match_any_case() {
        assert!(CLOSE_TEXTS.iter().all(|t| *t == t.to_lowercase()));
        let script = close_script();
        assert!(script.contains(".toLowerCase().includes(text.toLowerCase())"));
        assert!(script.contains(r#""close", "×", "x""#));
    }

    #[tokio::test]
    async fn test_lightbox_without_thumbnails() {
        let ctx = ScriptedContext::new("https://unithistory.churchofjesuschrist.org/story/1");
        let urls = collect_fullsize_urls_via_lightbox(&ctx, BASE).await.unwrap();
        assert!(urls.is_empty());
        assert!(ctx.keys().is_empty());
    }

    #[tokio::test]
    async fn test_extract_image_urls_from_dom_strips_and_dedupes() {
        let ctx = ScriptedContext::new("https://unithistory.churchofjesuschrist.org/story/1");
        ctx.on(
            "picture source",
            json!([
                "https://cdn.example.com/z.jpg?width=100",
                "https://cdn.example.com/z.jpg?width=300",
                "/local/a.png"
            ]),
        );

        let urls = extract_image_urls_from_dom(&ctx, BASE).await.unwrap();
        assert_eq!(
            urls,
            vec![
                "https://cdn.example.com/z.jpg".to_string(),
                "https://unithistory.churchofjesuschrist.org/local/a.png".to_string(),
            ]
        );
    }
}
