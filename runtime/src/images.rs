//! Image URL heuristics shared by both pipelines.
//!
//! Pages advertise several renditions of one picture through `srcset`, and
//! thumbnail services shrink images through query parameters. These helpers
//! pick the largest declared rendition and undo the shrinking.

use regex::Regex;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use url::Url;

/// Query keys that thumbnail services use to downscale an image.
const DOWNSCALING_PARAMS: &[&str] = &[
    "w", "h", "width", "height", "fit", "crop", "rect", "q", "quality", "auto", "format", "dpr",
];

/// Extensions kept as-is when naming downloaded files.
const IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".webp", ".bmp", ".tif", ".tiff", ".heic",
];

fn width_descriptor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\S+)\s+(\d+)w").expect("srcset regex is valid"))
}

/// Return the srcset candidate with the largest `w` descriptor.
///
/// Candidates without a width descriptor are ignored. Returns an empty
/// string when nothing qualifies. On equal widths the later candidate wins.
pub fn largest_from_srcset(srcset: &str) -> String {
    pick_largest(srcset, false)
}

/// Like [`largest_from_srcset`], but candidates without a `w` descriptor
/// count as width 0 instead of being dropped.
pub fn largest_from_srcset_lenient(srcset: &str) -> String {
    pick_largest(srcset, true)
}

fn pick_largest(srcset: &str, lenient: bool) -> String {
    let mut best: Option<(u64, &str)> = None;

    for part in srcset.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let candidate = match width_descriptor_re().captures(part) {
            Some(caps) => {
                let url = caps.get(1).map_or("", |m| m.as_str());
                let width = caps
                    .get(2)
                    .and_then(|m| m.as_str().parse::<u64>().ok())
                    .unwrap_or(0);
                Some((width, url))
            }
            None if lenient => part.split_whitespace().next().map(|tok| (0, tok)),
            None => None,
        };

        if let Some((width, url)) = candidate {
            if best.map_or(true, |(w, _)| width >= w) {
                best = Some((width, url));
            }
        }
    }

    best.map(|(_, url)| url.to_string()).unwrap_or_default()
}

/// Resolve `href` against `base`. Empty input stays empty.
pub fn absolutize(base: &str, href: &str) -> String {
    if href.is_empty() {
        return String::new();
    }
    Url::parse(base)
        .and_then(|b| b.join(href))
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Clean up an image reference pulled out of a DOM attribute.
///
/// Strips whitespace and stray quotes, upgrades protocol-relative URLs to
/// https and resolves root-relative paths against `base`.
pub fn normalize_img_url(base: &str, raw: &str) -> String {
    let u = raw
        .trim()
        .trim_matches(|c| c == ' ' || c == '"' || c == '\'');
    if u.is_empty() {
        return String::new();
    }
    if let Some(rest) = u.strip_prefix("//") {
        return format!("https://{rest}");
    }
    if u.starts_with('/') {
        return absolutize(base, u);
    }
    u.to_string()
}

/// Remove query parameters that make a CDN serve a smaller rendition.
///
/// The URL is returned untouched when it does not parse or carries none of
/// the known parameters.
pub fn strip_downscaling_params(raw: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let kept: Vec<&(String, String)> = pairs
        .iter()
        .filter(|(k, _)| !DOWNSCALING_PARAMS.contains(&k.to_lowercase().as_str()))
        .collect();

    if kept.len() == pairs.len() {
        return raw.to_string();
    }

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    url.to_string()
}

/// File extension for a downloaded image, defaulting to `.jpg`.
pub fn file_ext_from_url(raw: &str) -> String {
    let path = match Url::parse(raw) {
        Ok(u) => u.path().to_string(),
        Err(_) => raw.split(['?', '#']).next().unwrap_or("").to_string(),
    };
    let ext = Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        ext
    } else {
        ".jpg".to_string()
    }
}

/// Drop empty strings and repeats, keeping first-seen order.
pub fn dedupe_preserving_order<I>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|u| !u.is_empty() && seen.insert(u.clone()))
        .collect()
}
