//! Browser rendering seam.
//!
//! Pipelines talk to a page through [`RenderContext`] and never to the CDP
//! client directly. Most DOM work is done by evaluating small scripts, so a
//! scripted context can stand in for Chromium in tests.

pub mod chromium;
#[cfg(test)]
pub(crate) mod fake;

use crate::acquisition::storage_state::BrowserCookie;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Outcome of a top-level navigation.
#[derive(Debug, Clone, Default)]
pub struct NavigationResult {
    /// URL after redirects.
    pub final_url: String,
    pub load_time_ms: u64,
}

/// A single browser tab with its cookie jar.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate and wait for the document to load.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;

    /// Evaluate a script and return its JSON-serializable result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;

    async fn get_url(&self) -> Result<String>;

    /// Serialized HTML of the current document.
    async fn content(&self) -> Result<String>;

    /// Full-page PNG screenshot.
    async fn screenshot(&self) -> Result<Vec<u8>>;

    /// Replace the value of the first element matching `selector` by typing.
    /// Returns `false` if nothing matched.
    async fn fill(&self, selector: &str, value: &str) -> Result<bool>;

    /// Press a key (e.g. `Enter`, `Escape`) on the focused element.
    async fn press_key(&self, key: &str) -> Result<()>;

    async fn cookies(&self) -> Result<Vec<BrowserCookie>>;

    async fn set_cookies(&self, cookies: &[BrowserCookie]) -> Result<()>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Source of fresh browser contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;

    /// Close the browser and every context it owns.
    async fn shutdown(&self) -> Result<()>;
}

/// Quote a string as a JavaScript literal.
pub fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Sleep for `ms` milliseconds.
pub async fn pause(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// Number of elements matching `selector`. Invalid selectors count as zero.
pub async fn count(context: &dyn RenderContext, selector: &str) -> Result<usize> {
    let script = format!(
        "(() => {{ try {{ return document.querySelectorAll({}).length; }} catch (e) {{ return 0; }} }})()",
        js_str(selector)
    );
    let value = context.execute_js(&script).await?;
    Ok(value.as_u64().unwrap_or(0) as usize)
}

/// Poll until `selector` matches at least one element.
///
/// Returns `false` once `timeout_ms` has elapsed without a match. Script
/// errors count as no match, since the page may be mid-navigation.
pub async fn wait_for_selector(
    context: &dyn RenderContext,
    selector: &str,
    timeout_ms: u64,
) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if matches!(count(context, selector).await, Ok(n) if n > 0) {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        pause(250).await;
    }
}

/// Poll until the page URL is something other than `from`.
///
/// Returns the new URL, or `None` if it has not changed within `timeout_ms`.
pub async fn wait_for_url_change(
    context: &dyn RenderContext,
    from: &str,
    timeout_ms: u64,
) -> Option<String> {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if let Ok(url) = context.get_url().await {
            if url != from {
                return Some(url);
            }
        }
        if Instant::now() >= deadline {
            return None;
        }
        pause(250).await;
    }
}

#[cfg(test)]
mod tests {
    use super::fake::ScriptedContext;
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_js_str_escapes_quotes() {
        assert_eq!(js_str("a'b\"c"), r#""a'b\"c""#);
        assert_eq!(js_str(".x.y"), "\".x.y\"");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_selector_polls_until_present() {
        let ctx = ScriptedContext::new("https://example.org/");
        ctx.on_seq(
            "querySelectorAll(\".card\").length",
            vec![json!(0), json!(0), json!(3)],
        );

        assert!(wait_for_selector(&ctx, ".card", 5_000).await);
        assert_eq!(ctx.scripts_matching(".card").len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_selector_times_out() {
        let ctx = ScriptedContext::new("https://example.org/");
        assert!(!wait_for_selector(&ctx, ".missing", 1_000).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_selector_rides_out_navigation_errors() {
        let ctx = ScriptedContext::new("https://example.org/story/1");
        ctx.on("querySelectorAll(\"h1\").length", json!(1));
        ctx.fail_scripts(2);

        assert!(wait_for_selector(&ctx, "h1", 45_000).await);
        assert_eq!(ctx.scripts_matching("h1").len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_url_change() {
        let ctx = ScriptedContext::new("https://example.org/");
        assert_eq!(wait_for_url_change(&ctx, "https://example.org/", 1_000).await, None);

        ctx.on_then_url("go()", Value::Null, "https://example.org/story/7");
        ctx.execute_js("go()").await.unwrap();
        assert_eq!(
            wait_for_url_change(&ctx, "https://example.org/", 1_000).await.as_deref(),
            Some("https://example.org/story/7")
        );
    }
}
