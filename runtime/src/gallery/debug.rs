//! Failure artifacts: a full-page screenshot and the page HTML.

use crate::renderer::RenderContext;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Paths written by [`save_debug`].
#[derive(Debug, Clone)]
pub struct DebugArtifacts {
    pub screenshot: PathBuf,
    pub html: PathBuf,
}

/// Save `{tag}_{timestamp}.png` and `.html` into `dir`.
///
/// Write failures are swallowed: the artifacts only help diagnose the error
/// that is about to be raised, and must not replace it.
pub async fn save_debug(context: &dyn RenderContext, dir: &Path, tag: &str) -> DebugArtifacts {
    let ts = Local::now().format("%Y%m%d-%H%M%S");
    let artifacts = DebugArtifacts {
        screenshot: dir.join(format!("{tag}_{ts}.png")),
        html: dir.join(format!("{tag}_{ts}.html")),
    };
    let _ = std::fs::create_dir_all(dir);

    if let Ok(png) = context.screenshot().await {
        let _ = std::fs::write(&artifacts.screenshot, png);
    }
    if let Ok(html) = context.content().await {
        let _ = std::fs::write(&artifacts.html, html);
    }

    warn!("saved debug screenshot: {}", artifacts.screenshot.display());
    warn!("saved debug HTML:       {}", artifacts.html.display());
    artifacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::fake::ScriptedContext;

    #[tokio::test]
    async fn test_save_debug_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ScriptedContext::new("https://example.org/");

        let out = save_debug(&ctx, dir.path(), "zero_cards").await;

        let name = out.screenshot.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("zero_cards_"));
        assert_eq!(std::fs::read(&out.screenshot).unwrap(), b"\x89PNG");
        assert!(std::fs::read_to_string(&out.html).unwrap().contains("<body>"));
    }
}
