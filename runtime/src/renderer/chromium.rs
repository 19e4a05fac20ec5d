//! Chromium-backed renderer over the Chrome DevTools Protocol.

use super::{NavigationResult, RenderContext, Renderer};
use crate::acquisition::storage_state::BrowserCookie;
use crate::error::ScrapeError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    Cookie, CookieParam, CookieSameSite, TimeSinceEpoch,
};
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// How to start the browser.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub executable: Option<PathBuf>,
    /// Needed inside most containers.
    pub no_sandbox: bool,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            no_sandbox: false,
        }
    }
}

/// A launched Chromium process.
pub struct ChromiumRenderer {
    browser: Arc<Mutex<Browser>>,
    handler: Mutex<Option<JoinHandle<()>>>,
}

impl ChromiumRenderer {
    /// Launch Chromium and start pumping CDP events.
    pub async fn launch(options: &LaunchOptions) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(Duration::from_secs(120))
            .window_size(1366, 900);
        if !options.headless {
            builder = builder.with_head();
        }
        if options.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &options.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(ScrapeError::BrowserLaunch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::BrowserLaunch(e.to_string()))?;

        let task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("cdp handler: {e}");
                }
            }
        });

        info!(headless = options.headless, "chromium launched");
        Ok(Self {
            browser: Arc::new(Mutex::new(browser)),
            handler: Mutex::new(Some(task)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("opening browser tab")?;
        Ok(Box::new(ChromiumContext {
            page,
            browser: Arc::clone(&self.browser),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        {
            let mut browser = self.browser.lock().await;
            browser.close().await.context("closing browser")?;
            let _ = browser.wait().await;
        }
        if let Some(task) = self.handler.lock().await.take() {
            task.abort();
        }
        Ok(())
    }
}

/// One Chromium tab.
///
/// Cookies go through the browser's cookie store (`Storage.getCookies` and
/// `Storage.setCookies`) rather than the tab, so they can be set before the
/// tab has left `about:blank` and read back for every host.
pub struct ChromiumContext {
    page: Page,
    browser: Arc<Mutex<Browser>>,
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();
        tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url))
            .await
            .with_context(|| format!("navigation to {url} timed out after {timeout_ms}ms"))?
            .with_context(|| format!("navigating to {url}"))?;

        let final_url = self.page.url().await?.unwrap_or_else(|| url.to_string());
        Ok(NavigationResult {
            final_url,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self.page.evaluate(script).await.context("evaluating script")?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        let params = ScreenshotParams::builder().full_page(true).build();
        Ok(self.page.screenshot(params).await?)
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<bool> {
        let Ok(element) = self.page.find_element(selector).await else {
            return Ok(false);
        };
        let clear = format!(
            "(() => {{ const el = document.querySelector({}); if (el) el.value = ''; }})()",
            super::js_str(selector)
        );
        self.page.evaluate(clear.as_str()).await?;
        element.click().await?;
        element.type_str(value).await?;
        Ok(true)
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        let element = match self.page.find_element(":focus").await {
            Ok(el) => el,
            Err(_) => self.page.find_element("body").await?,
        };
        element.press_key(key).await?;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        let cookies = self
            .browser
            .lock()
            .await
            .get_cookies()
            .await
            .context("reading browser cookies")?;
        Ok(cookies.into_iter().map(browser_cookie).collect())
    }

    async fn set_cookies(&self, cookies: &[BrowserCookie]) -> Result<()> {
        let params = cookie_params(cookies)?;
        if !params.is_empty() {
            self.browser
                .lock()
                .await
                .set_cookies(params)
                .await
                .context("setting browser cookies")?;
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await?;
        Ok(())
    }
}

fn browser_cookie(c: Cookie) -> BrowserCookie {
    BrowserCookie {
        name: c.name,
        value: c.value,
        domain: c.domain,
        path: c.path,
        expires: c.expires,
        http_only: c.http_only,
        secure: c.secure,
        same_site: c.same_site.map(|s| format!("{s:?}")),
    }
}

/// CDP cookie params keyed on domain and path. No `url` is set, so nothing
/// depends on what the tab currently shows.
fn cookie_params(cookies: &[BrowserCookie]) -> Result<Vec<CookieParam>> {
    let mut params = Vec::with_capacity(cookies.len());
    for c in cookies.iter().filter(|c| !c.domain.is_empty()) {
        let mut builder = CookieParam::builder()
            .name(c.name.clone())
            .value(c.value.clone())
            .domain(c.domain.clone())
            .path(c.path.clone())
            .secure(c.secure)
            .http_only(c.http_only);
        if c.expires > 0.0 {
            builder = builder.expires(TimeSinceEpoch::new(c.expires));
        }
        let same_site = match c.same_site.as_deref() {
            Some("Strict") => Some(CookieSameSite::Strict),
            Some("Lax") => Some(CookieSameSite::Lax),
            Some("None") => Some(CookieSameSite::None),
            _ => None,
        };
        if let Some(same_site) = same_site {
            builder = builder.same_site(same_site);
        }
        params.push(builder.build().map_err(anyhow::Error::msg)?);
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_params_are_not_tied_to_the_tab_url() {
        let mut sid = BrowserCookie::new("sid", "abc", ".churchofjesuschrist.org");
        sid.expires = 1_900_000_000.0;
        sid.secure = true;
        sid.same_site = Some("Lax".into());
        let session = BrowserCookie::new("tmp", "1", "unithistory.churchofjesuschrist.org");
        let hostless = BrowserCookie::new("orphan", "x", "");

        let params = cookie_params(&[sid, session, hostless]).unwrap();
        assert_eq!(params.len(), 2);
        assert!(params.iter().all(|p| p.url.is_none()));

        assert_eq!(params[0].domain.as_deref(), Some(".churchofjesuschrist.org"));
        assert_eq!(params[0].path.as_deref(), Some("/"));
        assert_eq!(params[0].secure, Some(true));
        assert_eq!(params[0].same_site, Some(CookieSameSite::Lax));
        assert_eq!(
            params[0].expires.as_ref().map(|e| *e.inner()),
            Some(1_900_000_000.0)
        );

        // Session cookies stay session cookies.
        assert!(params[1].expires.is_none());
        assert!(params[1].same_site.is_none());
    }
}
