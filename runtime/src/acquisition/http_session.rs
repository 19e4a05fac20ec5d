//! HTTP session carried over from the browser.
//!
//! Image downloads run over plain HTTP but must present the same cookies the
//! authenticated browser holds. An `HttpSession` snapshots those cookies and
//! builds the `Cookie` header for each download URL.

use crate::acquisition::storage_state::BrowserCookie;
use url::Url;

/// How the browser session was authenticated.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthSource {
    /// Cookies restored from a saved storage state.
    StorageState,
    /// Username/password typed into the login form.
    Password,
    /// No authentication.
    None,
}

/// Cookies captured from an authenticated browser context.
#[derive(Debug, Clone)]
pub struct HttpSession {
    pub cookies: Vec<BrowserCookie>,
    pub auth_source: AuthSource,
}

impl HttpSession {
    pub fn new(auth_source: AuthSource) -> Self {
        Self {
            cookies: Vec::new(),
            auth_source,
        }
    }

    /// Snapshot a browser's cookie jar.
    pub fn from_cookies(cookies: Vec<BrowserCookie>, auth_source: AuthSource) -> Self {
        let mut session = Self::new(auth_source);
        session.cookies = cookies;
        session
    }

    /// `Cookie` header value for a request to `url`, if any cookie applies.
    ///
    /// Cookies are matched on domain (exact host or a parent domain), path
    /// prefix and the `secure` flag, and emitted sorted by name.
    pub fn cookie_header_for(&self, url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        let host = url.host_str()?.to_lowercase();
        let is_https = url.scheme() == "https";
        let path = url.path();

        let mut pairs: Vec<&BrowserCookie> = self
            .cookies
            .iter()
            .filter(|c| domain_matches(&host, &c.domain))
            .filter(|c| path.starts_with(c.path.as_str()))
            .filter(|c| is_https || !c.secure)
            .collect();
        if pairs.is_empty() {
            return None;
        }
        pairs.sort_by(|a, b| a.name.cmp(&b.name));

        Some(
            pairs
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Request headers to attach to a download of `url`.
    pub fn headers_for(&self, url: &str) -> Vec<(String, String)> {
        self.cookie_header_for(url)
            .map(|h| vec![("Cookie".to_string(), h)])
            .unwrap_or_default()
    }
}

fn domain_matches(host: &str, cookie_domain: &str) -> bool {
    let domain = cookie_domain.trim_start_matches('.').to_lowercase();
    if domain.is_empty() {
        return false;
    }
    host == domain || host.ends_with(&format!(".{domain}"))
}
