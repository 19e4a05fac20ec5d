//! Thin reqwest wrapper used for page fetches and image downloads.

use anyhow::{Context, Result};
use std::time::Duration;

/// A fetched text resource.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// URL after redirects.
    pub final_url: String,
    pub status: u16,
    /// Body decoded as UTF-8 regardless of the declared charset.
    pub body: String,
}

/// A fetched binary resource.
#[derive(Debug, Clone)]
pub struct HttpBytes {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpBytes {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Shared HTTP client with a fixed user agent.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build a client that sends `user_agent` on every request.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("building HTTP client")?;
        Ok(Self { client })
    }

    /// GET a page as text.
    ///
    /// The body is always decoded as UTF-8 so typographic quotes and dashes
    /// survive servers that mislabel their charset.
    pub async fn get(&self, url: &str, timeout_ms: u64) -> Result<HttpResponse> {
        let resp = self
            .client
            .get(url)
            .timeout(Duration::from_millis(timeout_ms))
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let bytes = resp
            .bytes()
            .await
            .with_context(|| format!("reading body of {url}"))?;

        Ok(HttpResponse {
            final_url,
            status,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }

    /// GET raw bytes with extra request headers (e.g. a session `Cookie`).
    pub async fn get_bytes(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout_ms: u64,
    ) -> Result<HttpBytes> {
        let mut req = self
            .client
            .get(url)
            .timeout(Duration::from_millis(timeout_ms));
        for (name, value) in headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = req.send().await.with_context(|| format!("GET {url}"))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .with_context(|| format!("reading body of {url}"))?
            .to_vec();

        Ok(HttpBytes { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_decodes_utf8_and_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", "test-agent/1.0"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=iso-8859-1")
                    .set_body_bytes("“Quoted” — dash".as_bytes()),
            )
            .mount(&server)
            .await;

        let client = HttpClient::new("test-agent/1.0").unwrap();
        let resp = client
            .get(&format!("{}/page", server.uri()), 5_000)
            .await
            .unwrap();

        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, "“Quoted” — dash");
        assert!(resp.final_url.ends_with("/page"));
    }

    #[tokio::test]
    async fn test_get_bytes_forwards_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.jpg"))
            .and(header("cookie", "sid=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let client = HttpClient::new("test-agent/1.0").unwrap();
        let got = client
            .get_bytes(
                &format!("{}/img.jpg", server.uri()),
                &[("Cookie".to_string(), "sid=abc".to_string())],
                5_000,
            )
            .await
            .unwrap();

        assert!(got.is_success());
        assert_eq!(got.body, vec![1, 2, 3]);
    }
}
