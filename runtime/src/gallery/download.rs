//! Image downloads over the authenticated HTTP session.

use crate::acquisition::http_client::HttpClient;
use crate::acquisition::http_session::HttpSession;
use crate::renderer;
use std::path::Path;
use tracing::debug;

const DOWNLOAD_TIMEOUT_MS: u64 = 120_000;
const RETRY_PAUSE_MS: u64 = 600;

/// Fetch `url` into `dest`. Any failure is reported as `false`.
pub async fn download_file(
    client: &HttpClient,
    session: &HttpSession,
    url: &str,
    dest: &Path,
) -> bool {
    let headers = session.headers_for(url);
    match client.get_bytes(url, &headers, DOWNLOAD_TIMEOUT_MS).await {
        Ok(resp) if resp.is_success() => match std::fs::write(dest, &resp.body) {
            Ok(()) => true,
            Err(e) => {
                debug!("cannot write {}: {e}", dest.display());
                false
            }
        },
        Ok(resp) => {
            debug!(status = resp.status, "download refused: {url}");
            false
        }
        Err(e) => {
            debug!("download failed: {url}: {e:#}");
            false
        }
    }
}

/// [`download_file`] with one retry after a short pause.
pub async fn download_with_retry(
    client: &HttpClient,
    session: &HttpSession,
    url: &str,
    dest: &Path,
) -> bool {
    if download_file(client, session, url, dest).await {
        return true;
    }
    renderer::pause(RETRY_PAUSE_MS).await;
    download_file(client, session, url, dest).await
}
