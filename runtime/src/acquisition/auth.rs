//! Authentication for the unit history site.
//!
//! Two routes into an authenticated browser: restore cookies from a saved
//! storage state, or type the username and password into the login form.
//! The form route is best-effort and fails when the account requires MFA.

use crate::acquisition::http_session::AuthSource;
use crate::acquisition::storage_state::{self, StorageState};
use crate::config::{Credentials, GalleryConfig};
use crate::error::ScrapeError;
use crate::gallery::debug::save_debug;
use crate::renderer::{self, js_str, RenderContext, Renderer};
use anyhow::Result;
use std::path::Path;
use tracing::{info, warn};

// ---- Login form selectors ---------------------------------------------------

const USERNAME_SELECTORS: &[&str] = &[
    "input[type='email']",
    "input[name='username']",
    "input#username",
    "input[id*='user']",
    "input[autocomplete='username']",
];

const PASSWORD_SELECTORS: &[&str] = &[
    "input[type='password']",
    "input[name='password']",
    "input#password",
    "input[autocomplete='current-password']",
];

const SUBMIT_SELECTORS: &[&str] = &["button[type='submit']", "input[type='submit']"];

/// Button captions tried when no submit control matched.
const SUBMIT_TEXTS: &[&str] = &["Sign in", "Sign In", "Continue", "Next"];

// ---- Public API ---------------------------------------------------------------

/// Guess whether `url` is a sign-in page rather than site content.
pub fn is_login_page(url: &str) -> bool {
    let u = url.to_lowercase();
    u.contains("signin")
        || u.contains("login")
        || u.contains("okta")
        || (u.contains("auth") && u.contains("churchofjesuschrist.org"))
}

/// Log in by filling the login form in `context`.
///
/// Returns early when the start page does not redirect to a login page.
pub async fn attempt_headless_login(
    context: &mut dyn RenderContext,
    start_url: &str,
    credentials: &Credentials,
    debug_dir: &Path,
) -> Result<()> {
    if !credentials.is_complete() {
        return Err(ScrapeError::MissingCredentials.into());
    }

    info!("attempting headless login with LDS_USERNAME/LDS_PASSWORD");
    context.navigate(start_url, 120_000).await?;
    renderer::pause(1500).await;

    if !is_login_page(&context.get_url().await?) {
        info!("not on a login page; likely already authenticated");
        return Ok(());
    }

    if !fill_first(context, USERNAME_SELECTORS, &credentials.username).await {
        save_debug(context, debug_dir, "login_no_username_field").await;
        return Err(ScrapeError::LoginFieldNotFound("username/email").into());
    }

    if !fill_first(context, PASSWORD_SELECTORS, &credentials.password).await {
        save_debug(context, debug_dir, "login_no_password_field").await;
        return Err(ScrapeError::LoginFieldNotFound("password").into());
    }

    let submitted = context
        .execute_js(&submit_script())
        .await
        .map(|v| v.as_bool().unwrap_or(false))
        .unwrap_or(false);
    if !submitted {
        if let Err(e) = context.press_key("Enter").await {
            warn!("could not press Enter on login form: {e}");
        }
    }

    renderer::pause(3000).await;

    if is_login_page(&context.get_url().await?) {
        save_debug(context, debug_dir, "login_still_on_login_page").await;
        return Err(ScrapeError::StillOnLoginPage.into());
    }

    info!("headless login appears successful");
    Ok(())
}

/// Open a browser context that carries the site's auth cookies.
///
/// With a storage-state secret the cookies are restored directly. Otherwise
/// a login is performed, the resulting cookies are saved to the configured
/// storage-state path, and a fresh context is started from them.
pub async fn open_authenticated_context(
    renderer: &dyn Renderer,
    config: &GalleryConfig,
) -> Result<(Box<dyn RenderContext>, AuthSource)> {
    if let Some(b64) = &config.storage_state_b64 {
        let state = storage_state::write_from_b64(&config.storage_state_path, b64)?;
        let context = renderer.new_context().await?;
        context.set_cookies(&state.cookies).await?;
        return Ok((context, AuthSource::StorageState));
    }

    let mut context = renderer.new_context().await?;
    attempt_headless_login(
        context.as_mut(),
        &config.start_url,
        &config.credentials,
        &config.debug_dir,
    )
    .await?;

    let state = StorageState {
        cookies: context.cookies().await?,
        origins: Vec::new(),
    };
    state.save(&config.storage_state_path)?;
    info!(
        "saved {} for this run",
        config.storage_state_path.display()
    );
    context.close().await?;

    let fresh = renderer.new_context().await?;
    fresh.set_cookies(&state.cookies).await?;
    Ok((fresh, AuthSource::Password))
}

// ---- Private helpers ----------------------------------------------------------

/// Fill the first selector that matches. Errors count as a miss.
async fn fill_first(context: &dyn RenderContext, selectors: &[&str], value: &str) -> bool {
    for selector in selectors {
        match renderer::count(context, selector).await {
            Ok(n) if n > 0 => {}
            _ => continue,
        }
        if let Ok(true) = context.fill(selector, value).await {
            return true;
        }
    }
    false
}

fn submit_script() -> String {
    let selectors: Vec<String> = SUBMIT_SELECTORS.iter().map(|s| js_str(s)).collect();
    let texts: Vec<String> = SUBMIT_TEXTS.iter().map(|s| js_str(s)).collect();
    format!(
        r#"(() => {{
            for (const sel of [{selectors}]) {{
                const el = document.querySelector(sel);
                if (el) {{ el.click(); return true; }}
            }}
            const texts = [{texts}];
            for (const b of document.querySelectorAll('button')) {{
                const t = (b.innerText || b.textContent || '').trim();
                if (texts.some(x => t.includes(x))) {{ b.click(); return true; }}
            }}
            return false;
        }})()"#,
        selectors = selectors.join(", "),
        texts = texts.join(", "),
    )
}

// ---- Tests --------------------------------------------------------------------
