//! Run configuration for both pipelines.
//!
//! The unit history export is configured through environment variables so
//! it can run unattended in CI; CLI flags layered on top take precedence.

use std::path::PathBuf;

/// Root of the church website hosting the weekly manual.
pub const LESSON_BASE: &str = "https://www.churchofjesuschrist.org";

/// Manual the weekly lesson is taken from.
pub const DEFAULT_MANUAL: &str = "come-follow-me-for-home-and-church-old-testament-2026";

/// Where the weekly summary is written.
pub const DEFAULT_LESSON_OUT: &str = "data/come_follow_me_this_week.json";

/// User agent sent with the weekly lesson request.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (compatible; SnowCanyonWardBot/1.0; +https://github.com/kdidso)";

/// Root of the unit history site.
pub const GALLERY_BASE: &str = "https://unithistory.churchofjesuschrist.org";

/// Page holding the story card grid.
pub const GALLERY_START_URL: &str = "https://unithistory.churchofjesuschrist.org/";

const DEFAULT_OUT_DIR: &str = "unit-history/events";
const DEFAULT_ZIP_NAME: &str = "unit-history/unit_history_export.zip";
const DEFAULT_MANIFEST_PATH: &str = "unit-history/manifest.json";
const DEFAULT_STORAGE_STATE_PATH: &str = "storage_state.json";

/// Settings for the weekly lesson scrape.
#[derive(Debug, Clone)]
pub struct LessonConfig {
    pub base: String,
    pub manual: String,
    pub out: PathBuf,
    pub user_agent: String,
    pub timeout_ms: u64,
}

impl Default for LessonConfig {
    fn default() -> Self {
        Self {
            base: LESSON_BASE.to_string(),
            manual: DEFAULT_MANUAL.to_string(),
            out: PathBuf::from(DEFAULT_LESSON_OUT),
            user_agent: USER_AGENT.to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Username/password pair for the headless login fallback.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Settings for the unit history export.
#[derive(Debug, Clone)]
pub struct GalleryConfig {
    pub base: String,
    pub start_url: String,
    pub out_dir: PathBuf,
    pub zip_name: PathBuf,
    pub manifest_path: PathBuf,
    pub storage_state_path: PathBuf,
    /// Where failure screenshots and HTML dumps go.
    pub debug_dir: PathBuf,
    pub headless: bool,
    pub skip_existing_folders: bool,
    pub write_zip: bool,
    /// Base64 Playwright-style storage state exported from a logged-in browser.
    pub storage_state_b64: Option<String>,
    pub credentials: Credentials,
    pub chromium_path: Option<PathBuf>,
    pub no_sandbox: bool,
}

impl GalleryConfig {
    /// Read the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let path_or = |key: &str, default: &str| {
            let value = lookup(key).unwrap_or_default();
            let value = value.trim();
            PathBuf::from(if value.is_empty() { default } else { value })
        };
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            base: GALLERY_BASE.to_string(),
            start_url: GALLERY_START_URL.to_string(),
            out_dir: path_or("OUT_DIR", DEFAULT_OUT_DIR),
            zip_name: path_or("ZIP_NAME", DEFAULT_ZIP_NAME),
            manifest_path: path_or("MANIFEST_PATH", DEFAULT_MANIFEST_PATH),
            storage_state_path: path_or("STORAGE_STATE_PATH", DEFAULT_STORAGE_STATE_PATH),
            debug_dir: path_or("DEBUG_DIR", "."),
            headless: env_flag(lookup("HEADLESS").as_deref(), true),
            skip_existing_folders: env_flag(lookup("SKIP_EXISTING_FOLDERS").as_deref(), true),
            write_zip: true,
            storage_state_b64: non_empty("UNIT_HISTORY_STORAGE_STATE_B64"),
            credentials: Credentials {
                username: non_empty("LDS_USERNAME").unwrap_or_default(),
                password: non_empty("LDS_PASSWORD").unwrap_or_default(),
            },
            chromium_path: non_empty("CHROMIUM_PATH").map(PathBuf::from),
            no_sandbox: env_flag(lookup("CHROMIUM_NO_SANDBOX").as_deref(), false),
        }
    }
}

/// Interpret an environment flag.
///
/// Unset means `default`. A set value is false only for `0`, `false`, `no`
/// or the empty string (trimmed, case-insensitive).
pub fn env_flag(value: Option<&str>, default: bool) -> bool {
    match value {
        None => default,
        Some(v) => !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "no" | ""),
    }
}
