//! Environment readiness check.
//!
//! Verifies that a Chromium binary can be found, that the unit history
//! export has some way to authenticate, and that every output location is
//! writable. Every failure includes a specific fix instruction.

use crate::acquisition::storage_state::{decode_b64, StorageState};
use crate::cli::output::{self, Styled};
use crate::config::{GalleryConfig, LessonConfig};
use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Binary names tried on `PATH`, in order.
const CHROMIUM_NAMES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
];

/// How the export would authenticate.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    /// Storage state secret present and parseable, with this many cookies.
    StorageState(usize),
    /// Storage state secret present but unusable.
    BadStorageState(String),
    Credentials,
    Missing,
}

/// Run the doctor diagnostic.
pub async fn run() -> Result<()> {
    let gallery = GalleryConfig::from_env();
    let lesson = LessonConfig::default();

    let chromium = gallery
        .chromium_path
        .clone()
        .filter(|p| p.exists())
        .or_else(find_chromium);
    let chromium_version = chromium.as_deref().and_then(chromium_version);
    let auth = auth_status(&gallery);
    let outputs = output_targets(&gallery, &lesson);

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "chromium_path": chromium.as_ref().map(|p| p.display().to_string()),
            "chromium_version": chromium_version,
            "auth": format!("{auth:?}"),
            "headless": gallery.headless,
            "skip_existing_folders": gallery.skip_existing_folders,
            "outputs": outputs
                .iter()
                .map(|(label, path)| serde_json::json!({
                    "label": label,
                    "path": path.display().to_string(),
                    "writable": dir_writable(path),
                }))
                .collect::<Vec<_>>(),
        }));
        return Ok(());
    }

    let s = Styled::new();
    let mut ready = true;
    let mut has_warning = false;

    output::print_header(&s);

    output::print_section(&s, "Browser");
    match &chromium {
        Some(path) => {
            let ver = chromium_version.as_deref().unwrap_or("unknown version");
            output::print_check(s.ok_sym(), "Chromium:", &format!("{ver} at {}", path.display()));
        }
        None => {
            output::print_check(s.fail_sym(), "Chromium:", "NOT FOUND");
            output::print_detail("Fix: install chromium, or set CHROMIUM_PATH=/path/to/chrome");
            ready = false;
        }
    }
    if gallery.no_sandbox {
        output::print_check(s.warn_sym(), "Sandbox:", "disabled (CHROMIUM_NO_SANDBOX)");
    }
    eprintln!();

    output::print_section(&s, "Auth");
    match &auth {
        AuthStatus::StorageState(n) => {
            output::print_check(s.ok_sym(), "Storage state:", &format!("{n} cookies"));
        }
        AuthStatus::BadStorageState(e) => {
            output::print_check(s.fail_sym(), "Storage state:", e);
            output::print_detail("Re-export UNIT_HISTORY_STORAGE_STATE_B64 from a logged-in browser.");
            ready = false;
        }
        AuthStatus::Credentials => {
            output::print_check(s.warn_sym(), "Login:", "username/password (headless login)");
            output::print_detail("MFA or bot checks will block this; prefer a storage state.");
            has_warning = true;
        }
        AuthStatus::Missing => {
            output::print_check(s.fail_sym(), "Login:", "no storage state and no credentials");
            output::print_detail(
                "Fix: set UNIT_HISTORY_STORAGE_STATE_B64, or LDS_USERNAME and LDS_PASSWORD",
            );
            ready = false;
        }
    }
    eprintln!();

    output::print_section(&s, "Output");
    for (label, path) in &outputs {
        if dir_writable(path) {
            output::print_check(s.ok_sym(), label, &format!("{} (writable)", path.display()));
        } else {
            output::print_check(s.fail_sym(), label, &format!("{} (not writable)", path.display()));
            ready = false;
        }
    }

    let (status, msg) = match (ready, has_warning) {
        (true, false) => (s.green("READY"), "all checks passed"),
        (true, true) => (s.yellow("READY"), "with warnings"),
        (false, _) => (s.red("NOT READY"), "fix the failed checks above"),
    };
    output::print_status(&s, &status, msg);
    Ok(())
}

/// Find a Chromium binary: `CHROMIUM_PATH` first, then well-known names on `PATH`.
pub fn find_chromium() -> Option<PathBuf> {
    if let Ok(p) = std::env::var("CHROMIUM_PATH") {
        let path = PathBuf::from(p.trim());
        if path.exists() {
            return Some(path);
        }
    }
    CHROMIUM_NAMES.iter().find_map(|name| which::which(name).ok())
}

fn chromium_version(path: &Path) -> Option<String> {
    let output = Command::new(path).arg("--version").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let raw = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Some(raw.replace("Google Chrome ", "").replace("Chromium ", ""))
}

/// Which authentication path the export would take.
pub fn auth_status(config: &GalleryConfig) -> AuthStatus {
    if let Some(b64) = &config.storage_state_b64 {
        return match decode_b64(b64).and_then(|data| StorageState::from_slice(&data)) {
            Ok(state) => AuthStatus::StorageState(state.cookies.len()),
            Err(e) => AuthStatus::BadStorageState(e.to_string()),
        };
    }
    if config.credentials.is_complete() {
        AuthStatus::Credentials
    } else {
        AuthStatus::Missing
    }
}

/// Directories the two pipelines write into.
fn output_targets(gallery: &GalleryConfig, lesson: &LessonConfig) -> Vec<(&'static str, PathBuf)> {
    let parent = |p: &Path| {
        p.parent()
            .filter(|d| !d.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };
    vec![
        ("Events:", gallery.out_dir.clone()),
        ("Manifest:", parent(&gallery.manifest_path)),
        ("Zip:", parent(&gallery.zip_name)),
        ("Weekly lesson:", parent(&lesson.out)),
    ]
}

/// Whether files could be created in `dir`.
///
/// A directory that does not exist yet counts as writable when its nearest
/// existing ancestor is.
pub fn dir_writable(dir: &Path) -> bool {
    let mut existing = dir;
    while !existing.exists() {
        match existing.parent() {
            Some(p) if !p.as_os_str().is_empty() => existing = p,
            _ => {
                existing = Path::new(".");
                break;
            }
        }
    }

    let marker = existing.join(format!(".ward-scrape-write-check-{}", std::process::id()));
    match std::fs::write(&marker, b"") {
        Ok(()) => {
            let _ = std::fs::remove_file(&marker);
            true
        }
        Err(_) => false,
    }
}
