//! Folder names for stories.

use regex::Regex;
use std::sync::OnceLock;

/// Default cap on folder name length, in characters.
pub const MAX_NAME_LEN: usize = 90;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex is valid"))
}

fn reserved_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[\\/:*?"<>|]+"#).expect("reserved regex is valid"))
}

/// Collapse runs of whitespace into single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    whitespace_re().replace_all(s, " ").into_owned()
}

/// Turn a story title into a folder name that is valid on Windows too.
pub fn safe_name(name: &str, max_len: usize) -> String {
    let name = collapse_whitespace(name.trim());
    let name = reserved_re().replace_all(&name, "-");
    let name = name.trim_matches(|c| c == ' ' || c == '.');

    if name.is_empty() {
        return "Untitled".to_string();
    }
    if name.chars().count() > max_len {
        let cut: String = name.chars().take(max_len).collect();
        return cut.trim_end().to_string();
    }
    name.to_string()
}

/// Truncate to `max` characters.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
