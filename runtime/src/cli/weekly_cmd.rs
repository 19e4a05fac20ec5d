//! `ward-scrape weekly`: write this week's lesson summary.

use crate::acquisition::http_client::HttpClient;
use crate::cli::output::{self, Styled};
use crate::config::LessonConfig;
use crate::weekly::{self, iso_week_number};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::path::PathBuf;

/// Run the weekly command.
pub async fn run(
    week: Option<u32>,
    date: Option<NaiveDate>,
    out: Option<PathBuf>,
    manual: Option<String>,
) -> Result<()> {
    let mut config = LessonConfig::default();
    if let Some(out) = out {
        config.out = out;
    }
    if let Some(manual) = manual {
        config.manual = manual;
    }

    let week = resolve_week(week, date, Local::now().date_naive());
    let client = HttpClient::new(&config.user_agent)?;

    let lesson = weekly::scrape_week(&client, &config, week)
        .await
        .with_context(|| format!("scraping week {week}"))?;
    weekly::write_lesson(&config.out, &lesson)?;

    if output::is_json() {
        output::print_json(&serde_json::to_value(&lesson)?);
    } else if !output::is_quiet() {
        let s = Styled::new();
        eprintln!(
            "  {} Wrote {} for week {week}: {}",
            s.ok_sym(),
            config.out.display(),
            lesson.big_heading
        );
        if output::is_verbose() {
            eprintln!("    {}", s.dim(&lesson.source_url));
            eprintln!("    {}", s.dim(&lesson.small_heading));
            eprintln!("    {}", s.dim(&lesson.image_url));
        }
    }
    Ok(())
}

/// An explicit week wins, then the week of `date`, then the week of `today`.
pub fn resolve_week(week: Option<u32>, date: Option<NaiveDate>, today: NaiveDate) -> u32 {
    week.unwrap_or_else(|| iso_week_number(date.unwrap_or(today)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_resolve_week_precedence() {
        let today = day(2026, 3, 4);
        assert_eq!(resolve_week(Some(7), Some(day(2026, 1, 1)), today), 7);
        assert_eq!(resolve_week(None, Some(day(2026, 1, 5)), today), 2);
        assert_eq!(resolve_week(None, None, today), 10);
    }

    #[test]
    fn test_resolve_week_clamps_week_53() {
        // 2026-12-31 falls in ISO week 53.
        assert_eq!(resolve_week(None, Some(day(2026, 12, 31)), day(2026, 1, 1)), 52);
    }
}
