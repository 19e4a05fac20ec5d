//! Weekly lesson summary.
//!
//! Picks this week's lesson from the manual, fetches it, and writes a small
//! JSON record (headings plus lead image) for the ward website to display.

pub mod parse;

use crate::acquisition::http_client::HttpClient;
use crate::config::LessonConfig;
use crate::error::ScrapeError;
use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// The manual is numbered 1..=52; ISO week 53 reuses lesson 52.
const LAST_LESSON_WEEK: u32 = 52;

/// The JSON document written each run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyLesson {
    pub generated_at_utc: String,
    pub week_number: u32,
    pub source_url: String,
    pub image_url: String,
    pub small_heading: String,
    pub big_heading: String,
}

/// ISO week of `date`, clamped to the last lesson week.
pub fn iso_week_number(date: NaiveDate) -> u32 {
    date.iso_week().week().min(LAST_LESSON_WEEK)
}

/// URL of a lesson week in the manual.
pub fn lesson_url(base: &str, manual: &str, week: u32) -> String {
    format!("{base}/study/manual/{manual}/{week:02}?lang=eng")
}

/// Fetch and summarize one lesson week.
pub async fn scrape_week(
    client: &HttpClient,
    config: &LessonConfig,
    week: u32,
) -> Result<WeeklyLesson> {
    let url = lesson_url(&config.base, &config.manual, week);
    info!(week, %url, "fetching lesson");

    let resp = client.get(&url, config.timeout_ms).await?;
    if !(200..300).contains(&resp.status) {
        return Err(ScrapeError::HttpStatus {
            status: resp.status,
            url,
        }
        .into());
    }

    let fields = parse::parse_lesson(&resp.body, &config.base);

    Ok(WeeklyLesson {
        generated_at_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false),
        week_number: week,
        source_url: url,
        image_url: fields.image_url,
        small_heading: fields.small_heading,
        big_heading: fields.big_heading,
    })
}

/// Write the summary as pretty JSON, replacing any previous file.
pub fn write_lesson(path: &Path, lesson: &WeeklyLesson) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(lesson)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_iso_week_number_clamps_to_52() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        assert_eq!(iso_week_number(d), 2);
        // 2026-12-31 falls in ISO week 53.
        let d = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert_eq!(d.iso_week().week(), 53);
        assert_eq!(iso_week_number(d), 52);
    }

    #[test]
    fn test_lesson_url_zero_pads_week() {
        assert_eq!(
            lesson_url("https://www.churchofjesuschrist.org", "cfm-ot-2026", 3),
            "https://www.churchofjesuschrist.org/study/manual/cfm-ot-2026/03?lang=eng"
        );
    }

    #[tokio::test]
    async fn test_scrape_week_against_fixture() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/study/manual/test-manual/07"))
            .and(query_param("lang", "eng"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<p class="title-number">February 9–15</p><h1>Genesis 6–11</h1>
                   <img id="img1" src="/ark.jpg">"#,
            ))
            .mount(&server)
            .await;

        let config = LessonConfig {
            base: server.uri(),
            manual: "test-manual".into(),
            ..LessonConfig::default()
        };
        let client = HttpClient::new(&config.user_agent).unwrap();
        let lesson = scrape_week(&client, &config, 7).await.unwrap();

        assert_eq!(lesson.week_number, 7);
        assert_eq!(
            lesson.source_url,
            format!("{}/study/manual/test-manual/07?lang=eng", server.uri())
        );
        assert_eq!(lesson.small_heading, "February 9–15");
        assert_eq!(lesson.big_heading, "Genesis 6–11");
        assert_eq!(lesson.image_url, format!("{}/ark.jpg", server.uri()));
        assert!(lesson.generated_at_utc.ends_with("+00:00"));
    }

    #[tokio::test]
    async fn test_scrape_week_fails_on_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = LessonConfig {
            base: server.uri(),
            ..LessonConfig::default()
        };
        let client = HttpClient::new(&config.user_agent).unwrap();
        let err = scrape_week(&client, &config, 1).await.unwrap_err();
        let typed = err.downcast_ref::<ScrapeError>().unwrap();
        assert!(matches!(typed, ScrapeError::HttpStatus { status: 503, .. }));
    }

    #[test]
    fn test_write_lesson_keeps_field_order_and_unicode() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("data").join("lesson.json");
        let lesson = WeeklyLesson {
            generated_at_utc: "2026-01-05T00:00:00.000000+00:00".into(),
            week_number: 2,
            source_url: "https://example.org/02".into(),
            image_url: "".into(),
            small_heading: "“Small”".into(),
            big_heading: "Big".into(),
        };
        write_lesson(&out, &lesson).unwrap();

        let raw = std::fs::read_to_string(&out).unwrap();
        assert!(raw.contains("“Small”"));
        let keys: Vec<usize> = [
            "generated_at_utc",
            "week_number",
            "source_url",
            "image_url",
            "small_heading",
            "big_heading",
        ]
        .iter()
        .map(|k| raw.find(k).unwrap())
        .collect();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert!(raw.contains("\n  \"week_number\": 2"));
    }
}
