//! Field extraction from a lesson page.

use crate::images::{absolutize, largest_from_srcset};
use scraper::{ElementRef, Html, Selector};

/// Fields pulled out of one lesson page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonFields {
    pub small_heading: String,
    pub big_heading: String,
    pub image_url: String,
}

/// Hero image first, then the first figure image, then any image.
const IMAGE_SELECTORS: &[&str] = &["img#img1", "figure img", "img"];

/// Extract the headings and lead image from lesson HTML.
pub fn parse_lesson(html: &str, base: &str) -> LessonFields {
    let document = Html::parse_document(html);

    LessonFields {
        small_heading: first_text(&document, "p.title-number"),
        big_heading: first_text(&document, "h1"),
        image_url: pick_first_image(&document, base),
    }
}

/// Text nodes of an element, trimmed and joined with single spaces.
pub fn element_text(el: &ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, selector: &str) -> String {
    let Ok(sel) = Selector::parse(selector) else {
        return String::new();
    };
    document
        .select(&sel)
        .next()
        .map(|el| element_text(&el))
        .unwrap_or_default()
}

fn pick_first_image(document: &Html, base: &str) -> String {
    for selector in IMAGE_SELECTORS {
        let Ok(sel) = Selector::parse(selector) else {
            continue;
        };
        if let Some(img) = document.select(&sel).next() {
            let best = best_image_from_tag(&img, base);
            if !best.is_empty() {
                return best;
            }
        }
    }
    String::new()
}

/// Largest srcset candidate of an `<img>`, else its `src`, made absolute.
fn best_image_from_tag(img: &ElementRef, base: &str) -> String {
    let srcset = img.value().attr("srcset").unwrap_or("");
    let best = largest_from_srcset(srcset);
    if !best.is_empty() {
        return absolutize(base, &best);
    }
    let src = img.value().attr("src").unwrap_or("");
    absolutize(base, src)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.churchofjesuschrist.org";

    const LESSON_PAGE: &str = r#"
        <html><head><title>Lesson</title></head><body>
          <header>
            <img id="img1"
                 src="/imgs/hero/small.jpg"
                 srcset="/imgs/hero/60.jpg 60w, /imgs/hero/640.jpg 640w, /imgs/hero/100.jpg 100w">
            <p class="title-number">January 5–11:   <span>“The Creation”</span></p>
            <h1 id="title1">
              Moses 1; <span>Abraham 3</span>
            </h1>
          </header>
          <figure><img src="/imgs/figure.jpg"></figure>
        </body></html>
    "#;

    #[test]
    fn test_parse_lesson_page() {
        let fields = parse_lesson(LESSON_PAGE, BASE);
        assert_eq!(fields.small_heading, "January 5–11: “The Creation”");
        assert_eq!(fields.big_heading, "Moses 1; Abraham 3");
        assert_eq!(
            fields.image_url,
            "https://www.churchofjesuschrist.org/imgs/hero/640.jpg"
        );
    }

    #[test]
    fn test_falls_back_to_figure_then_any_image() {
        let figure = r#"<body><img id="img1"><figure><img src="/fig.jpg"></figure></body>"#;
        assert_eq!(
            parse_lesson(figure, BASE).image_url,
            "https://www.churchofjesuschrist.org/fig.jpg"
        );

        let any = r#"<body><div><img srcset="https://cdn.example.com/a.jpg 10w"></div></body>"#;
        assert_eq!(parse_lesson(any, BASE).image_url, "https://cdn.example.com/a.jpg");
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let fields = parse_lesson("<html><body><p>nothing</p></body></html>", BASE);
        assert_eq!(fields, LessonFields::default());
    }
}
