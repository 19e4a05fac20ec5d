//! Named failure kinds for both pipelines.

use thiserror::Error;

/// Failures that abort a scrape run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("No storage_state provided and LDS_USERNAME/LDS_PASSWORD not set.")]
    MissingCredentials,

    #[error("Could not find {0} input on login page.")]
    LoginFieldNotFound(&'static str),

    #[error(
        "Login still appears to be required (possibly MFA/2FA). \
         Use UNIT_HISTORY_STORAGE_STATE_B64 instead."
    )]
    StillOnLoginPage,

    #[error("Redirected to login. Authentication was not valid.")]
    RedirectedToLogin,

    #[error("Bounced to login mid-run (story {story}). Auth is not valid.")]
    LoginBounce { story: usize },

    #[error("Could not find {what} using selector: {selector}")]
    SelectorNotFound { what: &'static str, selector: String },

    #[error("Found zero cards; selector is wrong or page didn't load.")]
    NoStoryCards,

    #[error("invalid storage state: {0}")]
    StorageState(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_selector() {
        let err = ScrapeError::SelectorNotFound {
            what: "story cards",
            selector: ".card".into(),
        };
        assert_eq!(
            err.to_string(),
            "Could not find story cards using selector: .card"
        );
    }

    #[test]
    fn test_http_status_message() {
        let err = ScrapeError::HttpStatus {
            status: 404,
            url: "https://example.com/x".into(),
        };
        assert_eq!(err.to_string(), "HTTP 404 from https://example.com/x");
    }
}
