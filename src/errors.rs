use axum::{http::StatusCode, Json};
use fantoccini::error::{CmdError, ErrorStatus};
use thiserror::Error;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<ScrapeError> for AppError {
    fn from(err: ScrapeError) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

/// Failures of a single scrape run. Every variant is fatal to the run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("element not found: {0}")]
    ElementNotFound(String),
    #[error("timed out waiting for {0}")]
    Timeout(String),
    #[error("element not interactable: {0}")]
    NotInteractable(String),
    #[error("malformed serving row: {0:?}")]
    MalformedRow(String),
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),
    #[error("cannot collect {0} days")]
    TooManyDays(usize),
    #[error("missing setting: {0}")]
    MissingSetting(&'static str),
    #[error("failed to launch {0}")]
    Launch(String),
    #[error("webdriver: {0}")]
    WebDriver(String),
    #[error("screenshot: {0}")]
    Image(#[from] image::ImageError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Maps a WebDriver command failure onto the element-level categories,
    /// falling back to a generic WebDriver error.
    pub fn classify(what: &str, err: CmdError) -> Self {
        match err {
            CmdError::WaitTimeout => Self::Timeout(what.to_string()),
            CmdError::Standard(ref e) if matches!(e.error, ErrorStatus::NoSuchElement) => {
                Self::ElementNotFound(what.to_string())
            }
            CmdError::Standard(ref e)
                if matches!(e.error, ErrorStatus::ElementNotInteractable) =>
            {
                Self::NotInteractable(what.to_string())
            }
            other => Self::WebDriver(format!("{what}: {other}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("setting {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use fantoccini::error::WebDriver;

    #[test]
    fn wait_timeout_is_classified_as_timeout() {
        let err = ScrapeError::classify("diary", CmdError::WaitTimeout);
        assert!(matches!(err, ScrapeError::Timeout(ref what) if what == "diary"));
    }

    #[test]
    fn standard_errors_map_to_element_categories() {
        let missing = CmdError::Standard(WebDriver::new(ErrorStatus::NoSuchElement, "gone"));
        assert!(matches!(
            ScrapeError::classify("serving table", missing),
            ScrapeError::ElementNotFound(ref what) if what == "serving table"
        ));

        let hidden = CmdError::Standard(WebDriver::new(ErrorStatus::ElementNotInteractable, "hidden"));
        assert!(matches!(
            ScrapeError::classify("login button", hidden),
            ScrapeError::NotInteractable(_)
        ));

        let other = CmdError::Standard(WebDriver::new(ErrorStatus::SessionNotCreated, "no chrome"));
        assert!(matches!(ScrapeError::classify("session", other), ScrapeError::WebDriver(_)));
    }

    #[test]
    fn forbidden_carries_403() {
        let err = AppError::forbidden("token parameter required.");
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.message, "token parameter required.");
    }
}
