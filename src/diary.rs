//! Driving the Cronometer diary page: login, page readiness, day navigation
//! and per-day stat extraction.

use crate::browser::BrowserSession;
use crate::errors::ScrapeError;
use crate::models::DayRecord;
use crate::screenshot::{crop_png, encode_base64, Rect};
use crate::settings::{Credentials, Timing};
use crate::walker::DiaryPage;
use async_trait::async_trait;
use chrono::NaiveDate;
use fantoccini::{wd::TimeoutConfiguration, Client, Locator};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

pub const SITE_URL: &str = "https://cronometer.com/";

mod selectors {
    pub const LOGIN_LINK: &str = "#loginli > a";
    pub const USERNAME: &str = "input[name='username']";
    pub const PASSWORD: &str = "input[name='password']";
    pub const LOGIN_BUTTON: &str = "#login-button";
    pub const DIARY: &str = "#diary";
    pub const UPGRADE_POPUP: &str = ".prompt-upgrade";
    pub const UPGRADE_DISMISS: &str = ".prompt-upgrade .close";
    pub const DATE_PICKER_BUTTONS: &str = ".date-picker button";
    pub const SERVING_ROWS: &str = ".crono-table tr";
    pub const SIDE_BOX_FIGURES: &str = ".diary_side_box .summary-value";
    pub const SUMMARY_TABLE: &str = "#diary-summary";
}

const HIDE_IFRAMES: &str =
    "document.querySelectorAll('iframe').forEach(function (f) { f.style.display = 'none'; });";
const BODY_SIZE: &str =
    "return [document.body.scrollWidth, document.body.scrollHeight];";

pub struct CronometerDiary<'a> {
    client: &'a Client,
    timing: Timing,
}

impl<'a> CronometerDiary<'a> {
    pub fn new(session: &'a BrowserSession, timing: Timing) -> Self {
        Self {
            client: &session.client,
            timing,
        }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<(), ScrapeError> {
        info!("logging in to {SITE_URL}");
        self.client
            .goto(SITE_URL)
            .await
            .map_err(|e| ScrapeError::WebDriver(format!("goto {SITE_URL}: {e}")))?;
        self.set_implicit_wait(self.timing.page_wait).await?;

        self.click(selectors::LOGIN_LINK).await?;

        let username = self.wait_interactable(selectors::USERNAME).await?;
        username
            .send_keys(&credentials.email)
            .await
            .map_err(|e| ScrapeError::classify("username", e))?;
        self.find(selectors::PASSWORD)
            .await?
            .send_keys(&credentials.password)
            .await
            .map_err(|e| ScrapeError::classify("password", e))?;
        self.click(selectors::LOGIN_BUTTON).await?;

        self.remove_ads().await
    }

    pub async fn remove_ads(&self) -> Result<(), ScrapeError> {
        self.wait_for_page().await?;
        self.client
            .execute(HIDE_IFRAMES, vec![])
            .await
            .map_err(|e| ScrapeError::classify("hide iframes", e))?;
        Ok(())
    }

    /// Must run before anything that reads or clicks the diary.
    pub async fn wait_for_page(&self) -> Result<(), ScrapeError> {
        self.client
            .wait()
            .at_most(self.timing.page_wait)
            .for_element(Locator::Css(selectors::DIARY))
            .await
            .map_err(|e| match ScrapeError::classify("diary", e) {
                ScrapeError::Timeout(what) => ScrapeError::ElementNotFound(what),
                other => other,
            })?;

        self.set_implicit_wait(self.timing.popup_lookup).await?;
        if let Ok(popup) = self.client.find(Locator::Css(selectors::UPGRADE_POPUP)).await
            && popup.is_displayed().await.unwrap_or(false)
        {
            debug!("dismissing upgrade popup");
            self.click(selectors::UPGRADE_DISMISS).await?;
            sleep(self.timing.popup_pause).await;
        }

        self.set_implicit_wait(self.timing.page_wait).await?;
        sleep(self.timing.panel_pause).await;
        Ok(())
    }

    async fn capture_summary(&self) -> Result<String, ScrapeError> {
        let size = self
            .client
            .execute(BODY_SIZE, vec![])
            .await
            .map_err(|e| ScrapeError::classify("body size", e))?;
        let (width, height) = body_size(&size)?;
        self.client
            .set_window_size(width, height)
            .await
            .map_err(|e| ScrapeError::classify("resize window", e))?;

        let png = self
            .client
            .screenshot()
            .await
            .map_err(|e| ScrapeError::classify("screenshot", e))?;
        let rect: Rect = self
            .find(selectors::SUMMARY_TABLE)
            .await?
            .rectangle()
            .await
            .map_err(|e| ScrapeError::classify("summary table", e))?
            .into();

        Ok(encode_base64(&crop_png(&png, rect)?))
    }

    async fn wait_interactable(&self, css: &str) -> Result<fantoccini::elements::Element, ScrapeError> {
        let deadline = Instant::now() + self.timing.login_wait;
        let element = self
            .client
            .wait()
            .at_most(self.timing.login_wait)
            .for_element(Locator::Css(css))
            .await
            .map_err(|e| ScrapeError::classify(css, e))?;

        loop {
            let displayed = element.is_displayed().await.unwrap_or(false);
            let enabled = element.is_enabled().await.unwrap_or(false);
            if displayed && enabled {
                return Ok(element);
            }
            if Instant::now() >= deadline {
                return Err(ScrapeError::NotInteractable(css.to_string()));
            }
            sleep(Duration::from_millis(100)).await;
        }
    }

    async fn find(&self, css: &str) -> Result<fantoccini::elements::Element, ScrapeError> {
        self.client
            .find(Locator::Css(css))
            .await
            .map_err(|e| ScrapeError::classify(css, e))
    }

    async fn find_all(&self, css: &str) -> Result<Vec<fantoccini::elements::Element>, ScrapeError> {
        self.client
            .find_all(Locator::Css(css))
            .await
            .map_err(|e| ScrapeError::classify(css, e))
    }

    async fn click(&self, css: &str) -> Result<(), ScrapeError> {
        self.find(css)
            .await?
            .click()
            .await
            .map_err(|e| ScrapeError::classify(css, e))
    }

    async fn set_implicit_wait(&self, wait: Duration) -> Result<(), ScrapeError> {
        self.client
            .update_timeouts(TimeoutConfiguration::new(None, None, Some(wait)))
            .await
            .map_err(|e| ScrapeError::classify("implicit wait", e))
    }
}

#[async_trait]
impl DiaryPage for CronometerDiary<'_> {
    async fn advance_day(&mut self, previous: bool) -> Result<(), ScrapeError> {
        self.wait_for_page().await?;

        let buttons = self.find_all(selectors::DATE_PICKER_BUTTONS).await?;
        let index = if previous { 0 } else { 1 };
        let button = buttons.get(index).ok_or_else(|| {
            ScrapeError::ElementNotFound(format!("{} #{index}", selectors::DATE_PICKER_BUTTONS))
        })?;
        button
            .click()
            .await
            .map_err(|e| ScrapeError::classify("date picker", e))
    }

    async fn collect_day_stats(
        &mut self,
        day_offset: i64,
        date: NaiveDate,
    ) -> Result<DayRecord, ScrapeError> {
        self.wait_for_page().await?;

        let mut rows = Vec::new();
        for row in self.find_all(selectors::SERVING_ROWS).await?.iter().skip(1) {
            rows.push(
                row.text()
                    .await
                    .map_err(|e| ScrapeError::classify("serving row", e))?,
            );
        }
        let weights = parse_weights(&rows)?;

        let figures = self.find_all(selectors::SIDE_BOX_FIGURES).await?;
        let figure = |index: usize| {
            figures.get(index).ok_or_else(|| {
                ScrapeError::ElementNotFound(format!("{} #{index}", selectors::SIDE_BOX_FIGURES))
            })
        };
        let consumed = parse_figure(
            &figure(0)?
                .text()
                .await
                .map_err(|e| ScrapeError::classify("consumed", e))?,
        )?;
        let burned = parse_figure(
            &figure(2)?
                .text()
                .await
                .map_err(|e| ScrapeError::classify("burned", e))?,
        )?;

        let screenshot = self.capture_summary().await?;

        Ok(DayRecord {
            day_offset,
            date,
            morning_weight: weights.morning,
            night_weight: weights.night,
            consumed,
            burned,
            screenshot,
        })
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct Weights {
    pub morning: Option<f64>,
    pub night: Option<f64>,
}

/// Reads weight entries out of serving rows (header already removed).
///
/// A weight in the first half of the list is the morning weight, first one
/// wins. A weight in the second half is the night weight, last one wins.
pub fn parse_weights(rows: &[String]) -> Result<Weights, ScrapeError> {
    let mut weights = Weights::default();
    let len = rows.len();

    for (index, row) in rows.iter().enumerate() {
        let (description, amount, _unit) = split_row(row)?;
        if description != "Weight" {
            continue;
        }

        let value = parse_figure(amount)?;
        if 2 * index < len {
            if weights.morning.is_none() {
                weights.morning = Some(value);
            }
        } else {
            weights.night = Some(value);
        }
    }

    Ok(weights)
}

fn split_row(row: &str) -> Result<(&str, &str, &str), ScrapeError> {
    let mut fields = row.split('\n').map(str::trim);

    match (fields.next(), fields.next(), fields.next()) {
        (Some(description), Some(amount), Some(unit)) => Ok((description, amount, unit)),
        _ => Err(ScrapeError::MalformedRow(row.to_string())),
    }
}

/// Parses a displayed figure such as `1,234.5 kcal`.
pub fn parse_figure(text: &str) -> Result<f64, ScrapeError> {
    text.split_whitespace()
        .next()
        .map(|token| token.replace(',', ""))
        .and_then(|token| token.parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .ok_or_else(|| ScrapeError::InvalidNumber(text.to_string()))
}

fn body_size(value: &serde_json::Value) -> Result<(u32, u32), ScrapeError> {
    let dims: Option<Vec<u32>> = value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|item| item.as_f64())
            .map(|n| n.max(1.0).round() as u32)
            .collect()
    });

    match dims.as_deref() {
        Some([width, height]) => Ok((*width, *height)),
        _ => Err(ScrapeError::InvalidNumber(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn morning_takes_first_weight_in_first_half() {
        let rows = rows(&[
            "Weight\n150.2\nlbs",
            "Weight\n150.9\nlbs",
            "Oatmeal\n1\ncup",
            "Coffee\n2\ncups",
            "Salad\n1\nbowl",
            "Tea\n1\ncup",
        ]);
        let weights = parse_weights(&rows).unwrap();
        assert_eq!(weights.morning, Some(150.2));
        assert_eq!(weights.night, None);
    }

    #[test]
    fn night_takes_last_weight_in_second_half() {
        let rows = rows(&[
            "Oatmeal\n1\ncup",
            "Coffee\n2\ncups",
            "Weight\n151.0\nlbs",
            "Weight\n150.6\nlbs",
        ]);
        let weights = parse_weights(&rows).unwrap();
        assert_eq!(weights.morning, None);
        assert_eq!(weights.night, Some(150.6));
    }

    #[test]
    fn odd_length_middle_row_counts_as_first_half() {
        let rows = rows(&["Oatmeal\n1\ncup", "Weight\n149.8\nlbs", "Tea\n1\ncup"]);
        let weights = parse_weights(&rows).unwrap();
        assert_eq!(weights.morning, Some(149.8));
    }

    #[test]
    fn row_with_fewer_than_three_fields_is_fatal() {
        let err = parse_weights(&rows(&["Oatmeal\n1\ncup", "Weight\n150.0"])).unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedRow(_)));
    }

    #[test]
    fn extra_trailing_fields_are_ignored() {
        let weights =
            parse_weights(&rows(&["Tea\n1\ncup", "Weight\n1,150.0\nlbs\nRaw"])).unwrap();
        assert_eq!(weights.morning, None);
        assert_eq!(weights.night, Some(1150.0));
    }

    #[test]
    fn empty_field_does_not_shift_the_row() {
        let err = parse_weights(&rows(&["Weight\n\n150\nlbs"])).unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidNumber(_)));

        let err = parse_weights(&rows(&["Weight\t150\tlbs"])).unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedRow(_)));
    }

    #[test]
    fn figures_strip_separators_and_units() {
        assert_eq!(parse_figure("1,234.5 kcal").unwrap(), 1234.5);
        assert_eq!(parse_figure(" 980 ").unwrap(), 980.0);
        assert!(matches!(
            parse_figure("n/a"),
            Err(ScrapeError::InvalidNumber(_))
        ));
        assert!(parse_figure("").is_err());
        for bad in ["NaN kcal", "inf", "-infinity"] {
            assert!(matches!(parse_figure(bad), Err(ScrapeError::InvalidNumber(_))), "{bad}");
        }
    }

    #[test]
    fn body_size_reads_two_numbers() {
        assert_eq!(
            body_size(&serde_json::json!([1280, 2400.4])).unwrap(),
            (1280, 2400)
        );
        assert!(body_size(&serde_json::json!([1280])).is_err());
    }
}
