use crate::browser::{BrowserSession, ChromeDriver};
use crate::diary::CronometerDiary;
use crate::display::VirtualDisplay;
use crate::errors::ScrapeError;
use crate::models::{DayRecord, Report};
use crate::report::render_reports;
use crate::settings::Settings;
use crate::walker::{collect_days, starting_offset};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// Source of consecutive diary days, most recent first.
#[async_trait]
pub trait DayCollector: Send + Sync {
    async fn collect_days(&self, num_days: usize) -> Result<Vec<DayRecord>, ScrapeError>;
}

/// Collects `n + 1` days so that each of the `n` latest days has a previous
/// day to compare against.
pub async fn collect_latest_reports(
    collector: &dyn DayCollector,
    n: usize,
    start_weight: Option<f64>,
) -> Result<Vec<Report>, ScrapeError> {
    let num_days = n.checked_add(1).ok_or(ScrapeError::TooManyDays(n))?;
    let records = collector.collect_days(num_days).await?;
    Ok(render_reports(records, start_weight))
}

/// Scrapes days from Cronometer with a real browser.
pub struct Scraper {
    settings: Arc<Settings>,
}

impl Scraper {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    async fn open_session(
        &self,
        display: &VirtualDisplay,
    ) -> Result<(Option<ChromeDriver>, BrowserSession), ScrapeError> {
        if let Some(url) = &self.settings.webdriver_url {
            info!("Connecting to external WebDriver at {url}...");
            return Ok((None, BrowserSession::connect(url).await?));
        }

        let driver = ChromeDriver::launch(
            &self.settings.chromedriver_path,
            self.settings.chromedriver_port,
            display.display_env().as_deref(),
        )
        .await?;
        let session = BrowserSession::connect(&driver.webdriver_url()).await?;
        Ok((Some(driver), session))
    }
}

#[async_trait]
impl DayCollector for Scraper {
    async fn collect_days(&self, num_days: usize) -> Result<Vec<DayRecord>, ScrapeError> {
        let settings = &self.settings;
        let credentials = settings
            .credentials()
            .ok_or(ScrapeError::MissingSetting("cronometer_email/cronometer_password"))?;

        let display = VirtualDisplay::start(settings.production, settings.display_number).await?;
        let (_driver, session) = self.open_session(&display).await?;

        let result: Result<Vec<DayRecord>, ScrapeError> = async {
            let mut diary = CronometerDiary::new(&session, settings.timing.clone());
            diary.login(&credentials).await?;

            let start = starting_offset(Utc::now(), settings.first_day, settings.day_cutoff_hour);
            info!(
                "collecting {num_days} days from offset {} (step back: {})",
                start.day_offset, start.step_back
            );
            collect_days(&mut diary, settings.first_day, start, num_days).await
        }
        .await;

        session.close().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeCollector {
        requested: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl DayCollector for FakeCollector {
        async fn collect_days(&self, num_days: usize) -> Result<Vec<DayRecord>, ScrapeError> {
            self.requested.lock().unwrap().push(num_days);
            let first = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
            Ok((0..num_days as i64)
                .map(|i| DayRecord {
                    day_offset: 100 - i,
                    date: first + Duration::days(100 - i),
                    morning_weight: None,
                    night_weight: Some(150.0 + i as f64),
                    consumed: 1800.0,
                    burned: 2000.0,
                    screenshot: String::new(),
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn latest_reports_request_one_extra_day() {
        let collector = FakeCollector::default();

        let reports = collect_latest_reports(&collector, 1, None).await.unwrap();
        assert_eq!(reports.len(), 1);

        let reports = collect_latest_reports(&collector, 3, Some(160.0)).await.unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports[0].report.contains("Since start: -10.0"));

        assert_eq!(*collector.requested.lock().unwrap(), vec![2, 4]);
    }

    #[tokio::test]
    async fn overflowing_amount_is_an_error_not_a_panic() {
        let collector = FakeCollector::default();
        let err = collect_latest_reports(&collector, usize::MAX, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::TooManyDays(usize::MAX)));
        assert!(collector.requested.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_reports_still_collects_one_day() {
        let collector = FakeCollector::default();
        let reports = collect_latest_reports(&collector, 0, None).await.unwrap();
        assert!(reports.is_empty());
        assert_eq!(*collector.requested.lock().unwrap(), vec![1]);
    }
}
