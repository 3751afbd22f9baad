use crate::errors::ConfigError;
use crate::store::SettingStore;
use chrono::NaiveDate;
use std::{env, sync::Arc, time::Duration};

const DEFAULT_FIRST_DAY: &str = "2017/01/01";
const DEFAULT_CUTOFF_HOUR: u32 = 14;
const DEFAULT_CHROMEDRIVER_PORT: u16 = 9515;
const DEFAULT_DISPLAY_NUMBER: u32 = 99;

type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Resolves a named setting: environment first (upper-cased key), then the
/// store (lower-cased key).
pub struct SettingsSource {
    env: Box<EnvLookup>,
    store: Arc<dyn SettingStore>,
}

impl SettingsSource {
    pub fn new(store: Arc<dyn SettingStore>) -> Self {
        Self {
            env: Box::new(|key: &str| env::var(key).ok()),
            store,
        }
    }

    pub fn with_env(
        store: Arc<dyn SettingStore>,
        env: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            env: Box::new(env),
            store,
        }
    }

    pub async fn get(&self, name: &str) -> Option<String> {
        match (self.env)(&name.to_uppercase()) {
            Some(value) if !value.is_empty() => Some(value),
            _ => self.store.lookup(&name.to_lowercase()).await,
        }
    }

    pub fn is_production(&self) -> bool {
        (self.env)("ENVIRONMENT").as_deref() == Some("production")
    }

    pub async fn get_start_time(&self) -> Result<NaiveDate, ConfigError> {
        let value = self
            .get("first_day")
            .await
            .unwrap_or_else(|| DEFAULT_FIRST_DAY.to_string());
        parse_first_day(&value)
    }

    async fn parsed<T: std::str::FromStr>(
        &self,
        name: &'static str,
    ) -> Result<Option<T>, ConfigError> {
        match self.get(name).await {
            None => Ok(None),
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::Invalid { name, value }),
        }
    }
}

pub fn parse_first_day(value: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(value.trim(), "%Y/%m/%d").map_err(|_| ConfigError::Invalid {
        name: "first_day",
        value: value.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Bounded waits and fixed pauses used while driving the site.
#[derive(Debug, Clone)]
pub struct Timing {
    pub login_wait: Duration,
    pub page_wait: Duration,
    pub popup_lookup: Duration,
    pub popup_pause: Duration,
    pub panel_pause: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            login_wait: Duration::from_secs(10),
            page_wait: Duration::from_secs(30),
            popup_lookup: Duration::from_secs(1),
            popup_pause: Duration::from_secs(1),
            panel_pause: Duration::from_secs(2),
        }
    }
}

/// Everything the service needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub production: bool,
    pub email: Option<String>,
    pub password: Option<String>,
    pub access_token: Option<String>,
    pub start_weight: Option<f64>,
    pub first_day: NaiveDate,
    pub day_cutoff_hour: u32,
    pub webdriver_url: Option<String>,
    pub chromedriver_path: String,
    pub chromedriver_port: u16,
    pub display_number: u32,
    pub timing: Timing,
}

impl Settings {
    pub async fn load(source: &SettingsSource) -> Result<Self, ConfigError> {
        let day_cutoff_hour = source
            .parsed("day_cutoff_hour")
            .await?
            .unwrap_or(DEFAULT_CUTOFF_HOUR);
        if day_cutoff_hour > 24 {
            return Err(ConfigError::Invalid {
                name: "day_cutoff_hour",
                value: day_cutoff_hour.to_string(),
            });
        }

        Ok(Self {
            production: source.is_production(),
            email: source.get("cronometer_email").await,
            password: source.get("cronometer_password").await,
            access_token: source.get("access_token").await,
            start_weight: source.parsed("start_weight").await?,
            first_day: source.get_start_time().await?,
            day_cutoff_hour,
            webdriver_url: source.get("webdriver_url").await,
            chromedriver_path: source
                .get("chromedriver_path")
                .await
                .unwrap_or_else(|| "chromedriver".to_string()),
            chromedriver_port: source
                .parsed("chromedriver_port")
                .await?
                .unwrap_or(DEFAULT_CHROMEDRIVER_PORT),
            display_number: source
                .parsed("display_number")
                .await?
                .unwrap_or(DEFAULT_DISPLAY_NUMBER),
            timing: Timing::default(),
        })
    }

    pub fn credentials(&self) -> Option<Credentials> {
        Some(Credentials {
            email: self.email.clone()?,
            password: self.password.clone()?,
        })
    }

    /// True only when a token is configured and `candidate` equals it.
    pub fn token_matches(&self, candidate: Option<&str>) -> bool {
        match (self.access_token.as_deref(), candidate) {
            (Some(expected), Some(given)) => expected == given,
            _ => false,
        }
    }
}
