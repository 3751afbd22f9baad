use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One scraped diary day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayRecord {
    /// Days since the configured first day.
    pub day_offset: i64,
    pub date: NaiveDate,
    pub morning_weight: Option<f64>,
    pub night_weight: Option<f64>,
    pub consumed: f64,
    pub burned: f64,
    /// Base64 PNG of the day's summary table.
    pub screenshot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub report: String,
    pub screenshot: String,
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub amount: Option<usize>,
    pub token: Option<String>,
}

/// Upper bound on reports per request.
pub const MAX_AMOUNT: usize = 60;

impl LatestQuery {
    /// Requested report count, `None` when above [`MAX_AMOUNT`].
    pub fn amount(&self) -> Option<usize> {
        let amount = self.amount.unwrap_or(1);
        (amount <= MAX_AMOUNT).then_some(amount)
    }
}

#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: usize,
}
