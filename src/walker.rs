use crate::errors::ScrapeError;
use crate::models::DayRecord;
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use tracing::info;

/// The page operations the day walk needs.
#[async_trait]
pub trait DiaryPage: Send {
    async fn advance_day(&mut self, previous: bool) -> Result<(), ScrapeError>;

    async fn collect_day_stats(
        &mut self,
        day_offset: i64,
        date: NaiveDate,
    ) -> Result<DayRecord, ScrapeError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkStart {
    pub day_offset: i64,
    /// The site still shows yesterday; step back once before collecting.
    pub step_back: bool,
}

/// Offset of the day to start collecting from. Before `cutoff_hour` (UTC)
/// the site's local day has not finished, so collection starts a day earlier.
pub fn starting_offset(now: DateTime<Utc>, first_day: NaiveDate, cutoff_hour: u32) -> WalkStart {
    let today = (now.date_naive() - first_day).num_days();
    if now.hour() < cutoff_hour {
        WalkStart {
            day_offset: today - 1,
            step_back: true,
        }
    } else {
        WalkStart {
            day_offset: today,
            step_back: false,
        }
    }
}

/// Collects exactly `num_days` records walking backwards from `start`.
/// Any failure aborts the walk.
pub async fn collect_days<P: DiaryPage + ?Sized>(
    page: &mut P,
    first_day: NaiveDate,
    start: WalkStart,
    num_days: usize,
) -> Result<Vec<DayRecord>, ScrapeError> {
    if start.step_back {
        page.advance_day(true).await?;
    }

    let mut day_offset = start.day_offset;
    let mut records = Vec::new();
    for _ in 0..num_days {
        let date = first_day + Duration::days(day_offset);
        let record = page.collect_day_stats(day_offset, date).await?;
        info!("collected day {day_offset} ({date})");
        records.push(record);

        page.advance_day(true).await?;
        day_offset -= 1;
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(Default)]
    struct ScriptedPage {
        steps: Vec<String>,
        fail_at: Option<i64>,
    }

    #[async_trait]
    impl DiaryPage for ScriptedPage {
        async fn advance_day(&mut self, previous: bool) -> Result<(), ScrapeError> {
            self.steps.push(if previous { "prev" } else { "next" }.to_string());
            Ok(())
        }

        async fn collect_day_stats(
            &mut self,
            day_offset: i64,
            date: NaiveDate,
        ) -> Result<DayRecord, ScrapeError> {
            if self.fail_at == Some(day_offset) {
                return Err(ScrapeError::ElementNotFound("serving table".into()));
            }
            self.steps.push(format!("stats {day_offset}"));
            Ok(DayRecord {
                day_offset,
                date,
                morning_weight: None,
                night_weight: None,
                consumed: 0.0,
                burned: 0.0,
                screenshot: String::new(),
            })
        }
    }

    fn first_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 1, 1).unwrap()
    }

    #[test]
    fn before_cutoff_starts_a_day_earlier() {
        let now = Utc.with_ymd_and_hms(2017, 1, 11, 13, 59, 0).unwrap();
        assert_eq!(
            starting_offset(now, first_day(), 14),
            WalkStart {
                day_offset: 9,
                step_back: true
            }
        );

        let now = Utc.with_ymd_and_hms(2017, 1, 11, 14, 0, 0).unwrap();
        assert_eq!(
            starting_offset(now, first_day(), 14),
            WalkStart {
                day_offset: 10,
                step_back: false
            }
        );
    }

    #[tokio::test]
    async fn walk_collects_exactly_num_days_backwards() {
        let mut page = ScriptedPage::default();
        let start = WalkStart {
            day_offset: 10,
            step_back: true,
        };

        let records = collect_days(&mut page, first_day(), start, 3).await.unwrap();

        let offsets: Vec<i64> = records.iter().map(|r| r.day_offset).collect();
        assert_eq!(offsets, vec![10, 9, 8]);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2017, 1, 11).unwrap());
        assert_eq!(
            page.steps,
            vec!["prev", "stats 10", "prev", "stats 9", "prev", "stats 8", "prev"]
        );
    }

    #[tokio::test]
    async fn failed_day_aborts_the_walk() {
        let mut page = ScriptedPage {
            fail_at: Some(9),
            ..Default::default()
        };
        let start = WalkStart {
            day_offset: 10,
            step_back: false,
        };

        let err = collect_days(&mut page, first_day(), start, 3).await.unwrap_err();
        assert!(matches!(err, ScrapeError::ElementNotFound(_)));
        assert_eq!(page.steps, vec!["stats 10", "prev"]);
    }

    #[tokio::test]
    async fn huge_day_count_does_not_preallocate() {
        let mut page = ScriptedPage {
            fail_at: Some(10),
            ..Default::default()
        };
        let start = WalkStart {
            day_offset: 10,
            step_back: false,
        };

        let err = collect_days(&mut page, first_day(), start, 1 << 50).await.unwrap_err();
        assert!(matches!(err, ScrapeError::ElementNotFound(_)));
    }
}
