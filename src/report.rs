use crate::models::{DayRecord, Report};

const UNKNOWN: &str = "[unknown]";

/// Builds one report per consecutive pair of days, most recent first.
/// The oldest record only serves as the comparison point.
pub fn render_reports(mut records: Vec<DayRecord>, start_weight: Option<f64>) -> Vec<Report> {
    if records.len() < 2 {
        return Vec::new();
    }

    records.sort_by(|a, b| b.day_offset.cmp(&a.day_offset));

    records
        .windows(2)
        .map(|pair| render_pair(&pair[0], &pair[1], start_weight))
        .collect()
}

fn render_pair(current: &DayRecord, previous: &DayRecord, start_weight: Option<f64>) -> Report {
    let consumed_diff = current.consumed - current.burned;
    let label = if consumed_diff < 0.0 { "deficit" } else { "surplus" };

    let weight_diff = match (current.night_weight, previous.night_weight) {
        (Some(now), Some(before)) => Some(now - before),
        _ => None,
    };
    let ytd = match (current.night_weight, start_weight) {
        (Some(now), Some(start)) => Some(now - start),
        _ => None,
    };

    let text = [
        format!("Day {} ({})", current.day_offset, current.date),
        format!("Consumed: {} kcal", one_decimal(current.consumed)),
        format!("Burned: {} kcal", one_decimal(current.burned)),
        format!("{} kcal {label}", one_decimal(consumed_diff)),
        format!("Morning weight: {}", or_unknown(current.morning_weight)),
        format!("Night weight: {}", or_unknown(current.night_weight)),
        format!("Weight change: {}", or_unknown(weight_diff)),
        format!("Since start: {}", or_unknown(ytd)),
    ]
    .join("\n");

    Report {
        report: text,
        screenshot: current.screenshot.clone(),
    }
}

fn one_decimal(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    // avoid "-0.0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{rounded:.1}")
}

fn or_unknown(value: Option<f64>) -> String {
    value.map(one_decimal).unwrap_or_else(|| UNKNOWN.to_string())
}
