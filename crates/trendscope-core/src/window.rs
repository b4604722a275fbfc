//! Monthly time windows.
//!
//! Window `i` covers `[start + i months, start + (i + 1) months)` at UTC
//! midnight, so consecutive windows are contiguous and never overlap.

use crate::error::{Result, TrendError};
use crate::types::TimeWindow;
use chrono::{DateTime, Months, NaiveDate};

fn month_start(start: NaiveDate, offset: usize) -> Result<i64> {
    let months = u32::try_from(offset)
        .map_err(|_| TrendError::invalid_config("windows.count", offset.to_string(), "too large"))?;
    let date = start.checked_add_months(Months::new(months)).ok_or_else(|| {
        TrendError::invalid_config("windows.start", start.to_string(), "date out of range")
    })?;
    let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| {
        TrendError::invalid_config("windows.start", start.to_string(), "no midnight")
    })?;
    Ok(midnight.and_utc().timestamp())
}

/// The `index`-th monthly window after `start`.
pub fn time_window(start: NaiveDate, index: usize) -> Result<TimeWindow> {
    Ok(TimeWindow::new(
        month_start(start, index)?,
        month_start(start, index + 1)?,
    ))
}

/// `count` consecutive monthly windows beginning at `start`.
pub fn time_windows(start: NaiveDate, count: usize) -> Result<Vec<TimeWindow>> {
    (0..count).map(|i| time_window(start, i)).collect()
}

/// Unix timestamp formatted as `YYYY-MM-DD` (UTC).
pub fn format_date(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn windows_are_contiguous_months() {
        let windows = time_windows(date(2020, 1, 1), 3).unwrap();
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].start, 1_577_836_800);
        assert_eq!(format_date(windows[0].stop), "2020-02-01");
        assert_eq!(format_date(windows[1].stop), "2020-03-01");
        for pair in windows.windows(2) {
            assert_eq!(pair[0].stop, pair[1].start);
        }
    }

    #[test]
    fn month_arithmetic_clamps_to_month_end() {
        let w = time_window(date(2021, 1, 31), 1).unwrap();
        assert_eq!(format_date(w.start), "2021-02-28");
        assert_eq!(format_date(w.stop), "2021-03-31");
    }

    #[test]
    fn indexed_window_matches_sequence() {
        let start = date(2019, 11, 1);
        let all = time_windows(start, 5).unwrap();
        assert_eq!(time_window(start, 4).unwrap(), all[4]);
        assert_eq!(format_date(all[2].start), "2020-01-01");
    }
}
