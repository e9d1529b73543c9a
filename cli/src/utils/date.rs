use chrono::{Datelike, NaiveDate, Utc, Weekday};

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Timestamp suffix for export and save files, e.g. `20240105_143000`.
pub fn file_timestamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Weekdays in `[start, end]`, an approximation of trading sessions.
pub fn count_weekdays(start: NaiveDate, end: NaiveDate) -> usize {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !is_weekend(*d))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_weekdays_inclusive() {
        // Mon 2024-01-01 .. Sun 2024-01-14
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        assert_eq!(count_weekdays(start, end), 10);
    }
}
