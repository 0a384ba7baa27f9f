use chrono::NaiveDate;
use std::path::PathBuf;

/// Get the SQLite database path from the environment or use the default.
pub fn get_database_path() -> PathBuf {
    std::env::var("COINWATCH_DB")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data").join("coinwatch.db"))
}

/// Format a calendar date the way API responses expect it.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_date_is_iso_day() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 9).unwrap();
        assert_eq!(format_date(date), "2025-01-09");
    }
}
