use std::fmt;
use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Number of days covered by the dashboard's daily series.
pub const WEEK_LENGTH: u64 = 7;

/// Month 01-12 and day 01-31; the day is not checked against the month.
static RE_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])$").unwrap()
});

/// A record date exactly as entered, in `YYYY-MM-DD` form.
///
/// Only the literal ranges are checked, so `2024-02-30` is a valid record
/// date. Ordering is the string ordering, which is chronological for
/// fixed-width dates.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RecordDate(String);

impl RecordDate {
    /// Accept a `YYYY-MM-DD` string with in-range month and day.
    pub fn parse(value: &str) -> Option<Self> {
        RE_DATE
            .is_match(value)
            .then(|| RecordDate(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<NaiveDate> for RecordDate {
    fn from(date: NaiveDate) -> Self {
        RecordDate(date.format(DATE_FORMAT).to_string())
    }
}

impl fmt::Display for RecordDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Instructions on how to deserialize a record date.
impl<'de> Deserialize<'de> for RecordDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        RecordDate::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("{s:?} is not a YYYY-MM-DD date")))
    }
}

/// The trailing week ending at (and including) `today`, oldest first.
pub fn trailing_week(today: NaiveDate) -> Vec<NaiveDate> {
    (0..WEEK_LENGTH)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .collect()
}

/// Short MM-DD label used by the bar chart.
pub fn short_label(date: &NaiveDate) -> String {
    date.format("%m-%d").to_string()
}

/// The current local calendar date.
pub fn today() -> NaiveDate {
    chrono::offset::Local::now().naive_local().date()
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trailing_week_crosses_month_boundary() {
        let expected = vec![
            ymd(2024, 2, 26),
            ymd(2024, 2, 27),
            ymd(2024, 2, 28),
            ymd(2024, 2, 29),
            ymd(2024, 3, 1),
            ymd(2024, 3, 2),
            ymd(2024, 3, 3),
        ];
        assert_eq!(trailing_week(ymd(2024, 3, 3)), expected);
    }

    #[rstest]
    #[case("2024-02-29", true)]
    #[case("2024-02-30", true)]
    #[case("2023-02-29", true)]
    #[case("2024-04-31", true)]
    #[case("2024-2-9", false)]
    #[case("2024-13-01", false)]
    #[case("2024-01-32", false)]
    #[case("2024-00-10", false)]
    #[case(" 2024-01-10", false)]
    #[case("yesterday", false)]
    fn test_parse_record_date(#[case] given: &str, #[case] accepted: bool) {
        let result = RecordDate::parse(given);
        assert_eq!(result.is_some(), accepted);
        if let Some(date) = result {
            assert_eq!(date.as_str(), given);
        }
    }

    #[test]
    fn test_record_dates_order_as_text() {
        let mut dates: Vec<RecordDate> = ["2024-03-01", "2024-02-30", "2023-12-31"]
            .into_iter()
            .filter_map(RecordDate::parse)
            .collect();
        dates.sort();
        let sorted: Vec<&str> = dates.iter().map(RecordDate::as_str).collect();
        assert_eq!(sorted, vec!["2023-12-31", "2024-02-30", "2024-03-01"]);
    }

    #[test]
    fn test_record_date_from_calendar_date() {
        assert_eq!(RecordDate::from(ymd(2024, 9, 3)).as_str(), "2024-09-03");
    }

    #[test]
    fn test_record_date_serde() {
        let date: RecordDate = serde_json::from_str("\"2024-02-30\"").unwrap();
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"2024-02-30\"");
        assert!(serde_json::from_str::<RecordDate>("\"2024-2-30\"").is_err());
    }

    #[test]
    fn test_short_label() {
        assert_eq!(short_label(&ymd(2024, 10, 5)), "10-05");
    }
}
