use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::Record;

/// The orderings offered for the records list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortKey {
    #[default]
    DateDesc,
    DateAsc,
    DescriptionAsc,
    DescriptionDesc,
    AmountAsc,
    AmountDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::DateDesc,
        SortKey::DateAsc,
        SortKey::DescriptionAsc,
        SortKey::DescriptionDesc,
        SortKey::AmountAsc,
        SortKey::AmountDesc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::DateDesc => "date-desc",
            SortKey::DateAsc => "date-asc",
            SortKey::DescriptionAsc => "desc-asc",
            SortKey::DescriptionDesc => "desc-desc",
            SortKey::AmountAsc => "amount-asc",
            SortKey::AmountDesc => "amount-desc",
        }
    }

    fn compare(&self, a: &Record, b: &Record) -> Ordering {
        match self {
            SortKey::DateDesc => b.date.cmp(&a.date),
            SortKey::DateAsc => a.date.cmp(&b.date),
            SortKey::DescriptionAsc => a.description.cmp(&b.description),
            SortKey::DescriptionDesc => b.description.cmp(&a.description),
            SortKey::AmountAsc => a.amount.cmp(&b.amount),
            SortKey::AmountDesc => b.amount.cmp(&a.amount),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<_> = SortKey::ALL.iter().map(SortKey::as_str).collect();
                format!("Unknown sort key {s:?}; expected one of {}", known.join(", "))
            })
    }
}

impl<'de> Deserialize<'de> for SortKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Return a sorted copy; ties keep their original relative order.
pub fn sorted_by<'a, R>(records: &'a [R], key: SortKey) -> Vec<&'a Record>
where
    R: AsRef<Record>,
{
    let mut sorted: Vec<&Record> = records.iter().map(|r| r.as_ref()).collect();
    sorted.sort_by(|a, b| key.compare(a, b));
    sorted
}

/// Sort by a key given in text form. An unrecognised key keeps input order.
pub fn sort_records<'a, R>(records: &'a [R], key: &str) -> Vec<&'a Record>
where
    R: AsRef<Record>,
{
    match key.parse::<SortKey>() {
        Ok(key) => sorted_by(records, key),
        Err(_) => records.iter().map(|r| r.as_ref()).collect(),
    }
}

impl AsRef<Record> for Record {
    fn as_ref(&self) -> &Record {
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn record(id: &str, description: &str, amount: Decimal, date: (i32, u32, u32)) -> Record {
        let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
        Record::new(id, description, amount, "Other", date)
    }

    fn sample_records() -> Vec<Record> {
        vec![
            record("rec_0001", "Bread", dec!(2.50), (2024, 9, 3)),
            record("rec_0002", "Apples", dec!(4.00), (2024, 9, 1)),
            record("rec_0003", "Coffee", dec!(3.25), (2024, 9, 2)),
            record("rec_0004", "Dates", dec!(4.00), (2024, 9, 2)),
        ]
    }

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[rstest]
    #[case("date-desc", vec!["rec_0001", "rec_0003", "rec_0004", "rec_0002"])]
    #[case("date-asc", vec!["rec_0002", "rec_0003", "rec_0004", "rec_0001"])]
    #[case("desc-asc", vec!["rec_0002", "rec_0001", "rec_0003", "rec_0004"])]
    #[case("desc-desc", vec!["rec_0004", "rec_0003", "rec_0001", "rec_0002"])]
    #[case("amount-asc", vec!["rec_0001", "rec_0003", "rec_0002", "rec_0004"])]
    #[case("amount-desc", vec!["rec_0002", "rec_0004", "rec_0003", "rec_0001"])]
    #[case("bogus", vec!["rec_0001", "rec_0002", "rec_0003", "rec_0004"])]
    fn test_sort_records(#[case] key: &str, #[case] expected: Vec<&str>) {
        let records = sample_records();
        let before = records.clone();
        let result = sort_records(&records, key);
        assert_eq!(ids(&result), expected);

        // The source list is untouched.
        assert_eq!(records, before);
    }

    #[test]
    fn test_amount_sorts_reverse_each_other_without_ties() {
        let records = vec![
            record("rec_0001", "A", dec!(5), (2024, 1, 1)),
            record("rec_0002", "B", dec!(1), (2024, 1, 1)),
            record("rec_0003", "C", dec!(3), (2024, 1, 1)),
        ];
        let asc = sorted_by(&records, SortKey::AmountAsc);
        let desc = sorted_by(&asc, SortKey::AmountDesc);
        let mut reversed = asc.clone();
        reversed.reverse();
        assert_eq!(desc, reversed);
    }

    #[test]
    fn test_sorting_a_view_of_a_view() {
        let records = sample_records();
        let by_date = sorted_by(&records, SortKey::DateAsc);
        let by_amount = sorted_by(&by_date, SortKey::AmountDesc);
        // rec_0002 precedes rec_0004 by date, and they tie on amount.
        assert_eq!(
            ids(&by_amount),
            vec!["rec_0002", "rec_0004", "rec_0003", "rec_0001"]
        );
    }

    #[test]
    fn test_sort_key_round_trip_text() {
        for key in SortKey::ALL {
            assert_eq!(key.as_str().parse::<SortKey>().unwrap(), key);
        }
        assert!("newest".parse::<SortKey>().unwrap_err().contains("date-desc"));
        assert_eq!(SortKey::default(), SortKey::DateDesc);
    }
}
