use std::fmt;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::currency::BASE_CURRENCY;
use crate::dates::{short_label, trailing_week, RecordDate};
use crate::{Record, Settings};

const HUNDRED: Decimal = dec!(100);

/// Whether spending is within the configured budget cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetStatus {
    Under,
    Over,
}

/// Sum of amounts for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

/// One bar of the trailing-week chart.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub total: Decimal,
    /// Bar height relative to the largest day (or 1, whichever is larger).
    pub height_percent: Decimal,
}

impl DailyPoint {
    pub fn label(&self) -> String {
        short_label(&self.date)
    }
}

/// A category's share of all spending.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub category: String,
    pub total: Decimal,
    pub percent: Decimal,
}

/// Everything the dashboard shows, computed from scratch.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub total: usize,
    pub sum: Decimal,
    /// Per-category totals in order of first appearance.
    pub category_totals: Vec<CategoryTotal>,
    pub top_category: Option<String>,
    pub budget_cap: Option<Decimal>,
    /// `cap - sum` when a positive cap is set; negative means over budget.
    pub remaining: Option<Decimal>,
    /// Exactly seven days, oldest first, ending today.
    pub daily_series: Vec<DailyPoint>,
    /// Categories by descending total; empty when nothing was spent.
    pub category_share: Vec<CategoryShare>,
}

impl Dashboard {
    pub fn status(&self) -> Option<BudgetStatus> {
        self.remaining.map(|remaining| {
            if remaining >= Decimal::ZERO {
                BudgetStatus::Under
            } else {
                BudgetStatus::Over
            }
        })
    }

    /// The budget alert message, if a cap is set.
    pub fn budget_message(&self) -> Option<String> {
        let cap = self.budget_cap?;
        let remaining = self.remaining?;
        let message = match self.status()? {
            BudgetStatus::Under => format!(
                "You're within budget. {} remaining of {}.",
                money(remaining),
                money(cap)
            ),
            BudgetStatus::Over => format!(
                "Budget exceeded by {}! (Cap: {})",
                money(remaining.abs()),
                money(cap)
            ),
        };
        Some(message)
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Records:      {}", self.total)?;
        writeln!(f, "Total spent:  {}", money(self.sum))?;
        writeln!(
            f,
            "Top category: {}",
            self.top_category.as_deref().unwrap_or("none")
        )?;
        match self.remaining {
            Some(remaining) if remaining < Decimal::ZERO => {
                writeln!(f, "Remaining:    -{}", money(remaining.abs()))?
            }
            Some(remaining) => writeln!(f, "Remaining:    {}", money(remaining))?,
            None => writeln!(f, "Remaining:    none")?,
        }
        if let Some(message) = self.budget_message() {
            writeln!(f, "{message}")?;
        }

        writeln!(f, "\nLast 7 days:")?;
        for point in self.daily_series.iter() {
            let bar = "#".repeat(bar_width(point.height_percent, 20));
            writeln!(f, "  {} {:<20} {}", point.label(), bar, money(point.total))?;
        }

        if !self.category_share.is_empty() {
            writeln!(f, "\nBy category:")?;
            for share in self.category_share.iter() {
                writeln!(
                    f,
                    "  {:<14} {:>4}% {}",
                    share.category,
                    share.percent.round_dp(0),
                    money(share.total)
                )?;
            }
        }
        Ok(())
    }
}

fn money(value: Decimal) -> String {
    format!("{BASE_CURRENCY}{:.2}", value)
}

fn bar_width(percent: Decimal, width: u32) -> usize {
    let cells = (percent.saturating_mul(Decimal::from(width)) / HUNDRED).round();
    cells.to_usize().unwrap_or(0)
}

/// Compute the dashboard for `records` as of `today`.
pub fn summarize<R>(records: &[R], settings: &Settings, today: NaiveDate) -> Dashboard
where
    R: AsRef<Record>,
{
    let sum = saturating_sum(records.iter().map(|r| r.as_ref().amount));
    let category_totals = category_totals(records);
    let ranked = ranked_by_total(&category_totals);
    let top_category = ranked.first().map(|c| c.category.clone());

    let budget_cap = settings.budget_cap();
    let remaining = budget_cap.map(|cap| cap.saturating_sub(sum));

    let category_share = if sum.is_zero() {
        vec![]
    } else {
        ranked
            .into_iter()
            .filter(|c| !c.total.is_zero())
            .map(|c| CategoryShare {
                category: c.category.clone(),
                total: c.total,
                percent: percent_of(c.total, sum),
            })
            .collect()
    };

    Dashboard {
        total: records.len(),
        sum,
        top_category,
        budget_cap,
        remaining,
        daily_series: daily_series(records, today),
        category_share,
        category_totals,
    }
}

fn category_totals<R: AsRef<Record>>(records: &[R]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();
    for record in records.iter().map(|r| r.as_ref()) {
        match totals.iter_mut().find(|c| c.category == record.category) {
            Some(entry) => entry.total = entry.total.saturating_add(record.amount),
            None => totals.push(CategoryTotal {
                category: record.category.to_owned(),
                total: record.amount,
            }),
        }
    }
    totals
}

/// Categories by descending total. Equal totals keep first-appearance order.
fn ranked_by_total(totals: &[CategoryTotal]) -> Vec<&CategoryTotal> {
    let mut ranked: Vec<&CategoryTotal> = totals.iter().collect();
    ranked.sort_by(|a, b| b.total.cmp(&a.total));
    ranked
}

fn daily_series<R: AsRef<Record>>(records: &[R], today: NaiveDate) -> Vec<DailyPoint> {
    let totals: Vec<(NaiveDate, Decimal)> = trailing_week(today)
        .into_iter()
        .map(|day| {
            let key = RecordDate::from(day);
            let total = saturating_sum(
                records
                    .iter()
                    .map(|r| r.as_ref())
                    .filter(|r| r.date == key)
                    .map(|r| r.amount),
            );
            (day, total)
        })
        .collect();

    let scale = totals
        .iter()
        .map(|(_, total)| *total)
        .max()
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ONE);

    totals
        .into_iter()
        .map(|(date, total)| DailyPoint {
            date,
            total,
            height_percent: percent_of(total, scale),
        })
        .collect()
}

/// Sum that clamps at the bounds of `Decimal` instead of overflowing.
fn saturating_sum(amounts: impl Iterator<Item = Decimal>) -> Decimal {
    amounts.fold(Decimal::ZERO, Decimal::saturating_add)
}

/// `part / whole * 100`, clamped; zero when the quotient is not representable.
fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    part.checked_div(whole)
        .map(|ratio| ratio.saturating_mul(HUNDRED))
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod test {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        ymd(2024, 9, 10)
    }

    fn record(id: &str, amount: Decimal, category: &str, date: NaiveDate) -> Record {
        Record::new(id, "Item", amount, category, date)
    }

    fn sample_records() -> Vec<Record> {
        vec![
            record("rec_0001", dec!(100), "Food", ymd(2024, 9, 10)),
            record("rec_0002", dec!(200), "Books", ymd(2024, 9, 9)),
            record("rec_0003", dec!(50), "Food", ymd(2024, 9, 4)),
            record("rec_0004", dec!(100), "Transport", ymd(2024, 9, 3)),
        ]
    }

    fn with_cap(cap: &str) -> Settings {
        Settings {
            budget_cap: Some(cap.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_totals_and_top_category() {
        let result = summarize(&sample_records(), &Settings::default(), today());
        assert_eq!(result.total, 4);
        assert_eq!(result.sum, dec!(450));
        assert_eq!(
            result.category_totals,
            vec![
                CategoryTotal { category: "Food".to_string(), total: dec!(150) },
                CategoryTotal { category: "Books".to_string(), total: dec!(200) },
                CategoryTotal { category: "Transport".to_string(), total: dec!(100) },
            ]
        );
        assert_eq!(result.top_category.as_deref(), Some("Books"));
        assert_eq!(result.remaining, None);
        assert_eq!(result.status(), None);
        assert_eq!(result.budget_message(), None);
    }

    #[rstest]
    #[case("500", Some(dec!(50)), Some(BudgetStatus::Under))]
    #[case("450", Some(dec!(0)), Some(BudgetStatus::Under))]
    #[case("400", Some(dec!(-50)), Some(BudgetStatus::Over))]
    #[case("0", None, None)]
    #[case("", None, None)]
    #[case("lots", None, None)]
    fn test_budget_remaining(
        #[case] cap: &str,
        #[case] remaining: Option<Decimal>,
        #[case] status: Option<BudgetStatus>,
    ) {
        let result = summarize(&sample_records(), &with_cap(cap), today());
        assert_eq!(result.remaining, remaining);
        assert_eq!(result.status(), status);
    }

    #[rstest]
    #[case("500", "You're within budget. RWF50.00 remaining of RWF500.00.")]
    #[case("400", "Budget exceeded by RWF50.00! (Cap: RWF400.00)")]
    fn test_budget_message(#[case] cap: &str, #[case] expected: &str) {
        let result = summarize(&sample_records(), &with_cap(cap), today());
        assert_eq!(result.budget_message().unwrap(), expected);
    }

    #[test]
    fn test_daily_series() {
        let result = summarize(&sample_records(), &Settings::default(), today());
        let days: Vec<NaiveDate> = result.daily_series.iter().map(|p| p.date).collect();
        assert_eq!(days, trailing_week(today()));

        let totals: Vec<Decimal> = result.daily_series.iter().map(|p| p.total).collect();
        // 2024-09-03 falls outside the window.
        assert_eq!(
            totals,
            vec![dec!(50), dec!(0), dec!(0), dec!(0), dec!(0), dec!(200), dec!(100)]
        );

        let heights: Vec<Decimal> = result
            .daily_series
            .iter()
            .map(|p| p.height_percent)
            .collect();
        assert_eq!(
            heights,
            vec![dec!(25), dec!(0), dec!(0), dec!(0), dec!(0), dec!(100), dec!(50)]
        );
        assert_eq!(result.daily_series[6].label(), "09-10");
    }

    #[test]
    fn test_daily_series_without_records() {
        let records: Vec<Record> = vec![];
        let result = summarize(&records, &Settings::default(), today());
        assert_eq!(result.daily_series.len(), 7);
        assert!(result
            .daily_series
            .iter()
            .all(|p| p.total.is_zero() && p.height_percent.is_zero()));
        assert_eq!(result.top_category, None);
        assert!(result.category_share.is_empty());
    }

    #[test]
    fn test_small_amounts_scale_against_one() {
        let records = vec![record("rec_0001", dec!(0.5), "Fees", today())];
        let result = summarize(&records, &Settings::default(), today());
        assert_eq!(result.daily_series[6].height_percent, dec!(50));
    }

    #[test]
    fn test_category_share() {
        let result = summarize(&sample_records(), &Settings::default(), today());
        let shares: Vec<(&str, Decimal)> = result
            .category_share
            .iter()
            .map(|s| (s.category.as_str(), s.percent.round_dp(2)))
            .collect();
        assert_eq!(
            shares,
            vec![("Books", dec!(44.44)), ("Food", dec!(33.33)), ("Transport", dec!(22.22))]
        );
    }

    #[test]
    fn test_tied_categories_keep_first_appearance() {
        let records = vec![
            record("rec_0001", dec!(10), "Fees", today()),
            record("rec_0002", dec!(10), "Books", today()),
        ];
        let result = summarize(&records, &Settings::default(), today());
        assert_eq!(result.top_category.as_deref(), Some("Fees"));
    }

    #[test]
    fn test_summarize_accepts_views() {
        let records = sample_records();
        let view: Vec<&Record> = records.iter().filter(|r| r.category == "Food").collect();
        let result = summarize(&view, &Settings::default(), today());
        assert_eq!(result.sum, dec!(150));
        assert_eq!(result.category_share.len(), 1);
        assert_eq!(result.category_share[0].percent, dec!(100));
    }

    #[test]
    fn test_extreme_amounts_clamp() {
        let records = vec![
            record("rec_0001", Decimal::MAX, "Food", today()),
            record("rec_0002", Decimal::MAX, "Books", today()),
            record("rec_0003", dec!(-5), "Fees", ymd(2024, 9, 9)),
        ];
        let result = summarize(&records, &with_cap("0.5"), today());
        assert_eq!(result.sum, Decimal::MAX - dec!(5));
        assert_eq!(result.status(), Some(BudgetStatus::Over));
        assert_eq!(result.daily_series[6].total, Decimal::MAX);
        assert_eq!(result.daily_series[6].height_percent, dec!(100));
        assert!(!result.to_string().is_empty());
    }

    #[test]
    fn test_large_cap_with_negative_spending() {
        let records = vec![record("rec_0001", dec!(-5), "Fees", today())];
        let cap = Decimal::MAX.to_string();
        let result = summarize(&records, &with_cap(&cap), today());
        assert_eq!(result.remaining, Some(Decimal::MAX));
        assert_eq!(result.status(), Some(BudgetStatus::Under));
    }

    #[test]
    fn test_display() {
        let result = summarize(&sample_records(), &with_cap("400"), today());
        let text = result.to_string();
        assert!(text.contains("Total spent:  RWF450.00"));
        assert!(text.contains("Remaining:    -RWF50.00"));
        assert!(text.contains("Budget exceeded by RWF50.00!"));
        assert!(text.contains("09-09 ####################"));
    }
}
