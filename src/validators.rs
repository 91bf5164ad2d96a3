use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

use crate::dates::RecordDate;

/// No leading or trailing whitespace.
static RE_DESCRIPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S(?:.*\S)?$").unwrap());
static RE_DOUBLE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"  +").unwrap());
static RE_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9A-Za-z_]+").unwrap());
/// Zero or a number without leading zeros, with up to two decimals.
static RE_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0|[1-9][0-9]*)(\.[0-9]{1,2})?$").unwrap());
/// Letters with single space or hyphen separators.
static RE_CATEGORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+(?:[ -][A-Za-z]+)*$").unwrap());

const MAX_AMOUNT: Decimal = dec!(99999);
const MIN_DESCRIPTION_LEN: usize = 2;
const MAX_DESCRIPTION_LEN: usize = 120;

/// A user-correctable problem with a single input field.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("Description is required.")]
    DescriptionRequired,
    #[error("No leading or trailing spaces allowed.")]
    SurroundingWhitespace,
    #[error("No double spaces allowed.")]
    DoubleSpace,
    #[error("Duplicate word detected (e.g. \"the the\").")]
    DuplicateWord,
    #[error("Description must be at least 2 characters.")]
    DescriptionTooShort,
    #[error("Description must be 120 characters or fewer.")]
    DescriptionTooLong,
    #[error("Amount is required.")]
    AmountRequired,
    #[error("Enter a valid amount (e.g. 12.50).")]
    AmountFormat,
    #[error("Amount must be greater than 0.")]
    AmountNotPositive,
    #[error("Amount seems too large.")]
    AmountTooLarge,
    #[error("Date is required.")]
    DateRequired,
    #[error("Date must be in YYYY-MM-DD format.")]
    DateFormat,
    #[error("Please select a category.")]
    CategoryRequired,
    #[error("Category name is required.")]
    CategoryNameRequired,
    #[error("Only letters, spaces, and hyphens allowed.")]
    CategoryNameFormat,
    #[error("Category already exists.")]
    CategoryExists,
    #[error("Enter a valid number (e.g. 500).")]
    BudgetCapFormat,
    #[error("Enter a valid rate (e.g. 1.27).")]
    RateFormat,
}

pub fn validate_description(value: &str) -> Result<(), FieldError> {
    if value.is_empty() {
        return Err(FieldError::DescriptionRequired);
    }
    if !RE_DESCRIPTION.is_match(value) {
        return Err(FieldError::SurroundingWhitespace);
    }
    if RE_DOUBLE_SPACE.is_match(value) {
        return Err(FieldError::DoubleSpace);
    }
    if has_repeated_word(value) {
        return Err(FieldError::DuplicateWord);
    }
    // UTF-16 code units, so astral characters count twice.
    let len = value.encode_utf16().count();
    if len < MIN_DESCRIPTION_LEN {
        return Err(FieldError::DescriptionTooShort);
    }
    if len > MAX_DESCRIPTION_LEN {
        return Err(FieldError::DescriptionTooLong);
    }
    Ok(())
}

/// True when a word is immediately followed, across whitespace only,
/// by the same word in any letter case.
fn has_repeated_word(value: &str) -> bool {
    let words: Vec<_> = RE_WORD.find_iter(value).collect();
    words.windows(2).any(|pair| {
        let gap = &value[pair[0].end()..pair[1].start()];
        !gap.is_empty()
            && gap.chars().all(char::is_whitespace)
            && pair[0].as_str().eq_ignore_ascii_case(pair[1].as_str())
    })
}

pub fn validate_amount(value: &str) -> Result<(), FieldError> {
    parse_valid_amount(value).map(|_| ())
}

fn parse_valid_amount(value: &str) -> Result<Decimal, FieldError> {
    if value.is_empty() {
        return Err(FieldError::AmountRequired);
    }
    if !RE_AMOUNT.is_match(value) {
        return Err(FieldError::AmountFormat);
    }
    let amount = Decimal::from_str_exact(value).map_err(|_| FieldError::AmountFormat)?;
    if amount <= Decimal::ZERO {
        return Err(FieldError::AmountNotPositive);
    }
    if amount > MAX_AMOUNT {
        return Err(FieldError::AmountTooLarge);
    }
    Ok(amount)
}

pub fn validate_date(value: &str) -> Result<(), FieldError> {
    parse_valid_date(value).map(|_| ())
}

fn parse_valid_date(value: &str) -> Result<RecordDate, FieldError> {
    if value.is_empty() {
        return Err(FieldError::DateRequired);
    }
    RecordDate::parse(value).ok_or(FieldError::DateFormat)
}

pub fn validate_category(value: &str) -> Result<(), FieldError> {
    if value.is_empty() {
        return Err(FieldError::CategoryRequired);
    }
    Ok(())
}

pub fn validate_custom_category(value: &str) -> Result<(), FieldError> {
    if value.is_empty() {
        return Err(FieldError::CategoryNameRequired);
    }
    if !RE_CATEGORY.is_match(value) {
        return Err(FieldError::CategoryNameFormat);
    }
    Ok(())
}

pub fn validate_budget_cap(value: &str) -> Result<(), FieldError> {
    if value.is_empty() || RE_AMOUNT.is_match(value) {
        return Ok(());
    }
    Err(FieldError::BudgetCapFormat)
}

pub fn validate_currency_rate(value: &str) -> Result<(), FieldError> {
    if value.is_empty() || RE_AMOUNT.is_match(value) {
        return Ok(());
    }
    Err(FieldError::RateFormat)
}

/// The input field a validation error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Description,
    Amount,
    Category,
    Date,
    BudgetCap,
    RateUsd,
    RateEur,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Description => "description",
            Field::Amount => "amount",
            Field::Category => "category",
            Field::Date => "date",
            Field::BudgetCap => "budget cap",
            Field::RateUsd => "USD rate",
            Field::RateEur => "EUR rate",
        };
        f.write_str(name)
    }
}

/// Every failing field of a submitted form, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(pub Vec<(Field, FieldError)>);

impl FieldErrors {
    fn check(&mut self, field: Field, outcome: Result<(), FieldError>) {
        if let Err(err) = outcome {
            self.0.push((field, err));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: Field) -> Option<FieldError> {
        self.0.iter().find(|(f, _)| *f == field).map(|(_, e)| *e)
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, err)) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{field}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

/// The typed values of a record form that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFields {
    pub description: String,
    pub amount: Decimal,
    pub category: String,
    pub date: RecordDate,
}

/// Validate the four record fields independently, reporting each failure.
pub fn validate_record_fields(
    description: &str,
    amount: &str,
    category: &str,
    date: &str,
) -> Result<RecordFields, FieldErrors> {
    let mut errors = FieldErrors::default();
    errors.check(Field::Description, validate_description(description));
    let amount = parse_valid_amount(amount);
    errors.check(Field::Amount, amount.map(|_| ()));
    errors.check(Field::Category, validate_category(category));
    let date = parse_valid_date(date);
    errors.check(Field::Date, date.clone().map(|_| ()));

    match (amount, date) {
        (Ok(amount), Ok(date)) if errors.is_empty() => Ok(RecordFields {
            description: description.to_owned(),
            amount,
            category: category.to_owned(),
            date,
        }),
        _ => Err(errors),
    }
}

/// Validate the settings form fields independently.
pub fn validate_settings(
    budget_cap: &str,
    rate_usd: &str,
    rate_eur: &str,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();
    errors.check(Field::BudgetCap, validate_budget_cap(budget_cap));
    errors.check(Field::RateUsd, validate_currency_rate(rate_usd));
    errors.check(Field::RateEur, validate_currency_rate(rate_eur));
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
