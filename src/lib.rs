mod config;
mod currency;
mod dashboard;
mod dates;
mod errors;
mod search;
mod settings;
mod sort;
mod storage;
mod store;
mod transfer;
mod validators;

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub use config::{
    config_template, normalize_path, AppConfig, ListOptions, SearchOptions, StoragePaths,
};
pub use currency::{convert, Conversion, Rates, BASE_CURRENCY};
pub use dashboard::{
    summarize, BudgetStatus, CategoryShare, CategoryTotal, Dashboard, DailyPoint,
};
pub use dates::{short_label, today, trailing_week, RecordDate, DATE_FORMAT};
pub use errors::{ImportError, StoreError};
pub use search::{compile_regex, escape_html, filter_records, highlight, CompiledPattern, Matcher};
pub use settings::{Settings, DEFAULT_RATE_EUR, DEFAULT_RATE_USD};
pub use sort::{sort_records, sorted_by, SortKey};
pub use storage::{
    load_slot, save_slot, FileStore, KeyValueStore, MemoryStore, RECORDS_KEY, SETTINGS_KEY,
};
pub use store::RecordStore;
pub use transfer::{
    export_json, import_json, inspect_elements, write_export, ElementVerdict, ImportReport,
    ShapeViolation, EXPORT_FILE_NAME,
};
pub use validators::{
    validate_amount, validate_budget_cap, validate_category, validate_currency_rate,
    validate_custom_category, validate_date, validate_description, validate_record_fields,
    validate_settings, Field, FieldError, FieldErrors, RecordFields,
};

/// The categories every installation starts with.
pub const BUILTIN_CATEGORIES: [&str; 6] =
    ["Food", "Books", "Transport", "Entertainment", "Fees", "Other"];

/// A single expense entry as it is persisted and exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub category: String,
    pub date: RecordDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Create a record stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        amount: Decimal,
        category: impl Into<String>,
        date: impl Into<RecordDate>,
    ) -> Self {
        let now = Utc::now();
        Record {
            id: id.into(),
            description: description.into(),
            amount,
            category: category.into(),
            date: date.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge the fields present in `patch` and refresh `updated_at`.
    pub fn apply(&mut self, patch: RecordPatch) {
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

/// A partial update for a record; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub date: Option<RecordDate>,
}

impl RecordPatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.date.is_none()
    }
}

/// Convert a decimal amount in string form into a Decimal object.
///
/// Surrounding whitespace is ignored. Returns None if the text is not
/// a plain decimal number.
pub fn parse_amount(amount: &str) -> Option<Decimal> {
    Decimal::from_str(amount.trim()).ok()
}

/// Parse an amount and keep it only if it is strictly positive.
pub fn parse_positive_amount(amount: &str) -> Option<Decimal> {
    parse_amount(amount).filter(|x| x.is_sign_positive() && !x.is_zero())
}
