use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use tracing::{debug, info};

use crate::dates::RecordDate;
use crate::storage::KeyValueStore;
use crate::{ImportError, Record, RecordStore, StoreError};

/// File name used for exports.
pub const EXPORT_FILE_NAME: &str = "finance-records.json";

/// Serialize records as a two-space indented JSON array.
pub fn export_json<R>(records: &[R]) -> Result<String, serde_json::Error>
where
    R: AsRef<Record>,
{
    let records: Vec<&Record> = records.iter().map(|r| r.as_ref()).collect();
    serde_json::to_string_pretty(&records)
}

/// Write the export file into `dir`, returning its path.
pub fn write_export<R>(dir: impl AsRef<Path>, records: &[R]) -> Result<PathBuf, StoreError>
where
    R: AsRef<Record>,
{
    let path = dir.as_ref().join(EXPORT_FILE_NAME);
    fs::write(&path, export_json(records)?)?;
    info!(path = %path.display(), count = records.len(), "exported records");
    Ok(path)
}

/// Why an element of an import file was not accepted as a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeViolation {
    NotAnObject,
    MissingId,
    IdNotString,
    DescriptionNotString,
    AmountNotNumber,
    AmountNotDecimal,
    MissingCategory,
    CategoryNotString,
    MissingDate,
    InvalidDate,
}

impl fmt::Display for ShapeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ShapeViolation::NotAnObject => "element is not an object",
            ShapeViolation::MissingId => "missing id",
            ShapeViolation::IdNotString => "id is not a string",
            ShapeViolation::DescriptionNotString => "description is not a string",
            ShapeViolation::AmountNotNumber => "amount is not a number",
            ShapeViolation::AmountNotDecimal => "amount cannot be represented as a decimal",
            ShapeViolation::MissingCategory => "missing category",
            ShapeViolation::CategoryNotString => "category is not a string",
            ShapeViolation::MissingDate => "missing date",
            ShapeViolation::InvalidDate => "date is not in YYYY-MM-DD form",
        };
        f.write_str(reason)
    }
}

/// The outcome of checking one element of an import file.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementVerdict {
    Accepted(Record),
    Rejected {
        index: usize,
        reasons: Vec<ShapeViolation>,
    },
}

/// What an import did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// Ids of the records that were added.
    pub imported: Vec<String>,
    /// Ids skipped because they were already present.
    pub duplicates: Vec<String>,
    /// Elements that did not have the shape of a record.
    pub rejected: Vec<ElementVerdict>,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} new record(s). {} skipped (duplicate id).",
            self.imported.len(),
            self.duplicates.len()
        )?;
        if !self.rejected.is_empty() {
            write!(f, " {} invalid element(s) ignored.", self.rejected.len())?;
        }
        Ok(())
    }
}

/// Whether a JSON value counts as present: not null, false, zero or empty text.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|x| x != 0.0 && !x.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Fetch a truthy string field, recording why it is unusable otherwise.
fn truthy_string<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    missing: ShapeViolation,
    not_string: ShapeViolation,
    reasons: &mut Vec<ShapeViolation>,
) -> Option<&'a str> {
    match object.get(key) {
        Some(value) if is_truthy(value) => match value.as_str() {
            Some(s) => Some(s),
            None => {
                reasons.push(not_string);
                None
            }
        },
        _ => {
            reasons.push(missing);
            None
        }
    }
}

/// Plain or exponent notation, as serde_json prints very large and small floats.
fn number_to_decimal(n: &Number) -> Option<Decimal> {
    let text = n.to_string();
    Decimal::from_str_exact(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn timestamp(object: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    object
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Check one element against the record shape.
fn inspect_element(index: usize, value: &Value, now: DateTime<Utc>) -> ElementVerdict {
    let Some(object) = value.as_object() else {
        return ElementVerdict::Rejected {
            index,
            reasons: vec![ShapeViolation::NotAnObject],
        };
    };
    let mut reasons = vec![];

    let id = truthy_string(
        object,
        "id",
        ShapeViolation::MissingId,
        ShapeViolation::IdNotString,
        &mut reasons,
    );

    let description = object.get("description").and_then(Value::as_str);
    if description.is_none() {
        reasons.push(ShapeViolation::DescriptionNotString);
    }

    let amount = match object.get("amount") {
        Some(Value::Number(n)) => {
            let amount = number_to_decimal(n);
            if amount.is_none() {
                reasons.push(ShapeViolation::AmountNotDecimal);
            }
            amount
        }
        _ => {
            reasons.push(ShapeViolation::AmountNotNumber);
            None
        }
    };

    let category = truthy_string(
        object,
        "category",
        ShapeViolation::MissingCategory,
        ShapeViolation::CategoryNotString,
        &mut reasons,
    );

    let date = match object.get("date") {
        Some(value) if is_truthy(value) => {
            let date = value.as_str().and_then(RecordDate::parse);
            if date.is_none() {
                reasons.push(ShapeViolation::InvalidDate);
            }
            date
        }
        _ => {
            reasons.push(ShapeViolation::MissingDate);
            None
        }
    };

    match (id, description, amount, category, date) {
        (Some(id), Some(description), Some(amount), Some(category), Some(date))
            if reasons.is_empty() =>
        {
            let created_at = timestamp(object, "createdAt").unwrap_or(now);
            let updated_at = timestamp(object, "updatedAt").unwrap_or(created_at);
            ElementVerdict::Accepted(Record {
                id: id.to_owned(),
                description: description.to_owned(),
                amount,
                category: category.to_owned(),
                date,
                created_at,
                updated_at,
            })
        }
        _ => ElementVerdict::Rejected { index, reasons },
    }
}

/// Check every element of an import array.
pub fn inspect_elements(values: &[Value]) -> Vec<ElementVerdict> {
    let now = Utc::now();
    values
        .iter()
        .enumerate()
        .map(|(index, value)| inspect_element(index, value, now))
        .collect()
}

/// Import records from JSON text into the store.
///
/// A malformed document, a non-array root or the absence of any usable
/// element aborts the import without changing the store. Elements with
/// the wrong shape are skipped, as are ids that already exist.
pub fn import_json<S: KeyValueStore>(
    store: &mut RecordStore<S>,
    text: &str,
) -> Result<ImportReport, ImportError> {
    let parsed: Value = serde_json::from_str(text)?;
    let Value::Array(elements) = parsed else {
        return Err(ImportError::NotAnArray);
    };

    let (accepted, rejected): (Vec<_>, Vec<_>) = inspect_elements(&elements)
        .into_iter()
        .partition(|v| matches!(v, ElementVerdict::Accepted(_)));
    for verdict in rejected.iter() {
        debug!(?verdict, "ignoring import element");
    }
    if accepted.is_empty() {
        return Err(ImportError::NoValidRecords {
            rejected: rejected.len(),
        });
    }

    let mut report = ImportReport {
        rejected,
        ..Default::default()
    };
    let mut seen: HashSet<String> = store.list().iter().map(|r| r.id.to_owned()).collect();
    let mut to_add = vec![];
    for verdict in accepted {
        if let ElementVerdict::Accepted(record) = verdict {
            if seen.insert(record.id.to_owned()) {
                report.imported.push(record.id.to_owned());
                to_add.push(record);
            } else {
                report.duplicates.push(record.id);
            }
        }
    }

    if !to_add.is_empty() {
        store.add_many(to_add)?;
    }
    info!(
        imported = report.imported.len(),
        duplicates = report.duplicates.len(),
        rejected = report.rejected.len(),
        "import finished"
    );
    Ok(report)
}
