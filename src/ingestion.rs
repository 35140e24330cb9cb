//! Shared fetch/validate/normalize stage.
//!
//! Every analysis stage consumes the same normalized transaction sequence, so
//! the loose source schema is dealt with exactly once, here. Field-level
//! conversion failures drop the row (counted, logged in aggregate); only a
//! missing column in the collection's union of keys is fatal.

use crate::error::{ExpenseInsightsError, Result};
use crate::schema::Transaction;
use crate::store::{DocumentStore, RawDocument};
use chrono::NaiveDate;
use log::info;
use serde_json::Value;
use std::collections::BTreeSet;

pub const REQUIRED_FIELDS: [&str; 4] = ["isExpense", "amount", "date", "category"];

/// Accepted date layout in source documents.
const DATE_FORMAT: &str = "%m/%d/%Y";

/// Fetches `collection` from `store` and normalizes it into date-sorted
/// expense transactions.
pub fn fetch_and_preprocess(
    store: &dyn DocumentStore,
    collection: &str,
) -> Result<Vec<Transaction>> {
    let documents = store.fetch(collection)?;
    normalize_documents(documents)
}

/// Normalizes raw documents: validates the schema, keeps expense rows,
/// coerces fields, drops unconvertible rows, and sorts ascending by date.
///
/// An empty collection (or one where nothing survives filtering) yields an
/// empty vector, not an error; downstream stages treat that as their own
/// insufficient-data condition.
pub fn normalize_documents(documents: Vec<RawDocument>) -> Result<Vec<Transaction>> {
    if documents.is_empty() {
        info!("No documents found in the collection.");
        return Ok(Vec::new());
    }

    info!("Fetched {} documents.", documents.len());
    check_required_fields(&documents)?;

    let expenses: Vec<RawDocument> = documents
        .into_iter()
        .filter(|doc| {
            doc.fields
                .get("isExpense")
                .map(coerce_expense_flag)
                .unwrap_or(false)
        })
        .collect();
    info!("Filtered down to {} expense transactions.", expenses.len());

    if expenses.is_empty() {
        info!("No expense transactions found after filtering.");
        return Ok(Vec::new());
    }

    let expense_count = expenses.len();
    let mut transactions: Vec<Transaction> = expenses
        .into_iter()
        .filter_map(|doc| {
            let amount = doc.fields.get("amount").and_then(parse_amount)?;
            let date = doc.fields.get("date").and_then(parse_date)?;
            let category = doc.fields.get("category").and_then(coerce_category)?;
            Some(Transaction {
                id: doc.id,
                amount,
                date,
                category,
            })
        })
        .collect();

    let dropped = expense_count - transactions.len();
    if dropped > 0 {
        info!(
            "Dropped {} rows due to missing/invalid amount, date, or category.",
            dropped
        );
    }

    // Stable sort keeps row order within a day, so re-runs are byte-identical.
    transactions.sort_by_key(|t| t.date);

    info!(
        "Preprocessing complete. {} valid expense transactions remaining.",
        transactions.len()
    );
    Ok(transactions)
}

/// The schema check runs against the union of keys across all documents;
/// individual documents may omit fields (the row is then dropped or treated
/// as non-expense).
fn check_required_fields(documents: &[RawDocument]) -> Result<()> {
    let seen: BTreeSet<&str> = documents
        .iter()
        .flat_map(|doc| doc.fields.keys().map(String::as_str))
        .collect();

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !seen.contains(*field))
        .map(|field| field.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ExpenseInsightsError::MissingFields(missing))
    }
}

/// Loose boolean coercion: `"true"`/`"1"` (case-insensitive) are expenses,
/// `"false"`/`"0"` are not, and anything unrecognized is silently treated as
/// a non-expense rather than an error.
fn coerce_expense_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64() == Some(1),
        Value::String(s) => matches!(s.to_lowercase().as_str(), "true" | "1"),
        _ => false,
    }
}

/// Numeric parse that never fails: unparseable or non-finite values are
/// reported as missing so the row can be dropped.
fn parse_amount(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|a| a.is_finite())
}

/// Dates are accepted in exactly one layout, `MM/DD/YYYY` (zero-padded or
/// not); anything else is a missing date.
fn parse_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok(),
        _ => None,
    }
}

fn coerce_category(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
