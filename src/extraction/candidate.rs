//! Normalizing one extracted element into a transaction candidate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::category::map_category;
use crate::ledger::{Category, TransactionKind};

/// Confidence assumed when the model gives none.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// A transaction proposed by the model, awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionCandidate {
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Positive amount.
    pub amount: f64,
    /// Canonical category identifier.
    pub category: Option<String>,
    /// Merchant or counterparty.
    #[serde(default)]
    pub merchant: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Calendar date.
    pub date: NaiveDate,
    /// Model confidence in `[0, 1]`.
    pub confidence: f64,
}

impl TransactionCandidate {
    /// Builds a candidate from one payload element.
    ///
    /// Returns `None` when the element is not an object, the amount is not a
    /// positive number, or a date is present but unreadable.
    pub fn from_element(
        element: &Value,
        categories: &[Category],
        today: NaiveDate,
    ) -> Option<Self> {
        let Some(fields) = element.as_object() else {
            debug!("Dropping non-object payload element");
            return None;
        };

        let Some(amount) = fields.get("amount").and_then(coerce_amount) else {
            debug!(amount = ?fields.get("amount"), "Dropping element without a positive amount");
            return None;
        };

        let Some(date) = coerce_date(fields.get("date"), today) else {
            debug!(date = ?fields.get("date"), "Dropping element with an unreadable date");
            return None;
        };

        let text = |key: &str| {
            fields
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        };

        Some(Self {
            kind: fields
                .get("type")
                .and_then(Value::as_str)
                .map_or(TransactionKind::Expense, TransactionKind::from_label),
            amount,
            category: Some(map_category(
                fields.get("category").and_then(Value::as_str),
                categories,
            )),
            merchant: text("merchant"),
            description: text("description"),
            date,
            confidence: coerce_confidence(fields.get("confidence")),
        })
    }
}

/// Reads a positive amount from a number or a decorated numeric string.
fn coerce_amount(value: &Value) -> Option<f64> {
    let amount = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .trim_start_matches(['¥', '￥', '$'])
                .trim_end_matches('元')
                .chars()
                .filter(|c| *c != ',' && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    (amount.is_finite() && amount > 0.0).then_some(amount)
}

/// Missing or blank dates default to `today`; anything else must parse.
fn coerce_date(value: Option<&Value>, today: NaiveDate) -> Option<NaiveDate> {
    match value {
        None | Some(Value::Null) => Some(today),
        Some(Value::String(s)) if s.trim().is_empty() => Some(today),
        Some(Value::String(s)) => {
            let s = s.trim();
            let day = s.split(['T', ' ']).next().unwrap_or(s);
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(day, format).ok())
        }
        Some(_) => None,
    }
}

fn coerce_confidence(value: Option<&Value>) -> f64 {
    let confidence = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    confidence
        .filter(|c| c.is_finite())
        .map_or(DEFAULT_CONFIDENCE, |c| c.clamp(0.0, 1.0))
}
