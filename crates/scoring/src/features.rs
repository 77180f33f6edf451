//! Feature mapping
//!
//! Translates a stored business row into the named, ordered feature row the
//! scaler and model were fitted on.

use serde::Serialize;
use serde_json::Value;

use creditai_core::BusinessRecord;

use crate::ScoringError;

/// Stored column name → model column name, in model column order
pub const COLUMN_MAPPING: [(&str, &str); 10] = [
    ("Annual_Revenue", "Annual Revenue"),
    ("Loan_Amount", "Loan Amount"),
    ("GST_Compliance", "GST Compliance (%)"),
    ("Past_Defaults", "Past Defaults"),
    ("Bank_Transactions", "Bank Transactions"),
    ("Market_Trend", "Market Trend"),
    ("Financial_Health", "financial_health"),
    ("Repayment_History", "repayment_history"),
    ("Credit_Utilization", "credit_utilization"),
    ("Industry_Risk", "industry_risk"),
];

const BANK_TRANSACTIONS: &str = "Bank Transactions";
const MARKET_TREND: &str = "Market Trend";

const BANK_TRANSACTION_LABELS: [(&str, f64); 3] =
    [("High Volume", 0.0), ("Low Volume", 1.0), ("Unstable", 2.0)];

const MARKET_TREND_LABELS: [(&str, f64); 3] =
    [("Declining", 0.0), ("Growth", 1.0), ("Stable", 2.0)];

/// One model input value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Number(f64),
    /// Categorical label not (yet) encoded
    Label(String),
}

impl FeatureValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(n) => Some(*n),
            FeatureValue::Label(_) => None,
        }
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Number(n) => n.as_f64().map(FeatureValue::Number),
            Value::Bool(b) => Some(FeatureValue::Number(if *b { 1.0 } else { 0.0 })),
            // "NaN" and "inf" parse as f64 but are not usable inputs
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Some(FeatureValue::Number(n)),
                _ => Some(FeatureValue::Label(s.clone())),
            },
            other => Some(FeatureValue::Label(other.to_string())),
        }
    }
}

/// Single-row feature table: (model column, value) pairs in model order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeatureVector {
    columns: Vec<(String, FeatureValue)>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, column: impl Into<String>, value: FeatureValue) {
        self.columns.push((column.into(), value));
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FeatureValue)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Numeric row for the scaler; fails on the first un-encoded label
    pub fn to_numeric(&self) -> Result<Vec<f64>, ScoringError> {
        self.columns
            .iter()
            .map(|(column, value)| match value {
                FeatureValue::Number(n) if n.is_finite() => Ok(*n),
                FeatureValue::Number(n) => Err(ScoringError::NonNumeric {
                    column: column.clone(),
                    label: n.to_string(),
                }),
                FeatureValue::Label(label) => Err(ScoringError::NonNumeric {
                    column: column.clone(),
                    label: label.clone(),
                }),
            })
            .collect()
    }
}

/// Maps stored rows to model feature rows
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureMapper;

impl FeatureMapper {
    pub fn new() -> Self {
        Self
    }

    /// Rename stored columns to model columns
    ///
    /// Absent or null columns are omitted. Column lookup falls back to an
    /// ASCII case-insensitive match, since stored column names are
    /// case-insensitive in the relational store.
    pub fn map(&self, record: &BusinessRecord) -> FeatureVector {
        let mut vector = FeatureVector::new();
        for (stored, model) in COLUMN_MAPPING {
            let value = record.get(stored).or_else(|| {
                record
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(stored))
                    .map(|(_, value)| value)
            });
            if let Some(value) = value.and_then(FeatureValue::from_json) {
                vector.push(model, value);
            }
        }
        vector
    }

    /// Replace categorical labels with their integer codes
    ///
    /// Unrecognised labels are left unchanged.
    pub fn encode(&self, mut vector: FeatureVector) -> FeatureVector {
        for (column, value) in vector.columns.iter_mut() {
            let table: &[(&str, f64)] = match column.as_str() {
                BANK_TRANSACTIONS => &BANK_TRANSACTION_LABELS,
                MARKET_TREND => &MARKET_TREND_LABELS,
                _ => continue,
            };
            if let FeatureValue::Label(label) = value {
                match table.iter().find(|(known, _)| known == label) {
                    Some((_, code)) => *value = FeatureValue::Number(*code),
                    None => {
                        tracing::warn!(column = %column, label = %label, "Unrecognised categorical label");
                    },
                }
            }
        }
        vector
    }

    /// Map then encode
    pub fn transform(&self, record: &BusinessRecord) -> FeatureVector {
        self.encode(self.map(record))
    }
}
