//! Business and credit record types
//!
//! A `BusinessRecord` is whatever row the store returns for a GST identifier:
//! column names and value types are not fixed, so it is kept as an ordered
//! JSON object. A `CreditRecord` is the fixed 13-field submission accepted by
//! the write path.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column holding the tax identifier in every stored table
pub const GST_IN_COLUMN: &str = "GST_IN";

/// Whether `name` is a plain SQL identifier usable as a table name
///
/// Table names cannot be bound as query parameters, so only
/// `[A-Za-z_][A-Za-z0-9_]*` (at most 64 chars) is accepted.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {},
        _ => return false,
    }
    name.len() <= 64 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A stored business row: attribute name → numeric or categorical value
///
/// Insertion order is preserved so that a row read from the store is echoed
/// back with its original column order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusinessRecord(Map<String, Value>);

impl BusinessRecord {
    /// Create an empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing JSON object
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert or replace an attribute
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Get an attribute by its stored name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The GST identifier, if the row carries one
    pub fn gst_in(&self) -> Option<&str> {
        self.0.get(GST_IN_COLUMN).and_then(Value::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate attributes in stored order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for BusinessRecord {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// A credit record submitted for storage
///
/// Field names follow the submission payload; `COLUMNS` gives the stored
/// column names in insert order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditRecord {
    pub user_id: i64,
    pub gst_in: String,
    pub annual_revenue: f64,
    pub loan_amount: f64,
    pub gst_compliance: f64,
    pub past_defaults: f64,
    pub bank_transactions: String,
    pub market_trend: f64,
    pub credit_score: f64,
    pub financial_health: f64,
    pub repayment_history: f64,
    pub credit_utilization: f64,
    pub industry_risk: f64,
}

impl CreditRecord {
    /// Stored column names, in the order values are bound on insert
    pub const COLUMNS: [&'static str; 13] = [
        "User_ID",
        "GST_IN",
        "Annual_Revenue",
        "Loan_Amount",
        "GST_Compliance",
        "Past_Defaults",
        "Bank_Transactions",
        "Market_Trend",
        "Credit_Score",
        "financial_health",
        "repayment_history",
        "credit_utilization",
        "industry_risk",
    ];

    /// The record as a stored row, keyed by column name
    pub fn to_business_record(&self) -> BusinessRecord {
        BusinessRecord::new()
            .with("User_ID", self.user_id)
            .with(GST_IN_COLUMN, self.gst_in.clone())
            .with("Annual_Revenue", self.annual_revenue)
            .with("Loan_Amount", self.loan_amount)
            .with("GST_Compliance", self.gst_compliance)
            .with("Past_Defaults", self.past_defaults)
            .with("Bank_Transactions", self.bank_transactions.clone())
            .with("Market_Trend", self.market_trend)
            .with("Credit_Score", self.credit_score)
            .with("financial_health", self.financial_health)
            .with("repayment_history", self.repayment_history)
            .with("credit_utilization", self.credit_utilization)
            .with("industry_risk", self.industry_risk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> CreditRecord {
        serde_json::from_value(json!({
            "user_id": 7,
            "gst_in": "09AAACH7409R1ZZ",
            "annual_revenue": 2500000.0,
            "loan_amount": 400000.0,
            "gst_compliance": 92.0,
            "past_defaults": 0,
            "bank_transactions": "High Volume",
            "market_trend": 1,
            "credit_score": 742,
            "financial_health": 0.8,
            "repayment_history": 1,
            "credit_utilization": 0.3,
            "industry_risk": 1
        }))
        .unwrap()
    }

    #[test]
    fn test_record_preserves_column_order() {
        let record = BusinessRecord::new()
            .with("GST_IN", "A1")
            .with("Zeta", 1)
            .with("Alpha", 2);

        let keys: Vec<&str> = record.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["GST_IN", "Zeta", "Alpha"]);
        assert_eq!(record.gst_in(), Some("A1"));
    }

    #[test]
    fn test_credit_record_columns_match_stored_row() {
        let row = sample().to_business_record();
        let keys: Vec<&str> = row.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, CreditRecord::COLUMNS.to_vec());
        assert_eq!(row.gst_in(), Some("09AAACH7409R1ZZ"));
        assert_eq!(row.get("Bank_Transactions"), Some(&json!("High Volume")));
    }

    #[test]
    fn test_table_name_validation() {
        assert!(is_valid_table_name("testcases"));
        assert!(is_valid_table_name("credit_data_2"));
        assert!(is_valid_table_name("_staging"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("2fast"));
        assert!(!is_valid_table_name("testcases; DROP TABLE x"));
        assert!(!is_valid_table_name("db.table"));
    }

    #[test]
    fn test_credit_record_rejects_missing_field() {
        let result: Result<CreditRecord, _> = serde_json::from_value(json!({
            "user_id": 7,
            "gst_in": "X"
        }));
        assert!(result.is_err());
    }
}
