//! SQL for the credit records table
//!
//! Table names cannot be bound as parameters. Every function here takes a
//! name already checked by [`checked_table`].

use creditai_core::{is_valid_table_name, CreditRecord, GST_IN_COLUMN};

use crate::error::StoreError;

/// Reject anything that is not a plain identifier
pub fn checked_table(name: &str) -> Result<&str, StoreError> {
    if is_valid_table_name(name) {
        Ok(name)
    } else {
        Err(StoreError::InvalidTable(name.to_string()))
    }
}

/// `CREATE TABLE IF NOT EXISTS` for credit records
pub fn create_credit_table_sql(table: &str) -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS `{}` (
            User_ID INT,
            GST_IN VARCHAR(255),
            Annual_Revenue FLOAT,
            Loan_Amount FLOAT,
            GST_Compliance FLOAT,
            Past_Defaults FLOAT,
            Bank_Transactions VARCHAR(100),
            Market_Trend FLOAT,
            Credit_Score FLOAT,
            financial_health FLOAT,
            repayment_history FLOAT,
            credit_utilization FLOAT,
            industry_risk FLOAT
        )"#,
        table
    )
}

/// Lookup of the first row for one GST identifier
pub fn select_by_gst_sql(table: &str) -> String {
    format!("SELECT * FROM `{}` WHERE {} = ? LIMIT 1", table, GST_IN_COLUMN)
}

/// Insert of one credit record, placeholders in `CreditRecord::COLUMNS` order
pub fn insert_credit_sql(table: &str) -> String {
    let columns = CreditRecord::COLUMNS.join(", ");
    let placeholders = vec!["?"; CreditRecord::COLUMNS.len()].join(", ");
    format!("INSERT INTO `{}` ({}) VALUES ({})", table, columns, placeholders)
}
