//! Business record lookups and credit record inserts

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Number, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use creditai_core::{BusinessRecord, CreditRecord};

use crate::client::MySqlClient;
use crate::error::StoreError;
use crate::schema::{checked_table, create_credit_table_sql, insert_credit_sql, select_by_gst_sql};

/// Record store gateway
///
/// Implementations acquire a connection per call and release it on every
/// exit path. Values are always bound, never interpolated.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// First row of `table` whose GST_IN equals `gst_in`
    async fn find_by_gst(&self, table: &str, gst_in: &str) -> Result<BusinessRecord, StoreError>;

    /// Append one credit record, creating `table` when missing
    ///
    /// Existing rows with the same GST_IN are left in place.
    async fn insert_credit_record(&self, table: &str, record: &CreditRecord)
        -> Result<(), StoreError>;

    /// Cheap reachability check
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str;
}

/// MySQL-backed record store
#[derive(Clone)]
pub struct MySqlRecordStore {
    client: MySqlClient,
}

impl MySqlRecordStore {
    pub fn new(client: MySqlClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &MySqlClient {
        &self.client
    }
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    async fn find_by_gst(&self, table: &str, gst_in: &str) -> Result<BusinessRecord, StoreError> {
        let table = checked_table(table)?;
        let mut conn = self.client.acquire().await?;

        let row = sqlx::query(&select_by_gst_sql(table))
            .bind(gst_in)
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| {
                tracing::error!(table, error = %e, "Record lookup failed");
                StoreError::from(e)
            })?;

        match row {
            Some(row) => row_to_record(&row),
            None => Err(StoreError::NotFound {
                table: table.to_string(),
                gst_in: gst_in.to_string(),
            }),
        }
    }

    async fn insert_credit_record(
        &self,
        table: &str,
        record: &CreditRecord,
    ) -> Result<(), StoreError> {
        let table = checked_table(table)?;
        let mut conn = self.client.acquire().await?;

        sqlx::query(&create_credit_table_sql(table))
            .execute(&mut *conn)
            .await
            .map_err(|e| StoreError::Schema(format!("Failed to create {}: {}", table, e)))?;

        sqlx::query(&insert_credit_sql(table))
            .bind(record.user_id)
            .bind(&record.gst_in)
            .bind(record.annual_revenue)
            .bind(record.loan_amount)
            .bind(record.gst_compliance)
            .bind(record.past_defaults)
            .bind(&record.bank_transactions)
            .bind(record.market_trend)
            .bind(record.credit_score)
            .bind(record.financial_health)
            .bind(record.repayment_history)
            .bind(record.credit_utilization)
            .bind(record.industry_risk)
            .execute(&mut *conn)
            .await?;

        tracing::debug!(table, gst_in = %record.gst_in, "Inserted credit record");
        Ok(())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.client.ping().await
    }

    fn backend(&self) -> &'static str {
        "mysql"
    }
}

/// Decode a row of unknown shape into a JSON object, keeping column order
fn row_to_record(row: &MySqlRow) -> Result<BusinessRecord, StoreError> {
    let mut map = Map::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx)?;
        map.insert(column.name().to_string(), value);
    }
    Ok(BusinessRecord::from_map(map))
}

fn decode_column(row: &MySqlRow, idx: usize) -> Result<Value, StoreError> {
    if row.try_get_raw(idx)?.is_null() {
        return Ok(Value::Null);
    }

    let type_name = row.column(idx).type_info().name().to_string();
    let value = match type_name.as_str() {
        "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(idx)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => {
            Value::from(row.try_get::<i64, _>(idx)?)
        },
        name if name.ends_with("UNSIGNED") => Value::from(row.try_get::<u64, _>(idx)?),
        "FLOAT" => float_value(widen(row.try_get::<f32, _>(idx)?)),
        "DOUBLE" => float_value(row.try_get::<f64, _>(idx)?),
        // sent as text on the wire
        "DECIMAL" => {
            let text = row.try_get_unchecked::<String, _>(idx)?;
            text.parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::String(text))
        },
        "DATE" => Value::String(row.try_get::<NaiveDate, _>(idx)?.to_string()),
        "DATETIME" => Value::String(row.try_get::<NaiveDateTime, _>(idx)?.to_string()),
        "TIMESTAMP" => Value::String(row.try_get::<DateTime<Utc>, _>(idx)?.to_rfc3339()),
        "JSON" => row.try_get::<Value, _>(idx)?,
        _ => match row.try_get_unchecked::<String, _>(idx) {
            Ok(text) => Value::String(text),
            Err(e) => {
                tracing::warn!(column = idx, column_type = %type_name, error = %e, "Undecodable column");
                Value::Null
            },
        },
    };
    Ok(value)
}

/// f32 → f64 through the shortest decimal form, so 0.3 stays 0.3
fn widen(v: f32) -> f64 {
    v.to_string().parse().unwrap_or(f64::from(v))
}

fn float_value(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_value_rejects_nan() {
        assert_eq!(float_value(f64::NAN), Value::Null);
        assert_eq!(float_value(1.5), serde_json::json!(1.5));
    }

    #[test]
    fn test_widen_keeps_short_decimals() {
        assert_eq!(widen(0.3), 0.3);
        assert_eq!(widen(88.5), 88.5);
    }
}
