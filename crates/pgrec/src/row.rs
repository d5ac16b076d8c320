//! Dynamic row decoding.
//!
//! The record facade works over opaque rows, so decoding is driven by the
//! column's declared Postgres type rather than a compile-time struct. The
//! supported set covers what the statement layer can produce: integers,
//! floats, booleans, text, json/jsonb, timestamps, dates and uuids.

use crate::error::{RecordError, RecordResult};
use serde_json::{Map, Number, Value as Json};
use tokio_postgres::Row;
use tokio_postgres::types::Type;

/// An opaque row: column name to JSON value, insertion-ordered.
pub type Record = Map<String, Json>;

/// Decode a full row into a [`Record`].
pub fn row_to_record(row: &Row) -> RecordResult<Record> {
    let mut record = Record::new();
    for idx in 0..row.columns().len() {
        let name = row.columns()[idx].name().to_string();
        record.insert(name, column_to_json(row, idx)?);
    }
    Ok(record)
}

/// Decode a batch of rows.
pub fn rows_to_records(rows: &[Row]) -> RecordResult<Vec<Record>> {
    rows.iter().map(row_to_record).collect()
}

/// Decode a single column by index.
pub fn column_to_json(row: &Row, idx: usize) -> RecordResult<Json> {
    let column = &row.columns()[idx];
    let name = column.name();
    let ty = column.type_();

    fn get<'a, T>(row: &'a Row, idx: usize, name: &str) -> RecordResult<Option<T>>
    where
        T: tokio_postgres::types::FromSql<'a>,
    {
        row.try_get(idx)
            .map_err(|e| RecordError::decode(name, e.to_string()))
    }

    let value = if *ty == Type::BOOL {
        get::<bool>(row, idx, name)?.map(Json::Bool)
    } else if *ty == Type::INT2 {
        get::<i16>(row, idx, name)?.map(|v| Json::from(v as i64))
    } else if *ty == Type::INT4 {
        get::<i32>(row, idx, name)?.map(|v| Json::from(v as i64))
    } else if *ty == Type::INT8 {
        get::<i64>(row, idx, name)?.map(Json::from)
    } else if *ty == Type::FLOAT4 {
        get::<f32>(row, idx, name)?.and_then(|v| Number::from_f64(v as f64).map(Json::Number))
    } else if *ty == Type::FLOAT8 {
        get::<f64>(row, idx, name)?.and_then(|v| Number::from_f64(v).map(Json::Number))
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
    {
        get::<String>(row, idx, name)?.map(Json::String)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        get::<Json>(row, idx, name)?
    } else if *ty == Type::TIMESTAMPTZ {
        get::<chrono::DateTime<chrono::Utc>>(row, idx, name)?
            .map(|v| Json::String(v.to_rfc3339()))
    } else if *ty == Type::TIMESTAMP {
        get::<chrono::NaiveDateTime>(row, idx, name)?.map(|v| Json::String(v.to_string()))
    } else if *ty == Type::DATE {
        get::<chrono::NaiveDate>(row, idx, name)?.map(|v| Json::String(v.to_string()))
    } else if *ty == Type::UUID {
        get::<uuid::Uuid>(row, idx, name)?.map(|v| Json::String(v.to_string()))
    } else {
        return Err(RecordError::decode(
            name,
            format!("unsupported column type: {ty}"),
        ));
    };

    Ok(value.unwrap_or(Json::Null))
}

/// Decode only the first column of a row, as used by single-value
/// projections (`max(id)`, `count(*)`, RETURNING clauses).
pub fn first_column_to_json(row: &Row) -> RecordResult<Json> {
    column_to_json(row, 0)
}
