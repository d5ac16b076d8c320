//! Statement execution.
//!
//! Thin async wrappers pairing the statement generators with a
//! [`GenericClient`]: placeholders are numbered, values bound, and rows
//! decoded into [`Record`]s. Argument order follows placeholder occurrence
//! order, so for UPDATE the SET values come before the WHERE values.

use crate::client::GenericClient;
use crate::error::RecordResult;
use crate::row::{Record, first_column_to_json, rows_to_records};
use crate::stmt::{self, SelectOpts, number_placeholders};
use crate::table::{Column, IndexName, TableName};
use crate::value::Value;
use serde_json::Value as Json;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

fn bind(args: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

async fn query(
    client: &impl GenericClient,
    sql: &str,
    args: &[Value],
) -> RecordResult<Vec<Row>> {
    let sql = number_placeholders(sql);
    tracing::debug!(sql = %sql, args = args.len(), "query");
    client.query(&sql, &bind(args)).await
}

async fn query_opt(
    client: &impl GenericClient,
    sql: &str,
    args: &[Value],
) -> RecordResult<Option<Row>> {
    let sql = number_placeholders(sql);
    tracing::debug!(sql = %sql, args = args.len(), "query_opt");
    client.query_opt(&sql, &bind(args)).await
}

async fn execute(client: &impl GenericClient, sql: &str, args: &[Value]) -> RecordResult<u64> {
    let sql = number_placeholders(sql);
    tracing::debug!(sql = %sql, args = args.len(), "execute");
    client.execute(&sql, &bind(args)).await
}

pub async fn create_table(
    client: &impl GenericClient,
    table: &TableName,
    columns: &[Column],
) -> RecordResult<()> {
    execute(client, &stmt::create_table(table, columns), &[]).await?;
    Ok(())
}

pub async fn add_table_column(
    client: &impl GenericClient,
    table: &TableName,
    columns: &[Column],
) -> RecordResult<()> {
    execute(client, &stmt::add_table_column(table, columns), &[]).await?;
    Ok(())
}

pub async fn create_index(
    client: &impl GenericClient,
    unique: bool,
    table: &TableName,
    index: &IndexName,
    columns: &[Column],
) -> RecordResult<()> {
    execute(client, &stmt::create_index(unique, table, index, columns), &[]).await?;
    Ok(())
}

pub async fn drop_table(client: &impl GenericClient, table: &TableName) -> RecordResult<()> {
    execute(client, &stmt::drop_table(table), &[]).await?;
    Ok(())
}

/// Insert a row. With `ret_column` the returned column value comes back
/// (typically the generated id); without it the result is `Null`.
pub async fn insert(
    client: &impl GenericClient,
    table: &TableName,
    columns: &[Column],
    values: &[Value],
    ret_column: Option<&Column>,
) -> RecordResult<Json> {
    let sql = stmt::insert(table, columns, ret_column);
    if ret_column.is_some() {
        match query_opt(client, &sql, values).await? {
            Some(row) => first_column_to_json(&row),
            None => Ok(Json::Null),
        }
    } else {
        execute(client, &sql, values).await?;
        Ok(Json::Null)
    }
}

/// Upsert keyed on `uniq_columns`; returns the affected row count
/// (0 when the conflict action is `DO NOTHING` and the row exists).
pub async fn insert_or_update(
    client: &impl GenericClient,
    table: &TableName,
    uniq_columns: &[Column],
    value_columns: &[Column],
    other_columns: &[Column],
    values: &[Value],
) -> RecordResult<u64> {
    let sql = stmt::insert_or_update(table, uniq_columns, value_columns, other_columns);
    execute(client, &sql, values).await
}

/// `args` binds the SET values first, then the WHERE values.
pub async fn update(
    client: &impl GenericClient,
    table: &TableName,
    columns: &[Column],
    part_sql: Option<&str>,
    args: &[Value],
) -> RecordResult<u64> {
    execute(client, &stmt::update(table, columns, part_sql), args).await
}

pub async fn delete(
    client: &impl GenericClient,
    table: &TableName,
    part_sql: Option<&str>,
    args: &[Value],
) -> RecordResult<u64> {
    execute(client, &stmt::delete(table, part_sql), args).await
}

pub async fn select(
    client: &impl GenericClient,
    table: &TableName,
    columns: &[Column],
    opts: &SelectOpts<'_>,
    args: &[Value],
) -> RecordResult<Vec<Record>> {
    let rows = query(client, &stmt::select(table, columns, opts), args).await?;
    rows_to_records(&rows)
}

/// Select a single column, returning just its values.
pub async fn select_only(
    client: &impl GenericClient,
    table: &TableName,
    column: &Column,
    opts: &SelectOpts<'_>,
    args: &[Value],
) -> RecordResult<Vec<Json>> {
    let sql = stmt::select(table, std::slice::from_ref(column), opts);
    let rows = query(client, &sql, args).await?;
    rows.iter().map(first_column_to_json).collect()
}

pub async fn select_one(
    client: &impl GenericClient,
    table: &TableName,
    columns: &[Column],
    part_sql: Option<&str>,
    join: Option<&str>,
    args: &[Value],
) -> RecordResult<Option<Record>> {
    let sql = stmt::select_one(table, columns, part_sql, join);
    match query_opt(client, &sql, args).await? {
        Some(row) => Ok(Some(crate::row::row_to_record(&row)?)),
        None => Ok(None),
    }
}

/// Single row, single column.
pub async fn select_one_only(
    client: &impl GenericClient,
    table: &TableName,
    column: &Column,
    part_sql: Option<&str>,
    join: Option<&str>,
    args: &[Value],
) -> RecordResult<Option<Json>> {
    let sql = stmt::select_one(table, std::slice::from_ref(column), part_sql, join);
    match query_opt(client, &sql, args).await? {
        Some(row) => Ok(Some(first_column_to_json(&row)?)),
        None => Ok(None),
    }
}

/// `sum(column)`; `Null` over an empty set.
pub async fn sum(
    client: &impl GenericClient,
    table: &TableName,
    column: &Column,
    part_sql: Option<&str>,
    join: Option<&str>,
    args: &[Value],
) -> RecordResult<Json> {
    let sql = stmt::sum(table, column, part_sql, join);
    match query_opt(client, &sql, args).await? {
        Some(row) => first_column_to_json(&row),
        None => Ok(Json::Null),
    }
}

/// `count(column)`. With `groups` the statement may return one row per
/// group; the first row's count is returned.
pub async fn count(
    client: &impl GenericClient,
    table: &TableName,
    column: &Column,
    part_sql: Option<&str>,
    join: Option<&str>,
    groups: Option<&str>,
    args: &[Value],
) -> RecordResult<i64> {
    let sql = stmt::count(table, column, part_sql, join, groups);
    count_value(query(client, &sql, args).await?.into_iter().next())
}

/// Count of distinct groups, via the grouped-subquery form.
pub async fn group_count(
    client: &impl GenericClient,
    table: &TableName,
    columns: &[Column],
    part_sql: Option<&str>,
    groups: Option<&str>,
    args: &[Value],
) -> RecordResult<i64> {
    let sql = stmt::group_count(table, columns, part_sql, groups, None);
    count_value(query_opt(client, &sql, args).await?)
}

fn count_value(row: Option<Row>) -> RecordResult<i64> {
    match row {
        Some(row) => Ok(first_column_to_json(&row)?.as_i64().unwrap_or(0)),
        None => Ok(0),
    }
}
