//! SQL statement generation.
//!
//! Pure functions from structured inputs to SQL text. Value positions are
//! emitted as sequential `?` placeholders; [`number_placeholders`] rewrites
//! them to the driver's `$1..$n` form immediately before execution, in
//! occurrence order. Identifiers are double-quoted only where
//! [`TableName`]/[`IndexName`] render them; [`Column`] text is spliced
//! verbatim and values never appear inline.

use crate::table::{Column, IndexName, TableName, columns_to_string, index_name};

/// Trailing options shared by the SELECT-shaped generators.
#[derive(Debug, Default, Clone)]
pub struct SelectOpts<'a> {
    /// WHERE predicate, without the `WHERE` keyword.
    pub part_sql: Option<&'a str>,
    /// Extra JOIN clause spliced after the table reference.
    pub join_sql: Option<&'a str>,
    pub groups: Option<&'a str>,
    pub sorts: Option<&'a str>,
    pub offset: Option<i64>,
    pub size: Option<i64>,
}

pub fn create_table(table: &TableName, columns: &[Column]) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        table,
        columns_to_string(columns)
    )
}

pub fn add_table_column(table: &TableName, columns: &[Column]) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN {}",
        table,
        columns_to_string(columns)
    )
}

pub fn create_index(
    unique: bool,
    table: &TableName,
    index: &IndexName,
    columns: &[Column],
) -> String {
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
        if unique { "UNIQUE " } else { "" },
        index_name(table, index),
        table,
        columns_to_string(columns)
    )
}

pub fn drop_table(table: &TableName) -> String {
    format!("DROP TABLE {}", table)
}

pub fn insert(table: &TableName, columns: &[Column], ret_column: Option<&Column>) -> String {
    let placeholders = vec!["?"; columns.len()].join(", ");
    let ret_sql = match ret_column {
        Some(col) => format!(" RETURNING {}", col),
        None => String::new(),
    };
    format!(
        "INSERT INTO {} ({}) VALUES ({}){}",
        table,
        columns_to_string(columns),
        placeholders,
        ret_sql
    )
}

/// `col` becomes `col = EXCLUDED.col`; fragments already containing `=`
/// pass through verbatim.
fn excluded_set(column: &Column) -> String {
    let col = column.as_str();
    if col.contains('=') {
        col.to_string()
    } else {
        format!("{} = EXCLUDED.{}", col, col)
    }
}

/// Upsert keyed on `uniq_columns`. With no value columns the conflict
/// action degrades to `DO NOTHING`.
pub fn insert_or_update(
    table: &TableName,
    uniq_columns: &[Column],
    value_columns: &[Column],
    other_columns: &[Column],
) -> String {
    let all: Vec<Column> = uniq_columns
        .iter()
        .chain(value_columns)
        .chain(other_columns)
        .cloned()
        .collect();
    let placeholders = vec!["?"; all.len()].join(", ");
    let do_sql = if value_columns.is_empty() {
        "DO NOTHING".to_string()
    } else {
        let sets = value_columns
            .iter()
            .map(excluded_set)
            .collect::<Vec<_>>()
            .join(", ");
        format!("DO UPDATE SET {}", sets)
    };
    format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) {}",
        table,
        columns_to_string(&all),
        placeholders,
        columns_to_string(uniq_columns),
        do_sql
    )
}

/// `col` becomes `col = ?`; fragments already containing `=` (e.g.
/// `counter = counter + 1`) pass through verbatim.
fn update_set(column: &Column) -> String {
    let col = column.as_str();
    if col.contains('=') {
        col.to_string()
    } else {
        format!("{} = ?", col)
    }
}

/// UPDATE statement. Placeholders in `part_sql` come after the SET values
/// in binding order.
pub fn update(table: &TableName, columns: &[Column], part_sql: Option<&str>) -> String {
    let sets = columns.iter().map(update_set).collect::<Vec<_>>().join(", ");
    format!("UPDATE {} SET {}{}", table, sets, where_sql(part_sql))
}

pub fn delete(table: &TableName, part_sql: Option<&str>) -> String {
    format!("DELETE FROM {}{}", table, where_sql(part_sql))
}

pub fn select(table: &TableName, columns: &[Column], opts: &SelectOpts) -> String {
    let mut sql = format!(
        "SELECT {} FROM {}{}{}{}",
        columns_to_string(columns),
        table,
        join_sql(opts.join_sql),
        where_sql(opts.part_sql),
        group_and_sort_sql(opts.groups, opts.sorts),
    );
    if let Some(size) = opts.size {
        sql.push_str(&format!(" LIMIT {}", size));
    }
    if let Some(offset) = opts.offset {
        sql.push_str(&format!(" OFFSET {}", offset));
    }
    sql
}

/// Single-row select with an implicit `LIMIT 1`.
pub fn select_one(
    table: &TableName,
    columns: &[Column],
    part_sql: Option<&str>,
    join: Option<&str>,
) -> String {
    format!(
        "SELECT {} FROM {}{}{} LIMIT 1",
        columns_to_string(columns),
        table,
        join_sql(join),
        where_sql(part_sql),
    )
}

pub fn sum(
    table: &TableName,
    column: &Column,
    part_sql: Option<&str>,
    join: Option<&str>,
) -> String {
    format!(
        "SELECT sum({}) FROM {}{}{}",
        column,
        table,
        join_sql(join),
        where_sql(part_sql),
    )
}

pub fn count(
    table: &TableName,
    column: &Column,
    part_sql: Option<&str>,
    join: Option<&str>,
    groups: Option<&str>,
) -> String {
    format!(
        "SELECT count({}) FROM {}{}{}{}",
        column,
        table,
        join_sql(join),
        where_sql(part_sql),
        group_and_sort_sql(groups, None),
    )
}

/// Count of a deduplicated/grouped subquery.
pub fn group_count(
    table: &TableName,
    columns: &[Column],
    part_sql: Option<&str>,
    groups: Option<&str>,
    sorts: Option<&str>,
) -> String {
    format!(
        "SELECT count(*) FROM (SELECT {} FROM {}{}{}) G",
        columns_to_string(columns),
        table,
        where_sql(part_sql),
        group_and_sort_sql(groups, sorts),
    )
}

/// VALUES-join ordering helper: join the id column against an inline
/// `(id, ordering)` table so rows come back in the order of `ids`.
///
/// Returns the join clause and the matching ORDER BY clause.
pub fn ordering_values_join(column: &Column, ids: &[i64]) -> (String, String) {
    let values = ids
        .iter()
        .enumerate()
        .map(|(ordering, id)| format!("({}, {})", id, ordering))
        .collect::<Vec<_>>()
        .join(", ");
    (
        format!(
            "JOIN (VALUES {}) AS x (id, ordering) ON {} = x.id",
            values, column
        ),
        "x.ordering".to_string(),
    )
}

fn where_sql(part_sql: Option<&str>) -> String {
    match part_sql {
        Some(p) if !p.is_empty() => format!(" WHERE {}", p),
        _ => String::new(),
    }
}

fn join_sql(join: Option<&str>) -> String {
    match join {
        Some(j) if !j.is_empty() => format!(" {}", j),
        _ => String::new(),
    }
}

fn group_and_sort_sql(groups: Option<&str>, sorts: Option<&str>) -> String {
    let mut sql = String::new();
    if let Some(g) = groups
        && !g.is_empty()
    {
        sql.push_str(&format!(" GROUP BY {}", g));
    }
    if let Some(s) = sorts
        && !s.is_empty()
    {
        sql.push_str(&format!(" ORDER BY {}", s));
    }
    sql
}

/// Rewrite sequential `?` placeholders to `$1..$n` in occurrence order.
///
/// Question marks inside single-quoted literals are left alone so raw
/// fragments like `#>>'{a, b}'` survive intact.
pub fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut idx = 0usize;
    let mut in_quote = false;
    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_quote = !in_quote;
                out.push(ch);
            }
            '?' if !in_quote => {
                idx += 1;
                out.push('$');
                out.push_str(&idx.to_string());
            }
            _ => out.push(ch),
        }
    }
    out
}
