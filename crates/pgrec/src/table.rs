//! Table, column and index identifier value types.
//!
//! These are thin immutable wrappers over the strings that end up in
//! generated SQL. `TableName` and `IndexName` render double-quoted;
//! [`Column`] is accepted verbatim so callers can pass raw fragments like
//! `count(*)` or a `CONSTRAINT ... PRIMARY KEY (...)` clause. Derived
//! values (`alias`, `join`) always produce new instances.

use std::fmt;

/// A trusted raw SQL fragment.
///
/// Everything wrapped in `RawSql` bypasses parameterization and is spliced
/// into generated SQL verbatim: join clauses, trailing WHERE predicates,
/// correlated sub-selects. The type exists to make that trust boundary
/// explicit at every call site; never construct one from untrusted input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSql(String);

impl RawSql {
    pub fn new(sql: impl Into<String>) -> Self {
        RawSql(sql.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RawSql {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A LEFT JOIN clause attached to a [`TableName`].
#[derive(Debug, Clone)]
pub struct LeftJoin {
    table: TableName,
    on: RawSql,
}

impl fmt::Display for LeftJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LEFT JOIN {} ON {}", self.table, self.on)
    }
}

/// A table identifier with an optional alias and an ordered left-join list.
#[derive(Debug, Clone)]
pub struct TableName {
    name: String,
    alias: Option<String>,
    joins: Vec<LeftJoin>,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        TableName {
            name: name.into(),
            alias: None,
            joins: Vec::new(),
        }
    }

    /// Bare table name, without quoting or alias.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derived copy carrying an alias.
    pub fn alias(&self, alias: impl Into<String>) -> Self {
        TableName {
            name: self.name.clone(),
            alias: Some(alias.into()),
            joins: self.joins.clone(),
        }
    }

    /// Derived copy with one more LEFT JOIN appended.
    pub fn join(&self, table: TableName, on: RawSql) -> Self {
        let mut joins = self.joins.clone();
        joins.push(LeftJoin { table, on });
        TableName {
            name: self.name.clone(),
            alias: self.alias.clone(),
            joins,
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "\"{}\" AS {}", self.name, alias)?,
            None => write!(f, "\"{}\"", self.name)?,
        }
        for join in &self.joins {
            write!(f, " {}", join)?;
        }
        Ok(())
    }
}

/// Shorthand for [`TableName::new`].
pub fn t(name: impl Into<String>) -> TableName {
    TableName::new(name)
}

/// An opaque column reference or raw SQL fragment.
///
/// No validation is performed; any string is accepted verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column(String);

impl Column {
    pub fn new(column: impl Into<String>) -> Self {
        Column(column.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shorthand for [`Column::new`].
pub fn c(column: impl Into<String>) -> Column {
    Column::new(column)
}

/// Build a column list from string slices.
pub fn cs<S: AsRef<str>>(columns: &[S]) -> Vec<Column> {
    columns.iter().map(|s| Column::new(s.as_ref())).collect()
}

/// The `*` projection.
pub fn c_all() -> Column {
    Column::new("*")
}

/// Render a column list as a comma-separated string.
pub fn columns_to_string(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A logical index identifier, combined with the table name for the
/// physical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexName(String);

impl IndexName {
    pub fn new(name: impl Into<String>) -> Self {
        IndexName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Shorthand for [`IndexName::new`].
pub fn i(name: impl Into<String>) -> IndexName {
    IndexName::new(name)
}

/// Deterministic physical index name: `"<table>_<index>"`.
pub fn index_name(table: &TableName, index: &IndexName) -> String {
    format!("\"{}_{}\"", table.name(), index.as_str())
}

/// A `CONSTRAINT "<table>_pk" PRIMARY KEY (...)` fragment, usable as a
/// column in `create_table`.
pub fn constraint_primary_key(table: &TableName, columns: &[Column]) -> Column {
    Column::new(format!(
        "CONSTRAINT {} PRIMARY KEY ({})",
        index_name(table, &IndexName::new("pk")),
        columns_to_string(columns),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_name_quoted() {
        assert_eq!(t("users").to_string(), "\"users\"");
    }

    #[test]
    fn table_name_alias() {
        assert_eq!(t("users").alias("u").to_string(), "\"users\" AS u");
    }

    #[test]
    fn table_name_join() {
        let users = t("users").alias("u").join(
            t("roles").alias("r"),
            RawSql::new("u.role_id = r.id"),
        );
        assert_eq!(
            users.to_string(),
            "\"users\" AS u LEFT JOIN \"roles\" AS r ON u.role_id = r.id"
        );
    }

    #[test]
    fn derived_values_do_not_mutate() {
        let base = t("users");
        let _aliased = base.alias("u");
        assert_eq!(base.to_string(), "\"users\"");
    }

    #[test]
    fn columns_join() {
        assert_eq!(columns_to_string(&cs(&["id", "name"])), "id, name");
    }

    #[test]
    fn physical_index_name() {
        assert_eq!(index_name(&t("users"), &i("email")), "\"users_email\"");
    }

    #[test]
    fn primary_key_fragment() {
        let pk = constraint_primary_key(&t("users"), &cs(&["id"]));
        assert_eq!(pk.as_str(), "CONSTRAINT \"users_pk\" PRIMARY KEY (id)");
    }
}
