//! Dynamic filter compilation.
//!
//! Filters are a closed operator enum with a typed builder API; the legacy
//! suffix-string form (`age_gte`, `id_in`, ...) is still accepted through
//! [`Filter::parse`] as a compatibility shim. Compilation produces one
//! parameterized predicate per filter, reorders predicates by the caller's
//! sort-priority list, and flattens everything into a single `AND`-joined
//! clause (with `?` placeholders) plus the ordered argument list.
//!
//! Field names may address into declared JSON columns with a dotted path
//! (`data.a.b.int`), which rewrites to a `#>>'{...}'` projection with an
//! explicit or value-inferred cast.

use crate::error::{RecordError, RecordResult};
use crate::table::RawSql;
use crate::value::{Value, guess_type};
use serde_json::Value as Json;

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    In,
    /// Case-insensitive regex (`~*`)
    Match,
    /// Negated case-insensitive regex (`!~*`)
    NotMatch,
    Similar,
    NotSimilar,
}

impl FilterOp {
    /// SQL spelling, including surrounding spaces for word operators.
    pub fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Gt => ">",
            FilterOp::Gte => ">=",
            FilterOp::Lt => "<",
            FilterOp::Lte => "<=",
            FilterOp::Like => " like ",
            FilterOp::NotLike => " not like ",
            FilterOp::In => " in ",
            FilterOp::Match => " ~* ",
            FilterOp::NotMatch => " !~* ",
            FilterOp::Similar => " similar to ",
            FilterOp::NotSimilar => " not similar to ",
        }
    }

    /// Legacy key-suffix table.
    pub fn from_suffix(suffix: &str) -> Option<FilterOp> {
        Some(match suffix {
            "gt" => FilterOp::Gt,
            "lt" => FilterOp::Lt,
            "lte" => FilterOp::Lte,
            "gte" => FilterOp::Gte,
            "neq" => FilterOp::Ne,
            "like" => FilterOp::Like,
            "unlike" => FilterOp::NotLike,
            "in" => FilterOp::In,
            "match" => FilterOp::Match,
            "unmatch" => FilterOp::NotMatch,
            "similar" => FilterOp::Similar,
            "unsimilar" => FilterOp::NotSimilar,
            _ => return None,
        })
    }
}

/// Split a legacy suffixed key into (column, operator).
///
/// `age_gte` -> (`age`, `Gte`); an unrecognized suffix means the whole key
/// is the column name and the operator defaults to `=`.
pub fn split_op(key: &str) -> (&str, FilterOp) {
    if let Some(pos) = key.rfind('_')
        && let Some(op) = FilterOp::from_suffix(&key[pos + 1..])
    {
        return (&key[..pos], op);
    }
    (key, FilterOp::Eq)
}

#[derive(Debug, Clone)]
enum FilterKind {
    Cmp { op: FilterOp, value: Json },
    List(Vec<Json>),
    /// Correlated sub-select, spliced verbatim: `key in (<sql>)`.
    SubSelect(RawSql),
    /// Raw predicate fragment, spliced verbatim.
    Raw(RawSql),
}

/// A single query filter.
#[derive(Debug, Clone)]
pub struct Filter {
    key: String,
    kind: FilterKind,
}

impl Filter {
    fn cmp(field: &str, op: FilterOp, value: impl Into<Json>) -> Filter {
        Filter {
            key: field.to_string(),
            kind: FilterKind::Cmp {
                op,
                value: value.into(),
            },
        }
    }

    pub fn eq(field: &str, value: impl Into<Json>) -> Filter {
        Filter::cmp(field, FilterOp::Eq, value)
    }

    pub fn ne(field: &str, value: impl Into<Json>) -> Filter {
        Filter::cmp(field, FilterOp::Ne, value)
    }

    pub fn gt(field: &str, value: impl Into<Json>) -> Filter {
        Filter::cmp(field, FilterOp::Gt, value)
    }

    pub fn gte(field: &str, value: impl Into<Json>) -> Filter {
        Filter::cmp(field, FilterOp::Gte, value)
    }

    pub fn lt(field: &str, value: impl Into<Json>) -> Filter {
        Filter::cmp(field, FilterOp::Lt, value)
    }

    pub fn lte(field: &str, value: impl Into<Json>) -> Filter {
        Filter::cmp(field, FilterOp::Lte, value)
    }

    pub fn like(field: &str, pattern: impl Into<Json>) -> Filter {
        Filter::cmp(field, FilterOp::Like, pattern)
    }

    pub fn not_like(field: &str, pattern: impl Into<Json>) -> Filter {
        Filter::cmp(field, FilterOp::NotLike, pattern)
    }

    pub fn matches(field: &str, pattern: impl Into<Json>) -> Filter {
        Filter::cmp(field, FilterOp::Match, pattern)
    }

    pub fn not_matches(field: &str, pattern: impl Into<Json>) -> Filter {
        Filter::cmp(field, FilterOp::NotMatch, pattern)
    }

    pub fn similar(field: &str, pattern: impl Into<Json>) -> Filter {
        Filter::cmp(field, FilterOp::Similar, pattern)
    }

    pub fn not_similar(field: &str, pattern: impl Into<Json>) -> Filter {
        Filter::cmp(field, FilterOp::NotSimilar, pattern)
    }

    /// `field in (?, ?, ...)`. An empty list fails compilation with
    /// [`RecordError::EmptyRows`]: it can never match, so the whole query
    /// short-circuits instead of issuing `IN ()`.
    pub fn in_list(field: &str, values: Vec<Json>) -> Filter {
        Filter {
            key: field.to_string(),
            kind: FilterKind::List(values),
        }
    }

    /// `field in (<trusted sub-select>)`, spliced verbatim.
    pub fn in_subselect(field: &str, sub: RawSql) -> Filter {
        Filter {
            key: field.to_string(),
            kind: FilterKind::SubSelect(sub),
        }
    }

    /// A trusted raw predicate fragment.
    pub fn raw(sql: RawSql) -> Filter {
        Filter {
            key: String::new(),
            kind: FilterKind::Raw(sql),
        }
    }

    /// Compatibility shim for the legacy suffixed-key form.
    ///
    /// - list values become [`Filter::in_list`]
    /// - a string under `_in` containing "select" (case-insensitive) is
    ///   treated as a trusted sub-select; any other `_in` string splits on
    ///   commas into a list
    /// - otherwise the suffix selects the operator, defaulting to `=`
    pub fn parse(key: &str, value: impl Into<Json>) -> Filter {
        match value.into() {
            Json::Array(items) => Filter::in_list(key, items),
            value => {
                let (field, op) = split_op(key);
                // A null value means no predicate; compilation skips it.
                if op != FilterOp::In || value.is_null() {
                    return Filter::cmp(field, op, value);
                }
                match value {
                    Json::String(s) => {
                        if s.to_ascii_lowercase().contains("select") {
                            return Filter::in_subselect(field, RawSql::new(s));
                        }
                        let items = s
                            .split(',')
                            .map(|part| Json::String(part.trim().to_string()))
                            .collect();
                        Filter::in_list(field, items)
                    }
                    value => Filter::in_list(field, vec![value]),
                }
            }
        }
    }
}

/// One compiled predicate: original key, rendered clause (`?`
/// placeholders) and bound values.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub key: String,
    pub clause: String,
    pub values: Vec<Value>,
}

/// The flattened result of filter compilation.
#[derive(Debug, Clone, Default)]
pub struct FilterQuery {
    /// `AND`-joined clause with `?` placeholders; empty when no filter
    /// produced a predicate.
    pub clause: String,
    pub values: Vec<Value>,
}

impl FilterQuery {
    pub fn part_sql(&self) -> Option<&str> {
        if self.clause.is_empty() {
            None
        } else {
            Some(&self.clause)
        }
    }
}

fn compile_one(
    filter: &Filter,
    json_keys: &[String],
    keys: &[String],
) -> RecordResult<Option<Predicate>> {
    let predicate = match &filter.kind {
        FilterKind::Cmp { value, .. } if value.is_null() => return Ok(None),
        FilterKind::Cmp { op, value } => {
            let fkey = format_key(&filter.key, Some(value), json_keys, keys);
            Predicate {
                key: filter.key.clone(),
                clause: format!("{}{}?", fkey, op.sql()),
                values: vec![Value::from_json(value)],
            }
        }
        FilterKind::List(items) => {
            if items.is_empty() {
                return Err(RecordError::EmptyRows);
            }
            let fkey = format_key(&filter.key, items.first(), json_keys, keys);
            let placeholders = vec!["?"; items.len()].join(", ");
            Predicate {
                key: filter.key.clone(),
                clause: format!("{} in ({})", fkey, placeholders),
                values: items.iter().map(Value::from_json).collect(),
            }
        }
        FilterKind::SubSelect(sub) => Predicate {
            key: filter.key.clone(),
            clause: format!("{} in ({})", filter.key, sub),
            values: Vec::new(),
        },
        FilterKind::Raw(sql) => Predicate {
            key: filter.key.clone(),
            clause: sql.as_str().to_string(),
            values: Vec::new(),
        },
    };
    Ok(Some(predicate))
}

/// Stable partition: predicates whose key appears in `sort_keys` move to
/// the front (in `sort_keys` order), relative order preserved within each
/// partition.
fn sort_predicates(predicates: Vec<Predicate>, sort_keys: &[String]) -> Vec<Predicate> {
    let mut front = Vec::new();
    let mut rest = predicates;
    for key in sort_keys {
        let (matched, other): (Vec<_>, Vec<_>) =
            rest.into_iter().partition(|p| p.key == *key);
        front.extend(matched);
        rest = other;
    }
    front.extend(rest);
    front
}

/// Compile a filter list into one flattened [`FilterQuery`].
///
/// `part_sql` is a trusted trailing predicate appended after all compiled
/// clauses; `extra_args` bind to its `?` placeholders.
pub fn compile(
    filters: &[Filter],
    sort_keys: &[String],
    part_sql: Option<&RawSql>,
    extra_args: &[Value],
    json_keys: &[String],
    keys: &[String],
) -> RecordResult<FilterQuery> {
    let mut predicates = Vec::with_capacity(filters.len());
    for filter in filters {
        if let Some(p) = compile_one(filter, json_keys, keys)? {
            predicates.push(p);
        }
    }
    let predicates = sort_predicates(predicates, sort_keys);

    let mut clauses = Vec::with_capacity(predicates.len() + 1);
    let mut values = Vec::new();
    for p in predicates {
        clauses.push(p.clause);
        values.extend(p.values);
    }
    if let Some(raw) = part_sql
        && !raw.is_empty()
    {
        clauses.push(raw.as_str().to_string());
    }
    values.extend(extra_args.iter().cloned());

    Ok(FilterQuery {
        clause: clauses.join(" AND "),
        values,
    })
}

const JSON_CAST_TYPES: [&str; 4] = ["int", "float", "boolean", "text"];

/// Rewrite a logical field name for SQL.
///
/// Bare names pass through unless they miss the declared key set while a
/// `data` JSON column exists, in which case they project into `data`.
/// Dotted paths whose head (or second segment, for aliased tables) is a
/// declared JSON column become `col#>>'{path}'` with an explicit
/// (`.int`/`.float`/`.boolean`/`.text` trailing segment) or value-inferred
/// cast, and an optional `... as <name>` trailing alias.
pub fn format_key(key: &str, val: Option<&Json>, json_keys: &[String], keys: &[String]) -> String {
    if key == "*" {
        return key.to_string();
    }

    if !key.contains('.') {
        if keys.is_empty()
            || keys.iter().any(|k| k == key)
            || !json_keys.iter().any(|k| k == "data")
        {
            return key.to_string();
        }
        return format_key(&format!("data.{}", key), val, json_keys, keys);
    }

    let parts: Vec<&str> = key.split('.').collect();

    let (prefix, mut path): (String, Vec<&str>) =
        if json_keys.iter().any(|k| k == parts[0]) {
            (parts[0].to_string(), parts[1..].to_vec())
        } else if parts.len() > 1 && json_keys.iter().any(|k| k == parts[1]) {
            (format!("{}.{}", parts[0], parts[1]), parts[2..].to_vec())
        } else {
            return key.to_string();
        };

    let mut cast = "";
    if let Some(last) = path.last()
        && JSON_CAST_TYPES.contains(last)
    {
        cast = path.pop().unwrap_or_default();
    }

    let mut as_name = "";
    if path.contains(&"as") && path.len() >= 2 {
        as_name = path[path.len() - 1];
        path.truncate(path.len() - 2);
    }

    let mut out = format!("{}#>>'{{{}}}'", prefix, path.join(", "));

    let cast = if cast.is_empty() {
        val.and_then(guess_type).unwrap_or("")
    } else {
        cast
    };
    if !cast.is_empty() {
        out = format!("cast({} as {})", out, cast);
    }
    if !as_name.is_empty() {
        out = format!("{} as {}", out, as_name);
    }
    out
}

/// Map a list of logical field names through [`format_key`].
pub fn format_fields(fields: &[String], json_keys: &[String], keys: &[String]) -> Vec<String> {
    fields
        .iter()
        .map(|f| format_key(f.trim(), None, json_keys, keys))
        .collect()
}

/// Map a comma-separated GROUP BY expression through [`format_key`].
pub fn format_groups(
    groups: Option<&str>,
    json_keys: &[String],
    keys: &[String],
) -> Option<String> {
    let groups = groups?;
    if groups.is_empty() {
        return None;
    }
    let fields: Vec<String> = groups.split(',').map(|s| s.trim().to_string()).collect();
    Some(format_fields(&fields, json_keys, keys).join(","))
}

fn format_sorts_one(sorts: &str, json_keys: &[String], keys: &[String]) -> String {
    // A trailing direction token ("id desc") survives the rewrite.
    match sorts.rfind(' ') {
        None => format_key(sorts, None, json_keys, keys),
        Some(idx) => format!(
            "{}{}",
            format_key(sorts[..idx].trim(), None, json_keys, keys),
            &sorts[idx..]
        ),
    }
}

/// Map a comma-separated ORDER BY expression through [`format_key`],
/// preserving per-item direction tokens.
pub fn format_sorts(sorts: Option<&str>, json_keys: &[String], keys: &[String]) -> Option<String> {
    let sorts = sorts?;
    if sorts.is_empty() {
        return None;
    }
    let items: Vec<String> = sorts
        .split(',')
        .map(|item| format_sorts_one(item.trim(), json_keys, keys))
        .collect();
    Some(items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn no_keys() -> (Vec<String>, Vec<String>) {
        (Vec::new(), Vec::new())
    }

    fn strs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn suffix_dispatch() {
        assert_eq!(split_op("age_gte"), ("age", FilterOp::Gte));
        assert_eq!(split_op("name_like"), ("name", FilterOp::Like));
        assert_eq!(split_op("name"), ("name", FilterOp::Eq));
        // unrecognized suffix stays part of the column name
        assert_eq!(split_op("updated_at"), ("updated_at", FilterOp::Eq));
    }

    #[test]
    fn gte_clause() {
        let (jk, ks) = no_keys();
        let q = compile(&[Filter::parse("age_gte", 5)], &[], None, &[], &jk, &ks).unwrap();
        assert_eq!(q.clause, "age>=?");
        assert_eq!(q.values, vec![crate::value::Value::Int(5)]);
    }

    #[test]
    fn eq_clause() {
        let (jk, ks) = no_keys();
        let q = compile(&[Filter::parse("name", "x")], &[], None, &[], &jk, &ks).unwrap();
        assert_eq!(q.clause, "name=?");
        assert_eq!(q.values, vec![crate::value::Value::Text("x".into())]);
    }

    #[test]
    fn null_value_emits_no_predicate() {
        let (jk, ks) = no_keys();
        let q = compile(&[Filter::eq("name", json!(null))], &[], None, &[], &jk, &ks).unwrap();
        assert_eq!(q.clause, "");
        assert!(q.values.is_empty());
    }

    #[test]
    fn null_value_under_in_suffix_emits_no_predicate() {
        let (jk, ks) = no_keys();
        let q = compile(
            &[Filter::parse("tag_in", json!(null))],
            &[],
            None,
            &[],
            &jk,
            &ks,
        )
        .unwrap();
        assert_eq!(q.clause, "");
        assert!(q.values.is_empty());
    }

    #[test]
    fn list_value_renders_in() {
        let (jk, ks) = no_keys();
        let q = compile(
            &[Filter::parse("id", json!([1, 2, 3]))],
            &[],
            None,
            &[],
            &jk,
            &ks,
        )
        .unwrap();
        assert_eq!(q.clause, "id in (?, ?, ?)");
        assert_eq!(q.values.len(), 3);
    }

    #[test]
    fn empty_list_short_circuits() {
        let (jk, ks) = no_keys();
        let err = compile(&[Filter::in_list("id", vec![])], &[], None, &[], &jk, &ks)
            .unwrap_err();
        assert!(matches!(err, RecordError::EmptyRows));
    }

    #[test]
    fn in_string_splits_on_commas() {
        let (jk, ks) = no_keys();
        let q = compile(
            &[Filter::parse("name_in", "a, b,c")],
            &[],
            None,
            &[],
            &jk,
            &ks,
        )
        .unwrap();
        assert_eq!(q.clause, "name in (?, ?, ?)");
    }

    #[test]
    fn in_string_with_select_inlines_subselect() {
        let (jk, ks) = no_keys();
        let q = compile(
            &[Filter::parse(
                "user_id_in",
                "SELECT id FROM users WHERE age > 10",
            )],
            &[],
            None,
            &[],
            &jk,
            &ks,
        )
        .unwrap();
        assert_eq!(q.clause, "user_id in (SELECT id FROM users WHERE age > 10)");
        assert!(q.values.is_empty());
    }

    #[test]
    fn sort_priority_partition_is_stable() {
        let (jk, ks) = no_keys();
        let filters = vec![
            Filter::eq("a", 1),
            Filter::eq("b", 2),
            Filter::eq("c", 3),
        ];
        let q = compile(&filters, &strs(&["c"]), None, &[], &jk, &ks).unwrap();
        assert_eq!(q.clause, "c=? AND a=? AND b=?");
        assert_eq!(
            q.values,
            vec![
                crate::value::Value::Int(3),
                crate::value::Value::Int(1),
                crate::value::Value::Int(2),
            ]
        );
    }

    #[test]
    fn raw_part_sql_appends_last() {
        let (jk, ks) = no_keys();
        let q = compile(
            &[Filter::eq("a", 1)],
            &[],
            Some(&RawSql::new("b > ?")),
            &[crate::value::Value::Int(9)],
            &jk,
            &ks,
        )
        .unwrap();
        assert_eq!(q.clause, "a=? AND b > ?");
        assert_eq!(
            q.values,
            vec![crate::value::Value::Int(1), crate::value::Value::Int(9)]
        );
    }

    #[test]
    fn json_path_with_explicit_cast() {
        let out = format_key("data.a.b.int", None, &strs(&["data"]), &strs(&["id"]));
        assert_eq!(out, "cast(data#>>'{a, b}' as int)");
    }

    #[test]
    fn json_path_with_inferred_cast() {
        let out = format_key("data.age", Some(&json!(5)), &strs(&["data"]), &strs(&["id"]));
        assert_eq!(out, "cast(data#>>'{age}' as int)");
    }

    #[test]
    fn json_path_text_value_no_cast() {
        let out = format_key(
            "data.name",
            Some(&json!("bob")),
            &strs(&["data"]),
            &strs(&["id"]),
        );
        assert_eq!(out, "data#>>'{name}'");
    }

    #[test]
    fn json_path_with_alias() {
        let out = format_key("data.a.as.aa", None, &strs(&["data"]), &strs(&["id"]));
        assert_eq!(out, "data#>>'{a}' as aa");
    }

    #[test]
    fn json_path_under_table_alias() {
        let out = format_key("u.data.a.int", None, &strs(&["data"]), &strs(&["id"]));
        assert_eq!(out, "cast(u.data#>>'{a}' as int)");
    }

    #[test]
    fn bare_key_falls_back_to_data_column() {
        let json_keys = strs(&["data"]);
        let keys = strs(&["id", "name"]);
        assert_eq!(format_key("name", None, &json_keys, &keys), "name");
        assert_eq!(
            format_key("level", Some(&json!(3)), &json_keys, &keys),
            "cast(data#>>'{level}' as int)"
        );
    }

    #[test]
    fn non_json_dotted_key_passes_through() {
        let (jk, ks) = no_keys();
        assert_eq!(format_key("u.name", None, &jk, &ks), "u.name");
    }

    #[test]
    fn groups_and_sorts_formatting() {
        let json_keys = strs(&["data"]);
        let keys = strs(&["id"]);
        assert_eq!(
            format_groups(Some("data.kind.text"), &json_keys, &keys),
            Some("cast(data#>>'{kind}' as text)".to_string())
        );
        assert_eq!(
            format_sorts(Some("data.age.int desc, id"), &json_keys, &keys),
            Some("cast(data#>>'{age}' as int) desc, id".to_string())
        );
    }
}
