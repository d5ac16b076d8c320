//! Pure preparation steps behind the record facade: lookup predicates,
//! changed-column computation, unique-key snapshots.

use super::RecordSchema;
use super::merge::{make_data, merge_json, merge_sub_json};
use super::query::Get;
use crate::error::{RecordError, RecordResult};
use crate::row::Record;
use crate::value::Value;
use serde_json::Value as Json;

/// A prepared single-record lookup predicate.
#[derive(Debug, Clone)]
pub(crate) struct GetProps {
    pub part_sql: String,
    pub args: Vec<Value>,
}

/// Unique-key lookups either hit the key set directly or, when a unique
/// value is absent, fall back to a `max(id)` pre-query.
#[derive(Debug)]
pub(crate) enum UniqLookup {
    Direct(GetProps),
    MaxId(GetProps),
}

/// Extra equality predicates from leftover lookup data; nulls are skipped.
fn append_extra(part_sql: &mut Vec<String>, args: &mut Vec<Value>, data: &Record) {
    for (key, val) in data {
        if val.is_null() {
            continue;
        }
        part_sql.push(format!("{}=?", key));
        args.push(Value::from_json(val));
    }
}

pub(crate) fn prepare_get_by_id(id: i64, get: &Get) -> GetProps {
    let mut part_sql = vec!["id=?".to_string()];
    let mut args = vec![Value::Int(id)];
    if !get.ignore_extra_keys {
        append_extra(&mut part_sql, &mut args, &get.data);
    }
    GetProps {
        part_sql: part_sql.join(" AND "),
        args,
    }
}

pub(crate) fn prepare_get_by_uniq(
    schema: &RecordSchema,
    get: &Get,
) -> RecordResult<UniqLookup> {
    if schema.uniq_keys.is_empty() && get.required_uniq_keys {
        // No key set to look up by; with extras ignored the query can
        // never match anything.
        if get.ignore_extra_keys {
            return Err(RecordError::EmptyRows);
        }
        return Err(RecordError::RequiredKey("uniq_keys".to_string()));
    }

    let mut data = get.data.clone();
    let mut part_sql = Vec::new();
    let mut args = Vec::new();
    let mut get_max_id = false;

    for key in &schema.uniq_keys {
        match data.remove(key) {
            Some(val) if !val.is_null() => {
                part_sql.push(format!("{}=?", key));
                args.push(Value::from_json(&val));
            }
            _ => {
                get_max_id = true;
                if get.required_uniq_keys && !schema.optional_keys.iter().any(|k| k == key) {
                    return Err(RecordError::RequiredKey(key.clone()));
                }
            }
        }
    }

    if !get.ignore_extra_keys {
        append_extra(&mut part_sql, &mut args, &data);
    }

    let props = GetProps {
        part_sql: part_sql.join(" AND "),
        args,
    };
    Ok(if get_max_id {
        UniqLookup::MaxId(props)
    } else {
        UniqLookup::Direct(props)
    })
}

/// Snapshot the full unique-key values for a save, falling back to the old
/// row for keys the incoming data omits. Returns whether any unique value
/// differs from the old row.
pub(crate) fn get_uniq_data(
    schema: &RecordSchema,
    data: &Record,
    old: Option<&Record>,
) -> (bool, Record) {
    let mut changed = false;
    let mut uniq_data = Record::new();

    for key in &schema.uniq_keys {
        let mut val = data.get(key).cloned().filter(|v| !v.is_null());
        if val.is_none()
            && let Some(old) = old
        {
            val = old.get(key).cloned();
        }
        let val = val.unwrap_or(Json::Null);
        uniq_data.insert(key.clone(), val.clone());

        if let Some(old) = old
            && old.get(key).cloned().unwrap_or(Json::Null) != val
        {
            changed = true;
        }
    }

    (changed, uniq_data)
}

/// Compute the columns and values a save should write.
///
/// Plain columns are written only when present, non-null and different
/// from the old row. JSON columns shallow-merge over the old value and
/// sub-JSON columns deep-merge, except for `replace_keys`. `updated_at`
/// is stamped (epoch seconds) when declared and not supplied.
pub(crate) fn prepare_save(
    schema: &RecordSchema,
    data: Record,
    old: Option<&Record>,
) -> (Vec<String>, Vec<Value>) {
    let data = if schema.exclude_data_keys.is_empty() {
        data
    } else {
        make_data(data, &schema.exclude_data_keys)
    };

    let mut rkeys = Vec::new();
    let mut args = Vec::new();

    for key in schema.keys.iter().chain(&schema.uniq_keys) {
        let Some(val) = data.get(key).filter(|v| !v.is_null()) else {
            continue;
        };
        if let Some(old) = old
            && old.get(key) == Some(val)
        {
            continue;
        }
        rkeys.push(key.clone());
        args.push(Value::from_json(val));
    }

    for key in &schema.json_keys {
        let Some(val) = data.get(key).filter(|v| !v.is_null()) else {
            continue;
        };
        let mut val = val.clone();
        if let Some(old) = old
            && !schema.replace_keys.iter().any(|k| k == key)
        {
            val = merge_json(val, old.get(key).cloned().unwrap_or(Json::Null));
        }
        rkeys.push(key.clone());
        args.push(Value::Json(val));
    }

    for key in &schema.sub_json_keys {
        let Some(val) = data.get(key).filter(|v| !v.is_null()) else {
            continue;
        };
        let mut val = val.clone();
        if let Some(old) = old {
            val = merge_sub_json(
                val,
                old.get(key).unwrap_or(&Json::Null),
                &schema.replace_keys,
            );
        }
        rkeys.push(key.clone());
        args.push(Value::Json(val));
    }

    if schema.keys.iter().any(|k| k == "updated_at")
        && data.get("updated_at").is_none_or(Json::is_null)
    {
        rkeys.push("updated_at".to_string());
        args.push(Value::Int(now_epoch()));
    }

    (rkeys, args)
}

pub(crate) fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordSchema;
    use serde_json::json;

    fn rec(v: Json) -> Record {
        match v {
            Json::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    fn schema() -> RecordSchema {
        RecordSchema::new("users")
            .keys(&["name", "age", "updated_at"])
            .uniq_keys(&["email"])
            .json_keys(&["data"])
    }

    #[test]
    fn get_by_id_with_extras() {
        let get = Get::by_id(7).value("status", "active");
        let props = prepare_get_by_id(7, &get);
        assert_eq!(props.part_sql, "id=? AND status=?");
        assert_eq!(props.args.len(), 2);
    }

    #[test]
    fn get_by_uniq_direct() {
        let get = Get::new().value("email", "a@b.c");
        let props = match prepare_get_by_uniq(&schema(), &get).unwrap() {
            UniqLookup::Direct(p) => p,
            UniqLookup::MaxId(_) => panic!("expected direct lookup"),
        };
        assert_eq!(props.part_sql, "email=?");
    }

    #[test]
    fn get_by_uniq_missing_required_key() {
        let err = prepare_get_by_uniq(&schema(), &Get::new()).unwrap_err();
        assert!(matches!(err, RecordError::RequiredKey(k) if k == "email"));
    }

    #[test]
    fn get_by_uniq_missing_optional_key_falls_back_to_max_id() {
        let schema = schema().optional_keys(&["email"]);
        let get = Get::new().value("age", 3);
        match prepare_get_by_uniq(&schema, &get).unwrap() {
            UniqLookup::MaxId(props) => assert_eq!(props.part_sql, "age=?"),
            UniqLookup::Direct(_) => panic!("expected max(id) fallback"),
        }
    }

    #[test]
    fn no_uniq_keys_strict_is_empty_rows_when_extras_ignored() {
        let schema = RecordSchema::new("users");
        let err = prepare_get_by_uniq(&schema, &Get::new().ignore_extra_keys()).unwrap_err();
        assert!(matches!(err, RecordError::EmptyRows));
    }

    #[test]
    fn save_skips_unchanged_columns() {
        let old = rec(json!({"id": 1, "email": "a@b.c", "name": "bob", "age": 3}));
        let data = rec(json!({"name": "bob", "age": 4}));
        let (rkeys, args) = prepare_save(&schema(), data, Some(&old));
        // name unchanged, age changed, updated_at stamped
        assert_eq!(rkeys, vec!["age", "updated_at"]);
        assert_eq!(args.len(), 2);
    }

    #[test]
    fn save_with_nothing_changed_writes_no_columns() {
        // No updated_at in the schema, so nothing gets stamped either.
        let schema = RecordSchema::new("users")
            .keys(&["name", "age"])
            .uniq_keys(&["email"]);
        let old = rec(json!({"id": 1, "email": "a@b.c", "name": "bob", "age": 3}));
        let data = rec(json!({"name": "bob", "age": 3}));
        let (rkeys, args) = prepare_save(&schema, data, Some(&old));
        assert!(rkeys.is_empty());
        assert!(args.is_empty());
    }

    #[test]
    fn save_merges_json_column() {
        let old = rec(json!({"id": 1, "data": {"a": 1, "b": 1}}));
        let data = rec(json!({"data": {"a": 2}}));
        let schema = RecordSchema::new("users").json_keys(&["data"]);
        let (rkeys, args) = prepare_save(&schema, data, Some(&old));
        assert_eq!(rkeys, vec!["data"]);
        assert_eq!(args[0], Value::Json(json!({"a": 2, "b": 1})));
    }

    #[test]
    fn save_replace_key_skips_merge() {
        let old = rec(json!({"id": 1, "data": {"a": 1, "b": 1}}));
        let data = rec(json!({"data": {"a": 2}}));
        let schema = RecordSchema::new("users")
            .json_keys(&["data"])
            .replace_keys(&["data"]);
        let (_, args) = prepare_save(&schema, data, Some(&old));
        assert_eq!(args[0], Value::Json(json!({"a": 2})));
    }

    #[test]
    fn save_excluded_keys_fold_under_data() {
        let schema = RecordSchema::new("events")
            .keys(&["kind"])
            .json_keys(&["data"])
            .exclude_data_keys(&["kind"]);
        let data = rec(json!({"kind": "click", "x": 1, "y": 2}));
        let (rkeys, args) = prepare_save(&schema, data, None);
        assert_eq!(rkeys, vec!["kind", "data"]);
        assert_eq!(args[1], Value::Json(json!({"x": 1, "y": 2})));
    }

    #[test]
    fn uniq_data_falls_back_to_old_and_detects_change() {
        let schema = schema();
        let old = rec(json!({"id": 1, "email": "a@b.c"}));

        let (changed, uniq) = get_uniq_data(&schema, &Record::new(), Some(&old));
        assert!(!changed);
        assert_eq!(uniq.get("email"), Some(&json!("a@b.c")));

        let data = rec(json!({"email": "new@b.c"}));
        let (changed, uniq) = get_uniq_data(&schema, &data, Some(&old));
        assert!(changed);
        assert_eq!(uniq.get("email"), Some(&json!("new@b.c")));
    }
}
