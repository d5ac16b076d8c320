//! JSON merge helpers for record save and read paths.

use crate::row::Record;
use serde_json::Value as Json;

/// Shallow overwrite-merge: when both sides are objects, `new`'s entries
/// overwrite `old`'s and the rest of `old` survives. Any other shape
/// replaces wholesale.
pub fn merge_json(new: Json, old: Json) -> Json {
    match (new, old) {
        (Json::Object(new), Json::Object(mut old)) => {
            for (k, v) in new {
                old.insert(k, v);
            }
            Json::Object(old)
        }
        (new, _) => new,
    }
}

/// Deep merge of a sub-JSON column: every top-level entry of `old` not in
/// `replace_keys` is shallow-merged into `new` ([`merge_json`] per entry),
/// so nested objects combine one level down while replace-keys take the
/// new value as-is.
pub fn merge_sub_json(new: Json, old: &Json, replace_keys: &[String]) -> Json {
    let mut new = match new {
        Json::Object(m) => m,
        other => return other,
    };
    let old = match old {
        Json::Object(m) => m,
        _ => return Json::Object(new),
    };
    for (k, v) in old {
        if replace_keys.iter().any(|r| r == k) {
            continue;
        }
        match new.remove(k) {
            None | Some(Json::Null) => {
                new.insert(k.clone(), v.clone());
            }
            Some(current) => {
                new.insert(k.clone(), merge_json(current, v.clone()));
            }
        }
    }
    Json::Object(new)
}

/// Hoist the `data` JSON object to the top level; the row's other columns
/// overwrite colliding keys.
pub fn popup_data(mut record: Record) -> Record {
    match record.remove("data") {
        Some(Json::Object(mut data)) => {
            for (k, v) in record {
                data.insert(k, v);
            }
            data
        }
        Some(other) => {
            record.insert("data".to_string(), other);
            record
        }
        None => record,
    }
}

/// Fold all entries except `exclude_data_keys` under a `data` object.
/// Excluded keys stay top-level; null excluded values are dropped.
pub fn make_data(mut data: Record, exclude_data_keys: &[String]) -> Record {
    let mut out = Record::new();
    for key in exclude_data_keys {
        if let Some(val) = data.remove(key)
            && !val.is_null()
        {
            out.insert(key.clone(), val);
        }
    }
    out.insert("data".to_string(), Json::Object(data));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(v: Json) -> Record {
        match v {
            Json::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn merge_json_overwrites_shallow() {
        let out = merge_json(json!({"a": 2, "c": 3}), json!({"a": 1, "b": 1}));
        assert_eq!(out, json!({"a": 2, "b": 1, "c": 3}));
    }

    #[test]
    fn merge_json_non_object_replaces() {
        assert_eq!(merge_json(json!(5), json!({"a": 1})), json!(5));
        assert_eq!(merge_json(json!({"a": 1}), json!(5)), json!({"a": 1}));
    }

    #[test]
    fn merge_sub_json_merges_one_level_down() {
        let new = json!({"a": {"x": 2}});
        let old = json!({"a": {"x": 1, "y": 1}, "b": {"z": 1}});
        let out = merge_sub_json(new, &old, &[]);
        assert_eq!(out, json!({"a": {"x": 2, "y": 1}, "b": {"z": 1}}));
    }

    #[test]
    fn merge_sub_json_replace_keys_take_new_value() {
        let new = json!({"a": {"x": 2}});
        let old = json!({"a": {"x": 1, "y": 1}});
        let out = merge_sub_json(new, &old, &["a".to_string()]);
        assert_eq!(out, json!({"a": {"x": 2}}));
    }

    #[test]
    fn popup_hoists_data_and_row_wins() {
        let record = rec(json!({"id": 7, "name": "row", "data": {"name": "json", "age": 3}}));
        let out = popup_data(record);
        assert_eq!(
            Json::Object(out),
            json!({"id": 7, "name": "row", "age": 3})
        );
    }

    #[test]
    fn popup_without_data_is_identity() {
        let record = rec(json!({"id": 7}));
        assert_eq!(Json::Object(popup_data(record)), json!({"id": 7}));
    }

    #[test]
    fn make_data_folds_remainder() {
        let data = rec(json!({"name": "n", "age": 3, "extra": true}));
        let out = make_data(data, &["name".to_string()]);
        assert_eq!(
            Json::Object(out),
            json!({"name": "n", "data": {"age": 3, "extra": true}})
        );
    }
}
