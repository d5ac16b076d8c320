//! Record facade: get / save / remove / count / list over a per-table
//! schema.
//!
//! [`RecordSchema`] declares which columns a table has, which of them form
//! the unique-key set, and which hold JSON. Rows travel as [`Record`]
//! (name-to-JSON maps), so the same code path serves any table without
//! compile-time row structs.
//!
//! The save path is read-modify-write without a wrapping transaction:
//! concurrent saves of the same record can race between the unique-key
//! lookup and the write. Wrap the call in a transaction at the call site
//! when that matters.

mod merge;
mod prepare;
mod query;

pub use merge::{merge_json, merge_sub_json, popup_data};
pub use query::{Get, ListQuery, RemovedHook, SaveOptions, SavedHook};

use crate::client::GenericClient;
use crate::error::{RecordError, RecordResult};
use crate::filter;
use crate::ops;
use crate::row::Record;
use crate::stmt::SelectOpts;
use crate::table::{RawSql, TableName, c, cs, t};
use crate::value::Value;
use prepare::{UniqLookup, get_uniq_data, now_epoch, prepare_get_by_id, prepare_get_by_uniq, prepare_save};
use serde_json::Value as Json;

/// Per-table configuration for the record facade.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub(crate) table: TableName,
    pub(crate) keys: Vec<String>,
    pub(crate) uniq_keys: Vec<String>,
    pub(crate) optional_keys: Vec<String>,
    pub(crate) json_keys: Vec<String>,
    pub(crate) sub_json_keys: Vec<String>,
    pub(crate) replace_keys: Vec<String>,
    pub(crate) exclude_data_keys: Vec<String>,
}

fn to_vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl RecordSchema {
    pub fn new(table: impl Into<String>) -> RecordSchema {
        RecordSchema {
            table: t(table),
            keys: Vec::new(),
            uniq_keys: Vec::new(),
            optional_keys: Vec::new(),
            json_keys: Vec::new(),
            sub_json_keys: Vec::new(),
            replace_keys: Vec::new(),
            exclude_data_keys: Vec::new(),
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Plain (non-unique, non-JSON) columns.
    pub fn keys(mut self, keys: &[&str]) -> RecordSchema {
        self.keys = to_vec(keys);
        self
    }

    /// Columns forming the unique-key set used by lookups and upserts.
    pub fn uniq_keys(mut self, keys: &[&str]) -> RecordSchema {
        self.uniq_keys = to_vec(keys);
        self
    }

    /// Unique keys that may be absent from a strict lookup.
    pub fn optional_keys(mut self, keys: &[&str]) -> RecordSchema {
        self.optional_keys = to_vec(keys);
        self
    }

    /// JSON columns; saves shallow-merge them over the old value.
    pub fn json_keys(mut self, keys: &[&str]) -> RecordSchema {
        self.json_keys = to_vec(keys);
        self
    }

    /// JSON columns whose entries deep-merge one level down.
    pub fn sub_json_keys(mut self, keys: &[&str]) -> RecordSchema {
        self.sub_json_keys = to_vec(keys);
        self
    }

    /// JSON keys written as-is instead of merged.
    pub fn replace_keys(mut self, keys: &[&str]) -> RecordSchema {
        self.replace_keys = to_vec(keys);
        self
    }

    /// Save folds every incoming key except these under the `data` column.
    pub fn exclude_data_keys(mut self, keys: &[&str]) -> RecordSchema {
        self.exclude_data_keys = to_vec(keys);
        self
    }

    /// All declared column names, for the JSON-path field formatter.
    fn column_keys(&self) -> Vec<String> {
        let mut keys = vec!["id".to_string()];
        keys.extend(self.keys.iter().cloned());
        keys.extend(self.uniq_keys.iter().cloned());
        keys.extend(self.json_keys.iter().cloned());
        keys.extend(self.sub_json_keys.iter().cloned());
        keys
    }

    /// Fetch a single record by id or by the unique-key set.
    ///
    /// When a unique value is absent (and the key is optional or the
    /// lookup non-strict) the lookup runs a `max(id)` pre-query over the
    /// available keys and then re-fetches by id.
    pub async fn get(
        &self,
        client: &impl GenericClient,
        get: Get,
    ) -> RecordResult<Option<Record>> {
        let props = match get.id {
            Some(id) => prepare_get_by_id(id, &get),
            None => match prepare_get_by_uniq(self, &get) {
                Ok(UniqLookup::Direct(props)) => props,
                Ok(UniqLookup::MaxId(props)) => {
                    let id = ops::select_one_only(
                        client,
                        &self.table,
                        &c("max(id)"),
                        part(&props.part_sql),
                        None,
                        &props.args,
                    )
                    .await?;
                    let Some(id) = id.and_then(|j| j.as_i64()) else {
                        return Ok(None);
                    };
                    prepare_get_by_id(id, &get)
                }
                Err(RecordError::EmptyRows) => return Ok(None),
                Err(e) => return Err(e),
            },
        };

        let fields = filter::format_fields(&get.fields, &self.json_keys, &self.column_keys());
        let row = ops::select_one(
            client,
            &self.table,
            &cs(&fields),
            part(&props.part_sql),
            None,
            &props.args,
        )
        .await?;

        Ok(match row {
            Some(r) if get.popup => Some(popup_data(r)),
            other => other,
        })
    }

    /// Insert or update a record, returning its id.
    ///
    /// The old row is loaded by id (must exist) or by unique keys. Only
    /// changed plain columns are written; JSON columns merge per the
    /// schema. Changing a unique value to one another row already owns
    /// fails with [`RecordError::UniqueConflict`]. With nothing to write
    /// the existing id comes back without an UPDATE.
    pub async fn save(
        &self,
        client: &impl GenericClient,
        data: Record,
        opts: SaveOptions,
    ) -> RecordResult<i64> {
        let old = match opts.id {
            Some(id) => {
                let old = self.get(client, Get::by_id(id)).await?;
                Some(old.ok_or_else(|| {
                    RecordError::not_found(format!("record {} does not exist", id))
                })?)
            }
            None => {
                let (_, uniq_data) = get_uniq_data(self, &data, None);
                self.get(client, Get::new().values(uniq_data).ignore_extra_keys())
                    .await?
            }
        };

        let (mut rkeys, mut args) = prepare_save(self, data.clone(), old.as_ref());

        match old {
            Some(old) => {
                let id = record_id(&old)?;

                let (uniq_changed, uniq_full) = get_uniq_data(self, &data, Some(&old));
                if uniq_changed
                    && let Some(other) = self
                        .get(client, Get::new().values(uniq_full).ignore_extra_keys())
                        .await?
                {
                    return Err(RecordError::UniqueConflict {
                        id: record_id(&other)?,
                    });
                }

                if rkeys.is_empty() {
                    return Ok(id);
                }

                args.push(Value::Int(id));
                ops::update(client, &self.table, &cs(&rkeys), Some("id=?"), &args).await?;

                if let Some(hook) = opts.on_saved {
                    hook(Some(old), id).await?;
                }
                Ok(id)
            }
            None => {
                if self.keys.iter().any(|k| k == "created_at")
                    && data.get("created_at").is_none_or(Json::is_null)
                {
                    rkeys.push("created_at".to_string());
                    args.push(Value::Int(now_epoch()));
                }

                let ret =
                    ops::insert(client, &self.table, &cs(&rkeys), &args, Some(&c("id"))).await?;
                let id = ret
                    .as_i64()
                    .ok_or_else(|| RecordError::decode("id", "insert returned no id"))?;

                if let Some(hook) = opts.on_saved {
                    hook(None, id).await?;
                }
                Ok(id)
            }
        }
    }

    /// Delete the record matching the lookup. Returns whether a record
    /// was found; the hook receives the full removed row.
    pub async fn remove(
        &self,
        client: &impl GenericClient,
        get: Get,
        on_removed: Option<RemovedHook>,
    ) -> RecordResult<bool> {
        let mut get = get.ignore_extra_keys();
        get.fields = if on_removed.is_some() {
            vec!["*".to_string()]
        } else {
            vec!["id".to_string()]
        };

        let Some(old) = self.get(client, get).await? else {
            return Ok(false);
        };
        let id = record_id(&old)?;

        ops::delete(client, &self.table, Some("id=?"), &[Value::Int(id)]).await?;

        if let Some(hook) = on_removed {
            hook(old).await?;
        }
        Ok(true)
    }

    /// Count records matching the query. An always-empty filter
    /// (empty IN list) short-circuits to 0.
    pub async fn count(&self, client: &impl GenericClient, q: ListQuery) -> RecordResult<i64> {
        let keys = self.column_keys();
        let compiled = match filter::compile(
            &q.filters,
            &q.sort_keys,
            q.part_sql.as_ref(),
            &q.args,
            &self.json_keys,
            &keys,
        ) {
            Err(RecordError::EmptyRows) => return Ok(0),
            other => other?,
        };
        let groups = filter::format_groups(q.groups.as_deref(), &self.json_keys, &keys);

        ops::count(
            client,
            &self.table,
            &c(q.field.as_str()),
            compiled.part_sql(),
            q.join_sql.as_ref().map(RawSql::as_str),
            groups.as_deref(),
            &compiled.values,
        )
        .await
    }

    /// List records matching the query. An always-empty filter
    /// (empty IN list) short-circuits to an empty vec.
    pub async fn list(
        &self,
        client: &impl GenericClient,
        q: ListQuery,
    ) -> RecordResult<Vec<Record>> {
        let keys = self.column_keys();
        let compiled = match filter::compile(
            &q.filters,
            &q.sort_keys,
            q.part_sql.as_ref(),
            &q.args,
            &self.json_keys,
            &keys,
        ) {
            Err(RecordError::EmptyRows) => return Ok(Vec::new()),
            other => other?,
        };

        let fields = filter::format_fields(&q.fields, &self.json_keys, &keys);
        let groups = filter::format_groups(q.groups.as_deref(), &self.json_keys, &keys);
        let sorts = filter::format_sorts(q.sorts.as_deref(), &self.json_keys, &keys);

        let opts = SelectOpts {
            part_sql: compiled.part_sql(),
            join_sql: q.join_sql.as_ref().map(RawSql::as_str),
            groups: groups.as_deref(),
            sorts: sorts.as_deref(),
            offset: q.offset,
            size: q.size,
        };
        let ret = ops::select(client, &self.table, &cs(&fields), &opts, &compiled.values).await?;

        Ok(if q.popup {
            ret.into_iter().map(popup_data).collect()
        } else {
            ret
        })
    }
}

fn record_id(record: &Record) -> RecordResult<i64> {
    record
        .get("id")
        .and_then(Json::as_i64)
        .ok_or_else(|| RecordError::decode("id", "record has no integer id"))
}

fn part(part_sql: &str) -> Option<&str> {
    if part_sql.is_empty() {
        None
    } else {
        Some(part_sql)
    }
}
