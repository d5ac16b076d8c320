//! Request builders for the record facade.

use crate::error::RecordResult;
use crate::filter::Filter;
use crate::row::Record;
use crate::table::RawSql;
use crate::value::Value;
use serde_json::Value as Json;
use std::future::Future;
use std::pin::Pin;

/// Hook run after a save, with the pre-save row (None on insert) and the
/// record id.
pub type SavedHook =
    Box<dyn FnOnce(Option<Record>, i64) -> Pin<Box<dyn Future<Output = RecordResult<()>> + Send>> + Send>;

/// Hook run after a remove, with the removed row.
pub type RemovedHook =
    Box<dyn FnOnce(Record) -> Pin<Box<dyn Future<Output = RecordResult<()>> + Send>> + Send>;

/// Single-record lookup: by explicit id, or by the schema's unique keys
/// with values taken from `data`.
#[derive(Debug, Clone)]
pub struct Get {
    pub(crate) id: Option<i64>,
    pub(crate) data: Record,
    pub(crate) fields: Vec<String>,
    pub(crate) required_uniq_keys: bool,
    pub(crate) ignore_extra_keys: bool,
    pub(crate) popup: bool,
}

impl Default for Get {
    fn default() -> Self {
        Get {
            id: None,
            data: Record::new(),
            fields: vec!["*".to_string()],
            required_uniq_keys: true,
            ignore_extra_keys: false,
            popup: false,
        }
    }
}

impl Get {
    pub fn new() -> Get {
        Get::default()
    }

    pub fn by_id(id: i64) -> Get {
        Get {
            id: Some(id),
            ..Get::default()
        }
    }

    /// A lookup value; unique-key values and extra equality predicates
    /// both come from here.
    pub fn value(mut self, key: &str, value: impl Into<Json>) -> Get {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn values(mut self, data: Record) -> Get {
        self.data.extend(data);
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> Get {
        self.fields = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Allow unique keys to be absent without erroring; lookup falls back
    /// to the `max(id)` path.
    pub fn optional_uniq_keys(mut self) -> Get {
        self.required_uniq_keys = false;
        self
    }

    /// Only unique-key values participate in the predicate; other entries
    /// in `data` are ignored.
    pub fn ignore_extra_keys(mut self) -> Get {
        self.ignore_extra_keys = true;
        self
    }

    /// Hoist the `data` JSON object to the top level of the result.
    pub fn popup(mut self) -> Get {
        self.popup = true;
        self
    }
}

/// Filtered multi-record query, shared by `count` and `list`.
pub struct ListQuery {
    pub(crate) filters: Vec<Filter>,
    pub(crate) sort_keys: Vec<String>,
    pub(crate) part_sql: Option<RawSql>,
    pub(crate) args: Vec<Value>,
    pub(crate) fields: Vec<String>,
    pub(crate) field: String,
    pub(crate) join_sql: Option<RawSql>,
    pub(crate) groups: Option<String>,
    pub(crate) sorts: Option<String>,
    pub(crate) offset: Option<i64>,
    pub(crate) size: Option<i64>,
    pub(crate) popup: bool,
}

impl Default for ListQuery {
    fn default() -> Self {
        ListQuery {
            filters: Vec::new(),
            sort_keys: Vec::new(),
            part_sql: None,
            args: Vec::new(),
            fields: vec!["*".to_string()],
            field: "*".to_string(),
            join_sql: None,
            groups: None,
            sorts: Some("id desc".to_string()),
            offset: None,
            size: None,
            popup: false,
        }
    }
}

impl ListQuery {
    pub fn new() -> ListQuery {
        ListQuery::default()
    }

    pub fn filter(mut self, filter: Filter) -> ListQuery {
        self.filters.push(filter);
        self
    }

    /// Legacy suffixed-key filter form, see [`Filter::parse`].
    pub fn filter_kv(mut self, key: &str, value: impl Into<Json>) -> ListQuery {
        self.filters.push(Filter::parse(key, value));
        self
    }

    /// Predicates whose key appears here compile first, in this order.
    pub fn sort_keys(mut self, keys: &[&str]) -> ListQuery {
        self.sort_keys = keys.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Trusted trailing predicate, appended after all compiled filters;
    /// `args` bind its `?` placeholders.
    pub fn part_sql(mut self, sql: RawSql, args: Vec<Value>) -> ListQuery {
        self.part_sql = Some(sql);
        self.args = args;
        self
    }

    pub fn fields(mut self, fields: &[&str]) -> ListQuery {
        self.fields = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    /// The column counted by `count`, `*` by default.
    pub fn count_field(mut self, field: &str) -> ListQuery {
        self.field = field.to_string();
        self
    }

    pub fn join_sql(mut self, join: RawSql) -> ListQuery {
        self.join_sql = Some(join);
        self
    }

    pub fn groups(mut self, groups: &str) -> ListQuery {
        self.groups = Some(groups.to_string());
        self
    }

    /// ORDER BY expression; defaults to `id desc`.
    pub fn sorts(mut self, sorts: &str) -> ListQuery {
        self.sorts = Some(sorts.to_string());
        self
    }

    pub fn no_sorts(mut self) -> ListQuery {
        self.sorts = None;
        self
    }

    pub fn offset(mut self, offset: i64) -> ListQuery {
        self.offset = Some(offset);
        self
    }

    pub fn size(mut self, size: i64) -> ListQuery {
        self.size = Some(size);
        self
    }

    pub fn popup(mut self) -> ListQuery {
        self.popup = true;
        self
    }
}

/// Options for [`RecordSchema::save`](crate::record::RecordSchema::save).
#[derive(Default)]
pub struct SaveOptions {
    pub(crate) id: Option<i64>,
    pub(crate) on_saved: Option<SavedHook>,
}

impl SaveOptions {
    pub fn new() -> SaveOptions {
        SaveOptions::default()
    }

    /// Update an existing record by id; the save fails with `NotFound`
    /// when the row does not exist.
    pub fn id(mut self, id: i64) -> SaveOptions {
        self.id = Some(id);
        self
    }

    pub fn on_saved(mut self, hook: SavedHook) -> SaveOptions {
        self.on_saved = Some(hook);
        self
    }
}
