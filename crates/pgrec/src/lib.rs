//! # pgrec
//!
//! A record-centric convenience layer over `tokio-postgres`.
//!
//! ## Features
//!
//! - **SQL generation**: pure statement builders for CRUD, DDL and
//!   aggregate queries, with `?` placeholders numbered at execution time
//! - **Dynamic filters**: a typed operator set plus the legacy
//!   suffixed-key form (`age_gte`, `id_in`), compiled to parameterized
//!   predicates with JSON-path support for `jsonb` columns
//! - **Record facade**: per-table [`RecordSchema`] with
//!   get / save / remove / count / list over schemaless
//!   name-to-JSON rows
//! - **Transaction-friendly**: every operation takes a
//!   [`GenericClient`], so a transaction slots in anywhere a client does
//! - **Explicit pooling**: a [`Connector`] handle owns the deadpool pool,
//!   runs connect hooks and reconnects once when the pool was closed
//!
//! ## Example
//!
//! ```ignore
//! use pgrec::{Connector, Get, ListQuery, PoolConfig, RecordSchema, SaveOptions};
//!
//! let connector = Connector::new();
//! connector.connect(PoolConfig::new(dsn)).await?;
//! let client = connector.client().await?;
//!
//! let users = RecordSchema::new("users")
//!     .keys(&["name", "age", "created_at", "updated_at"])
//!     .uniq_keys(&["email"])
//!     .json_keys(&["data"]);
//!
//! let id = users.save(&client, data, SaveOptions::new()).await?;
//! let user = users.get(&client, Get::by_id(id)).await?;
//! let adults = users
//!     .list(&client, ListQuery::new().filter_kv("age_gte", 18))
//!     .await?;
//! ```

pub mod client;
pub mod error;
pub mod filter;
pub mod ops;
pub mod pool;
pub mod record;
pub mod row;
pub mod stmt;
pub mod table;
pub mod value;

pub use client::GenericClient;
pub use error::{RecordError, RecordResult};
pub use filter::{Filter, FilterOp, FilterQuery};
pub use pool::{ConnectHook, Connector, PoolConfig, create_pool, create_pool_with_tls};
pub use record::{Get, ListQuery, RecordSchema, SaveOptions, merge_json, popup_data};
pub use row::Record;
pub use table::{Column, IndexName, RawSql, TableName, c, c_all, cs, i, t};
pub use value::Value;
