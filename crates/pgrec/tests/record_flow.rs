//! End-to-end record facade flow against a live database.
//!
//! Requires `DATABASE_URL`; the test skips itself when it is not set.

use pgrec::{
    Connector, Get, ListQuery, PoolConfig, RecordResult, RecordSchema, SaveOptions, cs, i, ops, t,
};
use serde_json::{Map, Value as Json, json};
use std::time::{SystemTime, UNIX_EPOCH};

fn rec(v: Json) -> Map<String, Json> {
    match v {
        Json::Object(m) => m,
        _ => panic!("expected object"),
    }
}

#[tokio::test]
async fn record_crud_roundtrip() -> RecordResult<()> {
    dotenvy::dotenv().ok();
    let dsn = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping record_crud_roundtrip");
            return Ok(());
        }
    };

    let connector = Connector::new();
    connector.connect(PoolConfig::new(dsn)).await?;
    let client = connector.client().await?;

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before UNIX_EPOCH")
        .as_nanos();
    let table_name = format!("pgrec_test_{}_{}", std::process::id(), nanos);
    let table = t(table_name.clone());

    ops::create_table(
        &client,
        &table,
        &cs(&[
            "id BIGSERIAL PRIMARY KEY",
            "email VARCHAR(128) NOT NULL",
            "name VARCHAR(128)",
            "age INT DEFAULT 0",
            "data JSONB",
            "created_at BIGINT",
            "updated_at BIGINT",
        ]),
    )
    .await?;
    ops::create_index(&client, true, &table, &i("email"), &cs(&["email"])).await?;

    let schema = RecordSchema::new(table_name)
        .keys(&["name", "age", "created_at", "updated_at"])
        .uniq_keys(&["email"])
        .json_keys(&["data"]);

    // insert through save; created_at stamped automatically
    let id = schema
        .save(
            &client,
            rec(json!({
                "email": "a@example.com",
                "name": "alice",
                "age": 30,
                "data": {"role": "admin"},
            })),
            SaveOptions::new(),
        )
        .await?;
    assert!(id > 0);

    let row = schema
        .get(&client, Get::by_id(id))
        .await?
        .expect("inserted row");
    assert_eq!(row.get("name"), Some(&json!("alice")));
    assert!(row.get("created_at").and_then(Json::as_i64).is_some());

    // lookup by unique key, popup hoists data
    let row = schema
        .get(
            &client,
            Get::new().value("email", "a@example.com").popup(),
        )
        .await?
        .expect("row by email");
    assert_eq!(row.get("role"), Some(&json!("admin")));

    // update merges json and stamps updated_at
    let same_id = schema
        .save(
            &client,
            rec(json!({
                "email": "a@example.com",
                "age": 31,
                "data": {"team": "core"},
            })),
            SaveOptions::new(),
        )
        .await?;
    assert_eq!(same_id, id);

    let row = schema.get(&client, Get::by_id(id)).await?.expect("row");
    assert_eq!(row.get("age"), Some(&json!(31)));
    assert_eq!(
        row.get("data"),
        Some(&json!({"role": "admin", "team": "core"}))
    );
    assert!(row.get("updated_at").and_then(Json::as_i64).is_some());

    // a second record, then a unique-value collision on update
    let other_id = schema
        .save(
            &client,
            rec(json!({"email": "b@example.com", "name": "bob"})),
            SaveOptions::new(),
        )
        .await?;
    let err = schema
        .save(
            &client,
            rec(json!({"email": "a@example.com"})),
            SaveOptions::new().id(other_id),
        )
        .await
        .expect_err("unique collision");
    assert!(err.is_unique_conflict());

    // list with suffixed filters; default sort is id desc
    let rows = schema
        .list(&client, ListQuery::new().filter_kv("age_gte", 18))
        .await?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&json!("alice")));

    let n = schema.count(&client, ListQuery::new()).await?;
    assert_eq!(n, 2);

    // an empty IN list matches nothing without touching the database
    let rows = schema
        .list(&client, ListQuery::new().filter_kv("id", json!([])))
        .await?;
    assert!(rows.is_empty());

    // json-path filter over the data column
    let rows = schema
        .list(&client, ListQuery::new().filter_kv("data.team", "core"))
        .await?;
    assert_eq!(rows.len(), 1);

    // remove by unique key
    let removed = schema
        .remove(
            &client,
            Get::new().value("email", "b@example.com"),
            None,
        )
        .await?;
    assert!(removed);
    assert_eq!(schema.count(&client, ListQuery::new()).await?, 1);

    // removing a key that matches nothing reports false and deletes nothing
    let removed = schema
        .remove(
            &client,
            Get::new().value("email", "nobody@example.com"),
            None,
        )
        .await?;
    assert!(!removed);
    assert_eq!(schema.count(&client, ListQuery::new()).await?, 1);

    ops::drop_table(&client, &table).await?;
    connector.close().await;
    Ok(())
}
