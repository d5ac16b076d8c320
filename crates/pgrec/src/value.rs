//! Dynamic bind values.
//!
//! Filter values and record fields arrive as JSON; [`Value`] is the closed
//! set of scalar shapes we bind through the driver. The `ToSql` impl
//! delegates to the concrete type, widening integers to the column's
//! declared width where the driver requires it.

use bytes::BytesMut;
use serde_json::Value as Json;
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

/// A dynamically typed SQL bind value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Bound as `json`/`jsonb`.
    Json(Json),
}

impl Value {
    /// Convert a JSON value into a bind value.
    ///
    /// Arrays and objects bind as `jsonb`; scalars bind as their native
    /// type. Numbers that do not fit `i64` fall back to `f64`.
    pub fn from_json(value: &Json) -> Value {
        match value {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            Json::String(s) => Value::Text(s.clone()),
            other => Value::Json(other.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql(ty, out),
            Value::Int(v) => {
                if *ty == Type::INT2 {
                    (*v as i16).to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    (*v as i32).to_sql(ty, out)
                } else if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*v as f64).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            Value::Text(s) => s.to_sql(ty, out),
            Value::Json(j) => j.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // Dynamic dispatch: mismatches surface from the delegated impl.
        true
    }

    to_sql_checked!();
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Json> for Value {
    fn from(v: Json) -> Self {
        Value::from_json(&v)
    }
}

/// Infer a cast type name for a JSON-path projection from the filter value.
///
/// Mirrors the dynamic inference used for `col#>>'{path}'` expressions:
/// booleans (including the strings `"true"`/`"false"`), integers and
/// floats (including numeric strings) get an explicit cast; everything
/// else compares as text.
pub fn guess_type(value: &Json) -> Option<&'static str> {
    match value {
        Json::Bool(_) => Some("boolean"),
        Json::Number(n) => {
            if n.is_i64() || n.is_u64() {
                Some("int")
            } else {
                Some("float")
            }
        }
        Json::String(s) => {
            let lower = s.to_ascii_lowercase();
            if lower == "true" || lower == "false" {
                return Some("boolean");
            }
            if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                return Some("int");
            }
            let mut dots = 0;
            let numeric = !s.is_empty()
                && s.chars().all(|c| {
                    if c == '.' {
                        dots += 1;
                        true
                    } else {
                        c.is_ascii_digit()
                    }
                });
            if numeric && dots == 1 {
                return Some("float");
            }
            None
        }
        _ => None,
    }
}
