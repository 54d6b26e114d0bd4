use actix_web::error::ErrorBadRequest;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::mysql::MySqlArguments;
use sqlx::query::{Query, QueryAs, QueryScalar};
use sqlx::{MySql, MySqlPool};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone)]
pub enum SqlValue {
    String(String),
    U64(u64),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Instant(DateTime<Utc>),
    Null,
}

/// ===============================
/// Dynamic WHERE-clause builder
/// ===============================
///
/// Conditions are static SQL fragments with `?` placeholders; only values
/// travel through bindings. Shared by the paginated list endpoints.
#[derive(Debug, Default)]
pub struct Filters {
    conditions: Vec<String>,
    values: Vec<SqlValue>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// One condition with one `?` placeholder.
    pub fn push(&mut self, condition: &str, value: SqlValue) {
        self.conditions.push(condition.to_string());
        self.values.push(value);
    }

    /// A condition with no placeholder (`logout_at IS NULL` and the like).
    pub fn push_clause(&mut self, condition: &str) {
        self.conditions.push(condition.to_string());
    }

    /// An extra bind for the previous condition, for fragments with more
    /// than one `?` (LIKE over several columns).
    pub fn push_value(&mut self, value: SqlValue) {
        self.values.push(value);
    }

    /// `WHERE a AND b ...`, or empty when no filter was set.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }
}

pub fn bind_values<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    values: &[SqlValue],
) -> Query<'q, MySql, MySqlArguments> {
    for value in values {
        query = match value.clone() {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Instant(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }
    query
}

pub fn bind_values_as<'q, T>(
    mut query: QueryAs<'q, MySql, T, MySqlArguments>,
    values: &[SqlValue],
) -> QueryAs<'q, MySql, T, MySqlArguments> {
    for value in values {
        query = match value.clone() {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Instant(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }
    query
}

pub fn bind_values_scalar<'q, S>(
    mut query: QueryScalar<'q, MySql, S, MySqlArguments>,
    values: &[SqlValue],
) -> QueryScalar<'q, MySql, S, MySqlArguments> {
    for value in values {
        query = match value.clone() {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Instant(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }
    query
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Column names come from the caller's whitelist, never from the payload;
/// a payload key outside `allowed` is a bad request.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed: &[&str],
    id_column: &str,
    id_value: u64,
) -> Result<SqlUpdate, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    for key in obj.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ErrorBadRequest(format!("Unknown field: {}", key)));
        }
    }

    // Build SET clause
    let set_clause = obj
        .keys()
        .map(|k| format!("{} = ?", k))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table, set_clause, id_column
    );

    let mut values = Vec::with_capacity(obj.len() + 1);

    // Convert JSON values → SqlValue
    for value in obj.values() {
        match value {
            Value::String(s) => {
                if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    values.push(SqlValue::Date(d));
                } else if let Ok(dt) =
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                {
                    values.push(SqlValue::DateTime(dt));
                } else {
                    values.push(SqlValue::String(s.clone()));
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    values.push(SqlValue::I64(i));
                } else if let Some(f) = n.as_f64() {
                    values.push(SqlValue::F64(f));
                }
            }
            Value::Bool(b) => values.push(SqlValue::Bool(*b)),
            Value::Null => values.push(SqlValue::Null),
            _ => return Err(ErrorBadRequest("Unsupported JSON value type")),
        }
    }

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(
    pool: &MySqlPool,
    update: SqlUpdate,
) -> Result<u64, sqlx::Error> {
    let query = bind_values(sqlx::query(&update.sql), &update.values);
    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filters_compose_a_where_clause_in_order() {
        let mut filters = Filters::new();
        assert_eq!(filters.where_clause(), "");

        filters.push("user_id = ?", SqlValue::U64(7));
        filters.push_clause("logout_at IS NULL");
        assert_eq!(
            filters.where_clause(),
            "WHERE user_id = ? AND logout_at IS NULL"
        );
        assert_eq!(filters.values().len(), 1);
    }

    #[test]
    fn update_builder_rejects_fields_outside_the_whitelist() {
        let payload = json!({"name": "Ada", "role": 1});
        let err = build_update_sql("users", &payload, &["name"], "id", 1).unwrap_err();
        assert!(err.to_string().contains("Unknown field: role"));
    }

    #[test]
    fn update_builder_binds_dates_and_ids() {
        let payload = json!({"department": "Platform", "hired_on": "2025-10-01"});
        let update = build_update_sql(
            "users",
            &payload,
            &["department", "hired_on"],
            "id",
            42,
        )
        .unwrap();
        assert!(update.sql.starts_with("UPDATE users SET "));
        assert!(update.sql.ends_with("WHERE id = ?"));
        assert_eq!(update.values.len(), 3);
        assert!(matches!(update.values.last(), Some(SqlValue::U64(42))));
        assert!(update
            .values
            .iter()
            .any(|v| matches!(v, SqlValue::Date(d) if d.to_string() == "2025-10-01")));
    }

    #[test]
    fn update_builder_requires_a_non_empty_object() {
        assert!(build_update_sql("users", &json!({}), &["name"], "id", 1).is_err());
        assert!(build_update_sql("users", &json!([1, 2]), &["name"], "id", 1).is_err());
    }
}
