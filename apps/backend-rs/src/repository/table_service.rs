//! Generic row helpers for the Postgres store. Rows travel as JSON objects
//! (`row_to_json` on the way out, `jsonb_populate_record` on the way in), so
//! column types are resolved by the table definition.

use serde_json::{Map, Value};
use sqlx::{postgres::PgRow, PgConnection, Postgres, QueryBuilder, Row};

use super::{StoreError, StoreResult};

const ALLOWED_TABLES: &[&str] = &["villas", "leads", "reviews"];
const MAX_ROWS: i64 = 5000;

pub async fn list_rows(
    pool: &sqlx::PgPool,
    table: &str,
    filters: Option<&Map<String, Value>>,
    order_by: &str,
    ascending: bool,
) -> StoreResult<Vec<Value>> {
    let mut query = list_query(table, filters, order_by, ascending)?;
    let rows = query.build().fetch_all(pool).await.map_err(map_db_error)?;
    Ok(read_rows(rows))
}

pub async fn get_row(
    pool: &sqlx::PgPool,
    table: &'static str,
    row_id: &str,
) -> StoreResult<Value> {
    let mut query = select_query(table, row_id, false)?;
    let row = query
        .build()
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .ok_or_else(|| StoreError::not_found(table, row_id))
}

/// Reads one row and holds a row lock on it until the transaction ends.
pub async fn lock_row_tx(
    conn: &mut PgConnection,
    table: &'static str,
    row_id: &str,
) -> StoreResult<Value> {
    let mut query = select_query(table, row_id, true)?;
    let row = query
        .build()
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .ok_or_else(|| StoreError::not_found(table, row_id))
}

pub async fn create_row(
    pool: &sqlx::PgPool,
    table: &str,
    payload: &Map<String, Value>,
) -> StoreResult<Value> {
    let mut query = insert_query(table, payload)?;
    let row = query
        .build()
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .ok_or_else(|| StoreError::Invalid(format!("Could not create {table} record.")))
}

pub async fn update_row(
    pool: &sqlx::PgPool,
    table: &'static str,
    row_id: &str,
    payload: &Map<String, Value>,
) -> StoreResult<Value> {
    let mut query = update_query(table, row_id, payload)?;
    let row = query
        .build()
        .fetch_optional(pool)
        .await
        .map_err(map_db_error)?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .ok_or_else(|| StoreError::not_found(table, row_id))
}

pub async fn update_row_tx(
    conn: &mut PgConnection,
    table: &'static str,
    row_id: &str,
    payload: &Map<String, Value>,
) -> StoreResult<Value> {
    let mut query = update_query(table, row_id, payload)?;
    let row = query
        .build()
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_db_error)?;

    row.and_then(|value| value.try_get::<Option<Value>, _>("row").ok().flatten())
        .ok_or_else(|| StoreError::not_found(table, row_id))
}

pub async fn delete_row(pool: &sqlx::PgPool, table: &'static str, row_id: &str) -> StoreResult<()> {
    let mut query = delete_query(table, row_id)?;
    let result = query.build().execute(pool).await.map_err(map_db_error)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found(table, row_id));
    }
    Ok(())
}

pub async fn delete_row_tx(
    conn: &mut PgConnection,
    table: &'static str,
    row_id: &str,
) -> StoreResult<()> {
    let mut query = delete_query(table, row_id)?;
    let result = query
        .build()
        .execute(&mut *conn)
        .await
        .map_err(map_db_error)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::not_found(table, row_id));
    }
    Ok(())
}

fn select_query(
    table: &str,
    row_id: &str,
    for_update: bool,
) -> StoreResult<QueryBuilder<'static, Postgres>> {
    let table_name = validate_table(table)?;

    let mut query = QueryBuilder::<Postgres>::new("SELECT row_to_json(t) AS row FROM ");
    query
        .push(table_name)
        .push(" t WHERE t.id = ")
        .push_bind(row_id.to_string())
        .push(" LIMIT 1");
    if for_update {
        query.push(" FOR UPDATE");
    }
    Ok(query)
}

fn delete_query(table: &str, row_id: &str) -> StoreResult<QueryBuilder<'static, Postgres>> {
    let table_name = validate_table(table)?;

    let mut query = QueryBuilder::<Postgres>::new("DELETE FROM ");
    query
        .push(table_name)
        .push(" t WHERE t.id = ")
        .push_bind(row_id.to_string());
    Ok(query)
}

fn list_query(
    table: &str,
    filters: Option<&Map<String, Value>>,
    order_by: &str,
    ascending: bool,
) -> StoreResult<QueryBuilder<'static, Postgres>> {
    let table_name = validate_table(table)?;
    let order_name = if order_by.trim().is_empty() {
        "created_at"
    } else {
        validate_identifier(order_by)?
    };

    let mut query = QueryBuilder::<Postgres>::new("SELECT row_to_json(t) AS row FROM ");
    query.push(table_name).push(" t WHERE 1=1");

    if let Some(filter_map) = filters {
        for (key, value) in filter_map {
            push_filter_clause(&mut query, key, value)?;
        }
    }

    query.push(" ORDER BY t.").push(order_name);
    query.push(if ascending { " ASC" } else { " DESC" });
    // Ties on the sort column still come back in a fixed order.
    query.push(", t.id ASC");
    query.push(" LIMIT ").push_bind(MAX_ROWS);
    Ok(query)
}

fn insert_query(
    table: &str,
    payload: &Map<String, Value>,
) -> StoreResult<QueryBuilder<'static, Postgres>> {
    let table_name = validate_table(table)?;
    if payload.is_empty() {
        return Err(StoreError::Invalid(format!(
            "Could not create {table_name} record."
        )));
    }
    let keys = sorted_keys(payload)?;

    let mut query = QueryBuilder::<Postgres>::new("INSERT INTO ");
    query.push(table_name).push(" (");
    {
        let mut separated = query.separated(", ");
        for key in &keys {
            separated.push(key.as_str());
        }
    }
    query.push(") SELECT ");
    {
        let mut separated = query.separated(", ");
        for key in &keys {
            separated.push("r.");
            separated.push_unseparated(key.as_str());
        }
    }
    query
        .push(" FROM jsonb_populate_record(NULL::")
        .push(table_name)
        .push(", ");
    query.push_bind(Value::Object(payload.clone()));
    query
        .push(") r RETURNING row_to_json(")
        .push(table_name)
        .push(".*) AS row");
    Ok(query)
}

fn update_query(
    table: &str,
    row_id: &str,
    payload: &Map<String, Value>,
) -> StoreResult<QueryBuilder<'static, Postgres>> {
    let table_name = validate_table(table)?;
    if payload.is_empty() {
        return Err(StoreError::Invalid("No fields to update.".to_string()));
    }
    let keys = sorted_keys(payload)?;

    let mut query = QueryBuilder::<Postgres>::new("UPDATE ");
    query.push(table_name).push(" t SET ");
    {
        let mut separated = query.separated(", ");
        for key in &keys {
            separated.push(key.as_str());
            separated.push_unseparated(" = r.");
            separated.push_unseparated(key.as_str());
        }
    }
    query
        .push(" FROM jsonb_populate_record(NULL::")
        .push(table_name)
        .push(", ");
    query.push_bind(Value::Object(payload.clone()));
    query
        .push(") r WHERE t.id = ")
        .push_bind(row_id.to_string())
        .push(" RETURNING row_to_json(t) AS row");
    Ok(query)
}

fn sorted_keys(payload: &Map<String, Value>) -> StoreResult<Vec<String>> {
    let mut keys = payload.keys().cloned().collect::<Vec<_>>();
    keys.sort_unstable();
    for key in &keys {
        validate_identifier(key)?;
    }
    Ok(keys)
}

fn push_filter_clause(
    query: &mut QueryBuilder<'static, Postgres>,
    key: &str,
    value: &Value,
) -> StoreResult<()> {
    let column = validate_identifier(key)?;
    query.push(" AND t.").push(column).push(" = ");
    match value {
        Value::String(text) => {
            query.push_bind(text.clone());
        }
        Value::Bool(flag) => {
            query.push_bind(*flag);
        }
        Value::Number(number) if number.as_i64().is_some() => {
            query.push_bind(number.as_i64().unwrap_or_default());
        }
        _ => {
            return Err(StoreError::Invalid(format!(
                "Unsupported filter value for '{column}'."
            )))
        }
    }
    Ok(())
}

fn read_rows(rows: Vec<PgRow>) -> Vec<Value> {
    rows.into_iter()
        .filter_map(|row| row.try_get::<Option<Value>, _>("row").ok().flatten())
        .collect()
}

fn validate_table(table: &str) -> StoreResult<&str> {
    let normalized = validate_identifier(table)?;
    if ALLOWED_TABLES.contains(&normalized) {
        return Ok(normalized);
    }
    Err(StoreError::Invalid(format!(
        "Table '{normalized}' is not allowed."
    )))
}

fn validate_identifier(identifier: &str) -> StoreResult<&str> {
    let trimmed = identifier.trim();
    let valid = !trimmed.is_empty()
        && trimmed.chars().all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        })
        && !trimmed
            .chars()
            .next()
            .is_some_and(|first| first.is_ascii_digit());
    if !valid {
        return Err(StoreError::Invalid(format!(
            "Invalid identifier '{trimmed}'."
        )));
    }
    Ok(trimmed)
}

fn map_db_error(error: sqlx::Error) -> StoreError {
    let code = error
        .as_database_error()
        .and_then(|db_error| db_error.code())
        .map(|code| code.into_owned());

    match code.as_deref() {
        Some("23505") => {
            StoreError::Conflict("Duplicate value violates a unique constraint.".to_string())
        }
        // Only villas are referenced by other tables.
        Some("23503") => StoreError::not_found("villas", ""),
        Some("23514") => StoreError::Invalid("Value violates a check constraint.".to_string()),
        _ => {
            tracing::error!(db_error = %error, "Database query failed");
            StoreError::Database(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::{
        delete_query, insert_query, list_query, select_query, update_query, validate_identifier,
        validate_table,
    };

    fn payload(entries: Value) -> Map<String, Value> {
        entries.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn rejects_unknown_tables_and_identifiers() {
        assert!(validate_table("villas").is_ok());
        assert!(validate_table("organizations").is_err());
        assert!(validate_identifier("rating_count").is_ok());
        assert!(validate_identifier("price; DROP TABLE villas").is_err());
        assert!(validate_identifier("1st").is_err());
        assert!(validate_identifier("").is_err());
    }

    #[test]
    fn list_sql_applies_filters_and_order() {
        let filters = payload(json!({ "approved": true, "villa_id": "v1" }));
        let query = list_query("reviews", Some(&filters), "created_at", false).expect("query");
        let sql = query.sql();
        assert!(
            sql.starts_with("SELECT row_to_json(t) AS row FROM reviews t WHERE 1=1"),
            "unexpected SQL: {sql}"
        );
        assert!(sql.contains("AND t.approved = $1"), "unexpected SQL: {sql}");
        assert!(sql.contains("AND t.villa_id = $2"), "unexpected SQL: {sql}");
        assert!(
            sql.contains("ORDER BY t.created_at DESC, t.id ASC LIMIT $3"),
            "unexpected SQL: {sql}"
        );
    }

    #[test]
    fn list_sql_rejects_nested_filter_values() {
        let filters = payload(json!({ "images": ["a"] }));
        assert!(list_query("villas", Some(&filters), "", true).is_err());
    }

    #[test]
    fn insert_sql_uses_jsonb_populate_record() {
        let row = payload(json!({ "name": "Casa", "id": "v1", "price": 100 }));
        let query = insert_query("villas", &row).expect("query");
        let sql = query.sql();
        assert!(
            sql.contains("INSERT INTO villas (id, name, price) SELECT r.id, r.name, r.price"),
            "unexpected SQL: {sql}"
        );
        assert!(
            sql.contains("jsonb_populate_record(NULL::villas"),
            "unexpected SQL: {sql}"
        );
        assert!(insert_query("villas", &Map::new()).is_err());
    }

    #[test]
    fn update_sql_sets_columns_from_record() {
        let patch = payload(json!({ "status": "booked", "updated_at": "2026-10-17T00:00:00Z" }));
        let query = update_query("leads", "l1", &patch).expect("query");
        let sql = query.sql();
        assert!(
            sql.contains("UPDATE leads t SET status = r.status, updated_at = r.updated_at"),
            "unexpected SQL: {sql}"
        );
        assert!(sql.contains("WHERE t.id = $2"), "unexpected SQL: {sql}");
        assert!(update_query("leads", "l1", &Map::new()).is_err());
    }

    #[test]
    fn list_sql_breaks_ties_by_id() {
        let query = list_query("villas", None, "created_at", true).expect("query");
        let sql = query.sql();
        assert!(
            sql.contains("ORDER BY t.created_at ASC, t.id ASC"),
            "unexpected SQL: {sql}"
        );
    }

    #[test]
    fn locking_select_adds_for_update() {
        let plain = select_query("reviews", "r1", false).expect("query");
        assert!(!plain.sql().contains("FOR UPDATE"), "unexpected SQL: {}", plain.sql());

        let locked = select_query("reviews", "r1", true).expect("query");
        assert!(
            locked
                .sql()
                .ends_with("FROM reviews t WHERE t.id = $1 LIMIT 1 FOR UPDATE"),
            "unexpected SQL: {}",
            locked.sql()
        );

        let delete = delete_query("reviews", "r1").expect("query");
        assert_eq!(delete.sql(), "DELETE FROM reviews t WHERE t.id = $1");
    }
}
