//! # Repository Module
//!
//! Aggregate repositories for Stockroom.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Aggregate Repositories                               │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.counterparties().replace(id, &request)                     │
//! │       ▼                                                                 │
//! │  CounterpartyRepository                                                │
//! │  ├── get(&self, id, lang)         read transaction, one snapshot       │
//! │  ├── list(&self, lang)                                                 │
//! │  ├── create(&self, request)       validate → tx → insert tree          │
//! │  ├── replace(&self, id, request)  validate → tx → delete + reinsert    │
//! │  ├── patch_address(...)           validate → tx → UPDATE named fields  │
//! │  └── delete(&self, id)            children go by ON DELETE CASCADE     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Writers: Pending → Validating → Rejected                              │
//! │                               └→ Persisting → Committed | RolledBack   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every writer transaction starts by touching the root row
//! (`UPDATE ... SET updated_at`), which takes SQLite's write lock. Two
//! writers on the same root therefore run one after the other.
//!
//! ## Available Repositories
//!
//! - [`CounterpartyRepository`] - counterparties, addresses, representatives
//! - [`CategoryRepository`] - categories and subcategories
//! - [`ProductRepository`] - products with codes, images, stock, suppliers
//! - [`OrderRepository`] - orders and order lines
//! - [`DictionaryRepository`] - languages, currencies, countries, cities, warehouses

pub mod category;
pub mod counterparty;
pub mod dictionary;
pub mod order;
pub mod product;

pub use category::CategoryRepository;
pub use counterparty::CounterpartyRepository;
pub use dictionary::DictionaryRepository;
pub use order::OrderRepository;
pub use product::ProductRepository;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::error::{DbError, DbResult};
use stockroom_core::integrity::{check_city_in_country, require_reference};
use stockroom_core::{CurrencyView, IntegrityViolation, NamedRef};

/// Bumps `updated_at` on a root row.
///
/// First statement of every update transaction. Returns `NotFound` when
/// no row has that id.
pub(crate) async fn touch_root(
    conn: &mut SqliteConnection,
    table: &str,
    entity: &str,
    id: i64,
) -> DbResult<DateTime<Utc>> {
    let now = Utc::now();
    let sql = format!("UPDATE {} SET updated_at = ?1 WHERE id = ?2", table);
    let result = sqlx::query(&sql).bind(now).bind(id).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found(entity, id));
    }
    Ok(now)
}

/// Deletes a root row; children go with it.
pub(crate) async fn delete_root(
    conn: &mut SqliteConnection,
    table: &str,
    entity: &str,
    id: i64,
) -> DbResult<()> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", table);
    let result = sqlx::query(&sql).bind(id).execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Err(DbError::not_found(entity, id));
    }
    Ok(())
}

pub(crate) async fn row_exists(conn: &mut SqliteConnection, table: &str, id: i64) -> DbResult<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table);
    let exists: i64 = sqlx::query_scalar(&sql).bind(id).fetch_one(&mut *conn).await?;
    Ok(exists != 0)
}

/// Fails with `<entity>_unknown` when `table` has no row `id`.
pub(crate) async fn require_row(
    conn: &mut SqliteConnection,
    table: &str,
    entity: &str,
    id: i64,
) -> DbResult<()> {
    let exists = row_exists(conn, table, id).await?;
    require_reference(entity, id, exists)?;
    Ok(())
}

pub(crate) async fn require_currency(conn: &mut SqliteConnection, code: &str) -> DbResult<()> {
    let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM currencies WHERE code = ?1)")
        .bind(code)
        .fetch_one(&mut *conn)
        .await?;
    if exists == 0 {
        return Err(IntegrityViolation::new(
            "currency_unknown",
            format!("Unknown currency {}", code),
        )
        .into());
    }
    Ok(())
}

pub(crate) async fn require_language(conn: &mut SqliteConnection, code: &str) -> DbResult<()> {
    let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM languages WHERE code = ?1)")
        .bind(code)
        .fetch_one(&mut *conn)
        .await?;
    if exists == 0 {
        return Err(IntegrityViolation::new(
            "language_unknown",
            format!("Unknown language {}", code),
        )
        .into());
    }
    Ok(())
}

/// Country stored on a city row, `None` if the city doesn't exist.
pub(crate) async fn city_country(conn: &mut SqliteConnection, city_id: i64) -> DbResult<Option<i64>> {
    let country: Option<i64> = sqlx::query_scalar("SELECT country_id FROM cities WHERE id = ?1")
        .bind(city_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(country)
}

/// Checks that an address's city lies in its country.
pub(crate) async fn check_place(
    conn: &mut SqliteConnection,
    country_id: i64,
    city_id: i64,
) -> DbResult<()> {
    let actual = city_country(conn, city_id).await?;
    check_city_in_country(city_id, actual, country_id)?;
    Ok(())
}

/// Reference to an entity without translations (counterparty, warehouse).
pub(crate) async fn plain_ref(
    conn: &mut SqliteConnection,
    table: &str,
    entity: &str,
    id: i64,
) -> DbResult<NamedRef> {
    let sql = format!("SELECT name FROM {} WHERE id = ?1", table);
    let name: String = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found(entity, id))?;
    Ok(NamedRef {
        id,
        display_name: name.clone(),
        name,
        translations: Vec::new(),
    })
}

pub(crate) async fn find_currency(
    conn: &mut SqliteConnection,
    code: &str,
) -> DbResult<Option<CurrencyView>> {
    let row: Option<(String, String, String, i64)> =
        sqlx::query_as("SELECT code, name, symbol, minor_units FROM currencies WHERE code = ?1")
            .bind(code)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(row.map(|(code, name, symbol, minor_units)| CurrencyView {
        code,
        name,
        symbol,
        minor_units: u32::try_from(minor_units).unwrap_or(0),
    }))
}

/// Currency of a stored row; the foreign key guarantees it exists.
pub(crate) async fn currency_view(conn: &mut SqliteConnection, code: &str) -> DbResult<CurrencyView> {
    find_currency(conn, code)
        .await?
        .ok_or_else(|| DbError::Internal(format!("currency {} referenced but missing", code)))
}

/// Fails with `<entity>_in_use` when `table.column` still references `id`.
///
/// Guards deletes of roots that other aggregates point at without a
/// cascade (orders keep their counterparty and products).
pub(crate) async fn require_unreferenced(
    conn: &mut SqliteConnection,
    table: &str,
    column: &str,
    entity: &str,
    id: i64,
) -> DbResult<()> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?1", table, column);
    let count: i64 = sqlx::query_scalar(&sql).bind(id).fetch_one(&mut *conn).await?;
    if count > 0 {
        return Err(IntegrityViolation::new(
            format!("{}_in_use", entity),
            format!("{} {} is referenced by {} row(s) in {}", entity, id, count, table),
        )
        .with(format!("{}_id", entity), id)
        .into());
    }
    Ok(())
}

// =============================================================================
// Partial Updates
// =============================================================================

/// New value for one column of a patched child row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ColumnValue {
    Text(Option<String>),
    Int(i64),
}

/// Updates the named columns of one child row owned by `owner_id`.
///
/// Builds `UPDATE <table> SET a = ?, b = ? WHERE id = ? AND <owner> = ?`
/// with only the given columns. Returns the number of rows touched.
pub(crate) async fn update_columns(
    conn: &mut SqliteConnection,
    table: &str,
    owner_column: &str,
    id: i64,
    owner_id: i64,
    columns: Vec<(&'static str, ColumnValue)>,
) -> DbResult<u64> {
    if columns.is_empty() {
        return Ok(0);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", table));
    for (i, (column, value)) in columns.into_iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(column).push(" = ");
        match value {
            ColumnValue::Text(v) => {
                qb.push_bind(v);
            }
            ColumnValue::Int(v) => {
                qb.push_bind(v);
            }
        }
    }
    qb.push(" WHERE id = ")
        .push_bind(id)
        .push(format!(" AND {} = ", owner_column))
        .push_bind(owner_id);

    let result = qb.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

/// Turns patch text fields into column assignments (trimmed, blank → NULL).
pub(crate) fn text_columns(fields: Vec<(&'static str, Option<&str>)>) -> Vec<(&'static str, ColumnValue)> {
    fields
        .into_iter()
        .map(|(column, value)| (column, ColumnValue::Text(clean_opt(value))))
        .collect()
}

/// Trims a free-text value before storage.
pub(crate) fn clean(value: &str) -> String {
    value.trim().to_string()
}

/// Trims an optional free-text value; blank becomes `None`.
pub(crate) fn clean_opt(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
