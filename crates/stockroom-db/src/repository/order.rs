//! # Order Repository
//!
//! The order aggregate: an order header and its lines.
//!
//! ## Totals
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  order_items row                       OrderItemView                    │
//! │  quantity = 3          ──────────►     unit_price = Money(1099)         │
//! │  unit_price_minor = 1099               line_total = Money(3297)         │
//! │                                                                         │
//! │  OrderView.total = Σ line_total   (integer minor units throughout)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Orders have no natural name, so there is no duplicate check. The
//! counterparty and every product must exist when the order is written.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::localization::{named_ref, TranslatedKind};
use crate::repository::{clean_opt, delete_root, plain_ref, require_currency, require_row, touch_root};
use stockroom_core::{Money, OrderItemView, OrderRequest, OrderStatus, OrderView};

const TABLE: &str = "orders";
const ENTITY: &str = "order";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    counterparty_id: i64,
    status: OrderStatus,
    currency_code: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    product_id: i64,
    quantity: i64,
    unit_price_minor: i64,
}

/// Repository for the order aggregate.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Loads one order with product names resolved for `lang`.
    pub async fn get(&self, id: i64, lang: &str) -> DbResult<Option<OrderView>> {
        debug!(id = id, lang = %lang, "Loading order");
        let mut tx = self.pool.begin().await?;
        let view = load(&mut tx, id, lang).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Loads every order, newest id last.
    pub async fn list(&self, lang: &str) -> DbResult<Vec<OrderView>> {
        let mut tx = self.pool.begin().await?;
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM orders ORDER BY id")
            .fetch_all(&mut *tx)
            .await?;

        let mut views = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(view) = load(&mut tx, id, lang).await? {
                views.push(view);
            }
        }
        tx.commit().await?;
        Ok(views)
    }

    /// Creates an order with its lines.
    ///
    /// ## Errors
    /// * `Validation` - bad currency code, notes, quantity or price
    /// * `Integrity` - unknown counterparty, currency or product
    pub async fn create(&self, request: &OrderRequest) -> DbResult<i64> {
        self.create_in_tx(request)
            .await
            .inspect_err(|e| warn!(code = %e.code(), "Order create rejected"))
    }

    async fn create_in_tx(&self, request: &OrderRequest) -> DbResult<i64> {
        request.validate()?;

        let mut tx = self.pool.begin().await?;
        check_references(&mut tx, request).await?;

        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO orders (counterparty_id, status, currency_code, notes, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        )
        .bind(request.counterparty_id)
        .bind(request.status)
        .bind(&request.currency_code)
        .bind(clean_opt(request.notes.as_deref()))
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        insert_items(&mut tx, id, request).await?;
        tx.commit().await?;

        debug!(
            id = id,
            counterparty_id = request.counterparty_id,
            items = request.items.len(),
            "Order created"
        );
        Ok(id)
    }

    /// Replaces the header and every line.
    pub async fn replace(&self, id: i64, request: &OrderRequest) -> DbResult<()> {
        self.replace_in_tx(id, request)
            .await
            .inspect_err(|e| warn!(id = id, code = %e.code(), "Order replace rejected"))
    }

    async fn replace_in_tx(&self, id: i64, request: &OrderRequest) -> DbResult<()> {
        request.validate()?;

        let mut tx = self.pool.begin().await?;
        touch_root(&mut tx, TABLE, ENTITY, id).await?;
        check_references(&mut tx, request).await?;

        sqlx::query(
            "UPDATE orders SET counterparty_id = ?1, status = ?2, currency_code = ?3, notes = ?4 \
             WHERE id = ?5",
        )
        .bind(request.counterparty_id)
        .bind(request.status)
        .bind(&request.currency_code)
        .bind(clean_opt(request.notes.as_deref()))
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_items(&mut tx, id, request).await?;
        tx.commit().await?;

        debug!(id = id, status = ?request.status, "Order replaced");
        Ok(())
    }

    /// Deletes an order and its lines.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        delete_root(&mut tx, TABLE, ENTITY, id).await?;
        tx.commit().await?;

        debug!(id = id, "Order deleted");
        Ok(())
    }
}

async fn check_references(conn: &mut SqliteConnection, request: &OrderRequest) -> DbResult<()> {
    require_row(conn, "counterparties", "counterparty", request.counterparty_id).await?;
    require_currency(conn, &request.currency_code).await?;
    for item in &request.items {
        require_row(conn, "products", "product", item.product_id).await?;
    }
    Ok(())
}

async fn insert_items(
    conn: &mut SqliteConnection,
    order_id: i64,
    request: &OrderRequest,
) -> DbResult<()> {
    for item in &request.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, unit_price_minor) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.quantity)
        .bind(item.unit_price.minor())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn load(conn: &mut SqliteConnection, id: i64, lang: &str) -> DbResult<Option<OrderView>> {
    let row = sqlx::query_as::<_, OrderRow>(
        "SELECT id, counterparty_id, status, currency_code, notes, created_at, updated_at \
         FROM orders WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let counterparty = plain_ref(conn, "counterparties", "counterparty", row.counterparty_id).await?;

    let item_rows = sqlx::query_as::<_, ItemRow>(
        "SELECT id, product_id, quantity, unit_price_minor FROM order_items \
         WHERE order_id = ?1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let mut items = Vec::with_capacity(item_rows.len());
    for item in item_rows {
        let unit_price = Money::from_minor(item.unit_price_minor);
        let line_total = unit_price.checked_mul_quantity(item.quantity).ok_or_else(|| {
            DbError::Internal(format!("line total overflow on order item {}", item.id))
        })?;
        items.push(OrderItemView {
            id: item.id,
            product: named_ref(conn, TranslatedKind::Product, item.product_id, lang).await?,
            quantity: item.quantity,
            unit_price,
            line_total,
        });
    }
    let total = Money::checked_sum(items.iter().map(|i| i.line_total))
        .ok_or_else(|| DbError::Internal(format!("total overflow on order {}", id)))?;

    Ok(Some(OrderView {
        id: row.id,
        counterparty,
        status: row.status,
        currency_code: row.currency_code,
        notes: row.notes,
        items,
        total,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

// =============================================================================
// Unit Tests
// =============================================================================
