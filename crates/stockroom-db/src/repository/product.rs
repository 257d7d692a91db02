//! # Product Repository
//!
//! The product aggregate: the product row with its translations, codes,
//! images, links, per-warehouse stock and supplier prices.
//!
//! ## Aggregate Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products (root) ──► categories / subcategories (localized NamedRef)   │
//! │  │               ──► currencies                                        │
//! │  ├── product_translations   (name + description per language)          │
//! │  ├── product_codes          EAN / UPC / SKU / supplier code            │
//! │  ├── product_images         ordered by (position, id)                  │
//! │  ├── product_links                                                     │
//! │  ├── product_stock ───────► warehouses      total_stock = Σ quantity   │
//! │  └── product_suppliers ───► counterparties  purchase price (Money)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Prices are stored as integer minor units and surface as [`Money`].

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::localization::{named_ref, TranslatedKind};
use crate::repository::{
    clean, clean_opt, currency_view, delete_root, plain_ref, require_currency, require_language,
    require_row, require_unreferenced, touch_root,
};
use stockroom_core::integrity::check_subcategory_in_category;
use stockroom_core::{
    Money, ProductCodeView, ProductImageView, ProductLinkView, ProductRequest, ProductTranslation,
    ProductView, StockView, SupplierView,
};

const TABLE: &str = "products";
const ENTITY: &str = "product";

/// Child tables, all keyed by `product_id`.
const CHILD_TABLES: &[&str] = &[
    "product_translations",
    "product_codes",
    "product_images",
    "product_links",
    "product_stock",
    "product_suppliers",
];

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    description: Option<String>,
    category_id: Option<i64>,
    subcategory_id: Option<i64>,
    currency_code: String,
    price_minor: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    translated_name: Option<String>,
    translated_description: Option<String>,
}

/// Repository for the product aggregate.
///
/// ## Usage
/// ```rust,ignore
/// let id = db.products().create(&request).await?;
/// let view = db.products().get(id, "pl").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Loads one product aggregate with names resolved for `lang`.
    pub async fn get(&self, id: i64, lang: &str) -> DbResult<Option<ProductView>> {
        debug!(id = id, lang = %lang, "Loading product");
        let mut tx = self.pool.begin().await?;
        let view = load(&mut tx, id, lang).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Loads every product aggregate, ordered by id.
    pub async fn list(&self, lang: &str) -> DbResult<Vec<ProductView>> {
        let mut tx = self.pool.begin().await?;
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM products ORDER BY id")
            .fetch_all(&mut *tx)
            .await?;

        let mut views = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(view) = load(&mut tx, id, lang).await? {
                views.push(view);
            }
        }
        tx.commit().await?;

        debug!(count = views.len(), "Listed products");
        Ok(views)
    }

    /// Creates a product with all its children.
    ///
    /// ## Errors
    /// * `Validation` - field, price, quantity or translation rejected
    /// * `Conflict` - same name already used in the same category
    /// * `Integrity` - unknown currency, category, warehouse or supplier,
    ///   or subcategory outside the category
    pub async fn create(&self, request: &ProductRequest) -> DbResult<i64> {
        self.create_in_tx(request)
            .await
            .inspect_err(|e| warn!(code = %e.code(), "Product create rejected"))
    }

    async fn create_in_tx(&self, request: &ProductRequest) -> DbResult<i64> {
        request.validate()?;
        let name = clean(&request.name);

        let mut tx = self.pool.begin().await?;
        if let Some(existing_id) = find_duplicate(&mut tx, &name, request.category_id, None).await? {
            return Err(DbError::conflict(ENTITY, existing_id));
        }
        check_references(&mut tx, request).await?;

        let now = Utc::now();
        let id = sqlx::query(
            "INSERT INTO products (name, description, category_id, subcategory_id, currency_code, \
             price_minor, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        )
        .bind(&name)
        .bind(clean_opt(request.description.as_deref()))
        .bind(request.category_id)
        .bind(request.subcategory_id)
        .bind(&request.currency_code)
        .bind(request.price.minor())
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        insert_children(&mut tx, id, request).await?;
        tx.commit().await?;

        debug!(id = id, name = %name, price = %request.price, "Product created");
        Ok(id)
    }

    /// Replaces scalar fields and every child collection.
    pub async fn replace(&self, id: i64, request: &ProductRequest) -> DbResult<()> {
        self.replace_in_tx(id, request)
            .await
            .inspect_err(|e| warn!(id = id, code = %e.code(), "Product replace rejected"))
    }

    async fn replace_in_tx(&self, id: i64, request: &ProductRequest) -> DbResult<()> {
        request.validate()?;
        let name = clean(&request.name);

        let mut tx = self.pool.begin().await?;
        touch_root(&mut tx, TABLE, ENTITY, id).await?;
        if let Some(existing_id) =
            find_duplicate(&mut tx, &name, request.category_id, Some(id)).await?
        {
            return Err(DbError::conflict(ENTITY, existing_id));
        }
        check_references(&mut tx, request).await?;

        sqlx::query(
            "UPDATE products SET name = ?1, description = ?2, category_id = ?3, \
             subcategory_id = ?4, currency_code = ?5, price_minor = ?6 WHERE id = ?7",
        )
        .bind(&name)
        .bind(clean_opt(request.description.as_deref()))
        .bind(request.category_id)
        .bind(request.subcategory_id)
        .bind(&request.currency_code)
        .bind(request.price.minor())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        for table in CHILD_TABLES {
            let sql = format!("DELETE FROM {} WHERE product_id = ?1", table);
            sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        }
        insert_children(&mut tx, id, request).await?;
        tx.commit().await?;

        debug!(id = id, "Product replaced");
        Ok(())
    }

    /// Deletes a product and its children.
    ///
    /// Refused with `product_in_use` while order lines reference it.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        require_unreferenced(&mut tx, "order_items", "product_id", ENTITY, id).await?;
        delete_root(&mut tx, TABLE, ENTITY, id).await?;
        tx.commit().await?;

        debug!(id = id, "Product deleted");
        Ok(())
    }
}

// =============================================================================
// Write Helpers
// =============================================================================

/// Id of another product with the same name in the same category.
///
/// Products without a category share one scope (`IS` matches NULL).
async fn find_duplicate(
    conn: &mut SqliteConnection,
    name: &str,
    category_id: Option<i64>,
    exclude: Option<i64>,
) -> DbResult<Option<i64>> {
    let id = sqlx::query_scalar(
        "SELECT id FROM products WHERE name = ?1 COLLATE NOCASE AND category_id IS ?2 \
         AND (?3 IS NULL OR id <> ?3)",
    )
    .bind(name)
    .bind(category_id)
    .bind(exclude)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}

async fn check_references(conn: &mut SqliteConnection, request: &ProductRequest) -> DbResult<()> {
    require_currency(conn, &request.currency_code).await?;
    for translation in &request.translations {
        require_language(conn, &translation.language_code).await?;
    }

    if let Some(category_id) = request.category_id {
        require_row(conn, "categories", "category", category_id).await?;
    }
    if let Some(subcategory_id) = request.subcategory_id {
        let parent: Option<i64> =
            sqlx::query_scalar("SELECT category_id FROM subcategories WHERE id = ?1")
                .bind(subcategory_id)
                .fetch_optional(&mut *conn)
                .await?;
        check_subcategory_in_category(subcategory_id, parent, request.category_id)?;
    }
    for row in &request.stock {
        require_row(conn, "warehouses", "warehouse", row.warehouse_id).await?;
    }
    for supplier in &request.suppliers {
        require_row(conn, "counterparties", "counterparty", supplier.counterparty_id).await?;
    }
    Ok(())
}

async fn insert_children(
    conn: &mut SqliteConnection,
    product_id: i64,
    request: &ProductRequest,
) -> DbResult<()> {
    for t in &request.translations {
        sqlx::query(
            "INSERT INTO product_translations (product_id, language_code, name, description) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(product_id)
        .bind(&t.language_code)
        .bind(clean(&t.name))
        .bind(clean_opt(t.description.as_deref()))
        .execute(&mut *conn)
        .await?;
    }
    for code in &request.codes {
        sqlx::query("INSERT INTO product_codes (product_id, kind, code) VALUES (?1, ?2, ?3)")
            .bind(product_id)
            .bind(code.kind)
            .bind(clean(&code.code))
            .execute(&mut *conn)
            .await?;
    }
    for (index, image) in request.images.iter().enumerate() {
        // Without an explicit position, images keep request order.
        let position = image.position.unwrap_or(index as i64);
        sqlx::query("INSERT INTO product_images (product_id, url, position) VALUES (?1, ?2, ?3)")
            .bind(product_id)
            .bind(clean(&image.url))
            .bind(position)
            .execute(&mut *conn)
            .await?;
    }
    for link in &request.links {
        sqlx::query("INSERT INTO product_links (product_id, title, url) VALUES (?1, ?2, ?3)")
            .bind(product_id)
            .bind(clean_opt(link.title.as_deref()))
            .bind(clean(&link.url))
            .execute(&mut *conn)
            .await?;
    }
    for row in &request.stock {
        sqlx::query(
            "INSERT INTO product_stock (product_id, warehouse_id, quantity) VALUES (?1, ?2, ?3)",
        )
        .bind(product_id)
        .bind(row.warehouse_id)
        .bind(row.quantity)
        .execute(&mut *conn)
        .await?;
    }
    for supplier in &request.suppliers {
        sqlx::query(
            "INSERT INTO product_suppliers (product_id, counterparty_id, purchase_price_minor) \
             VALUES (?1, ?2, ?3)",
        )
        .bind(product_id)
        .bind(supplier.counterparty_id)
        .bind(supplier.purchase_price.minor())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Aggregate Assembly
// =============================================================================

async fn load(conn: &mut SqliteConnection, id: i64, lang: &str) -> DbResult<Option<ProductView>> {
    let row = sqlx::query_as::<_, ProductRow>(
        "SELECT p.id, p.name, p.description, p.category_id, p.subcategory_id, p.currency_code, \
                p.price_minor, p.created_at, p.updated_at, \
                t.name AS translated_name, t.description AS translated_description \
         FROM products p \
         LEFT JOIN product_translations t ON t.product_id = p.id AND t.language_code = ?2 \
         WHERE p.id = ?1",
    )
    .bind(id)
    .bind(lang)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let translations: Vec<ProductTranslation> = sqlx::query_as::<_, (String, String, Option<String>)>(
        "SELECT language_code, name, description FROM product_translations \
         WHERE product_id = ?1 ORDER BY language_code",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|(language_code, name, description)| ProductTranslation {
        language_code,
        name,
        description,
    })
    .collect();

    let category = match row.category_id {
        Some(category_id) => Some(named_ref(conn, TranslatedKind::Category, category_id, lang).await?),
        None => None,
    };
    let subcategory = match row.subcategory_id {
        Some(sub_id) => Some(named_ref(conn, TranslatedKind::Subcategory, sub_id, lang).await?),
        None => None,
    };
    let currency = currency_view(conn, &row.currency_code).await?;

    let codes = sqlx::query_as::<_, ProductCodeView>(
        "SELECT id, kind, code FROM product_codes WHERE product_id = ?1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let images = sqlx::query_as::<_, ProductImageView>(
        "SELECT id, url, position FROM product_images WHERE product_id = ?1 ORDER BY position, id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let links = sqlx::query_as::<_, ProductLinkView>(
        "SELECT id, title, url FROM product_links WHERE product_id = ?1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let stock_rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT warehouse_id, quantity FROM product_stock WHERE product_id = ?1 ORDER BY warehouse_id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    let mut stock = Vec::with_capacity(stock_rows.len());
    for (warehouse_id, quantity) in stock_rows {
        stock.push(StockView {
            warehouse: plain_ref(conn, "warehouses", "warehouse", warehouse_id).await?,
            quantity,
        });
    }
    let total_stock = stock.iter().map(|s| s.quantity).sum();

    let supplier_rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT counterparty_id, purchase_price_minor FROM product_suppliers \
         WHERE product_id = ?1 ORDER BY counterparty_id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    let mut suppliers = Vec::with_capacity(supplier_rows.len());
    for (counterparty_id, price_minor) in supplier_rows {
        suppliers.push(SupplierView {
            counterparty: plain_ref(conn, "counterparties", "counterparty", counterparty_id).await?,
            purchase_price: Money::from_minor(price_minor),
        });
    }

    let display_name = row.translated_name.clone().unwrap_or_else(|| row.name.clone());
    let display_description = row.translated_description.or_else(|| row.description.clone());

    Ok(Some(ProductView {
        id: row.id,
        name: row.name,
        display_name,
        description: row.description,
        display_description,
        translations,
        category,
        subcategory,
        currency,
        price: Money::from_minor(row.price_minor),
        codes,
        images,
        links,
        stock,
        total_stock,
        suppliers,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

// =============================================================================
// Unit Tests
// =============================================================================
