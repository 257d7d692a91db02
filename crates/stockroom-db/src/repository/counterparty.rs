//! # Counterparty Repository
//!
//! The counterparty aggregate: the root row plus addresses,
//! representatives, bank accounts, contacts and the products the
//! counterparty deals in.
//!
//! ## Aggregate Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  counterparties (root)                                                  │
//! │  ├── addresses ─────────► countries / cities (localized NamedRef)      │
//! │  ├── representatives                                                   │
//! │  ├── bank_accounts ─────► currencies                                   │
//! │  ├── contacts                                                          │
//! │  └── counterparty_products ► products (localized NamedRef)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Write Policies
//! - `replace`: delete every child row, insert the submitted ones. Child ids
//!   are regenerated.
//! - `patch_address` / `patch_representative`: update only the fields
//!   present in the patch, on a child that must belong to the stated root.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::localization::{named_ref, TranslatedKind};
use crate::repository::{
    check_place, clean, clean_opt, delete_root, require_currency, require_row,
    require_unreferenced, row_exists, text_columns, touch_root, update_columns, ColumnValue,
};
use stockroom_core::{
    AddressInput, AddressPatch, AddressView, BankAccountView, ContactView, CounterpartyKind,
    CounterpartyRequest, CounterpartyView, RepresentativeInput, RepresentativePatch,
    RepresentativeView,
};

const TABLE: &str = "counterparties";
const ENTITY: &str = "counterparty";

/// Child tables, all keyed by `counterparty_id`.
const CHILD_TABLES: &[&str] = &[
    "addresses",
    "representatives",
    "bank_accounts",
    "contacts",
    "counterparty_products",
];

#[derive(sqlx::FromRow)]
struct CounterpartyRow {
    id: i64,
    name: String,
    kind: CounterpartyKind,
    tax_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: i64,
    counterparty_id: i64,
    full_name: String,
    country_id: i64,
    city_id: i64,
    street: String,
    house: String,
    apartment: Option<String>,
    postal_code: String,
    phone: Option<String>,
}

/// Repository for the counterparty aggregate.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.counterparties();
/// let id = repo.create(&request).await?;
/// let view = repo.get(id, "pl").await?.expect("just created");
/// ```
#[derive(Debug, Clone)]
pub struct CounterpartyRepository {
    pool: SqlitePool,
}

impl CounterpartyRepository {
    /// Creates a new CounterpartyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CounterpartyRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Loads one counterparty aggregate with names resolved for `lang`.
    ///
    /// ## Returns
    /// * `Ok(Some(view))` - Counterparty found
    /// * `Ok(None)` - No counterparty with that id
    pub async fn get(&self, id: i64, lang: &str) -> DbResult<Option<CounterpartyView>> {
        debug!(id = id, lang = %lang, "Loading counterparty");
        let mut tx = self.pool.begin().await?;
        let view = load(&mut tx, id, lang).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Loads every counterparty aggregate, ordered by id.
    pub async fn list(&self, lang: &str) -> DbResult<Vec<CounterpartyView>> {
        let mut tx = self.pool.begin().await?;
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM counterparties ORDER BY id")
            .fetch_all(&mut *tx)
            .await?;

        let mut views = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(view) = load(&mut tx, id, lang).await? {
                views.push(view);
            }
        }
        tx.commit().await?;

        debug!(count = views.len(), "Listed counterparties");
        Ok(views)
    }

    /// Loads the address set of one counterparty.
    ///
    /// `Ok(None)` when the counterparty doesn't exist; an existing
    /// counterparty without addresses yields `Ok(Some(vec![]))`.
    pub async fn addresses(&self, id: i64, lang: &str) -> DbResult<Option<Vec<AddressView>>> {
        let mut tx = self.pool.begin().await?;
        if !row_exists(&mut tx, TABLE, id).await? {
            return Ok(None);
        }
        let addresses = load_addresses(&mut tx, id, lang).await?;
        tx.commit().await?;
        Ok(Some(addresses))
    }

    // =========================================================================
    // Create / Replace / Delete
    // =========================================================================

    /// Creates a counterparty with all its children in one transaction.
    ///
    /// ## Errors
    /// * `Validation` - a field failed its rule (nothing opened)
    /// * `Conflict` - a counterparty with that name exists
    /// * `Integrity` - unknown city/currency/product, or city not in country
    pub async fn create(&self, request: &CounterpartyRequest) -> DbResult<i64> {
        self.create_in_tx(request)
            .await
            .inspect_err(|e| warn!(code = %e.code(), "Counterparty create rejected"))
    }

    async fn create_in_tx(&self, request: &CounterpartyRequest) -> DbResult<i64> {
        request.validate()?;
        let name = clean(&request.name);

        let mut tx = self.pool.begin().await?;
        if let Some(existing_id) = find_duplicate(&mut tx, &name, None).await? {
            return Err(DbError::conflict(ENTITY, existing_id));
        }
        check_references(&mut tx, request).await?;

        let now = Utc::now();
        let inserted = sqlx::query(
            "INSERT INTO counterparties (name, kind, tax_number, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind(&name)
        .bind(request.kind)
        .bind(clean_opt(request.tax_number.as_deref()))
        .bind(now)
        .execute(&mut *tx)
        .await;
        let id = match inserted {
            Ok(done) => done.last_insert_rowid(),
            Err(e) => return Err(unique_as_conflict(&mut tx, e.into(), &name, None).await),
        };

        insert_children(&mut tx, id, request).await?;
        tx.commit().await?;

        debug!(
            id = id,
            addresses = request.addresses.len(),
            representatives = request.representatives.len(),
            "Counterparty created"
        );
        Ok(id)
    }

    /// Replaces the scalar fields and every child collection.
    ///
    /// All prior children are deleted and the submitted ones inserted; on
    /// any failure the previous state stays intact.
    pub async fn replace(&self, id: i64, request: &CounterpartyRequest) -> DbResult<()> {
        self.replace_in_tx(id, request)
            .await
            .inspect_err(|e| warn!(id = id, code = %e.code(), "Counterparty replace rejected"))
    }

    async fn replace_in_tx(&self, id: i64, request: &CounterpartyRequest) -> DbResult<()> {
        request.validate()?;
        let name = clean(&request.name);

        let mut tx = self.pool.begin().await?;
        touch_root(&mut tx, TABLE, ENTITY, id).await?;

        if let Some(existing_id) = find_duplicate(&mut tx, &name, Some(id)).await? {
            return Err(DbError::conflict(ENTITY, existing_id));
        }
        check_references(&mut tx, request).await?;

        let updated =
            sqlx::query("UPDATE counterparties SET name = ?1, kind = ?2, tax_number = ?3 WHERE id = ?4")
                .bind(&name)
                .bind(request.kind)
                .bind(clean_opt(request.tax_number.as_deref()))
                .bind(id)
                .execute(&mut *tx)
                .await;
        if let Err(e) = updated {
            return Err(unique_as_conflict(&mut tx, e.into(), &name, Some(id)).await);
        }

        for table in CHILD_TABLES {
            let sql = format!("DELETE FROM {} WHERE counterparty_id = ?1", table);
            sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        }
        insert_children(&mut tx, id, request).await?;
        tx.commit().await?;

        debug!(id = id, addresses = request.addresses.len(), "Counterparty replaced");
        Ok(())
    }

    /// Deletes a counterparty and, by cascade, all its children.
    ///
    /// Refused with `counterparty_in_use` while orders reference it.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        require_unreferenced(&mut tx, "orders", "counterparty_id", ENTITY, id).await?;
        delete_root(&mut tx, TABLE, ENTITY, id).await?;
        tx.commit().await?;

        debug!(id = id, "Counterparty deleted");
        Ok(())
    }

    // =========================================================================
    // Patch
    // =========================================================================

    /// Applies a partial update to one address, or adds a new one.
    ///
    /// With `address_id = Some(..)` only the fields present in `patch` are
    /// written; the address must belong to `counterparty_id`. With `None`
    /// the patch must carry every required field and a new address is
    /// inserted. Returns the address id.
    ///
    /// ## Flow
    /// ```text
    /// validate patch ──✗──► Validation (storage untouched)
    ///      │
    ///      ▼
    /// BEGIN → touch root ──✗──► NotFound(counterparty)
    ///      │
    ///      ▼
    /// load address under root ──✗──► NotFound(address)
    ///      │
    ///      ▼
    /// city ∈ country (effective values) ──✗──► Integrity
    ///      │
    ///      ▼
    /// UPDATE named columns → COMMIT
    /// ```
    pub async fn patch_address(
        &self,
        counterparty_id: i64,
        address_id: Option<i64>,
        patch: &AddressPatch,
    ) -> DbResult<i64> {
        self.patch_address_in_tx(counterparty_id, address_id, patch)
            .await
            .inspect_err(|e| {
                warn!(
                    counterparty_id = counterparty_id,
                    address_id = ?address_id,
                    code = %e.code(),
                    "Address patch rejected"
                )
            })
    }

    async fn patch_address_in_tx(
        &self,
        counterparty_id: i64,
        address_id: Option<i64>,
        patch: &AddressPatch,
    ) -> DbResult<i64> {
        patch.validate()?;

        let Some(address_id) = address_id else {
            let input = patch.into_input()?;
            let mut tx = self.pool.begin().await?;
            touch_root(&mut tx, TABLE, ENTITY, counterparty_id).await?;
            check_place(&mut tx, input.country_id, input.city_id).await?;
            let id = insert_address(&mut tx, counterparty_id, &input).await?;
            tx.commit().await?;

            debug!(counterparty_id = counterparty_id, address_id = id, "Address added");
            return Ok(id);
        };

        let mut tx = self.pool.begin().await?;
        touch_root(&mut tx, TABLE, ENTITY, counterparty_id).await?;

        let current: Option<(i64, i64)> = sqlx::query_as(
            "SELECT country_id, city_id FROM addresses WHERE id = ?1 AND counterparty_id = ?2",
        )
        .bind(address_id)
        .bind(counterparty_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (current_country, current_city) =
            current.ok_or_else(|| DbError::not_found("address", address_id))?;

        let country_id = patch.country_id.value().copied().unwrap_or(current_country);
        let city_id = patch.city_id.value().copied().unwrap_or(current_city);
        if !patch.country_id.is_absent() || !patch.city_id.is_absent() {
            check_place(&mut tx, country_id, city_id).await?;
        }

        let mut columns = text_columns(patch.text_fields());
        if let Some(id) = patch.country_id.value() {
            columns.push(("country_id", ColumnValue::Int(*id)));
        }
        if let Some(id) = patch.city_id.value() {
            columns.push(("city_id", ColumnValue::Int(*id)));
        }
        let fields = columns.len();
        update_columns(&mut tx, "addresses", "counterparty_id", address_id, counterparty_id, columns)
            .await?;
        tx.commit().await?;

        debug!(
            counterparty_id = counterparty_id,
            address_id = address_id,
            fields = fields,
            "Address patched"
        );
        Ok(address_id)
    }

    /// Applies a partial update to one representative, or adds a new one.
    ///
    /// Same contract as [`CounterpartyRepository::patch_address`].
    pub async fn patch_representative(
        &self,
        counterparty_id: i64,
        representative_id: Option<i64>,
        patch: &RepresentativePatch,
    ) -> DbResult<i64> {
        self.patch_representative_in_tx(counterparty_id, representative_id, patch)
            .await
            .inspect_err(|e| {
                warn!(
                    counterparty_id = counterparty_id,
                    representative_id = ?representative_id,
                    code = %e.code(),
                    "Representative patch rejected"
                )
            })
    }

    async fn patch_representative_in_tx(
        &self,
        counterparty_id: i64,
        representative_id: Option<i64>,
        patch: &RepresentativePatch,
    ) -> DbResult<i64> {
        patch.validate()?;

        let Some(representative_id) = representative_id else {
            let input = patch.into_input()?;
            let mut tx = self.pool.begin().await?;
            touch_root(&mut tx, TABLE, ENTITY, counterparty_id).await?;
            let id = insert_representative(&mut tx, counterparty_id, &input).await?;
            tx.commit().await?;
            return Ok(id);
        };

        let mut tx = self.pool.begin().await?;
        touch_root(&mut tx, TABLE, ENTITY, counterparty_id).await?;

        let owned: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM representatives WHERE id = ?1 AND counterparty_id = ?2",
        )
        .bind(representative_id)
        .bind(counterparty_id)
        .fetch_optional(&mut *tx)
        .await?;
        if owned.is_none() {
            return Err(DbError::not_found("representative", representative_id));
        }

        update_columns(
            &mut tx,
            "representatives",
            "counterparty_id",
            representative_id,
            counterparty_id,
            text_columns(patch.text_fields()),
        )
        .await?;
        tx.commit().await?;

        debug!(
            counterparty_id = counterparty_id,
            representative_id = representative_id,
            "Representative patched"
        );
        Ok(representative_id)
    }
}

// =============================================================================
// Aggregate Assembly
// =============================================================================

async fn load(conn: &mut SqliteConnection, id: i64, lang: &str) -> DbResult<Option<CounterpartyView>> {
    let row = sqlx::query_as::<_, CounterpartyRow>(
        "SELECT id, name, kind, tax_number, created_at, updated_at FROM counterparties WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let addresses = load_addresses(conn, id, lang).await?;

    let representatives = sqlx::query_as::<_, RepresentativeView>(
        "SELECT id, full_name, position, phone, email FROM representatives \
         WHERE counterparty_id = ?1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let bank_accounts = sqlx::query_as::<_, BankAccountView>(
        "SELECT id, bank_name, account_number, swift, currency_code FROM bank_accounts \
         WHERE counterparty_id = ?1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let contacts = sqlx::query_as::<_, ContactView>(
        "SELECT id, kind, value FROM contacts WHERE counterparty_id = ?1 ORDER BY id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    let product_ids: Vec<i64> = sqlx::query_scalar(
        "SELECT product_id FROM counterparty_products WHERE counterparty_id = ?1 ORDER BY product_id",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;
    let mut products = Vec::with_capacity(product_ids.len());
    for product_id in product_ids {
        products.push(named_ref(conn, TranslatedKind::Product, product_id, lang).await?);
    }

    Ok(Some(CounterpartyView {
        id: row.id,
        name: row.name,
        kind: row.kind,
        tax_number: row.tax_number,
        addresses,
        representatives,
        bank_accounts,
        contacts,
        products,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

async fn load_addresses(
    conn: &mut SqliteConnection,
    counterparty_id: i64,
    lang: &str,
) -> DbResult<Vec<AddressView>> {
    let rows = sqlx::query_as::<_, AddressRow>(
        "SELECT id, counterparty_id, full_name, country_id, city_id, street, house, apartment, \
         postal_code, phone FROM addresses WHERE counterparty_id = ?1 ORDER BY id",
    )
    .bind(counterparty_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        let country = named_ref(conn, TranslatedKind::Country, row.country_id, lang).await?;
        let city = named_ref(conn, TranslatedKind::City, row.city_id, lang).await?;
        views.push(AddressView {
            id: row.id,
            counterparty_id: row.counterparty_id,
            full_name: row.full_name,
            country,
            city,
            street: row.street,
            house: row.house,
            apartment: row.apartment,
            postal_code: row.postal_code,
            phone: row.phone,
        });
    }
    Ok(views)
}

// =============================================================================
// Write Helpers
// =============================================================================

/// Id of another counterparty with the same name (case-insensitive).
async fn find_duplicate(
    conn: &mut SqliteConnection,
    name: &str,
    exclude: Option<i64>,
) -> DbResult<Option<i64>> {
    let id = sqlx::query_scalar(
        "SELECT id FROM counterparties WHERE name = ?1 COLLATE NOCASE AND (?2 IS NULL OR id <> ?2)",
    )
    .bind(name)
    .bind(exclude)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}

/// Reports a name taken between the duplicate check and the write as
/// `Conflict`, like the check itself would have.
async fn unique_as_conflict(
    conn: &mut SqliteConnection,
    err: DbError,
    name: &str,
    exclude: Option<i64>,
) -> DbError {
    let DbError::UniqueViolation { .. } = err else {
        return err;
    };
    match find_duplicate(conn, name, exclude).await {
        Ok(Some(existing_id)) => DbError::conflict(ENTITY, existing_id),
        Ok(None) => err,
        Err(lookup) => lookup,
    }
}

async fn check_references(conn: &mut SqliteConnection, request: &CounterpartyRequest) -> DbResult<()> {
    for address in &request.addresses {
        check_place(conn, address.country_id, address.city_id).await?;
    }
    for account in &request.bank_accounts {
        require_currency(conn, &account.currency_code).await?;
    }
    for product_id in &request.product_ids {
        require_row(conn, "products", "product", *product_id).await?;
    }
    Ok(())
}

async fn insert_children(
    conn: &mut SqliteConnection,
    counterparty_id: i64,
    request: &CounterpartyRequest,
) -> DbResult<()> {
    for address in &request.addresses {
        insert_address(conn, counterparty_id, address).await?;
    }
    for rep in &request.representatives {
        insert_representative(conn, counterparty_id, rep).await?;
    }
    for account in &request.bank_accounts {
        sqlx::query(
            "INSERT INTO bank_accounts (counterparty_id, bank_name, account_number, swift, currency_code) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(counterparty_id)
        .bind(clean(&account.bank_name))
        .bind(clean(&account.account_number))
        .bind(clean_opt(account.swift.as_deref()))
        .bind(&account.currency_code)
        .execute(&mut *conn)
        .await?;
    }
    for contact in &request.contacts {
        sqlx::query("INSERT INTO contacts (counterparty_id, kind, value) VALUES (?1, ?2, ?3)")
            .bind(counterparty_id)
            .bind(contact.kind)
            .bind(clean(&contact.value))
            .execute(&mut *conn)
            .await?;
    }
    for product_id in &request.product_ids {
        sqlx::query("INSERT INTO counterparty_products (counterparty_id, product_id) VALUES (?1, ?2)")
            .bind(counterparty_id)
            .bind(*product_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_address(
    conn: &mut SqliteConnection,
    counterparty_id: i64,
    address: &AddressInput,
) -> DbResult<i64> {
    let id = sqlx::query(
        "INSERT INTO addresses (counterparty_id, full_name, country_id, city_id, street, house, \
         apartment, postal_code, phone) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(counterparty_id)
    .bind(clean(&address.full_name))
    .bind(address.country_id)
    .bind(address.city_id)
    .bind(clean(&address.street))
    .bind(clean(&address.house))
    .bind(clean_opt(address.apartment.as_deref()))
    .bind(clean(&address.postal_code))
    .bind(clean_opt(address.phone.as_deref()))
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}

async fn insert_representative(
    conn: &mut SqliteConnection,
    counterparty_id: i64,
    rep: &RepresentativeInput,
) -> DbResult<i64> {
    let id = sqlx::query(
        "INSERT INTO representatives (counterparty_id, full_name, position, phone, email) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(counterparty_id)
    .bind(clean(&rep.full_name))
    .bind(clean_opt(rep.position.as_deref()))
    .bind(clean_opt(rep.phone.as_deref()))
    .bind(clean_opt(rep.email.as_deref()))
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();
    Ok(id)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::{Database, DbConfig};
    use stockroom_core::{BankAccountInput, ContactInput, ContactKind, Patch};

    struct Fixture {
        db: Database,
        poland: i64,
        warsaw: i64,
        berlin: i64,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let dict = db.dictionaries();
        dict.add_currency("PLN", "Polish zloty", "zł", 2).await.unwrap();
        let poland = dict.add_country("Poland", &[]).await.unwrap();
        let germany = dict.add_country("Germany", &[]).await.unwrap();
        let warsaw = dict.add_city(poland, "Warsaw", &[]).await.unwrap();
        let berlin = dict.add_city(germany, "Berlin", &[]).await.unwrap();
        Fixture {
            db,
            poland,
            warsaw,
            berlin,
        }
    }

    fn address(f: &Fixture, street: &str) -> AddressInput {
        AddressInput {
            full_name: "Jan Kowalski".to_string(),
            country_id: f.poland,
            city_id: f.warsaw,
            street: street.to_string(),
            house: "10".to_string(),
            apartment: None,
            postal_code: "00-001".to_string(),
            phone: None,
        }
    }

    fn request(f: &Fixture, name: &str) -> CounterpartyRequest {
        CounterpartyRequest {
            name: name.to_string(),
            kind: CounterpartyKind::Supplier,
            tax_number: Some("PL1234567890".to_string()),
            addresses: vec![address(f, "Prosta")],
            representatives: vec![RepresentativeInput {
                full_name: "Anna Nowak".to_string(),
                position: Some("Sales manager".to_string()),
                phone: None,
                email: Some("anna@example.com".to_string()),
            }],
            bank_accounts: vec![BankAccountInput {
                bank_name: "PKO BP".to_string(),
                account_number: "PL61109010140000071219812874".to_string(),
                swift: None,
                currency_code: "PLN".to_string(),
            }],
            contacts: vec![ContactInput {
                kind: ContactKind::Phone,
                value: "+48 22 111 22 33".to_string(),
            }],
            product_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let f = fixture().await;
        let repo = f.db.counterparties();
        let id = repo.create(&request(&f, "Hurtownia Nowak")).await.unwrap();

        let view = repo.get(id, "en").await.unwrap().unwrap();
        assert_eq!(view.name, "Hurtownia Nowak");
        assert_eq!(view.addresses.len(), 1);
        assert_eq!(view.addresses[0].city.name, "Warsaw");
        assert_eq!(view.representatives[0].email.as_deref(), Some("anna@example.com"));
        assert_eq!(view.bank_accounts[0].currency_code, "PLN");
        assert_eq!(view.contacts[0].kind, ContactKind::Phone);

        assert!(repo.get(id + 100, "en").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let f = fixture().await;
        let repo = f.db.counterparties();
        let first = repo.create(&request(&f, "Hurtownia Nowak")).await.unwrap();

        let err = repo.create(&request(&f, "HURTOWNIA NOWAK")).await.unwrap_err();
        match err {
            DbError::Conflict { existing_id, .. } => assert_eq!(existing_id, first),
            other => panic!("expected conflict, got {other:?}"),
        }

        // Replacing a row with its own name is not a conflict.
        repo.replace(first, &request(&f, "Hurtownia Nowak")).await.unwrap();

        let second = repo.create(&request(&f, "Delikatesy Centrum")).await.unwrap();
        let err = repo.replace(second, &request(&f, "Hurtownia Nowak")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_name_taken_at_write_time_is_conflict() {
        let f = fixture().await;
        let first = f.db.counterparties().create(&request(&f, "Hurtownia Nowak")).await.unwrap();

        let mut conn = f.db.pool().acquire().await.unwrap();
        let raw = sqlx::query(
            "INSERT INTO counterparties (name, kind, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        )
        .bind("hurtownia nowak")
        .bind(CounterpartyKind::Customer)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .unwrap_err();
        let err = unique_as_conflict(&mut conn, raw.into(), "hurtownia nowak", None).await;
        assert_eq!(err.code(), "counterparty_exists");
        assert!(matches!(err, DbError::Conflict { existing_id, .. } if existing_id == first));

        let fk = DbError::ForeignKeyViolation {
            message: "FOREIGN KEY constraint failed".to_string(),
        };
        let err = unique_as_conflict(&mut conn, fk, "Hurtownia Nowak", None).await;
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[tokio::test]
    async fn test_city_country_mismatch_aborts_create() {
        let f = fixture().await;
        let repo = f.db.counterparties();
        let mut req = request(&f, "Hurtownia Nowak");
        req.addresses[0].city_id = f.berlin;

        let err = repo.create(&req).await.unwrap_err();
        assert_eq!(err.code(), "city_country_mismatch");
        assert!(repo.list("en").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_unknown_root_is_not_found() {
        let f = fixture().await;
        let err = f
            .db
            .counterparties()
            .replace(77, &request(&f, "Hurtownia Nowak"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_patch_address_of_other_root_is_not_found() {
        let f = fixture().await;
        let repo = f.db.counterparties();
        let a = repo.create(&request(&f, "Hurtownia Nowak")).await.unwrap();
        let b = repo.create(&request(&f, "Delikatesy Centrum")).await.unwrap();
        let address_of_b = repo.get(b, "en").await.unwrap().unwrap().addresses[0].id;

        let patch = AddressPatch {
            street: Patch::Value("Nowa".to_string()),
            ..AddressPatch::default()
        };
        let err = repo.patch_address(a, Some(address_of_b), &patch).await.unwrap_err();
        assert_eq!(err.code(), "address_not_found");

        let view = repo.get(b, "en").await.unwrap().unwrap();
        assert_eq!(view.addresses[0].street, "Prosta");
    }

    #[tokio::test]
    async fn test_patch_city_checked_against_stored_country() {
        let f = fixture().await;
        let repo = f.db.counterparties();
        let id = repo.create(&request(&f, "Hurtownia Nowak")).await.unwrap();
        let address_id = repo.get(id, "en").await.unwrap().unwrap().addresses[0].id;

        let patch = AddressPatch {
            city_id: Patch::Value(f.berlin),
            ..AddressPatch::default()
        };
        let err = repo.patch_address(id, Some(address_id), &patch).await.unwrap_err();
        assert_eq!(err.code(), "city_country_mismatch");
    }

    #[tokio::test]
    async fn test_patch_without_id_adds_address() {
        let f = fixture().await;
        let repo = f.db.counterparties();
        let id = repo.create(&request(&f, "Hurtownia Nowak")).await.unwrap();

        let incomplete = AddressPatch {
            street: Patch::Value("Nowa".to_string()),
            ..AddressPatch::default()
        };
        let err = repo.patch_address(id, None, &incomplete).await.unwrap_err();
        assert_eq!(err.code(), "full_name_required");

        let patch: AddressPatch = serde_json::from_value(serde_json::json!({
            "fullName": "Piotr Zieliński", "countryId": f.poland, "cityId": f.warsaw,
            "street": "Nowa", "house": "3", "postalCode": "00-950"
        }))
        .unwrap();
        let new_id = repo.patch_address(id, None, &patch).await.unwrap();

        let addresses = repo.addresses(id, "en").await.unwrap().unwrap();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[1].id, new_id);
        assert_eq!(addresses[1].full_name, "Piotr Zieliński");
    }

    #[tokio::test]
    async fn test_patch_representative_clears_optional_field() {
        let f = fixture().await;
        let repo = f.db.counterparties();
        let id = repo.create(&request(&f, "Hurtownia Nowak")).await.unwrap();
        let rep_id = repo.get(id, "en").await.unwrap().unwrap().representatives[0].id;

        let patch: RepresentativePatch =
            serde_json::from_value(serde_json::json!({ "position": null })).unwrap();
        repo.patch_representative(id, Some(rep_id), &patch).await.unwrap();

        let rep = &repo.get(id, "en").await.unwrap().unwrap().representatives[0];
        assert_eq!(rep.position, None);
        assert_eq!(rep.full_name, "Anna Nowak");
        assert_eq!(rep.email.as_deref(), Some("anna@example.com"));
    }

    #[tokio::test]
    async fn test_delete_cascades_children() {
        let f = fixture().await;
        let repo = f.db.counterparties();
        let id = repo.create(&request(&f, "Hurtownia Nowak")).await.unwrap();

        repo.delete(id).await.unwrap();

        let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses")
            .fetch_one(f.db.pool())
            .await
            .unwrap();
        assert_eq!(left, 0);
        assert!(repo.addresses(id, "en").await.unwrap().is_none());
        assert_eq!(repo.delete(id).await.unwrap_err().kind(), ErrorKind::NotFound);
    }
}
