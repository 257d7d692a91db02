//! # Dictionary Repository
//!
//! Reference data the aggregates point at: languages, currencies,
//! countries and cities (both translatable), warehouses.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::localization::{insert_translations, named_ref, TranslatedKind};
use crate::repository::{city_country, clean, find_currency, require_row};
use stockroom_core::validation::{
    validate_currency_code, validate_field, validate_language_code, validate_translation_languages,
    EntityKind,
};
use stockroom_core::{CurrencyView, NamedRef, TranslationInput};

/// Repository for dictionary tables.
#[derive(Debug, Clone)]
pub struct DictionaryRepository {
    pool: SqlitePool,
}

impl DictionaryRepository {
    /// Creates a new DictionaryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DictionaryRepository { pool }
    }

    // =========================================================================
    // Languages & Currencies
    // =========================================================================

    /// Adds a language, or renames it if the code exists.
    pub async fn add_language(&self, code: &str, name: &str) -> DbResult<()> {
        validate_language_code(code)?;
        validate_field(EntityKind::Dictionary, "name", Some(name))?;

        debug!(code = %code, "Upserting language");
        sqlx::query(
            "INSERT INTO languages (code, name) VALUES (?1, ?2) \
             ON CONFLICT(code) DO UPDATE SET name = excluded.name",
        )
        .bind(code)
        .bind(clean(name))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Lists language codes.
    pub async fn languages(&self) -> DbResult<Vec<String>> {
        let codes = sqlx::query_scalar("SELECT code FROM languages ORDER BY code")
            .fetch_all(&self.pool)
            .await?;
        Ok(codes)
    }

    /// Adds a currency, or updates it if the code exists.
    pub async fn add_currency(
        &self,
        code: &str,
        name: &str,
        symbol: &str,
        minor_units: u32,
    ) -> DbResult<()> {
        validate_currency_code(code)?;
        validate_field(EntityKind::Dictionary, "name", Some(name))?;

        debug!(code = %code, minor_units = minor_units, "Upserting currency");
        sqlx::query(
            "INSERT INTO currencies (code, name, symbol, minor_units) VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(code) DO UPDATE SET name = excluded.name, symbol = excluded.symbol, \
             minor_units = excluded.minor_units",
        )
        .bind(code)
        .bind(clean(name))
        .bind(symbol.trim())
        .bind(i64::from(minor_units))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Looks up a currency by code.
    pub async fn currency(&self, code: &str) -> DbResult<Option<CurrencyView>> {
        let mut conn = self.pool.acquire().await?;
        find_currency(&mut conn, code).await
    }

    // =========================================================================
    // Warehouses
    // =========================================================================

    /// Adds a warehouse. A duplicate name is a conflict.
    pub async fn add_warehouse(&self, name: &str) -> DbResult<i64> {
        validate_field(EntityKind::Dictionary, "name", Some(name))?;
        let name = clean(name);

        let mut tx = self.pool.begin().await?;
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM warehouses WHERE name = ?1 COLLATE NOCASE")
                .bind(&name)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(existing_id) = existing {
            return Err(DbError::conflict("warehouse", existing_id));
        }

        let id = sqlx::query("INSERT INTO warehouses (name) VALUES (?1)")
            .bind(&name)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        tx.commit().await?;

        debug!(id = id, name = %name, "Warehouse created");
        Ok(id)
    }

    /// Lists warehouses by id.
    pub async fn warehouses(&self) -> DbResult<Vec<NamedRef>> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, name FROM warehouses ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| NamedRef {
                id,
                display_name: name.clone(),
                name,
                translations: Vec::new(),
            })
            .collect())
    }

    // =========================================================================
    // Countries & Cities
    // =========================================================================

    /// Adds a country with its translations.
    pub async fn add_country(&self, name: &str, translations: &[TranslationInput]) -> DbResult<i64> {
        validate_place(name, translations)?;
        let name = clean(name);

        let mut tx = self.pool.begin().await?;
        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM countries WHERE name = ?1 COLLATE NOCASE")
                .bind(&name)
                .fetch_optional(&mut *tx)
                .await?;
        if let Some(existing_id) = existing {
            return Err(DbError::conflict("country", existing_id));
        }

        let id = sqlx::query("INSERT INTO countries (name) VALUES (?1)")
            .bind(&name)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        insert_translations(&mut tx, TranslatedKind::Country, id, translations).await?;
        tx.commit().await?;

        debug!(id = id, name = %name, translations = translations.len(), "Country created");
        Ok(id)
    }

    /// Adds a city to an existing country.
    pub async fn add_city(
        &self,
        country_id: i64,
        name: &str,
        translations: &[TranslationInput],
    ) -> DbResult<i64> {
        validate_place(name, translations)?;

        let mut tx = self.pool.begin().await?;
        require_row(&mut tx, "countries", "country", country_id).await?;

        let id = sqlx::query("INSERT INTO cities (country_id, name) VALUES (?1, ?2)")
            .bind(country_id)
            .bind(clean(name))
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();
        insert_translations(&mut tx, TranslatedKind::City, id, translations).await?;
        tx.commit().await?;

        debug!(id = id, country_id = country_id, "City created");
        Ok(id)
    }

    /// Lists countries with names resolved for `lang`.
    pub async fn countries(&self, lang: &str) -> DbResult<Vec<NamedRef>> {
        let mut tx = self.pool.begin().await?;
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM countries ORDER BY id")
            .fetch_all(&mut *tx)
            .await?;

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push(named_ref(&mut tx, TranslatedKind::Country, id, lang).await?);
        }
        tx.commit().await?;
        Ok(out)
    }

    /// Lists the cities of one country with names resolved for `lang`.
    pub async fn cities(&self, country_id: i64, lang: &str) -> DbResult<Vec<NamedRef>> {
        let mut tx = self.pool.begin().await?;
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM cities WHERE country_id = ?1 ORDER BY id")
            .bind(country_id)
            .fetch_all(&mut *tx)
            .await?;

        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            out.push(named_ref(&mut tx, TranslatedKind::City, id, lang).await?);
        }
        tx.commit().await?;
        Ok(out)
    }

    /// Returns the country a city belongs to, `None` for an unknown city.
    pub async fn city_country(&self, city_id: i64) -> DbResult<Option<i64>> {
        let mut conn = self.pool.acquire().await?;
        city_country(&mut conn, city_id).await
    }
}

fn validate_place(name: &str, translations: &[TranslationInput]) -> DbResult<()> {
    validate_field(EntityKind::Dictionary, "name", Some(name))?;
    validate_translation_languages(translations.iter().map(|t| t.language_code.as_str()))?;
    for t in translations {
        validate_field(EntityKind::Dictionary, "name", Some(&t.name))?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
