//! # Localization Resolver
//!
//! Resolves the display name of a translatable entity for one language.
//!
//! ## Resolution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve_name(City, 7, "pl")                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  cities.id = 7  ──LEFT JOIN──►  city_translations                      │
//! │  name = "Warsaw"                (city_id = 7, language_code = "pl")    │
//! │                                  name = "Warszawa"                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LocalizedName { base: "Warsaw", translated: Some("Warszawa") }        │
//! │                                                                         │
//! │  "xx" or "en" → no row joins → translated: None → display "Warsaw"     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The free functions take a connection so aggregate readers can call them
//! inside their own read transaction. [`LocalizationRepository`] wraps them
//! for standalone lookups.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::require_language;
use stockroom_core::{LocalizedName, NamedRef, Translation};

/// Entity types that own a translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslatedKind {
    Country,
    City,
    Category,
    Subcategory,
    Product,
}

impl TranslatedKind {
    /// Base table holding the untranslated `name`.
    pub fn table(self) -> &'static str {
        match self {
            TranslatedKind::Country => "countries",
            TranslatedKind::City => "cities",
            TranslatedKind::Category => "categories",
            TranslatedKind::Subcategory => "subcategories",
            TranslatedKind::Product => "products",
        }
    }

    /// Translation table.
    pub fn translation_table(self) -> &'static str {
        match self {
            TranslatedKind::Country => "country_translations",
            TranslatedKind::City => "city_translations",
            TranslatedKind::Category => "category_translations",
            TranslatedKind::Subcategory => "subcategory_translations",
            TranslatedKind::Product => "product_translations",
        }
    }

    /// Column in the translation table referencing the base row.
    pub fn owner_column(self) -> &'static str {
        match self {
            TranslatedKind::Country => "country_id",
            TranslatedKind::City => "city_id",
            TranslatedKind::Category => "category_id",
            TranslatedKind::Subcategory => "subcategory_id",
            TranslatedKind::Product => "product_id",
        }
    }

    /// Entity name used in errors.
    pub fn entity(self) -> &'static str {
        match self {
            TranslatedKind::Country => "country",
            TranslatedKind::City => "city",
            TranslatedKind::Category => "category",
            TranslatedKind::Subcategory => "subcategory",
            TranslatedKind::Product => "product",
        }
    }
}

#[derive(sqlx::FromRow)]
struct NameRow {
    base: String,
    translated: Option<String>,
}

/// Looks up the base name and the `lang` translation of one entity.
///
/// Returns `NotFound` when the base row is missing; a missing translation
/// is not an error.
pub async fn resolve_name(
    conn: &mut SqliteConnection,
    kind: TranslatedKind,
    id: i64,
    lang: &str,
) -> DbResult<LocalizedName> {
    let sql = format!(
        "SELECT b.name AS base, t.name AS translated \
         FROM {base} b \
         LEFT JOIN {tr} t ON t.{owner} = b.id AND t.language_code = ?1 \
         WHERE b.id = ?2",
        base = kind.table(),
        tr = kind.translation_table(),
        owner = kind.owner_column(),
    );

    let row = sqlx::query_as::<_, NameRow>(&sql)
        .bind(lang)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found(kind.entity(), id))?;

    Ok(LocalizedName {
        base: row.base,
        translated: row.translated,
    })
}

/// Resolves a name into the [`NamedRef`] embedded in views, with the
/// entity's full translation list attached.
pub async fn named_ref(
    conn: &mut SqliteConnection,
    kind: TranslatedKind,
    id: i64,
    lang: &str,
) -> DbResult<NamedRef> {
    let name = resolve_name(conn, kind, id, lang).await?;
    Ok(NamedRef {
        id,
        display_name: name.display().to_string(),
        name: name.base,
        translations: translations(conn, kind, id).await?,
    })
}

/// Lists every stored translation of one entity, ordered by language.
pub async fn translations(
    conn: &mut SqliteConnection,
    kind: TranslatedKind,
    id: i64,
) -> DbResult<Vec<Translation>> {
    let sql = format!(
        "SELECT language_code, name FROM {tr} WHERE {owner} = ?1 ORDER BY language_code",
        tr = kind.translation_table(),
        owner = kind.owner_column(),
    );

    let rows: Vec<(String, String)> = sqlx::query_as(&sql).bind(id).fetch_all(&mut *conn).await?;

    Ok(rows
        .into_iter()
        .map(|(language_code, name)| Translation { language_code, name })
        .collect())
}

/// Inserts translation rows for one entity.
///
/// Callers validate the language list first; a duplicate that slips
/// through fails on the table's primary key. Every code must be a
/// registered language (`language_unknown` otherwise).
pub async fn insert_translations(
    conn: &mut SqliteConnection,
    kind: TranslatedKind,
    id: i64,
    rows: &[stockroom_core::TranslationInput],
) -> DbResult<()> {
    let sql = format!(
        "INSERT INTO {tr} ({owner}, language_code, name) VALUES (?1, ?2, ?3)",
        tr = kind.translation_table(),
        owner = kind.owner_column(),
    );
    for row in rows {
        require_language(conn, &row.language_code).await?;
        sqlx::query(&sql)
            .bind(id)
            .bind(&row.language_code)
            .bind(row.name.trim())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Standalone access to the resolver.
///
/// ## Usage
/// ```rust,ignore
/// let name = db.localization().resolve_name(TranslatedKind::City, 7, "pl").await?;
/// println!("{}", name.display());
/// ```
#[derive(Debug, Clone)]
pub struct LocalizationRepository {
    pool: SqlitePool,
}

impl LocalizationRepository {
    /// Creates a new LocalizationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LocalizationRepository { pool }
    }

    /// Resolves one entity's name for `lang`.
    pub async fn resolve_name(
        &self,
        kind: TranslatedKind,
        id: i64,
        lang: &str,
    ) -> DbResult<LocalizedName> {
        debug!(kind = ?kind, id = id, lang = %lang, "Resolving name");
        let mut conn = self.pool.acquire().await?;
        resolve_name(&mut conn, kind, id, lang).await
    }

    /// Lists the stored translations of one entity.
    pub async fn translations(&self, kind: TranslatedKind, id: i64) -> DbResult<Vec<Translation>> {
        let mut conn = self.pool.acquire().await?;
        translations(&mut conn, kind, id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn setup() -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        sqlx::query("INSERT INTO countries (id, name) VALUES (1, 'Poland')")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query("INSERT INTO cities (id, country_id, name) VALUES (7, 1, 'Warsaw')")
            .execute(db.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO city_translations (city_id, language_code, name) \
             VALUES (7, 'pl', 'Warszawa'), (7, 'ru', 'Варшава')",
        )
        .execute(db.pool())
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_resolves_translation() {
        let db = setup().await;
        let name = db
            .localization()
            .resolve_name(TranslatedKind::City, 7, "pl")
            .await
            .unwrap();
        assert_eq!(name.base, "Warsaw");
        assert_eq!(name.translated.as_deref(), Some("Warszawa"));
        assert_eq!(name.display(), "Warszawa");
    }

    #[tokio::test]
    async fn test_unknown_language_falls_back_to_base() {
        let db = setup().await;
        let repo = db.localization();
        for lang in ["xx", "en"] {
            let name = repo.resolve_name(TranslatedKind::City, 7, lang).await.unwrap();
            assert_eq!(name.translated, None);
            assert_eq!(name.display(), "Warsaw");
        }
        let country = repo.resolve_name(TranslatedKind::Country, 1, "pl").await.unwrap();
        assert_eq!(country.display(), "Poland");
    }

    #[tokio::test]
    async fn test_missing_entity_is_not_found() {
        let db = setup().await;
        let err = db
            .localization()
            .resolve_name(TranslatedKind::City, 99, "pl")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "city_not_found");
    }

    #[tokio::test]
    async fn test_translations_are_ordered() {
        let db = setup().await;
        let list = db.localization().translations(TranslatedKind::City, 7).await.unwrap();
        let langs: Vec<_> = list.iter().map(|t| t.language_code.as_str()).collect();
        assert_eq!(langs, vec!["pl", "ru"]);
    }
}
