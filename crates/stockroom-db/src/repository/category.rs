//! # Category Repository
//!
//! The category aggregate: a category, its translations, and its
//! subcategories each with their own translations.
//!
//! Category names are unique ignoring case; a create or replace that would
//! duplicate one fails with `Conflict` carrying the existing id.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::localization::{insert_translations, resolve_name, translations, TranslatedKind};
use crate::repository::{clean, delete_root, touch_root};
use stockroom_core::{CategoryRequest, CategoryView, SubcategoryView};

const TABLE: &str = "categories";
const ENTITY: &str = "category";

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Repository for the category aggregate.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Loads one category aggregate with names resolved for `lang`.
    pub async fn get(&self, id: i64, lang: &str) -> DbResult<Option<CategoryView>> {
        debug!(id = id, lang = %lang, "Loading category");
        let mut tx = self.pool.begin().await?;
        let view = load(&mut tx, id, lang).await?;
        tx.commit().await?;
        Ok(view)
    }

    /// Loads every category aggregate, ordered by id.
    pub async fn list(&self, lang: &str) -> DbResult<Vec<CategoryView>> {
        let mut tx = self.pool.begin().await?;
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM categories ORDER BY id")
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

    /// Creates a category with translations and subcategories.
    ///
    /// ## Errors
    /// * `Validation` - name or translation rejected
    /// * `Conflict` - a category with that name (any case) exists
    pub async fn create(&self, request: &CategoryRequest) -> DbResult<i64> {
        self.create_in_tx(request)
            .await
            .inspect_err(|e| warn!(code = %e.code(), "Category create rejected"))
    }

    async fn create_in_tx(&self, request: &CategoryRequest) -> DbResult<i64> {
        request.validate()?;
        let name = clean(&request.name);

        let mut tx = self.pool.begin().await?;
        if let Some(existing_id) = find_duplicate(&mut tx, &name, None).await? {
            return Err(DbError::conflict(ENTITY, existing_id));
        }

        let now = Utc::now();
        let inserted = sqlx::query(
            "INSERT INTO categories (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
        )
        .bind(&name)
        .bind(now)
        .execute(&mut *tx)
        .await;
        let id = match inserted {
            Ok(done) => done.last_insert_rowid(),
            Err(e) => return Err(unique_as_conflict(&mut tx, e.into(), &name, None).await),
        };

        insert_children(&mut tx, id, request).await?;
        tx.commit().await?;

        debug!(id = id, subcategories = request.subcategories.len(), "Category created");
        Ok(id)
    }

    /// Replaces name, translations and subcategories.
    ///
    /// Subcategories are deleted and re-inserted with new ids; products
    /// pointing at a deleted subcategory lose that link.
    pub async fn replace(&self, id: i64, request: &CategoryRequest) -> DbResult<()> {
        self.replace_in_tx(id, request)
            .await
            .inspect_err(|e| warn!(id = id, code = %e.code(), "Category replace rejected"))
    }

    async fn replace_in_tx(&self, id: i64, request: &CategoryRequest) -> DbResult<()> {
        request.validate()?;
        let name = clean(&request.name);

        let mut tx = self.pool.begin().await?;
        touch_root(&mut tx, TABLE, ENTITY, id).await?;
        if let Some(existing_id) = find_duplicate(&mut tx, &name, Some(id)).await? {
            return Err(DbError::conflict(ENTITY, existing_id));
        }

        let renamed = sqlx::query("UPDATE categories SET name = ?1 WHERE id = ?2")
            .bind(&name)
            .bind(id)
            .execute(&mut *tx)
            .await;
        if let Err(e) = renamed {
            return Err(unique_as_conflict(&mut tx, e.into(), &name, Some(id)).await);
        }
        sqlx::query("DELETE FROM category_translations WHERE category_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM subcategories WHERE category_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        insert_children(&mut tx, id, request).await?;
        tx.commit().await?;

        debug!(id = id, "Category replaced");
        Ok(())
    }

    /// Deletes a category with its subcategories. Products keep existing
    /// without a category.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        delete_root(&mut tx, TABLE, ENTITY, id).await?;
        tx.commit().await?;

        debug!(id = id, "Category deleted");
        Ok(())
    }
}

async fn find_duplicate(
    conn: &mut SqliteConnection,
    name: &str,
    exclude: Option<i64>,
) -> DbResult<Option<i64>> {
    let id = sqlx::query_scalar(
        "SELECT id FROM categories WHERE name = ?1 COLLATE NOCASE AND (?2 IS NULL OR id <> ?2)",
    )
    .bind(name)
    .bind(exclude)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}

/// Turns a unique-index failure on the name into `Conflict`.
///
/// A writer that commits the same name between our duplicate check and our
/// write trips the index instead of the check.
async fn unique_as_conflict(
    conn: &mut SqliteConnection,
    err: DbError,
    name: &str,
    exclude: Option<i64>,
) -> DbError {
    if !matches!(err, DbError::UniqueViolation { .. }) {
        return err;
    }
    match find_duplicate(conn, name, exclude).await {
        Ok(Some(existing_id)) => DbError::conflict(ENTITY, existing_id),
        Ok(None) => err,
        Err(lookup) => lookup,
    }
}

async fn insert_children(
    conn: &mut SqliteConnection,
    category_id: i64,
    request: &CategoryRequest,
) -> DbResult<()> {
    insert_translations(conn, TranslatedKind::Category, category_id, &request.translations).await?;

    for sub in &request.subcategories {
        let sub_id = sqlx::query("INSERT INTO subcategories (category_id, name) VALUES (?1, ?2)")
            .bind(category_id)
            .bind(clean(&sub.name))
            .execute(&mut *conn)
            .await?
            .last_insert_rowid();
        insert_translations(conn, TranslatedKind::Subcategory, sub_id, &sub.translations).await?;
    }
    Ok(())
}

async fn load(conn: &mut SqliteConnection, id: i64, lang: &str) -> DbResult<Option<CategoryView>> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, created_at, updated_at FROM categories WHERE id = ?1",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let name = resolve_name(conn, TranslatedKind::Category, id, lang).await?;
    let category_translations = translations(conn, TranslatedKind::Category, id).await?;

    let sub_ids: Vec<i64> =
        sqlx::query_scalar("SELECT id FROM subcategories WHERE category_id = ?1 ORDER BY id")
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
    let mut subcategories = Vec::with_capacity(sub_ids.len());
    for sub_id in sub_ids {
        let sub_name = resolve_name(conn, TranslatedKind::Subcategory, sub_id, lang).await?;
        subcategories.push(SubcategoryView {
            id: sub_id,
            display_name: sub_name.display().to_string(),
            name: sub_name.base,
            translations: translations(conn, TranslatedKind::Subcategory, sub_id).await?,
        });
    }

    Ok(Some(CategoryView {
        id: row.id,
        display_name: name.display().to_string(),
        name: name.base,
        translations: category_translations,
        subcategories,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pool::{Database, DbConfig};
    use stockroom_core::{SubcategoryInput, TranslationInput};

    fn tr(lang: &str, name: &str) -> TranslationInput {
        TranslationInput {
            language_code: lang.to_string(),
            name: name.to_string(),
        }
    }

    fn beverages() -> CategoryRequest {
        CategoryRequest {
            name: "Beverages".to_string(),
            translations: vec![tr("pl", "Napoje"), tr("ru", "Напитки")],
            subcategories: vec![
                SubcategoryInput {
                    name: "Juice".to_string(),
                    translations: vec![tr("pl", "Soki")],
                },
                SubcategoryInput {
                    name: "Water".to_string(),
                    translations: vec![],
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_create_and_get_localized() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.categories();
        let id = repo.create(&beverages()).await.unwrap();

        let view = repo.get(id, "pl").await.unwrap().unwrap();
        assert_eq!(view.name, "Beverages");
        assert_eq!(view.display_name, "Napoje");
        assert_eq!(view.translations.len(), 2);
        assert_eq!(view.subcategories[0].display_name, "Soki");
        assert_eq!(view.subcategories[1].display_name, "Water");

        let fallback = repo.get(id, "xx").await.unwrap().unwrap();
        assert_eq!(fallback.display_name, "Beverages");
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts_without_insert() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.categories();
        let id = repo.create(&beverages()).await.unwrap();

        let mut dup = beverages();
        dup.name = "beverages".to_string();
        match repo.create(&dup).await.unwrap_err() {
            DbError::Conflict { entity, existing_id } => {
                assert_eq!(entity, "category");
                assert_eq!(existing_id, id);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(repo.list("en").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unique_index_failure_reports_conflict() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let id = db.categories().create(&beverages()).await.unwrap();

        // A row written past the duplicate check hits the index.
        let mut conn = db.pool().acquire().await.unwrap();
        let raw = sqlx::query(
            "INSERT INTO categories (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
        )
        .bind("BEVERAGES")
        .bind(Utc::now())
        .execute(&mut *conn)
        .await
        .unwrap_err();
        let err = unique_as_conflict(&mut conn, raw.into(), "BEVERAGES", None).await;
        assert_eq!(err.kind(), ErrorKind::Conflict);
        match err {
            DbError::Conflict { entity, existing_id } => {
                assert_eq!(entity, "category");
                assert_eq!(existing_id, id);
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        // Renaming onto itself is excluded, so the index error stays as is.
        let same = DbError::UniqueViolation {
            field: "categories.name".to_string(),
        };
        let err = unique_as_conflict(&mut conn, same, "Beverages", Some(id)).await;
        assert!(matches!(err, DbError::UniqueViolation { .. }));

        let other = unique_as_conflict(&mut conn, DbError::Internal("disk".into()), "Beverages", None).await;
        assert!(matches!(other, DbError::Internal(_)));
    }

    #[tokio::test]
    async fn test_unregistered_translation_language_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.categories();
        let mut request = beverages();
        request.translations.push(tr("fr", "Boissons"));

        let err = repo.create(&request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert_eq!(err.code(), "language_unknown");
        assert!(repo.list("en").await.unwrap().is_empty());

        db.dictionaries().add_language("fr", "Français").await.unwrap();
        let id = repo.create(&request).await.unwrap();
        assert_eq!(repo.get(id, "fr").await.unwrap().unwrap().display_name, "Boissons");
    }

    #[tokio::test]
    async fn test_replace_drops_old_subcategories() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.categories();
        let id = repo.create(&beverages()).await.unwrap();

        let request = CategoryRequest {
            name: "Drinks".to_string(),
            translations: vec![tr("pl", "Napoje")],
            subcategories: vec![SubcategoryInput {
                name: "Tea".to_string(),
                translations: vec![],
            }],
        };
        repo.replace(id, &request).await.unwrap();
        repo.replace(id, &request).await.unwrap();

        let view = repo.get(id, "en").await.unwrap().unwrap();
        assert_eq!(view.name, "Drinks");
        assert_eq!(view.translations.len(), 1);
        let names: Vec<_> = view.subcategories.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Tea"]);

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM subcategory_translations")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_invalid_translation_rejected_before_storage() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.categories();
        let mut request = beverages();
        request.translations.push(tr("en", "Beverages"));

        let err = repo.create(&request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.code(), "translation_language_duplicate");
        assert!(repo.list("en").await.unwrap().is_empty());
    }
}
