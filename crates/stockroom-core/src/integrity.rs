//! # Cross-Entity Invariants
//!
//! Pure predicates over ids already looked up by the caller. The db layer
//! fetches the facts (which country a city is in, whether a row exists)
//! inside its write transaction and hands them to these checks, so the
//! rules stay testable without a database.

use crate::error::IntegrityViolation;

/// Checks that a referenced row exists.
///
/// ## Example
/// ```rust
/// use stockroom_core::integrity::require_reference;
///
/// let err = require_reference("warehouse", 9, false).unwrap_err();
/// assert_eq!(err.code, "warehouse_unknown");
/// assert_eq!(err.context.get("warehouse_id"), Some(&9));
/// ```
pub fn require_reference(entity: &str, id: i64, exists: bool) -> Result<(), IntegrityViolation> {
    if exists {
        return Ok(());
    }
    Err(
        IntegrityViolation::new(format!("{}_unknown", entity), format!("Unknown {} {}", entity, id))
            .with(format!("{}_id", entity), id),
    )
}

/// Checks that `city_id` lies in `country_id`.
///
/// `city_country_id` is the country stored on the city row, or `None` when
/// the city does not exist.
pub fn check_city_in_country(
    city_id: i64,
    city_country_id: Option<i64>,
    country_id: i64,
) -> Result<(), IntegrityViolation> {
    match city_country_id {
        None => Err(IntegrityViolation::new("city_unknown", format!("Unknown city {}", city_id))
            .with("city_id", city_id)),
        Some(actual) if actual != country_id => Err(IntegrityViolation::new(
            "city_country_mismatch",
            format!("City {} does not belong to country {}", city_id, country_id),
        )
        .with("city_id", city_id)
        .with("country_id", country_id)
        .with("city_country_id", actual)),
        Some(_) => Ok(()),
    }
}

/// Checks that a product's subcategory belongs to its category.
///
/// A subcategory without a category is rejected as well.
pub fn check_subcategory_in_category(
    subcategory_id: i64,
    subcategory_category_id: Option<i64>,
    category_id: Option<i64>,
) -> Result<(), IntegrityViolation> {
    require_reference("subcategory", subcategory_id, subcategory_category_id.is_some())?;
    if subcategory_category_id != category_id {
        let mut err = IntegrityViolation::new(
            "subcategory_category_mismatch",
            format!("Subcategory {} is not part of the product's category", subcategory_id),
        )
        .with("subcategory_id", subcategory_id);
        if let Some(category_id) = category_id {
            err = err.with("category_id", category_id);
        }
        return Err(err);
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
