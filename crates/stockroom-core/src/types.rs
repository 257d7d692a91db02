//! # Domain Types
//!
//! Enumerations stored in root and child rows, and the localization value
//! types shared by requests and views.
//!
//! ## Localization Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  categories                      category_translations                 │
//! │  ┌────┬────────────┐             ┌─────────────┬──────┬──────────────┐ │
//! │  │ id │ name       │◄────────────│ category_id │ lang │ name         │ │
//! │  ├────┼────────────┤             ├─────────────┼──────┼──────────────┤ │
//! │  │ 1  │ Beverages  │             │ 1           │ pl   │ Napoje       │ │
//! │  └────┴────────────┘             │ 1           │ ru   │ Напитки      │ │
//! │                                  └─────────────┴──────┴──────────────┘ │
//! │                                                                         │
//! │  resolve(1, "pl") → LocalizedName { base: "Beverages", translated: Some("Napoje") }
//! │  resolve(1, "de") → LocalizedName { base: "Beverages", translated: None }
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Localization
// =============================================================================

/// Result of resolving an entity's name for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedName {
    /// Untranslated (default-language) value from the entity row.
    pub base: String,

    /// Translation for the requested language, if one exists.
    pub translated: Option<String>,
}

impl LocalizedName {
    /// The value to present: the translation when present, else the base.
    ///
    /// ## Example
    /// ```rust
    /// use stockroom_core::LocalizedName;
    ///
    /// let name = LocalizedName { base: "Milk".into(), translated: None };
    /// assert_eq!(name.display(), "Milk");
    /// ```
    pub fn display(&self) -> &str {
        self.translated.as_deref().unwrap_or(&self.base)
    }
}

/// A stored translation row (raw, as embedded in views).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Translation {
    pub language_code: String,
    pub name: String,
}

/// A product translation; products translate their description too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductTranslation {
    pub language_code: String,
    pub name: String,
    pub description: Option<String>,
}

// =============================================================================
// Counterparty Kind
// =============================================================================

/// Whether a counterparty supplies us, buys from us, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CounterpartyKind {
    Supplier,
    Customer,
    Both,
}

// =============================================================================
// Contact Kind
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Phone,
    Email,
    Fax,
    Website,
    Other,
}

// =============================================================================
// Product Code Kind
// =============================================================================

/// Kind of identifier printed on or assigned to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ProductCodeKind {
    /// EAN-8 / EAN-13 barcode.
    Ean,
    /// UPC-A barcode.
    Upc,
    /// Stock keeping unit.
    Sku,
    /// Supplier's own article number.
    Supplier,
}

// =============================================================================
// Order Status
// =============================================================================

/// The status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Being assembled; items may still change.
    Draft,
    /// Accepted by both sides.
    Confirmed,
    /// Left the warehouse.
    Shipped,
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Draft
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
