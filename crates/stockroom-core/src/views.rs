//! # Aggregate Views
//!
//! Denormalized response trees, one per root row. Every localized entity
//! carries its base name, the name to display for the requested language,
//! and (where the entity owns translations) the raw translation list, so a
//! client can render any language without a second round trip.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{
    ContactKind, CounterpartyKind, OrderStatus, ProductCodeKind, ProductTranslation, Translation,
};

/// Reference to a named entity (country, city, category, product ...).
///
/// Entities without translation tables (warehouses, counterparties) carry
/// an empty `translations` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NamedRef {
    pub id: i64,
    /// Base (default-language) name.
    pub name: String,
    /// Translated name, or the base name when no translation exists.
    pub display_name: String,
    /// Every stored translation, ordered by language code.
    #[serde(default)]
    pub translations: Vec<Translation>,
}

// =============================================================================
// Counterparty
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AddressView {
    pub id: i64,
    pub counterparty_id: i64,
    pub full_name: String,
    pub country: NamedRef,
    pub city: NamedRef,
    pub street: String,
    pub house: String,
    pub apartment: Option<String>,
    pub postal_code: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativeView {
    pub id: i64,
    pub full_name: String,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountView {
    pub id: i64,
    pub bank_name: String,
    pub account_number: String,
    pub swift: Option<String>,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ContactView {
    pub id: i64,
    pub kind: ContactKind,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyView {
    pub id: i64,
    pub name: String,
    pub kind: CounterpartyKind,
    pub tax_number: Option<String>,
    pub addresses: Vec<AddressView>,
    pub representatives: Vec<RepresentativeView>,
    pub bank_accounts: Vec<BankAccountView>,
    pub contacts: Vec<ContactView>,
    pub products: Vec<NamedRef>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryView {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub translations: Vec<Translation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategoryView {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub translations: Vec<Translation>,
    pub subcategories: Vec<SubcategoryView>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyView {
    pub code: String,
    pub name: String,
    pub symbol: String,
    /// Decimal places of the minor unit (2 for PLN, 0 for JPY).
    pub minor_units: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductCodeView {
    pub id: i64,
    pub kind: ProductCodeKind,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductImageView {
    pub id: i64,
    pub url: String,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductLinkView {
    pub id: i64,
    pub title: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockView {
    pub warehouse: NamedRef,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SupplierView {
    pub counterparty: NamedRef,
    pub purchase_price: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub description: Option<String>,
    /// Translated description, falling back to the base description.
    pub display_description: Option<String>,
    pub translations: Vec<ProductTranslation>,
    pub category: Option<NamedRef>,
    pub subcategory: Option<NamedRef>,
    pub currency: CurrencyView,
    pub price: Money,
    pub codes: Vec<ProductCodeView>,
    pub images: Vec<ProductImageView>,
    pub links: Vec<ProductLinkView>,
    pub stock: Vec<StockView>,
    /// Sum of `stock[*].quantity`.
    pub total_stock: i64,
    pub suppliers: Vec<SupplierView>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Order
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemView {
    pub id: i64,
    pub product: NamedRef,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: i64,
    pub counterparty: NamedRef,
    pub status: OrderStatus,
    pub currency_code: String,
    pub notes: Option<String>,
    pub items: Vec<OrderItemView>,
    pub total: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}
