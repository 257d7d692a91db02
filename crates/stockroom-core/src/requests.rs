//! # Aggregate Requests
//!
//! Create / replace payloads: a tree of scalar fields plus named child
//! arrays. A replace submits the COMPLETE desired child set; children not
//! listed are deleted.
//!
//! Every request validates itself before any storage is touched:
//! ```text
//! CounterpartyRequest::validate()
//!   ├── name, tax_number               (Counterparty rules)
//!   ├── addresses[*]                   (Address rules)
//!   ├── representatives[*]             (Representative rules)
//!   ├── bank_accounts[*]               (BankAccount rules + currency code)
//!   └── contacts[*]                    (Contact rules)
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{ContactKind, CounterpartyKind, OrderStatus, ProductCodeKind};
use crate::error::ValidationError;
use crate::validation::{
    validate_currency_code, validate_field, validate_price, validate_quantity,
    validate_translation_languages, EntityKind, ValidationResult,
};

// =============================================================================
// Translations
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TranslationInput {
    pub language_code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductTranslationInput {
    pub language_code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn reject_duplicate_ids<I>(ids: I, field: &str, label: &str) -> ValidationResult<()>
where
    I: IntoIterator<Item = i64>,
{
    let mut seen = std::collections::BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ValidationError::new(
                format!("{}_duplicate", field),
                format!("{} {} is listed more than once", label, id),
            ));
        }
    }
    Ok(())
}

fn validate_translations(kind: EntityKind, translations: &[TranslationInput]) -> ValidationResult<()> {
    validate_translation_languages(translations.iter().map(|t| t.language_code.as_str()))?;
    for t in translations {
        validate_field(kind, "name", Some(&t.name))?;
    }
    Ok(())
}

// =============================================================================
// Counterparty
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub full_name: String,
    pub country_id: i64,
    pub city_id: i64,
    pub street: String,
    pub house: String,
    #[serde(default)]
    pub apartment: Option<String>,
    pub postal_code: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl AddressInput {
    pub fn validate(&self) -> ValidationResult<()> {
        let kind = EntityKind::Address;
        validate_field(kind, "full_name", Some(&self.full_name))?;
        validate_field(kind, "street", Some(&self.street))?;
        validate_field(kind, "house", Some(&self.house))?;
        validate_field(kind, "apartment", self.apartment.as_deref())?;
        validate_field(kind, "postal_code", Some(&self.postal_code))?;
        validate_field(kind, "phone", self.phone.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativeInput {
    pub full_name: String,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl RepresentativeInput {
    pub fn validate(&self) -> ValidationResult<()> {
        let kind = EntityKind::Representative;
        validate_field(kind, "full_name", Some(&self.full_name))?;
        validate_field(kind, "position", self.position.as_deref())?;
        validate_field(kind, "phone", self.phone.as_deref())?;
        validate_field(kind, "email", self.email.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BankAccountInput {
    pub bank_name: String,
    pub account_number: String,
    #[serde(default)]
    pub swift: Option<String>,
    pub currency_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ContactInput {
    pub kind: ContactKind,
    pub value: String,
}

/// Full counterparty aggregate, as submitted on create and replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyRequest {
    pub name: String,
    pub kind: CounterpartyKind,
    #[serde(default)]
    pub tax_number: Option<String>,
    #[serde(default)]
    pub addresses: Vec<AddressInput>,
    #[serde(default)]
    pub representatives: Vec<RepresentativeInput>,
    #[serde(default)]
    pub bank_accounts: Vec<BankAccountInput>,
    #[serde(default)]
    pub contacts: Vec<ContactInput>,
    /// Products this counterparty deals in.
    #[serde(default)]
    pub product_ids: Vec<i64>,
}

impl CounterpartyRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_field(EntityKind::Counterparty, "name", Some(&self.name))?;
        validate_field(EntityKind::Counterparty, "tax_number", self.tax_number.as_deref())?;

        for address in &self.addresses {
            address.validate()?;
        }
        for rep in &self.representatives {
            rep.validate()?;
        }
        for account in &self.bank_accounts {
            let kind = EntityKind::BankAccount;
            validate_field(kind, "bank_name", Some(&account.bank_name))?;
            validate_field(kind, "account_number", Some(&account.account_number))?;
            validate_field(kind, "swift", account.swift.as_deref())?;
            validate_currency_code(&account.currency_code)?;
        }
        for contact in &self.contacts {
            validate_field(EntityKind::Contact, "value", Some(&contact.value))?;
        }
        reject_duplicate_ids(self.product_ids.iter().copied(), "product_id", "Product")
    }
}

// =============================================================================
// Category
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryInput {
    pub name: String,
    #[serde(default)]
    pub translations: Vec<TranslationInput>,
}

/// Category aggregate: base name, translations, subcategories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRequest {
    pub name: String,
    #[serde(default)]
    pub translations: Vec<TranslationInput>,
    #[serde(default)]
    pub subcategories: Vec<SubcategoryInput>,
}

impl CategoryRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_field(EntityKind::Category, "name", Some(&self.name))?;
        validate_translations(EntityKind::Category, &self.translations)?;
        for sub in &self.subcategories {
            validate_field(EntityKind::Category, "name", Some(&sub.name))?;
            validate_translations(EntityKind::Category, &sub.translations)?;
        }
        Ok(())
    }
}

// =============================================================================
// Product
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductCodeInput {
    pub kind: ProductCodeKind,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductImageInput {
    pub url: String,
    /// Display position; defaults to the index in the submitted array.
    #[serde(default)]
    pub position: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductLinkInput {
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockInput {
    pub warehouse_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInput {
    pub counterparty_id: i64,
    pub purchase_price: Money,
}

/// Product aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub subcategory_id: Option<i64>,
    pub currency_code: String,
    pub price: Money,
    #[serde(default)]
    pub translations: Vec<ProductTranslationInput>,
    #[serde(default)]
    pub codes: Vec<ProductCodeInput>,
    #[serde(default)]
    pub images: Vec<ProductImageInput>,
    #[serde(default)]
    pub links: Vec<ProductLinkInput>,
    #[serde(default)]
    pub stock: Vec<StockInput>,
    #[serde(default)]
    pub suppliers: Vec<SupplierInput>,
}

impl ProductRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        let kind = EntityKind::Product;
        validate_field(kind, "name", Some(&self.name))?;
        validate_field(kind, "description", self.description.as_deref())?;
        validate_currency_code(&self.currency_code)?;
        validate_price(self.price)?;

        validate_translation_languages(self.translations.iter().map(|t| t.language_code.as_str()))?;
        for t in &self.translations {
            validate_field(kind, "name", Some(&t.name))?;
            validate_field(kind, "description", t.description.as_deref())?;
        }
        for code in &self.codes {
            validate_field(EntityKind::ProductCode, "code", Some(&code.code))?;
        }
        for image in &self.images {
            validate_field(EntityKind::ProductLink, "url", Some(&image.url))?;
        }
        for link in &self.links {
            validate_field(EntityKind::ProductLink, "title", link.title.as_deref())?;
            validate_field(EntityKind::ProductLink, "url", Some(&link.url))?;
        }
        for row in &self.stock {
            validate_quantity(row.quantity, true)?;
        }
        reject_duplicate_ids(self.stock.iter().map(|s| s.warehouse_id), "warehouse_id", "Warehouse")?;
        for supplier in &self.suppliers {
            validate_price(supplier.purchase_price)?;
        }
        reject_duplicate_ids(
            self.suppliers.iter().map(|s| s.counterparty_id),
            "counterparty_id",
            "Supplier",
        )
    }
}

// =============================================================================
// Order
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
}

/// Order aggregate: header plus line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub counterparty_id: i64,
    #[serde(default)]
    pub status: OrderStatus,
    pub currency_code: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItemInput>,
}

impl OrderRequest {
    pub fn validate(&self) -> ValidationResult<()> {
        validate_currency_code(&self.currency_code)?;
        validate_field(EntityKind::Order, "notes", self.notes.as_deref())?;
        let mut total = Money::zero();
        for item in &self.items {
            validate_quantity(item.quantity, false)?;
            validate_price(item.unit_price)?;
            let line = item.unit_price.checked_mul_quantity(item.quantity).ok_or_else(|| {
                ValidationError::new("price_invalid", "Line total exceeds the representable amount")
            })?;
            total = total.checked_add(line).ok_or_else(|| {
                ValidationError::new(
                    "order_total_overflow",
                    "Order total exceeds the representable amount",
                )
            })?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> AddressInput {
        AddressInput {
            full_name: "Jan Kowalski".to_string(),
            country_id: 1,
            city_id: 1,
            street: "Marszałkowska".to_string(),
            house: "10A".to_string(),
            apartment: None,
            postal_code: "00-001".to_string(),
            phone: Some("+48 22 000 00 00".to_string()),
        }
    }

    #[test]
    fn test_counterparty_request_from_json() {
        let req: CounterpartyRequest = serde_json::from_value(serde_json::json!({
            "name": "Hurtownia Nowak",
            "kind": "supplier",
            "addresses": [{
                "fullName": "Jan Kowalski", "countryId": 1, "cityId": 2,
                "street": "Prosta", "house": "5", "postalCode": "00-838"
            }]
        }))
        .unwrap();
        assert_eq!(req.addresses.len(), 1);
        assert!(req.representatives.is_empty());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_counterparty_request_reports_nested_failure() {
        let mut bad = address();
        bad.postal_code = "1".to_string();
        let req = CounterpartyRequest {
            name: "Hurtownia Nowak".to_string(),
            kind: CounterpartyKind::Supplier,
            tax_number: None,
            addresses: vec![address(), bad],
            representatives: vec![],
            bank_accounts: vec![],
            contacts: vec![],
            product_ids: vec![],
        };
        assert_eq!(req.validate().unwrap_err().code, "postal_code_length");
    }

    #[test]
    fn test_category_request_checks_translations() {
        let req = CategoryRequest {
            name: "Beverages".to_string(),
            translations: vec![
                TranslationInput { language_code: "pl".into(), name: "Napoje".into() },
                TranslationInput { language_code: "pl".into(), name: "Napoje 2".into() },
            ],
            subcategories: vec![],
        };
        assert_eq!(req.validate().unwrap_err().code, "translation_language_duplicate");
    }

    #[test]
    fn test_product_request_rejects_negative_price() {
        let req: ProductRequest = serde_json::from_value(serde_json::json!({
            "name": "Milk 1l", "currencyCode": "PLN", "price": -1
        }))
        .unwrap();
        assert_eq!(req.validate().unwrap_err().code, "price_invalid");
    }

    #[test]
    fn test_product_request_rejects_repeated_warehouse() {
        let req: ProductRequest = serde_json::from_value(serde_json::json!({
            "name": "Milk 1l", "currencyCode": "PLN", "price": 349,
            "stock": [{ "warehouseId": 1, "quantity": 5 }, { "warehouseId": 1, "quantity": 2 }]
        }))
        .unwrap();
        assert_eq!(req.validate().unwrap_err().code, "warehouse_id_duplicate");
    }

    #[test]
    fn test_order_request_rejects_zero_quantity() {
        let req: OrderRequest = serde_json::from_value(serde_json::json!({
            "counterpartyId": 1, "currencyCode": "PLN",
            "items": [{ "productId": 1, "quantity": 0, "unitPrice": 100 }]
        }))
        .unwrap();
        assert_eq!(req.status, OrderStatus::Draft);
        assert_eq!(req.validate().unwrap_err().code, "quantity_invalid");
    }

    fn order_with(items: &[(i64, i64)]) -> OrderRequest {
        OrderRequest {
            counterparty_id: 1,
            status: OrderStatus::Draft,
            currency_code: "PLN".to_string(),
            notes: None,
            items: items
                .iter()
                .map(|&(unit_price, quantity)| OrderItemInput {
                    product_id: 1,
                    quantity,
                    unit_price: Money::from_minor(unit_price),
                })
                .collect(),
        }
    }

    #[test]
    fn test_order_request_rejects_unrepresentable_totals() {
        let line = order_with(&[(i64::MAX / 2, 3)]);
        assert_eq!(line.validate().unwrap_err().code, "price_invalid");

        let total = order_with(&[(i64::MAX / 2 + 10, 1), (i64::MAX / 2 + 10, 1)]);
        assert_eq!(total.validate().unwrap_err().code, "order_total_overflow");

        assert!(order_with(&[(1099, 3), (450, 1)]).validate().is_ok());
    }
}
