//! Aggregate read / replace / patch behaviour against an in-memory database.

use std::collections::BTreeSet;

use serde_json::json;
use stockroom_core::validation::{validate_field, EntityKind};
use stockroom_core::{
    AddressInput, AddressPatch, CategoryRequest, ContactInput, ContactKind, CounterpartyKind,
    CounterpartyRequest, CounterpartyView, Patch, RepresentativeInput, SubcategoryInput,
    TranslationInput,
};
use stockroom_db::{Database, DbConfig, DbError, ErrorBody, ErrorKind};

// =============================================================================
// Fixtures
// =============================================================================

struct World {
    db: Database,
    poland: i64,
    warsaw: i64,
    krakow: i64,
}

async fn world() -> World {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let dict = db.dictionaries();
    dict.add_currency("PLN", "Polish zloty", "zł", 2).await.unwrap();
    let poland = dict
        .add_country("Poland", &[tr("pl", "Polska")])
        .await
        .unwrap();
    let warsaw = dict
        .add_city(poland, "Warsaw", &[tr("pl", "Warszawa")])
        .await
        .unwrap();
    let krakow = dict.add_city(poland, "Krakow", &[]).await.unwrap();
    World {
        db,
        poland,
        warsaw,
        krakow,
    }
}

fn tr(lang: &str, name: &str) -> TranslationInput {
    TranslationInput {
        language_code: lang.to_string(),
        name: name.to_string(),
    }
}

fn address(w: &World, full_name: &str, street: &str, city_id: i64) -> AddressInput {
    AddressInput {
        full_name: full_name.to_string(),
        country_id: w.poland,
        city_id,
        street: street.to_string(),
        house: "12".to_string(),
        apartment: None,
        postal_code: "00-950".to_string(),
        phone: None,
    }
}

fn counterparty(addresses: Vec<AddressInput>) -> CounterpartyRequest {
    CounterpartyRequest {
        name: "Hurtownia Nowak".to_string(),
        kind: CounterpartyKind::Both,
        tax_number: None,
        addresses,
        representatives: vec![
            RepresentativeInput {
                full_name: "Anna Nowak".to_string(),
                position: None,
                phone: None,
                email: None,
            },
            RepresentativeInput {
                full_name: "Piotr Zieliński".to_string(),
                position: Some("Driver".to_string()),
                phone: Some("+48 600 100 200".to_string()),
                email: None,
            },
        ],
        bank_accounts: vec![],
        contacts: vec![ContactInput {
            kind: ContactKind::Email,
            value: "biuro@nowak.example".to_string(),
        }],
        product_ids: vec![],
    }
}

fn streets(view: &CounterpartyView) -> BTreeSet<String> {
    view.addresses.iter().map(|a| a.street.clone()).collect()
}

async fn address_count(db: &Database) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM addresses")
        .fetch_one(db.pool())
        .await
        .unwrap()
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_emoji_in_full_name_is_invalid() {
    let err = validate_field(EntityKind::Address, "fullName", Some("John 💩")).unwrap_err();
    assert_eq!(err.code, "full_name_invalid");
}

#[test]
fn test_short_postal_code_is_length_error() {
    let err = validate_field(EntityKind::Address, "postalCode", Some("1")).unwrap_err();
    assert_eq!(err.code, "postal_code_length");
}

// =============================================================================
// Patch
// =============================================================================

#[tokio::test]
async fn test_patch_updates_only_named_fields() {
    let w = world().await;
    let repo = w.db.counterparties();
    let id = repo
        .create(&counterparty(vec![address(&w, "Jan Kowalski", "Prosta", w.warsaw)]))
        .await
        .unwrap();
    let before = repo.get(id, "en").await.unwrap().unwrap();
    let address_id = before.addresses[0].id;

    let patch: AddressPatch = serde_json::from_value(json!({
        "fullName": "Jane Updated",
        "postalCode": "11-111"
    }))
    .unwrap();
    repo.patch_address(id, Some(address_id), &patch).await.unwrap();

    let after = repo.get(id, "en").await.unwrap().unwrap();
    let (old, new) = (&before.addresses[0], &after.addresses[0]);
    assert_eq!(new.full_name, "Jane Updated");
    assert_eq!(new.postal_code, "11-111");
    assert_eq!(new.street, old.street);
    assert_eq!(new.house, old.house);
    assert_eq!(new.city, old.city);
    assert_eq!(after.representatives, before.representatives);
}

#[tokio::test]
async fn test_rejected_patch_leaves_storage_unchanged() {
    let w = world().await;
    let repo = w.db.counterparties();
    let id = repo
        .create(&counterparty(vec![address(&w, "Jan Kowalski", "Prosta", w.warsaw)]))
        .await
        .unwrap();
    let before = repo.get(id, "en").await.unwrap().unwrap();
    let address_id = before.addresses[0].id;

    // Each input trips exactly one stage: required, length, pattern, structural.
    let cases = [
        (json!({ "fullName": "   " }), "full_name_required"),
        (json!({ "fullName": "J".repeat(101) }), "full_name_too_long"),
        (json!({ "fullName": "John 💩" }), "full_name_invalid"),
        (json!({ "fullName": "Jane  Doe" }), "full_name_double_space"),
        (json!({ "postalCode": "1" }), "postal_code_length"),
        // First failing field in declaration order wins.
        (json!({ "postalCode": "1", "fullName": "J" }), "full_name_too_short"),
    ];
    for (body, code) in cases {
        let patch: AddressPatch = serde_json::from_value(body).unwrap();
        let err = repo.patch_address(id, Some(address_id), &patch).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.code(), code);
    }

    let after = repo.get(id, "en").await.unwrap().unwrap();
    assert_eq!(after.addresses, before.addresses);
}

#[tokio::test]
async fn test_patch_null_clears_optional_field() {
    let w = world().await;
    let repo = w.db.counterparties();
    let mut input = address(&w, "Jan Kowalski", "Prosta", w.warsaw);
    input.apartment = Some("7".to_string());
    let id = repo.create(&counterparty(vec![input])).await.unwrap();
    let address_id = repo.get(id, "en").await.unwrap().unwrap().addresses[0].id;

    let patch = AddressPatch {
        apartment: Patch::Null,
        city_id: Patch::Value(w.krakow),
        ..AddressPatch::default()
    };
    repo.patch_address(id, Some(address_id), &patch).await.unwrap();

    let view = repo.get(id, "en").await.unwrap().unwrap();
    assert_eq!(view.addresses[0].apartment, None);
    assert_eq!(view.addresses[0].city.name, "Krakow");
    assert_eq!(view.addresses[0].street, "Prosta");
}

// =============================================================================
// Read / Replace
// =============================================================================

#[tokio::test]
async fn test_create_then_get_is_set_equal() {
    let w = world().await;
    let repo = w.db.counterparties();
    let request = counterparty(vec![
        address(&w, "Jan Kowalski", "Prosta", w.warsaw),
        address(&w, "Ewa Wiśniewska", "Długa", w.krakow),
    ]);
    let id = repo.create(&request).await.unwrap();

    let view = repo.get(id, "en").await.unwrap().unwrap();
    let expected: BTreeSet<String> = request.addresses.iter().map(|a| a.street.clone()).collect();
    assert_eq!(streets(&view), expected);

    let names: BTreeSet<_> = view.representatives.iter().map(|r| r.full_name.clone()).collect();
    let expected: BTreeSet<_> = request.representatives.iter().map(|r| r.full_name.clone()).collect();
    assert_eq!(names, expected);
    assert_eq!(view.contacts.len(), request.contacts.len());
    assert_eq!(view.kind, CounterpartyKind::Both);
}

#[tokio::test]
async fn test_replace_drops_previous_children() {
    let w = world().await;
    let repo = w.db.counterparties();
    let id = repo
        .create(&counterparty(vec![
            address(&w, "Jan Kowalski", "Aleja A", w.warsaw),
            address(&w, "Jan Kowalski", "Aleja B", w.warsaw),
        ]))
        .await
        .unwrap();
    let old_ids: Vec<i64> = repo
        .get(id, "en")
        .await
        .unwrap()
        .unwrap()
        .addresses
        .iter()
        .map(|a| a.id)
        .collect();

    repo.replace(id, &counterparty(vec![address(&w, "Jan Kowalski", "Aleja C", w.krakow)]))
        .await
        .unwrap();

    let view = repo.get(id, "en").await.unwrap().unwrap();
    assert_eq!(view.addresses.len(), 1);
    assert_eq!(view.addresses[0].street, "Aleja C");
    assert!(!old_ids.contains(&view.addresses[0].id));
    assert_eq!(address_count(&w.db).await, 1);
}

#[tokio::test]
async fn test_replace_twice_is_idempotent() {
    let w = world().await;
    let repo = w.db.counterparties();
    let id = repo.create(&counterparty(vec![])).await.unwrap();

    let request = counterparty(vec![
        address(&w, "Jan Kowalski", "Prosta", w.warsaw),
        address(&w, "Jan Kowalski", "Krzywa", w.krakow),
    ]);
    repo.replace(id, &request).await.unwrap();
    let first = repo.get(id, "en").await.unwrap().unwrap();
    repo.replace(id, &request).await.unwrap();
    let second = repo.get(id, "en").await.unwrap().unwrap();

    assert_eq!(streets(&first), streets(&second));
    assert_eq!(first.representatives.len(), second.representatives.len());
    assert_eq!(address_count(&w.db).await, 2);
}

#[tokio::test]
async fn test_replace_failing_mid_insert_keeps_previous_aggregate() {
    let w = world().await;
    let repo = w.db.counterparties();
    let id = repo
        .create(&counterparty(vec![
            address(&w, "Jan Kowalski", "Prosta", w.warsaw),
            address(&w, "Jan Kowalski", "Krzywa", w.krakow),
        ]))
        .await
        .unwrap();
    let before = repo.get(id, "en").await.unwrap().unwrap();

    // Storage refuses one address row after the old children are gone.
    sqlx::query(
        "CREATE TRIGGER reject_blocked_street BEFORE INSERT ON addresses \
         WHEN NEW.street = 'Zablokowana' \
         BEGIN SELECT RAISE(ABORT, 'address rejected'); END",
    )
    .execute(w.db.pool())
    .await
    .unwrap();

    let mut request = counterparty(vec![
        address(&w, "Ewa Wiśniewska", "Nowa", w.warsaw),
        address(&w, "Ewa Wiśniewska", "Zablokowana", w.warsaw),
    ]);
    request.name = "Hurtownia Nowak i Syn".to_string();
    let err = repo.replace(id, &request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert_eq!(err.code(), "storage_error");

    let after = repo.get(id, "en").await.unwrap().unwrap();
    assert_eq!(after.name, before.name);
    assert_eq!(after.addresses, before.addresses);
    assert_eq!(after.representatives, before.representatives);
    assert_eq!(after.contacts, before.contacts);
    assert_eq!(after.updated_at, before.updated_at);
    assert_eq!(address_count(&w.db).await, 2);
}

#[tokio::test]
async fn test_unknown_language_falls_back_to_base_name() {
    let w = world().await;
    let repo = w.db.counterparties();
    let id = repo
        .create(&counterparty(vec![address(&w, "Jan Kowalski", "Prosta", w.warsaw)]))
        .await
        .unwrap();

    let pl = repo.addresses(id, "pl").await.unwrap().unwrap();
    assert_eq!(pl[0].city.display_name, "Warszawa");
    assert_eq!(pl[0].country.display_name, "Polska");

    let xx = repo.addresses(id, "xx").await.unwrap().unwrap();
    assert_eq!(xx[0].city.display_name, "Warsaw");
    assert_eq!(xx[0].country.display_name, "Poland");

    assert!(repo.addresses(id + 1, "en").await.unwrap().is_none());
}

#[tokio::test]
async fn test_embedded_places_carry_translation_lists() {
    let w = world().await;
    let repo = w.db.counterparties();
    let id = repo
        .create(&counterparty(vec![
            address(&w, "Jan Kowalski", "Prosta", w.warsaw),
            address(&w, "Jan Kowalski", "Długa", w.krakow),
        ]))
        .await
        .unwrap();

    let pl = repo.addresses(id, "pl").await.unwrap().unwrap();
    let city_langs: Vec<_> = pl[0]
        .city
        .translations
        .iter()
        .map(|t| (t.language_code.as_str(), t.name.as_str()))
        .collect();
    assert_eq!(city_langs, vec![("pl", "Warszawa")]);
    assert_eq!(pl[0].country.translations[0].name, "Polska");

    // The list does not depend on the requested language.
    let en = repo.addresses(id, "en").await.unwrap().unwrap();
    assert_eq!(en[0].city.translations, pl[0].city.translations);
    assert!(en[1].city.translations.is_empty());
}

// =============================================================================
// Conflicts
// =============================================================================

#[tokio::test]
async fn test_duplicate_category_reports_existing_id() {
    let w = world().await;
    let repo = w.db.categories();
    let request = |name: &str| CategoryRequest {
        name: name.to_string(),
        translations: vec![],
        subcategories: vec![SubcategoryInput {
            name: "Juice".to_string(),
            translations: vec![],
        }],
    };
    let existing = repo.create(&request("Beverages")).await.unwrap();

    let err = repo.create(&request("beverages")).await.unwrap_err();
    assert!(matches!(
        &err,
        DbError::Conflict { entity, existing_id } if entity == "category" && *existing_id == existing
    ));

    let body = ErrorBody::from(&err);
    assert_eq!(body.kind, ErrorKind::Conflict);
    assert_eq!(body.code, "category_exists");
    assert_eq!(body.existing_id, Some(existing));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(w.db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}
