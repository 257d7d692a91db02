//! # Seed Data Loader
//!
//! Populates a database with demo dictionaries and one aggregate of each
//! root type, then prints the assembled views as JSON.
//!
//! ## Usage
//! ```bash
//! # In-memory database, English names
//! cargo run -p stockroom-db --bin seed
//!
//! # File database, Polish names
//! cargo run -p stockroom-db --bin seed -- --db ./stockroom_dev.db --lang pl
//!
//! # Path from STOCKROOM_DB_PATH
//! STOCKROOM_DB_PATH=./stockroom_dev.db cargo run -p stockroom-db --bin seed
//! ```
//!
//! ## Seeded Data
//! - Languages en / pl / de, currencies PLN and EUR
//! - Poland (Warsaw, Krakow) and Germany (Berlin), translated
//! - Two warehouses
//! - Category "Beverages" with subcategories "Juice" and "Water"
//! - A supplier with address, representative, bank account and contacts
//! - Two products with codes, images, stock and supplier prices
//! - A draft order over both products

use std::env;

use stockroom_core::{
    AddressInput, BankAccountInput, CategoryRequest, ContactInput, ContactKind, CounterpartyKind,
    CounterpartyRequest, Money, OrderItemInput, OrderRequest, OrderStatus, ProductCodeInput,
    ProductCodeKind, ProductImageInput, ProductRequest, ProductTranslationInput,
    RepresentativeInput, StockInput, SubcategoryInput, SupplierInput, TranslationInput,
};
use stockroom_db::{ConfigError, Database, DbConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn tr(lang: &str, name: &str) -> TranslationInput {
    TranslationInput {
        language_code: lang.to_string(),
        name: name.to_string(),
    }
}

/// Command-line path wins, then `STOCKROOM_DB_PATH`, then in-memory.
fn resolve_config(db_path: Option<String>) -> Result<DbConfig, ConfigError> {
    if let Some(path) = db_path {
        return Ok(DbConfig::new(path));
    }
    match DbConfig::from_env() {
        Ok(config) => Ok(config),
        Err(ConfigError::MissingRequired(_)) => Ok(DbConfig::in_memory()),
        Err(e) => Err(e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<String> = None;
    let mut lang = String::from("en");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--lang" | "-l" => {
                if i + 1 < args.len() {
                    lang = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockroom Seed Data Loader");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>     Database file path (default: STOCKROOM_DB_PATH or in-memory)");
                println!("  -l, --lang <CODE>   Language for printed views (default: en)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = resolve_config(db_path)?;
    info!(path = %config.database_path.display(), "Opening database");
    let db = Database::new(config).await?;

    if !db.categories().list("en").await?.is_empty() {
        info!("Database already seeded; delete the file to regenerate");
        return Ok(());
    }

    // -------------------------------------------------------------------------
    // Dictionaries
    // -------------------------------------------------------------------------
    let dict = db.dictionaries();
    dict.add_language("en", "English").await?;
    dict.add_language("pl", "Polski").await?;
    dict.add_language("de", "Deutsch").await?;
    dict.add_currency("PLN", "Polish zloty", "zł", 2).await?;
    dict.add_currency("EUR", "Euro", "€", 2).await?;

    let poland = dict
        .add_country("Poland", &[tr("pl", "Polska"), tr("de", "Polen")])
        .await?;
    let germany = dict
        .add_country("Germany", &[tr("pl", "Niemcy"), tr("de", "Deutschland")])
        .await?;
    let warsaw = dict.add_city(poland, "Warsaw", &[tr("pl", "Warszawa"), tr("de", "Warschau")]).await?;
    dict.add_city(poland, "Krakow", &[tr("pl", "Kraków"), tr("de", "Krakau")]).await?;
    dict.add_city(germany, "Berlin", &[]).await?;

    let main_wh = dict.add_warehouse("Main warehouse").await?;
    let north_wh = dict.add_warehouse("North depot").await?;
    info!("Dictionaries seeded");

    // -------------------------------------------------------------------------
    // Aggregates
    // -------------------------------------------------------------------------
    let beverages = db
        .categories()
        .create(&CategoryRequest {
            name: "Beverages".to_string(),
            translations: vec![tr("pl", "Napoje"), tr("de", "Getränke")],
            subcategories: vec![
                SubcategoryInput {
                    name: "Juice".to_string(),
                    translations: vec![tr("pl", "Soki"), tr("de", "Säfte")],
                },
                SubcategoryInput {
                    name: "Water".to_string(),
                    translations: vec![tr("pl", "Woda")],
                },
            ],
        })
        .await?;
    let category = db.categories().get(beverages, &lang).await?;
    let juice = category
        .as_ref()
        .and_then(|c| c.subcategories.first())
        .map(|s| s.id);

    let supplier = db
        .counterparties()
        .create(&CounterpartyRequest {
            name: "Hurtownia Nowak".to_string(),
            kind: CounterpartyKind::Supplier,
            tax_number: Some("PL5250001009".to_string()),
            addresses: vec![AddressInput {
                full_name: "Jan Nowak".to_string(),
                country_id: poland,
                city_id: warsaw,
                street: "Marszałkowska".to_string(),
                house: "10A".to_string(),
                apartment: Some("4".to_string()),
                postal_code: "00-590".to_string(),
                phone: Some("+48 22 555 01 01".to_string()),
            }],
            representatives: vec![RepresentativeInput {
                full_name: "Anna Kowalska".to_string(),
                position: Some("Account manager".to_string()),
                phone: None,
                email: Some("anna.kowalska@nowak.example".to_string()),
            }],
            bank_accounts: vec![BankAccountInput {
                bank_name: "PKO BP".to_string(),
                account_number: "PL61109010140000071219812874".to_string(),
                swift: Some("BPKOPLPW".to_string()),
                currency_code: "PLN".to_string(),
            }],
            contacts: vec![
                ContactInput {
                    kind: ContactKind::Email,
                    value: "biuro@nowak.example".to_string(),
                },
                ContactInput {
                    kind: ContactKind::Website,
                    value: "https://nowak.example".to_string(),
                },
            ],
            product_ids: vec![],
        })
        .await?;

    let mut product_ids = Vec::new();
    for (name, pl, ean, price, stock) in [
        ("Apple juice 1l", "Sok jabłkowy 1l", "5900001000011", 599, 120),
        ("Orange juice 1l", "Sok pomarańczowy 1l", "5900001000028", 649, 80),
    ] {
        let id = db
            .products()
            .create(&ProductRequest {
                name: name.to_string(),
                description: Some("Not from concentrate".to_string()),
                category_id: Some(beverages),
                subcategory_id: juice,
                currency_code: "PLN".to_string(),
                price: Money::from_minor(price),
                translations: vec![ProductTranslationInput {
                    language_code: "pl".to_string(),
                    name: pl.to_string(),
                    description: Some("Nie z koncentratu".to_string()),
                }],
                codes: vec![ProductCodeInput {
                    kind: ProductCodeKind::Ean,
                    code: ean.to_string(),
                }],
                images: vec![ProductImageInput {
                    url: format!("https://cdn.stockroom.example/{}.jpg", ean),
                    position: None,
                }],
                links: vec![],
                stock: vec![
                    StockInput {
                        warehouse_id: main_wh,
                        quantity: stock,
                    },
                    StockInput {
                        warehouse_id: north_wh,
                        quantity: stock / 4,
                    },
                ],
                suppliers: vec![SupplierInput {
                    counterparty_id: supplier,
                    purchase_price: Money::from_minor(price * 70 / 100),
                }],
            })
            .await?;
        product_ids.push(id);
    }

    let order = db
        .orders()
        .create(&OrderRequest {
            counterparty_id: supplier,
            status: OrderStatus::Draft,
            currency_code: "PLN".to_string(),
            notes: Some("Weekly restock".to_string()),
            items: product_ids
                .iter()
                .map(|&product_id| OrderItemInput {
                    product_id,
                    quantity: 24,
                    unit_price: Money::from_minor(420),
                })
                .collect(),
        })
        .await?;
    info!(supplier, products = product_ids.len(), order, "Aggregates seeded");

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------
    let mut products = Vec::new();
    for id in &product_ids {
        products.push(db.products().get(*id, &lang).await?);
    }
    let output = serde_json::json!({
        "category": category,
        "counterparty": db.counterparties().get(supplier, &lang).await?,
        "products": products,
        "order": db.orders().get(order, &lang).await?,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    db.close().await;
    Ok(())
}
