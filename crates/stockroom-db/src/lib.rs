//! # stockroom-db: Aggregate Persistence for Stockroom
//!
//! Reads nested, localized aggregates out of normalized SQLite tables and
//! writes them back under the replace-all-children and patch policies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Data Flow                              │
//! │                                                                         │
//! │  HTTP handler (PUT /counterparties/{id})                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  stockroom-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (aggregates)  │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Counterparty  │    │ 001_initial  │  │   │
//! │  │   │ DbConfig      │    │ Category      │    │   _schema    │  │   │
//! │  │   │ from_env()    │    │ Product/Order │    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                               │   │
//! │  │                        ┌───────▼───────┐                       │   │
//! │  │                        │ localization  │ base name + per-lang  │   │
//! │  │                        │   resolver    │ translation fallback  │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Error taxonomy and the boundary error body
//! - [`localization`] - Name resolution with default-language fallback
//! - [`repository`] - Aggregate repositories
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockroom_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//!
//! let id = db.categories().create(&request).await?;
//! let view = db.categories().get(id, "pl").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod localization;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, ErrorBody, ErrorKind};
pub use localization::{LocalizationRepository, TranslatedKind};
pub use pool::{ConfigError, Database, DbConfig};

// Repository re-exports for convenience
pub use repository::{
    CategoryRepository, CounterpartyRepository, DictionaryRepository, OrderRepository,
    ProductRepository,
};
