//! # stockroom-core: Pure Domain Logic for Stockroom
//!
//! Everything the aggregate layer needs that does not touch storage:
//! request and view shapes, typed patches, money, and the validation engine.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockroom Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            HTTP boundary (routing, auth, files)                 │   │
//! │  │   decodes JSON ──► CounterpartyRequest / AddressPatch / ...     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ stockroom-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ requests  │  │   views   │  │   patch   │  │validation │  │   │
//! │  │   │  create / │  │ aggregate │  │ Patch<T>  │  │ registry  │  │   │
//! │  │   │  replace  │  │  trees    │  │ presence  │  │ per field │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              stockroom-db (aggregate repositories)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain enums and localization value types
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`requests`] - Create / replace request trees
//! - [`views`] - Denormalized aggregate views
//! - [`patch`] - Typed partial updates (`Patch<T>`)
//! - [`validation`] - Field rule registry and validators
//! - [`integrity`] - Cross-entity invariants (city belongs to country, ...)
//! - [`error`] - Validation and integrity error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockroom_core::validation::{validate_field, EntityKind};
//!
//! let err = validate_field(EntityKind::Address, "postal_code", Some("1")).unwrap_err();
//! assert_eq!(err.code, "postal_code_length");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod integrity;
pub mod money;
pub mod patch;
pub mod requests;
pub mod types;
pub mod validation;
pub mod views;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{IntegrityViolation, ValidationError};
pub use money::Money;
pub use patch::{AddressPatch, Patch, RepresentativePatch};
pub use requests::*;
pub use types::*;
pub use views::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Language of the base (untranslated) columns.
///
/// Translation tables never hold a row for this language; requesting it
/// always resolves to the base value.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Maximum quantity on a single order line or stock row.
pub const MAX_QUANTITY: i64 = 1_000_000;
