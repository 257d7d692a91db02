//! # Error Types
//!
//! Domain-specific error types for stockroom-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stockroom-core errors (this file)                                      │
//! │  ├── ValidationError     - a field failed a registered rule             │
//! │  └── IntegrityViolation  - a cross-entity invariant failed              │
//! │                                                                         │
//! │  stockroom-db errors (separate crate)                                   │
//! │  └── DbError             - full taxonomy incl. NotFound / Conflict      │
//! │                                                                         │
//! │  Flow: ValidationError → DbError::Validation → boundary (400)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Every error carries a machine-stable `code` (e.g. `postal_code_invalid`)
//! 2. `message` is human-readable and fixed to English
//! 3. Validation never panics; it returns `Err` on the first failed rule

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// Validation Error
// =============================================================================

/// A client-supplied value failed a registered rule.
///
/// ## Serialization
/// ```json
/// { "code": "full_name_invalid", "message": "Full name contains characters that are not allowed" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} ({code})")]
pub struct ValidationError {
    /// Machine-stable code, `<field>_<rule>`.
    pub code: String,

    /// Human-readable message (not localized).
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            code: code.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Integrity Violation
// =============================================================================

/// A cross-entity invariant failed.
///
/// Treated like a validation failure by callers, but carries the ids that
/// were found to be inconsistent.
///
/// ## Example
/// ```text
/// city_id = 7 belongs to country 2, request says country_id = 1
///      │
///      ▼
/// IntegrityViolation {
///     code: "city_country_mismatch",
///     context: { "city_id": 7, "country_id": 1, "city_country_id": 2 }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} ({code})")]
pub struct IntegrityViolation {
    pub code: String,
    pub message: String,
    pub context: BTreeMap<String, i64>,
}

impl IntegrityViolation {
    /// Creates an integrity violation without relational context.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        IntegrityViolation {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    /// Attaches an id to the violation context.
    pub fn with(mut self, key: impl Into<String>, id: i64) -> Self {
        self.context.insert(key.into(), id);
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
