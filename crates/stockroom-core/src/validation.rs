//! # Validation Module
//!
//! Field-level validation for request trees and patches.
//!
//! ## Rule Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 One field, four rules, first failure wins               │
//! │                                                                         │
//! │  value ──► 1. required    blank / null on a required field             │
//! │            │               → "<field>_required"                         │
//! │            ▼                                                            │
//! │            2. length      trimmed char count outside [min, max]         │
//! │            │               → "<field>_too_short" / "<field>_too_long"   │
//! │            │                 or "<field>_length" (combined bound)       │
//! │            ▼                                                            │
//! │            3. pattern     allow-list character class                    │
//! │            │               → "<field>_invalid"                          │
//! │            ▼                                                            │
//! │            4. structural  no consecutive whitespace,                    │
//! │                           no emoji / control / newline                  │
//! │                            → "<field>_double_space"                     │
//! │                            → "<field>_forbidden_chars"                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The order is part of the contract: for any input the failing code can be
//! predicted from the table above.
//!
//! ## Usage
//! ```rust
//! use stockroom_core::validation::{validate_field, EntityKind};
//!
//! let err = validate_field(EntityKind::Address, "full_name", Some("John 💩")).unwrap_err();
//! assert_eq!(err.code, "full_name_invalid");
//!
//! // Unknown fields are ignored.
//! assert!(validate_field(EntityKind::Address, "nickname", Some("💩")).is_ok());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Character Classes
// =============================================================================

/// Allow-list pattern a field's value must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Letters in any script, space, hyphen, apostrophe, dot.
    PersonName,
    /// Letters, digits and common address punctuation.
    Street,
    /// Letters, digits, hyphen, slash, space ("12A", "4/2").
    House,
    /// ASCII letters, digits, hyphen, space ("11-111", "SW1A 1AA").
    PostalCode,
    /// Digits and `+ - ( )` and space; at least one digit.
    Phone,
    /// `local@domain` made of ASCII letters, digits and `. _ - +`.
    Email,
    /// ASCII letters, digits and `- _ . /` and space.
    Code,
    /// `http://` or `https://` followed by non-whitespace.
    Url,
    /// Free text; only the structural checks apply.
    Text,
}

impl CharClass {
    /// Returns true when `value` matches the pattern.
    pub fn matches(self, value: &str) -> bool {
        match self {
            CharClass::PersonName => value
                .chars()
                .all(|c| c.is_alphabetic() || matches!(c, ' ' | '-' | '\'' | '.')),
            CharClass::Street => value.chars().all(|c| {
                c.is_alphanumeric()
                    || matches!(c, ' ' | '-' | '\'' | '.' | ',' | '/' | '"' | '(' | ')' | '№')
            }),
            CharClass::House => value
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '-' | '/' | ' ')),
            CharClass::PostalCode => value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | ' ')),
            CharClass::Phone => {
                value.chars().any(|c| c.is_ascii_digit())
                    && value
                        .chars()
                        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | ' '))
            }
            CharClass::Email => {
                let allowed =
                    |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+');
                match value.split_once('@') {
                    Some((local, domain)) => {
                        !local.is_empty()
                            && domain.contains('.')
                            && !domain.starts_with('.')
                            && !domain.ends_with('.')
                            && local.chars().all(allowed)
                            && domain.chars().all(allowed)
                    }
                    None => false,
                }
            }
            CharClass::Code => value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ' ')),
            CharClass::Url => {
                let rest = value
                    .strip_prefix("https://")
                    .or_else(|| value.strip_prefix("http://"));
                matches!(rest, Some(r) if !r.is_empty() && !r.chars().any(char::is_whitespace))
            }
            CharClass::Text => true,
        }
    }
}

// =============================================================================
// Field Rules
// =============================================================================

/// How length failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthCode {
    /// `<field>_too_short` / `<field>_too_long`
    Split,
    /// `<field>_length` for both bounds
    Combined,
}

/// A validation rule bound to one field name.
///
/// Rules are plain data; [`FieldRule::check`] applies them in the fixed
/// required → length → pattern → structural order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// snake_case field identifier, also the code prefix.
    pub field: &'static str,
    /// Human label used in messages.
    pub label: &'static str,
    pub required: bool,
    pub min_len: usize,
    pub max_len: usize,
    pub length_code: LengthCode,
    pub pattern: CharClass,
}

impl FieldRule {
    const fn new(
        field: &'static str,
        label: &'static str,
        required: bool,
        min_len: usize,
        max_len: usize,
        pattern: CharClass,
    ) -> Self {
        FieldRule {
            field,
            label,
            required,
            min_len,
            max_len,
            length_code: LengthCode::Split,
            pattern,
        }
    }

    const fn combined_length(mut self) -> Self {
        self.length_code = LengthCode::Combined;
        self
    }

    fn error(&self, rule: &str, message: String) -> ValidationError {
        ValidationError::new(format!("{}_{}", self.field, rule), message)
    }

    /// Validates one value against this rule.
    ///
    /// `None` stands for an explicit null. Blank values on optional fields
    /// are accepted without further checks.
    pub fn check(&self, value: Option<&str>) -> ValidationResult<()> {
        let trimmed = value.map(str::trim).unwrap_or("");

        if trimmed.is_empty() {
            if self.required {
                return Err(self.error("required", format!("{} is required", self.label)));
            }
            return Ok(());
        }

        // Every stage sees the value as it will be stored.
        let len = trimmed.chars().count();
        if len < self.min_len || len > self.max_len {
            return Err(match self.length_code {
                LengthCode::Combined => self.error(
                    "length",
                    format!(
                        "{} must be between {} and {} characters",
                        self.label, self.min_len, self.max_len
                    ),
                ),
                LengthCode::Split if len < self.min_len => self.error(
                    "too_short",
                    format!("{} must be at least {} characters", self.label, self.min_len),
                ),
                LengthCode::Split => self.error(
                    "too_long",
                    format!("{} must be at most {} characters", self.label, self.max_len),
                ),
            });
        }

        if !self.pattern.matches(trimmed) {
            return Err(self.error(
                "invalid",
                format!("{} contains characters that are not allowed", self.label),
            ));
        }

        if has_consecutive_whitespace(trimmed) {
            return Err(self.error(
                "double_space",
                format!("{} must not contain consecutive spaces", self.label),
            ));
        }

        if trimmed.chars().any(is_forbidden_char) {
            return Err(self.error(
                "forbidden_chars",
                format!("{} must not contain emoji, control characters or line breaks", self.label),
            ));
        }

        Ok(())
    }
}

/// Two whitespace characters in a row (" ", "\t ", ...).
fn has_consecutive_whitespace(value: &str) -> bool {
    let mut prev_ws = false;
    for c in value.chars() {
        let ws = c.is_whitespace();
        if ws && prev_ws {
            return true;
        }
        prev_ws = ws;
    }
    false
}

/// Control characters (newlines included) and emoji code points.
fn is_forbidden_char(c: char) -> bool {
    c.is_control()
        || matches!(
            c as u32,
            0x1F000..=0x1FAFF    // pictographs, emoticons, transport, flags
                | 0x2600..=0x27BF // misc symbols, dingbats
                | 0x2B00..=0x2BFF // arrows, stars
                | 0xFE00..=0xFE0F // variation selectors
                | 0x200D          // zero width joiner
                | 0xE0000..=0xE007F // tags
        )
}

// =============================================================================
// Rule Registry
// =============================================================================

/// Entity types with a registered rule-set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Address,
    Representative,
    Counterparty,
    BankAccount,
    Contact,
    Category,
    Product,
    ProductCode,
    ProductLink,
    Order,
    /// Dictionary entries: countries, cities, warehouses, currencies.
    Dictionary,
}

const ADDRESS_RULES: &[FieldRule] = &[
    FieldRule::new("full_name", "Full name", true, 2, 100, CharClass::PersonName),
    FieldRule::new("street", "Street", true, 2, 120, CharClass::Street),
    FieldRule::new("house", "House", true, 1, 10, CharClass::House),
    FieldRule::new("apartment", "Apartment", false, 1, 10, CharClass::House),
    FieldRule::new("postal_code", "Postal code", true, 3, 10, CharClass::PostalCode)
        .combined_length(),
    FieldRule::new("phone", "Phone", false, 5, 20, CharClass::Phone).combined_length(),
];

const REPRESENTATIVE_RULES: &[FieldRule] = &[
    FieldRule::new("full_name", "Full name", true, 2, 100, CharClass::PersonName),
    FieldRule::new("position", "Position", false, 2, 100, CharClass::Text),
    FieldRule::new("phone", "Phone", false, 5, 20, CharClass::Phone).combined_length(),
    FieldRule::new("email", "Email", false, 5, 254, CharClass::Email),
];

const COUNTERPARTY_RULES: &[FieldRule] = &[
    FieldRule::new("name", "Name", true, 2, 200, CharClass::Text),
    FieldRule::new("tax_number", "Tax number", false, 5, 20, CharClass::Code).combined_length(),
];

const BANK_ACCOUNT_RULES: &[FieldRule] = &[
    FieldRule::new("bank_name", "Bank name", true, 2, 120, CharClass::Text),
    FieldRule::new("account_number", "Account number", true, 8, 34, CharClass::Code)
        .combined_length(),
    FieldRule::new("swift", "SWIFT", false, 8, 11, CharClass::Code).combined_length(),
];

const CONTACT_RULES: &[FieldRule] = &[FieldRule::new("value", "Contact", true, 1, 200, CharClass::Text)];

const CATEGORY_RULES: &[FieldRule] = &[FieldRule::new("name", "Name", true, 1, 100, CharClass::Text)];

const PRODUCT_RULES: &[FieldRule] = &[
    FieldRule::new("name", "Name", true, 1, 200, CharClass::Text),
    FieldRule::new("description", "Description", false, 1, 2000, CharClass::Text),
];

const PRODUCT_CODE_RULES: &[FieldRule] = &[FieldRule::new("code", "Code", true, 1, 64, CharClass::Code)];

const PRODUCT_LINK_RULES: &[FieldRule] = &[
    FieldRule::new("title", "Title", false, 1, 200, CharClass::Text),
    FieldRule::new("url", "URL", true, 8, 2048, CharClass::Url),
];

const ORDER_RULES: &[FieldRule] = &[FieldRule::new("notes", "Notes", false, 1, 500, CharClass::Text)];

const DICTIONARY_RULES: &[FieldRule] = &[FieldRule::new("name", "Name", true, 1, 100, CharClass::Text)];

/// Returns the rule-set registered for an entity type.
pub fn rules_for(kind: EntityKind) -> &'static [FieldRule] {
    match kind {
        EntityKind::Address => ADDRESS_RULES,
        EntityKind::Representative => REPRESENTATIVE_RULES,
        EntityKind::Counterparty => COUNTERPARTY_RULES,
        EntityKind::BankAccount => BANK_ACCOUNT_RULES,
        EntityKind::Contact => CONTACT_RULES,
        EntityKind::Category => CATEGORY_RULES,
        EntityKind::Product => PRODUCT_RULES,
        EntityKind::ProductCode => PRODUCT_CODE_RULES,
        EntityKind::ProductLink => PRODUCT_LINK_RULES,
        EntityKind::Order => ORDER_RULES,
        EntityKind::Dictionary => DICTIONARY_RULES,
    }
}

/// Looks up a rule by snake_case or camelCase field name.
pub fn rule(kind: EntityKind, field: &str) -> Option<&'static FieldRule> {
    rules_for(kind)
        .iter()
        .find(|r| r.field == field || snake_to_camel(r.field) == field)
}

fn snake_to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = false;
    for c in s.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// =============================================================================
// Validators
// =============================================================================

/// Validates a single field value. Unknown fields pass.
pub fn validate_field(kind: EntityKind, field: &str, value: Option<&str>) -> ValidationResult<()> {
    match rule(kind, field) {
        Some(rule) => rule.check(value),
        None => Ok(()),
    }
}

/// Validates a set of present fields, stopping at the first violation.
///
/// Fields are checked in iteration order; unknown keys are ignored.
pub fn validate_patch<'a, I>(kind: EntityKind, fields: I) -> ValidationResult<()>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    for (field, value) in fields {
        validate_field(kind, field, value)?;
    }
    Ok(())
}

/// Validates an ISO-639 style language code ("en", "pl", "ru", "uk").
///
/// ## Example
/// ```rust
/// use stockroom_core::validation::validate_language_code;
///
/// assert!(validate_language_code("pl").is_ok());
/// assert!(validate_language_code("PL").is_err());
/// assert!(validate_language_code("polish").is_err());
/// ```
pub fn validate_language_code(code: &str) -> ValidationResult<()> {
    if (2..=3).contains(&code.len()) && code.chars().all(|c| c.is_ascii_lowercase()) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "language_code_invalid",
            format!("'{}' is not a valid language code", code),
        ))
    }
}

/// Validates a currency code (three upper-case ASCII letters).
pub fn validate_currency_code(code: &str) -> ValidationResult<()> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "currency_code_invalid",
            format!("'{}' is not a valid currency code", code),
        ))
    }
}

/// Validates the language codes of a translation list: each valid, none
/// repeated, none equal to the base language.
pub fn validate_translation_languages<'a, I>(codes: I) -> ValidationResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: Vec<&str> = Vec::new();
    for code in codes {
        validate_language_code(code)?;
        if code == crate::DEFAULT_LANGUAGE || seen.contains(&code) {
            return Err(ValidationError::new(
                "translation_language_duplicate",
                format!("Translation for '{}' is given more than once", code),
            ));
        }
        seen.push(code);
    }
    Ok(())
}

/// Validates an order line or stock quantity.
///
/// `allow_zero` is true for stock rows (an empty shelf is a valid state).
pub fn validate_quantity(qty: i64, allow_zero: bool) -> ValidationResult<()> {
    let min = if allow_zero { 0 } else { 1 };
    if qty < min || qty > MAX_QUANTITY {
        return Err(ValidationError::new(
            "quantity_invalid",
            format!("Quantity must be between {} and {}", min, MAX_QUANTITY),
        ));
    }
    Ok(())
}

/// Validates a price. Zero is allowed (free samples), negatives are not.
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::new("price_invalid", "Price must not be negative"));
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn code(kind: EntityKind, field: &str, value: Option<&str>) -> String {
        validate_field(kind, field, value).unwrap_err().code
    }

    #[test]
    fn test_full_name_with_emoji_is_invalid() {
        assert_eq!(code(EntityKind::Address, "full_name", Some("John 💩")), "full_name_invalid");
    }

    #[test]
    fn test_short_postal_code_reports_length() {
        assert_eq!(code(EntityKind::Address, "postal_code", Some("1")), "postal_code_length");
        assert_eq!(
            code(EntityKind::Address, "postal_code", Some("12345678901")),
            "postal_code_length"
        );
        assert!(validate_field(EntityKind::Address, "postal_code", Some("11-111")).is_ok());
    }

    #[test]
    fn test_rule_order_required_first() {
        assert_eq!(code(EntityKind::Address, "full_name", None), "full_name_required");
        assert_eq!(code(EntityKind::Address, "full_name", Some("   ")), "full_name_required");
    }

    #[test]
    fn test_rule_order_length_before_pattern() {
        // Too long AND invalid characters: length wins.
        let long_bad = "💩".repeat(101);
        assert_eq!(code(EntityKind::Address, "full_name", Some(&long_bad)), "full_name_too_long");
        assert_eq!(code(EntityKind::Address, "full_name", Some("J")), "full_name_too_short");
    }

    #[test]
    fn test_rule_order_pattern_before_structural() {
        // Digit (pattern) and double space (structural): pattern wins.
        assert_eq!(code(EntityKind::Address, "full_name", Some("John  7")), "full_name_invalid");
        // Only structural.
        assert_eq!(
            code(EntityKind::Address, "full_name", Some("John  Smith")),
            "full_name_double_space"
        );
    }

    #[test]
    fn test_structural_checks_on_free_text() {
        assert_eq!(
            code(EntityKind::Product, "name", Some("Milk 🥛")),
            "name_forbidden_chars"
        );
        assert_eq!(
            code(EntityKind::Product, "description", Some("line one\nline two")),
            "description_forbidden_chars"
        );
        assert_eq!(
            code(EntityKind::Product, "description", Some("line one \n two")),
            "description_double_space"
        );
        assert!(validate_field(EntityKind::Product, "name", Some("Mleko 3,2% 1 l")).is_ok());
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed_before_structural_checks() {
        assert!(validate_field(EntityKind::Address, "full_name", Some("Jane  ")).is_ok());
        assert!(validate_field(EntityKind::Address, "full_name", Some("  Jane Doe\n")).is_ok());
        assert_eq!(
            code(EntityKind::Address, "full_name", Some(" Jane  Doe ")),
            "full_name_double_space"
        );
    }

    #[test]
    fn test_optional_fields_accept_blank_and_null() {
        assert!(validate_field(EntityKind::Address, "apartment", None).is_ok());
        assert!(validate_field(EntityKind::Address, "apartment", Some("")).is_ok());
        assert_eq!(code(EntityKind::Address, "phone", Some("12")), "phone_length");
        assert_eq!(code(EntityKind::Address, "phone", Some("call-me")), "phone_invalid");
    }

    #[test]
    fn test_camel_case_lookup_and_unknown_fields() {
        assert_eq!(code(EntityKind::Address, "postalCode", Some("1")), "postal_code_length");
        assert!(validate_field(EntityKind::Address, "favouriteColour", Some("💩")).is_ok());
    }

    #[test]
    fn test_validate_patch_stops_at_first_violation() {
        let err = validate_patch(
            EntityKind::Address,
            [
                ("full_name", Some("Jane Updated")),
                ("postal_code", Some("1")),
                ("street", Some("")),
            ],
        )
        .unwrap_err();
        assert_eq!(err.code, "postal_code_length");

        assert!(validate_patch(
            EntityKind::Address,
            [("full_name", Some("Jane Updated")), ("postal_code", Some("11-111"))],
        )
        .is_ok());
    }

    #[test]
    fn test_email_and_url_patterns() {
        assert!(validate_field(EntityKind::Representative, "email", Some("a.b@shop.pl")).is_ok());
        assert_eq!(code(EntityKind::Representative, "email", Some("a.b@shop")), "email_invalid");
        assert_eq!(code(EntityKind::Representative, "email", Some("ab.shop.pl")), "email_invalid");
        assert!(validate_field(EntityKind::ProductLink, "url", Some("https://x.io/p?id=1")).is_ok());
        assert_eq!(code(EntityKind::ProductLink, "url", Some("ftp://x.io/file")), "url_invalid");
    }

    #[test]
    fn test_language_codes() {
        assert!(validate_translation_languages(["pl", "ru"]).is_ok());
        assert_eq!(
            validate_translation_languages(["pl", "pl"]).unwrap_err().code,
            "translation_language_duplicate"
        );
        assert_eq!(
            validate_translation_languages(["en"]).unwrap_err().code,
            "translation_language_duplicate"
        );
        assert_eq!(
            validate_translation_languages(["Pl"]).unwrap_err().code,
            "language_code_invalid"
        );
    }

    #[test]
    fn test_quantity_and_price() {
        assert!(validate_quantity(1, false).is_ok());
        assert!(validate_quantity(0, true).is_ok());
        assert_eq!(validate_quantity(0, false).unwrap_err().code, "quantity_invalid");
        assert_eq!(validate_quantity(-1, true).unwrap_err().code, "quantity_invalid");
        assert!(validate_price(Money::zero()).is_ok());
        assert_eq!(validate_price(Money::from_minor(-1)).unwrap_err().code, "price_invalid");
        assert!(validate_currency_code("PLN").is_ok());
        assert!(validate_currency_code("pln").is_err());
    }
}
