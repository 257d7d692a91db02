//! # Typed Patches
//!
//! Partial updates of a single child row.
//!
//! ## Presence Tracking
//! ```text
//! JSON body                    Patch<T>           SQL
//! ─────────────────────────    ───────────────    ─────────────────────────
//! { }                          Absent             column untouched
//! { "apartment": null }        Null               apartment = NULL
//! { "apartment": "4" }         Value("4")         apartment = '4'
//! ```
//!
//! Unknown keys in the body are ignored by deserialization, so older and
//! newer clients can talk to the same endpoint.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::requests::{AddressInput, RepresentativeInput};
use crate::validation::{validate_patch, EntityKind, ValidationResult};
use crate::ValidationError;

// =============================================================================
// Patch<T>
// =============================================================================

/// A field in a partial update: omitted, explicitly null, or set.
///
/// Struct fields of this type must carry `#[serde(default)]` so that an
/// omitted key becomes [`Patch::Absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Absent,
    Null,
    Value(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Absent
    }
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// `None` when absent, `Some(None)` when null, `Some(Some(v))` when set.
    pub fn as_option(&self) -> Option<Option<&T>> {
        match self {
            Patch::Absent => None,
            Patch::Null => Some(None),
            Patch::Value(v) => Some(Some(v)),
        }
    }

    /// The set value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }
}

impl Patch<String> {
    fn as_text(&self) -> Option<Option<&str>> {
        self.as_option().map(|v| v.map(String::as_str))
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(|v| match v {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Value(v) => serializer.serialize_some(v),
            _ => serializer.serialize_none(),
        }
    }
}

/// Takes the patched value or, for a new row, demands it.
fn required<T: Clone>(patch: &Patch<T>, field: &str, label: &str) -> ValidationResult<T> {
    patch.value().cloned().ok_or_else(|| {
        ValidationError::new(format!("{}_required", field), format!("{} is required", label))
    })
}

// =============================================================================
// Address Patch
// =============================================================================

/// Partial update of one address of a counterparty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressPatch {
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub full_name: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub country_id: Patch<i64>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub city_id: Patch<i64>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub street: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub house: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub apartment: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub postal_code: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub phone: Patch<String>,
}

impl AddressPatch {
    /// Present text fields, in declaration order.
    pub fn text_fields(&self) -> Vec<(&'static str, Option<&str>)> {
        [
            ("full_name", self.full_name.as_text()),
            ("street", self.street.as_text()),
            ("house", self.house.as_text()),
            ("apartment", self.apartment.as_text()),
            ("postal_code", self.postal_code.as_text()),
            ("phone", self.phone.as_text()),
        ]
        .into_iter()
        .filter_map(|(name, v)| v.map(|v| (name, v)))
        .collect()
    }

    /// True when the patch names no field at all.
    pub fn is_empty(&self) -> bool {
        self.text_fields().is_empty() && self.country_id.is_absent() && self.city_id.is_absent()
    }

    /// Validates every present field against the address rule-set.
    ///
    /// Nulling an id column is rejected here: an address always points at
    /// a country and a city.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_patch(EntityKind::Address, self.text_fields())?;
        if matches!(self.country_id, Patch::Null) {
            return Err(ValidationError::new("country_id_required", "Country is required"));
        }
        if matches!(self.city_id, Patch::Null) {
            return Err(ValidationError::new("city_id_required", "City is required"));
        }
        Ok(())
    }

    /// Builds a complete address from the patch, for inserting a new row.
    pub fn into_input(&self) -> ValidationResult<AddressInput> {
        Ok(AddressInput {
            full_name: required(&self.full_name, "full_name", "Full name")?,
            country_id: required(&self.country_id, "country_id", "Country")?,
            city_id: required(&self.city_id, "city_id", "City")?,
            street: required(&self.street, "street", "Street")?,
            house: required(&self.house, "house", "House")?,
            apartment: self.apartment.value().cloned(),
            postal_code: required(&self.postal_code, "postal_code", "Postal code")?,
            phone: self.phone.value().cloned(),
        })
    }
}

// =============================================================================
// Representative Patch
// =============================================================================

/// Partial update of one representative of a counterparty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepresentativePatch {
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub full_name: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub position: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub phone: Patch<String>,
    #[serde(skip_serializing_if = "Patch::is_absent")]
    pub email: Patch<String>,
}

impl RepresentativePatch {
    pub fn text_fields(&self) -> Vec<(&'static str, Option<&str>)> {
        [
            ("full_name", self.full_name.as_text()),
            ("position", self.position.as_text()),
            ("phone", self.phone.as_text()),
            ("email", self.email.as_text()),
        ]
        .into_iter()
        .filter_map(|(name, v)| v.map(|v| (name, v)))
        .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.text_fields().is_empty()
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_patch(EntityKind::Representative, self.text_fields())
    }

    pub fn into_input(&self) -> ValidationResult<RepresentativeInput> {
        Ok(RepresentativeInput {
            full_name: required(&self.full_name, "full_name", "Full name")?,
            position: self.position.value().cloned(),
            phone: self.phone.value().cloned(),
            email: self.email.value().cloned(),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_null_and_value_are_distinct() {
        let patch: AddressPatch =
            serde_json::from_str(r#"{ "apartment": null, "postalCode": "11-111" }"#).unwrap();
        assert_eq!(patch.apartment, Patch::Null);
        assert_eq!(patch.postal_code, Patch::Value("11-111".to_string()));
        assert_eq!(patch.street, Patch::Absent);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let patch: AddressPatch =
            serde_json::from_str(r#"{ "fullName": "Jane Updated", "floor": 3 }"#).unwrap();
        assert_eq!(patch.text_fields(), vec![("full_name", Some("Jane Updated"))]);
        assert!(patch.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_first_bad_field() {
        let patch: AddressPatch =
            serde_json::from_str(r#"{ "fullName": "John 💩", "postalCode": "1" }"#).unwrap();
        assert_eq!(patch.validate().unwrap_err().code, "full_name_invalid");

        let patch: AddressPatch = serde_json::from_str(r#"{ "cityId": null }"#).unwrap();
        assert_eq!(patch.validate().unwrap_err().code, "city_id_required");
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let patch = AddressPatch {
            apartment: Patch::Null,
            house: Patch::Value("7".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "house": "7", "apartment": null }));
    }

    #[test]
    fn test_into_input_requires_all_mandatory_fields() {
        let patch: AddressPatch = serde_json::from_str(r#"{ "fullName": "Jane Doe" }"#).unwrap();
        assert_eq!(patch.into_input().unwrap_err().code, "country_id_required");

        let patch = RepresentativePatch {
            full_name: Patch::Value("Anna Nowak".to_string()),
            ..Default::default()
        };
        let input = patch.into_input().unwrap();
        assert_eq!(input.full_name, "Anna Nowak");
        assert!(input.email.is_none());
    }
}
