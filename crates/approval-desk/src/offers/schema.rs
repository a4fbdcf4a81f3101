//! Storage-boundary decoding of the `additionalApprovals` field.
//!
//! Three generations of data share that one JSON field with no version tag. The shape is decided
//! here, once, when a record is deserialized; everything past this module works with
//! [`StoredApprovals`] and never inspects raw JSON again.
//!
//! Decoding favors availability: only a field that is not an array at all is rejected. Entries
//! of either array shape are read best-effort, with gaps filled in deterministically so that two
//! reads of the same document agree.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::domain::{lenient_opt_string, lenient_string, LegacyOfferEntry, OfferEntry, OfferFields, OfferId};
use super::ids::{new_offer_id_at, OfferIdOrigin};

const PRIMARY_MARKER: &str = "isPrimary";

/// Decoded contents of the `additionalApprovals` field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StoredApprovals {
    /// `null` or missing.
    #[default]
    Absent,
    /// Array whose first element has no boolean `isPrimary`.
    Legacy(Vec<LegacyOfferEntry>),
    /// Array whose first element carries a boolean `isPrimary`, or an empty array.
    Canonical(Vec<OfferEntry>),
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("additionalApprovals must be an array or null, found {found}")]
    UnexpectedShape { found: &'static str },
}

impl StoredApprovals {
    /// Decodes with the current time standing in for missing canonical timestamps.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        Self::from_value_with(value, Utc::now())
    }

    /// Decodes `value`; canonical entries stored without `createdAt` take `fallback_created_at`.
    pub fn from_value_with(
        value: Value,
        fallback_created_at: DateTime<Utc>,
    ) -> Result<Self, SchemaError> {
        match value {
            Value::Null => Ok(Self::Absent),
            Value::Array(items) => Ok(Self::from_items(items, fallback_created_at)),
            // Some writers stored the list as JSON text inside the JSON document.
            Value::String(text) => match serde_json::from_str::<Value>(&text) {
                Ok(inner @ (Value::Array(_) | Value::Null)) => {
                    Self::from_value_with(inner, fallback_created_at)
                }
                _ => Err(SchemaError::UnexpectedShape { found: "string" }),
            },
            Value::Bool(_) => Err(SchemaError::UnexpectedShape { found: "boolean" }),
            Value::Number(_) => Err(SchemaError::UnexpectedShape { found: "number" }),
            Value::Object(_) => Err(SchemaError::UnexpectedShape { found: "object" }),
        }
    }

    fn from_items(items: Vec<Value>, fallback_created_at: DateTime<Utc>) -> Self {
        match items.first() {
            None => Self::Canonical(Vec::new()),
            Some(first) if has_primary_marker(first) => {
                Self::Canonical(canonical_entries(items, fallback_created_at))
            }
            Some(_) => Self::Legacy(items.into_iter().map(legacy_entry).collect()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Absent => true,
            Self::Legacy(entries) => entries.is_empty(),
            Self::Canonical(entries) => entries.is_empty(),
        }
    }
}

/// Only a real boolean marks the current shape; `null` or a string does not.
fn has_primary_marker(value: &Value) -> bool {
    matches!(
        value.as_object().and_then(|object| object.get(PRIMARY_MARKER)),
        Some(Value::Bool(_))
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCanonicalEntry {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    id: Option<String>,
    #[serde(flatten)]
    fields: OfferFields,
    #[serde(default, deserialize_with = "lenient_flag")]
    is_primary: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    created_at: Option<DateTime<Utc>>,
}

/// Reads every element of a canonical array. Missing ids become `migrated-{index}` (suffixed
/// when that id is already taken), missing flags read as not primary, and missing timestamps
/// take `fallback_created_at`. The primary flags are kept as stored.
fn canonical_entries(items: Vec<Value>, fallback_created_at: DateTime<Utc>) -> Vec<OfferEntry> {
    let raw: Vec<RawCanonicalEntry> = items
        .into_iter()
        .map(|item| match item {
            object @ Value::Object(_) => serde_json::from_value(object).unwrap_or_default(),
            _ => RawCanonicalEntry::default(),
        })
        .collect();

    let mut taken: HashSet<String> = raw
        .iter()
        .filter_map(|entry| entry.id.clone())
        .filter(|id| !id.trim().is_empty())
        .collect();

    raw.into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let id = match entry.id {
                Some(id) if !id.trim().is_empty() => OfferId(id),
                _ => fill_missing_id(index, fallback_created_at, &mut taken),
            };
            OfferEntry::new(
                id,
                entry.fields,
                entry.is_primary,
                entry.created_at.unwrap_or(fallback_created_at),
            )
        })
        .collect()
}

fn fill_missing_id(index: usize, now: DateTime<Utc>, taken: &mut HashSet<String>) -> OfferId {
    let base = new_offer_id_at(OfferIdOrigin::LegacyMigration(index), now);
    let mut candidate = base.0.clone();
    let mut attempt = 1;
    while taken.contains(&candidate) {
        candidate = format!("{}-{attempt}", base.0);
        attempt += 1;
    }
    taken.insert(candidate.clone());
    OfferId(candidate)
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(
        Option::<Value>::deserialize(deserializer)?,
        Some(Value::Bool(true))
    ))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = lenient_opt_string(deserializer)?;
    Ok(raw.and_then(|text| {
        DateTime::parse_from_rfc3339(text.trim())
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc))
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawLegacyEntry {
    #[serde(deserialize_with = "lenient_string")]
    lender: String,
    #[serde(deserialize_with = "lenient_string")]
    amount: String,
    #[serde(deserialize_with = "lenient_string")]
    advance_amount: String,
    #[serde(deserialize_with = "lenient_string")]
    term: String,
    #[serde(deserialize_with = "lenient_string")]
    factor_rate: String,
}

/// Best-effort mapping; anything unreadable becomes an empty entry rather than an error.
fn legacy_entry(value: Value) -> LegacyOfferEntry {
    let raw = match value {
        object @ Value::Object(_) => serde_json::from_value(object).unwrap_or_default(),
        _ => RawLegacyEntry::default(),
    };

    let amount = if raw.amount.trim().is_empty() {
        raw.advance_amount
    } else {
        raw.amount
    };

    LegacyOfferEntry {
        lender: raw.lender,
        amount,
        term: raw.term,
        factor_rate: raw.factor_rate,
    }
}

impl<'de> Deserialize<'de> for StoredApprovals {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<Value>::deserialize(deserializer)?.unwrap_or(Value::Null);
        Self::from_value(value).map_err(D::Error::custom)
    }
}

impl Serialize for StoredApprovals {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Legacy(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for entry in entries {
                    seq.serialize_element(entry)?;
                }
                seq.end()
            }
            Self::Canonical(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for entry in entries {
                    seq.serialize_element(entry)?;
                }
                seq.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_and_missing_decode_as_absent() {
        assert_eq!(
            StoredApprovals::from_value(Value::Null).expect("decodes"),
            StoredApprovals::Absent
        );
    }

    #[test]
    fn empty_array_is_not_treated_as_migrated() {
        let decoded = StoredApprovals::from_value(json!([])).expect("decodes");
        assert_eq!(decoded, StoredApprovals::Canonical(Vec::new()));
        assert!(decoded.is_empty());
    }

    #[test]
    fn primary_marker_on_first_element_selects_canonical_even_when_false() {
        let decoded = StoredApprovals::from_value(json!([
            {
                "id": "appr-1",
                "lender": "Acme Capital",
                "advanceAmount": "50000",
                "isPrimary": false,
                "createdAt": "2025-01-02T03:04:05Z"
            }
        ]))
        .expect("decodes");

        match decoded {
            StoredApprovals::Canonical(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].fields.lender, "Acme Capital");
                assert!(!entries[0].is_primary);
            }
            other => panic!("expected canonical, got {other:?}"),
        }
    }

    #[test]
    fn legacy_entries_accept_either_amount_key_and_numbers() {
        let decoded = StoredApprovals::from_value(json!([
            { "lender": "X", "amount": "10000", "term": "6mo", "factorRate": "1.3" },
            { "lender": "Y", "advanceAmount": 25000, "factorRate": 1.25 },
            "garbage"
        ]))
        .expect("decodes");

        match decoded {
            StoredApprovals::Legacy(entries) => {
                assert_eq!(entries.len(), 3);
                assert_eq!(entries[0].amount, "10000");
                assert_eq!(entries[1].amount, "25000");
                assert_eq!(entries[1].factor_rate, "1.25");
                assert_eq!(entries[2], LegacyOfferEntry::default());
            }
            other => panic!("expected legacy, got {other:?}"),
        }
    }

    #[test]
    fn double_encoded_arrays_are_unwrapped() {
        let decoded =
            StoredApprovals::from_value(json!("[{\"lender\":\"X\",\"amount\":\"5\"}]"))
                .expect("decodes");
        assert!(matches!(decoded, StoredApprovals::Legacy(ref entries) if entries.len() == 1));
    }

    #[test]
    fn scalars_are_rejected() {
        let error = StoredApprovals::from_value(json!(42)).expect_err("numbers are invalid");
        assert!(error.to_string().contains("number"));
    }

    fn fallback() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-08-01T10:00:00Z")
            .expect("valid instant")
            .with_timezone(&Utc)
    }

    fn canonical(value: Value) -> Vec<OfferEntry> {
        match StoredApprovals::from_value_with(value, fallback()).expect("decodes") {
            StoredApprovals::Canonical(entries) => entries,
            other => panic!("expected canonical, got {other:?}"),
        }
    }

    #[test]
    fn canonical_entry_without_created_at_takes_the_fallback() {
        let entries = canonical(json!([
            { "id": "a", "lender": "X", "isPrimary": true },
            { "id": "b", "lender": "Y", "isPrimary": false, "createdAt": "2025-01-02T03:04:05Z" }
        ]));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].created_at, fallback());
        assert_eq!(entries[0].fields.lender, "X");
        assert_eq!(entries[1].created_at.to_rfc3339(), "2025-01-02T03:04:05+00:00");
    }

    #[test]
    fn unreadable_flags_and_timestamps_do_not_reject_the_list() {
        let entries = canonical(json!([
            { "id": "a", "isPrimary": true, "createdAt": "2025-01-02T03:04:05Z" },
            { "id": "b", "isPrimary": null, "createdAt": "yesterday" },
            { "id": "c", "isPrimary": "yes" }
        ]));

        let flags: Vec<bool> = entries.iter().map(|entry| entry.is_primary).collect();
        assert_eq!(flags, [true, false, false]);
        assert_eq!(entries[1].created_at, fallback());
    }

    #[test]
    fn missing_ids_are_filled_without_collisions() {
        let entries = canonical(json!([
            { "lender": "No id", "isPrimary": true },
            { "id": "migrated-0", "lender": "Taken", "isPrimary": false },
            "garbage"
        ]));

        let ids: Vec<&str> = entries.iter().map(|entry| entry.id.as_str()).collect();
        assert_eq!(ids, ["migrated-0-1", "migrated-0", "migrated-2"]);
        assert_eq!(entries[2].fields, OfferFields::default());
    }

    #[test]
    fn null_primary_marker_on_first_element_reads_as_legacy() {
        let decoded = StoredApprovals::from_value(json!([
            { "id": "a", "lender": "X", "amount": "10000", "isPrimary": null,
              "createdAt": "2025-01-01T00:00:00Z" }
        ]))
        .expect("decodes");

        match decoded {
            StoredApprovals::Legacy(entries) => {
                assert_eq!(entries[0].lender, "X");
                assert_eq!(entries[0].amount, "10000");
            }
            other => panic!("expected legacy, got {other:?}"),
        }
    }

    #[test]
    fn repeated_decodes_agree() {
        let document = json!([{ "lender": "No id", "isPrimary": true }]);
        assert_eq!(canonical(document.clone()), canonical(document));
    }
}
