use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use super::schema::StoredApprovals;

/// Identifier of a single offer, unique within the owning record's offer list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfferId(pub String);

impl OfferId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OfferId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier wrapper for applicant business records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusinessId(pub String);

impl BusinessId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BusinessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BusinessId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Repayment cadence of an advance. Unset or unrecognized values read as weekly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentFrequency {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl PaymentFrequency {
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Self::Daily,
            "monthly" => Self::Monthly,
            _ => Self::Weekly,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl<'de> Deserialize<'de> for PaymentFrequency {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(Value::String(value)) => Self::parse_lenient(&value),
            _ => Self::Weekly,
        })
    }
}

/// Lifecycle of the underwriting decision attached to a business.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    #[default]
    Pending,
    Approved,
    Declined,
    Unqualified,
}

impl DecisionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Declined => "declined",
            Self::Unqualified => "unqualified",
        }
    }
}

/// Every attribute of an offer that staff may edit.
///
/// Numeric-looking values (amounts, rates, payback) stay decimal strings end to end; nothing in
/// this crate parses them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OfferFields {
    #[serde(deserialize_with = "lenient_string")]
    pub lender: String,
    #[serde(deserialize_with = "lenient_string")]
    pub advance_amount: String,
    #[serde(deserialize_with = "lenient_string")]
    pub term: String,
    pub payment_frequency: PaymentFrequency,
    #[serde(deserialize_with = "lenient_string")]
    pub factor_rate: String,
    #[serde(deserialize_with = "lenient_string")]
    pub max_upsell: String,
    #[serde(deserialize_with = "lenient_string")]
    pub total_payback: String,
    #[serde(deserialize_with = "lenient_string")]
    pub net_after_fees: String,
    #[serde(deserialize_with = "lenient_string")]
    pub notes: String,
    #[serde(deserialize_with = "lenient_string")]
    pub approval_date: String,
    #[serde(
        deserialize_with = "lenient_string",
        skip_serializing_if = "String::is_empty"
    )]
    pub commission: String,
}

/// Canonical representation of one lender offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferEntry {
    pub id: OfferId,
    #[serde(flatten)]
    pub fields: OfferFields,
    #[serde(default)]
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

impl OfferEntry {
    pub fn new(id: OfferId, fields: OfferFields, is_primary: bool, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            fields,
            is_primary,
            created_at,
        }
    }
}

/// Pre-multi-offer array element. Read and upgraded, never written by new code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyOfferEntry {
    pub lender: String,
    pub amount: String,
    pub term: String,
    pub factor_rate: String,
}

/// Single-offer columns kept on the record from before offers became a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LegacyFlatFields {
    #[serde(
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub lender: Option<String>,
    #[serde(
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub advance_amount: Option<String>,
    #[serde(
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub term: Option<String>,
    #[serde(
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub payment_frequency: Option<String>,
    #[serde(
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub factor_rate: Option<String>,
    #[serde(
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_upsell: Option<String>,
    #[serde(
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_payback: Option<String>,
    #[serde(
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub net_after_fees: Option<String>,
    #[serde(
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
    #[serde(
        deserialize_with = "lenient_opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub approval_date: Option<String>,
}

impl LegacyFlatFields {
    /// A flat offer exists when either the lender or the amount carries text.
    pub fn has_offer(&self) -> bool {
        is_filled(&self.lender) || is_filled(&self.advance_amount)
    }

    pub(crate) fn to_offer_fields(&self) -> OfferFields {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        OfferFields {
            lender: text(&self.lender),
            advance_amount: text(&self.advance_amount),
            term: text(&self.term),
            payment_frequency: self
                .payment_frequency
                .as_deref()
                .map(PaymentFrequency::parse_lenient)
                .unwrap_or_default(),
            factor_rate: text(&self.factor_rate),
            max_upsell: text(&self.max_upsell),
            total_payback: text(&self.total_payback),
            net_after_fees: text(&self.net_after_fees),
            notes: text(&self.notes),
            approval_date: text(&self.approval_date),
            commission: String::new(),
        }
    }
}

fn is_filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|text| !text.trim().is_empty())
}

/// A lender that passed on the business, kept as free text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclinedLender {
    pub lender: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeclineMetadata {
    pub lenders: Vec<DeclinedLender>,
}

impl DeclineMetadata {
    pub fn is_empty(&self) -> bool {
        self.lenders.is_empty()
    }

    /// Appends declines not already on file; the same lender and reason pair is kept once.
    pub fn record(&mut self, declined: &[DeclinedLender]) {
        for entry in declined {
            if !self.lenders.contains(entry) {
                self.lenders.push(entry.clone());
            }
        }
    }
}

/// Which representation a record's offers are currently stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferGeneration {
    Empty,
    FlatLegacy,
    ArrayLegacy,
    Canonical,
}

/// One applicant business and the offers attached to its underwriting decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRecord {
    pub id: BusinessId,
    pub business_name: String,
    #[serde(default)]
    pub status: DecisionStatus,
    #[serde(flatten)]
    pub flat: LegacyFlatFields,
    #[serde(default)]
    pub additional_approvals: StoredApprovals,
    #[serde(default, skip_serializing_if = "DeclineMetadata::is_empty")]
    pub decline: DeclineMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Stored layout of a record before the offer field's shape is decided.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredBusinessRecord {
    id: BusinessId,
    business_name: String,
    #[serde(default)]
    status: DecisionStatus,
    #[serde(flatten)]
    flat: LegacyFlatFields,
    #[serde(default)]
    additional_approvals: Option<Value>,
    #[serde(default)]
    decline: DeclineMetadata,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
}

impl<'de> Deserialize<'de> for BusinessRecord {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let stored = StoredBusinessRecord::deserialize(deserializer)?;
        // Offers written without a timestamp inherit the record's own.
        let fallback = stored.created_at.unwrap_or_else(Utc::now);
        let additional_approvals = StoredApprovals::from_value_with(
            stored.additional_approvals.unwrap_or(Value::Null),
            fallback,
        )
        .map_err(D::Error::custom)?;

        Ok(Self {
            id: stored.id,
            business_name: stored.business_name,
            status: stored.status,
            flat: stored.flat,
            additional_approvals,
            decline: stored.decline,
            created_at: stored.created_at,
        })
    }
}

impl BusinessRecord {
    pub fn new(
        id: BusinessId,
        business_name: impl Into<String>,
        status: DecisionStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            business_name: business_name.into(),
            status,
            flat: LegacyFlatFields::default(),
            additional_approvals: StoredApprovals::Absent,
            decline: DeclineMetadata::default(),
            created_at: Some(created_at),
        }
    }

    pub fn generation(&self) -> OfferGeneration {
        match &self.additional_approvals {
            StoredApprovals::Canonical(entries) if !entries.is_empty() => {
                OfferGeneration::Canonical
            }
            StoredApprovals::Legacy(entries) if !entries.is_empty() => OfferGeneration::ArrayLegacy,
            _ if self.flat.has_offer() => OfferGeneration::FlatLegacy,
            _ => OfferGeneration::Empty,
        }
    }

    /// Stores `offers` as the canonical list and drops the flat offer columns, which the list
    /// has absorbed. An emptied list therefore stays empty on the next read.
    pub fn commit_offers(&mut self, offers: Vec<OfferEntry>) {
        self.additional_approvals = StoredApprovals::Canonical(offers);
        self.flat = LegacyFlatFields::default();
    }
}

/// Accepts strings, numbers, booleans, or null and keeps the textual form.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

pub(crate) fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(scalar_text))
}

pub(crate) fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
