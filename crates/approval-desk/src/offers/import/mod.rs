//! Bulk import of lender decisions from a spreadsheet export.
//!
//! One row describes one business. Column headers are matched after normalization (case,
//! whitespace, underscores, and `#` are ignored):
//!
//! - `Business Name`, `Overall Status` (`Approved` or `Declined Only`)
//! - offer slot 1: `Best Lender`, `Best Amount`, `Best Rate`, `Best Term`, `Best Frequency`,
//!   `Best Commission`
//! - offer slots 2..=N: `Offer 2 Lender`, `Offer 2 Amount`, ... with the same suffixes
//! - decline slots 1..=M: `Declined Lender 1`, `Decline Reason 1`, ...
//!
//! Rows merge into existing records rather than replacing them, and a bad row is reported
//! without stopping the rest of the batch.

mod headers;
mod parser;
mod reconciler;

use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{BusinessId, DecisionStatus, DeclinedLender, OfferFields, PaymentFrequency};
use super::repository::RepositoryError;

pub use parser::parse_rows;
pub(crate) use reconciler::Reconciler;

pub(crate) use headers::normalize_header;

/// How many offer and decline slots are read from each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportLayout {
    pub offer_slots: usize,
    pub decline_slots: usize,
}

impl Default for ImportLayout {
    fn default() -> Self {
        Self {
            offer_slots: 5,
            decline_slots: 3,
        }
    }
}

/// One data row keyed by normalized header, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawImportRow {
    Columns {
        row: usize,
        columns: BTreeMap<String, String>,
    },
    Malformed {
        row: usize,
        error: String,
    },
}

impl RawImportRow {
    /// Builds a row from header/value pairs, normalizing the headers the same way the CSV
    /// parser does.
    pub fn from_pairs<I, K, V>(row: usize, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let columns = pairs
            .into_iter()
            .map(|(key, value)| (normalize_header(key.as_ref()), value.into()))
            .collect();
        Self::Columns { row, columns }
    }

    pub fn row(&self) -> usize {
        match self {
            Self::Columns { row, .. } | Self::Malformed { row, .. } => *row,
        }
    }

    fn business_name(&self) -> String {
        match self {
            Self::Columns { columns, .. } => column(columns, "business name").to_string(),
            Self::Malformed { .. } => String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Approved,
    DeclinedOnly,
}

impl OverallStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match normalize_header(value).as_str() {
            "approved" => Some(Self::Approved),
            "declined only" => Some(Self::DeclinedOnly),
            _ => None,
        }
    }

    pub const fn decision_status(self) -> DecisionStatus {
        match self {
            Self::Approved => DecisionStatus::Approved,
            Self::DeclinedOnly => DecisionStatus::Declined,
        }
    }
}

/// A row after its columns have been read into offer and decline slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub business_name: String,
    pub overall_status: OverallStatus,
    /// Populated offer slots in slot order, best offer first.
    pub offers: Vec<OfferFields>,
    pub declined: Vec<DeclinedLender>,
}

impl ImportRow {
    pub fn from_columns(
        columns: &BTreeMap<String, String>,
        layout: &ImportLayout,
    ) -> Result<Self, ImportRowError> {
        let business_name = column(columns, "business name");
        if business_name.is_empty() {
            return Err(ImportRowError::MissingBusinessName);
        }

        let raw_status = column(columns, "overall status");
        let overall_status = OverallStatus::parse(raw_status)
            .ok_or_else(|| ImportRowError::UnrecognizedStatus(raw_status.to_string()))?;

        let offers = (1..=layout.offer_slots)
            .filter_map(|slot| offer_slot(columns, slot))
            .collect();

        let declined = (1..=layout.decline_slots)
            .filter_map(|slot| decline_slot(columns, slot))
            .collect();

        Ok(Self {
            business_name: business_name.to_string(),
            overall_status,
            offers,
            declined,
        })
    }
}

fn column<'a>(columns: &'a BTreeMap<String, String>, key: &str) -> &'a str {
    columns.get(key).map(|value| value.trim()).unwrap_or("")
}

fn slot_prefix(slot: usize) -> String {
    if slot == 1 {
        "best".to_string()
    } else {
        format!("offer {slot}")
    }
}

/// A slot counts when it names a lender or an amount.
fn offer_slot(columns: &BTreeMap<String, String>, slot: usize) -> Option<OfferFields> {
    let prefix = slot_prefix(slot);
    let read = |suffix: &str| column(columns, &format!("{prefix} {suffix}")).to_string();

    let lender = read("lender");
    let advance_amount = read("amount");
    if lender.is_empty() && advance_amount.is_empty() {
        return None;
    }

    Some(OfferFields {
        lender,
        advance_amount,
        term: read("term"),
        payment_frequency: PaymentFrequency::parse_lenient(&read("frequency")),
        factor_rate: read("rate"),
        commission: read("commission"),
        ..OfferFields::default()
    })
}

fn decline_slot(columns: &BTreeMap<String, String>, slot: usize) -> Option<DeclinedLender> {
    let lender = column(columns, &format!("declined lender {slot}"));
    if lender.is_empty() {
        return None;
    }

    Some(DeclinedLender {
        lender: lender.to_string(),
        reason: column(columns, &format!("decline reason {slot}")).to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ImportRowError {
    #[error("row could not be read: {0}")]
    Malformed(String),
    #[error("business name is empty")]
    MissingBusinessName,
    #[error("unrecognized overall status '{0}'")]
    UnrecognizedStatus(String),
    #[error("approved row has no lender or amount in any offer slot")]
    NoOffers,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowStatus {
    Imported,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowResult {
    pub row: usize,
    pub business_name: String,
    pub status: RowStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_id: Option<BusinessId>,
    pub offers_added: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub imported: usize,
    pub errors: usize,
    pub results: Vec<RowResult>,
}

impl ImportSummary {
    fn record(&mut self, result: RowResult) {
        match result.status {
            RowStatus::Imported => self.imported += 1,
            RowStatus::Error => self.errors += 1,
        }
        self.results.push(result);
    }
}
