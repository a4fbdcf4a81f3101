//! Lender offer reconciliation for business approvals.
//!
//! Offers attached to a business have been stored in three shapes over time: single flat
//! columns on the record, an array without primary markers, and the current canonical array.
//! [`schema`] decides the shape when a record is decoded, [`normalizer`] turns any of them into
//! one ordered list, [`book`] applies mutations while keeping exactly one primary offer,
//! [`ordering`] and [`letter`] drive display, and [`import`] merges spreadsheet rows into the
//! same lists. [`service`] and [`router`] wrap it all in a read-modify-write cycle over a
//! [`repository::BusinessRepository`].

pub mod book;
pub mod domain;
pub mod ids;
pub mod import;
pub mod letter;
pub mod normalizer;
pub mod ordering;
pub mod repository;
pub mod router;
pub mod schema;
pub mod service;

#[cfg(test)]
mod tests;

pub use book::{add_offer, delete_offer, edit_offer, set_primary, OfferBook, OfferError};
pub use domain::{
    BusinessId, BusinessRecord, DecisionStatus, DeclineMetadata, DeclinedLender,
    LegacyFlatFields, LegacyOfferEntry, OfferEntry, OfferFields, OfferGeneration, OfferId,
    PaymentFrequency,
};
pub use import::{
    parse_rows, ImportLayout, ImportRow, ImportRowError, ImportSummary, OverallStatus,
    RawImportRow, RowResult, RowStatus,
};
pub use letter::{approval_letter, ApprovalLetterView};
pub use normalizer::{normalize, normalize_at};
pub use ordering::{display_order, theme_slot, SelectionCursor};
pub use repository::{BusinessRepository, RepositoryError};
pub use router::offer_router;
pub use schema::{SchemaError, StoredApprovals};
pub use service::{BusinessDraft, OfferDeskService, OfferListView, OfferServiceError};
