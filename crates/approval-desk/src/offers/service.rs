use std::io::Read;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::book::{OfferBook, OfferError};
use super::domain::{
    BusinessId, BusinessRecord, DecisionStatus, OfferEntry, OfferFields, OfferGeneration, OfferId,
};
use super::ids::next_business_id;
use super::import::{parse_rows, ImportSummary, RawImportRow, Reconciler};
use super::letter::{approval_letter, ApprovalLetterView};
use super::normalizer::normalize_at;
use super::repository::{BusinessRepository, RepositoryError};
use crate::config::OfferDeskConfig;

/// Fields accepted when opening a new business record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessDraft {
    pub business_name: String,
    #[serde(default)]
    pub status: DecisionStatus,
}

/// A record's offers in storage order, as returned by every read and mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferListView {
    pub business_id: BusinessId,
    pub business_name: String,
    pub status: DecisionStatus,
    /// Representation the offers were stored in when this call loaded the record.
    pub stored_as: OfferGeneration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_id: Option<OfferId>,
    pub offers: Vec<OfferEntry>,
}

impl OfferListView {
    fn new(record: &BusinessRecord, stored_as: OfferGeneration, offers: Vec<OfferEntry>) -> Self {
        let primary_id = offers
            .iter()
            .find(|entry| entry.is_primary)
            .map(|entry| entry.id.clone());
        Self {
            business_id: record.id.clone(),
            business_name: record.business_name.clone(),
            status: record.status,
            stored_as,
            primary_id,
            offers,
        }
    }
}

/// Read-modify-write orchestration over a [`BusinessRepository`].
///
/// Each call loads a record, normalizes its offers once, applies one operation to the canonical
/// list, and writes the canonical list back. Legacy shapes are never written.
pub struct OfferDeskService<R> {
    repository: Arc<R>,
    config: OfferDeskConfig,
}

impl<R> OfferDeskService<R>
where
    R: BusinessRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: OfferDeskConfig) -> Self {
        Self { repository, config }
    }

    pub fn config(&self) -> &OfferDeskConfig {
        &self.config
    }

    pub fn create_business(&self, draft: BusinessDraft) -> Result<BusinessRecord, OfferServiceError> {
        let business_name = draft.business_name.trim();
        if business_name.is_empty() {
            return Err(OfferServiceError::MissingBusinessName);
        }
        if self.repository.find_by_name(business_name)?.is_some() {
            return Err(RepositoryError::Conflict.into());
        }

        let now = Utc::now();
        let record = BusinessRecord::new(next_business_id(now), business_name, draft.status, now);
        let stored = self.repository.insert(record)?;
        info!(business_id = %stored.id, "business record created");
        Ok(stored)
    }

    pub fn offers(&self, business_id: &BusinessId) -> Result<OfferListView, OfferServiceError> {
        let record = self.load(business_id)?;
        let stored_as = record.generation();
        let offers = normalize_at(&record, Utc::now());
        debug!(business_id = %business_id, ?stored_as, offers = offers.len(), "offers normalized");
        Ok(OfferListView::new(&record, stored_as, offers))
    }

    pub fn add_offer(
        &self,
        business_id: &BusinessId,
        fields: OfferFields,
    ) -> Result<OfferListView, OfferServiceError> {
        self.mutate(business_id, "add", |book| {
            book.add(fields);
            Ok(())
        })
    }

    pub fn edit_offer(
        &self,
        business_id: &BusinessId,
        offer_id: &OfferId,
        fields: OfferFields,
    ) -> Result<OfferListView, OfferServiceError> {
        self.mutate(business_id, "edit", |book| book.edit(offer_id, fields))
    }

    pub fn set_primary(
        &self,
        business_id: &BusinessId,
        offer_id: &OfferId,
    ) -> Result<OfferListView, OfferServiceError> {
        self.mutate(business_id, "set_primary", |book| {
            if !book.set_primary(offer_id) {
                warn!(
                    business_id = %business_id,
                    offer_id = %offer_id,
                    "set_primary ignored unknown offer"
                );
            }
            Ok(())
        })
    }

    /// Removes one offer. A record left with no offers is kept; removing the record itself is
    /// [`Self::delete_business`], which callers invoke explicitly.
    pub fn delete_offer(
        &self,
        business_id: &BusinessId,
        offer_id: &OfferId,
    ) -> Result<OfferListView, OfferServiceError> {
        self.mutate(business_id, "delete", |book| book.delete(offer_id).map(|_| ()))
    }

    pub fn delete_business(&self, business_id: &BusinessId) -> Result<(), OfferServiceError> {
        match self.repository.delete(business_id) {
            Ok(()) => {
                info!(business_id = %business_id, "business record deleted");
                Ok(())
            }
            Err(RepositoryError::NotFound) => {
                Err(OfferServiceError::BusinessNotFound(business_id.clone()))
            }
            Err(other) => Err(other.into()),
        }
    }

    pub fn approval_letter(
        &self,
        business_id: &BusinessId,
        requested_index: usize,
    ) -> Result<Option<ApprovalLetterView>, OfferServiceError> {
        let record = self.load(business_id)?;
        let offers = normalize_at(&record, Utc::now());
        Ok(approval_letter(
            &record.id,
            &record.business_name,
            &offers,
            requested_index,
            self.config.palette_size,
        ))
    }

    pub fn import_rows(&self, rows: Vec<RawImportRow>) -> ImportSummary {
        let reconciler = Reconciler::new(self.repository.as_ref(), self.config.import);
        let summary = reconciler.run(rows, Utc::now());
        info!(
            imported = summary.imported,
            errors = summary.errors,
            "bulk import finished"
        );
        summary
    }

    pub fn import_csv<T: Read>(&self, reader: T) -> Result<ImportSummary, OfferServiceError> {
        let rows = parse_rows(reader)?;
        Ok(self.import_rows(rows))
    }

    fn load(&self, business_id: &BusinessId) -> Result<BusinessRecord, OfferServiceError> {
        self.repository
            .fetch(business_id)?
            .ok_or_else(|| OfferServiceError::BusinessNotFound(business_id.clone()))
    }

    fn mutate<F>(
        &self,
        business_id: &BusinessId,
        operation: &'static str,
        apply: F,
    ) -> Result<OfferListView, OfferServiceError>
    where
        F: FnOnce(&mut OfferBook) -> Result<(), OfferError>,
    {
        let mut record = self.load(business_id)?;
        let stored_as = record.generation();
        let mut book = OfferBook::new(normalize_at(&record, Utc::now()));

        apply(&mut book)?;

        let offers = book.into_entries();
        record.commit_offers(offers.clone());
        let view = OfferListView::new(&record, stored_as, offers);
        self.repository.update(record)?;

        if matches!(
            stored_as,
            OfferGeneration::FlatLegacy | OfferGeneration::ArrayLegacy
        ) {
            warn!(business_id = %business_id, ?stored_as, "legacy offers rewritten in canonical form");
        }
        info!(
            business_id = %business_id,
            operation,
            offers = view.offers.len(),
            "offer list updated"
        );
        Ok(view)
    }
}

/// Error raised by the offer desk service.
#[derive(Debug, thiserror::Error)]
pub enum OfferServiceError {
    #[error("business {0} not found")]
    BusinessNotFound(BusinessId),
    #[error("business name is empty")]
    MissingBusinessName,
    #[error(transparent)]
    Offer(#[from] OfferError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("import file could not be read: {0}")]
    Import(#[from] csv::Error),
}
