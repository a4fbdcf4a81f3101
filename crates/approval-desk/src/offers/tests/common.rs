use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::OfferDeskConfig;
use crate::offers::domain::{
    BusinessId, BusinessRecord, DecisionStatus, OfferEntry, OfferFields, OfferId,
};
use crate::offers::repository::{BusinessRepository, RepositoryError};
use crate::offers::service::OfferDeskService;

pub(super) fn instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 14, 30, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn fields(lender: &str, amount: &str) -> OfferFields {
    OfferFields {
        lender: lender.to_string(),
        advance_amount: amount.to_string(),
        term: "9 months".to_string(),
        factor_rate: "1.32".to_string(),
        ..OfferFields::default()
    }
}

pub(super) fn offer(id: &str, is_primary: bool) -> OfferEntry {
    OfferEntry::new(
        OfferId::from(id),
        fields(&format!("Lender {id}"), "25000"),
        is_primary,
        instant(),
    )
}

pub(super) fn primary_count(offers: &[OfferEntry]) -> usize {
    offers.iter().filter(|entry| entry.is_primary).count()
}

pub(super) fn record(id: &str, name: &str) -> BusinessRecord {
    BusinessRecord::new(BusinessId::from(id), name, DecisionStatus::Pending, instant())
}

pub(super) fn build_service() -> (OfferDeskService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = OfferDeskService::new(repository.clone(), OfferDeskConfig::default());
    (service, repository)
}

/// Stores records as JSON text so every read goes through the schema boundary.
#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) documents: Arc<Mutex<HashMap<BusinessId, String>>>,
}

impl MemoryRepository {
    pub(super) fn seed_json(&self, id: &str, document: Value) {
        self.documents
            .lock()
            .expect("repository mutex poisoned")
            .insert(BusinessId::from(id), document.to_string());
    }

    pub(super) fn raw(&self, id: &BusinessId) -> Value {
        let guard = self.documents.lock().expect("repository mutex poisoned");
        let text = guard.get(id).expect("document present");
        serde_json::from_str(text).expect("stored json")
    }

    pub(super) fn len(&self) -> usize {
        self.documents.lock().expect("repository mutex poisoned").len()
    }

    fn encode(record: &BusinessRecord) -> Result<String, RepositoryError> {
        serde_json::to_string(record).map_err(|err| RepositoryError::Corrupt(err.to_string()))
    }

    fn decode(text: &str) -> Result<BusinessRecord, RepositoryError> {
        serde_json::from_str(text).map_err(|err| RepositoryError::Corrupt(err.to_string()))
    }
}

impl BusinessRepository for MemoryRepository {
    fn insert(&self, record: BusinessRecord) -> Result<BusinessRecord, RepositoryError> {
        let mut guard = self.documents.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), Self::encode(&record)?);
        Ok(record)
    }

    fn update(&self, record: BusinessRecord) -> Result<(), RepositoryError> {
        let mut guard = self.documents.lock().expect("repository mutex poisoned");
        guard.insert(record.id.clone(), Self::encode(&record)?);
        Ok(())
    }

    fn fetch(&self, id: &BusinessId) -> Result<Option<BusinessRecord>, RepositoryError> {
        let guard = self.documents.lock().expect("repository mutex poisoned");
        guard.get(id).map(|text| Self::decode(text)).transpose()
    }

    fn find_by_name(&self, business_name: &str) -> Result<Option<BusinessRecord>, RepositoryError> {
        let guard = self.documents.lock().expect("repository mutex poisoned");
        for text in guard.values() {
            let record = Self::decode(text)?;
            if record.business_name == business_name {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    fn delete(&self, id: &BusinessId) -> Result<(), RepositoryError> {
        let mut guard = self.documents.lock().expect("repository mutex poisoned");
        guard.remove(id).map(|_| ()).ok_or(RepositoryError::NotFound)
    }
}

pub(super) struct UnavailableRepository;

impl BusinessRepository for UnavailableRepository {
    fn insert(&self, _record: BusinessRecord) -> Result<BusinessRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _record: BusinessRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &BusinessId) -> Result<Option<BusinessRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn find_by_name(&self, _business_name: &str) -> Result<Option<BusinessRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: &BusinessId) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
